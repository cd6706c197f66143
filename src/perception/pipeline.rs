//! Locate and snapshot pipelines: glue between the vision provider, the
//! geometric core and the files written next to the input image.
//!
//! Locate:
//! 1. Load the input and record its size.
//! 2. Ask the provider to paint a marker; save the result as `<stem>_annotated.png`.
//! 3. Segment the marker and remap its centroid to the input's grid.
//!
//! Snapshot:
//! 1. Load the input and ask the provider for an element tree.
//! 2. Validate/clamp, assign refs.
//! 3. Optionally render the labeled overlay to `<stem>_labeled.png`.

use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat, ImageReader};
use serde::Serialize;

use crate::errors::{ErrorCode, LocatorError, LocatorResult};
use crate::llm::provider::VisionProvider;
use crate::llm::types::{mime_type_for, ImageInput, TreeRequest};
use crate::perception::annotator::{render, RenderStyle};
use crate::perception::marker::{locate_marker, MarkerParams};
use crate::perception::refs::assign_refs;
use crate::perception::types::{ElementNode, ElementTree};
use crate::perception::validate::validate;

pub const ANNOTATED_SUFFIX: &str = "_annotated";
pub const LABELED_SUFFIX: &str = "_labeled";
pub const DEBUG_MASK_FILE: &str = "screen_locator_debug_mask.png";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportedPoint {
    pub x: i64,
    pub y: i64,
    pub input_width: u32,
    pub input_height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocateReport {
    pub detected: bool,
    #[serde(flatten)]
    pub location: Option<ReportedPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotated_image: Option<String>,
}

impl LocateReport {
    fn missed(error: impl Into<String>, annotated_image: Option<String>) -> Self {
        Self {
            detected: false,
            location: None,
            error: Some(error.into()),
            annotated_image,
        }
    }

    pub fn exit_code(&self) -> i32 {
        if self.detected {
            0
        } else {
            1
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SnapshotReport {
    pub width: u32,
    pub height: u32,
    pub model: String,
    pub elements: Vec<ElementNode>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub validation_warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotated_image: Option<String>,
}

/// Fatal-path output.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelope {
    pub error: String,
    pub error_code: ErrorCode,
}

impl From<&LocatorError> for ErrorEnvelope {
    fn from(e: &LocatorError) -> Self {
        Self {
            error: e.to_string(),
            error_code: e.code(),
        }
    }
}

/// `<dir>/<stem><suffix>.png` next to `input`.
pub fn sibling_path(input: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    input.with_file_name(format!("{stem}{suffix}.png"))
}

struct LoadedImage {
    image: DynamicImage,
    input: ImageInput,
}

/// Read and decode an image, guessing the format from its content.
fn load_input(path: &Path) -> LocatorResult<LoadedImage> {
    if !path.exists() {
        return Err(LocatorError::ImageNotFound(path.display().to_string()));
    }
    let bytes = std::fs::read(path)?;
    let image = ImageReader::new(std::io::Cursor::new(&bytes))
        .with_guessed_format()?
        .decode()?;
    let input = ImageInput {
        width: image.width(),
        height: image.height(),
        mime_type: mime_type_for(path).to_string(),
        bytes,
    };
    tracing::debug!(path = %path.display(), width = input.width, height = input.height, "input image loaded");
    Ok(LoadedImage { image, input })
}

pub async fn run_locate(
    provider: &dyn VisionProvider,
    image_path: &Path,
    description: &str,
    params: &MarkerParams,
    debug: bool,
) -> LocatorResult<LocateReport> {
    let loaded = load_input(image_path)?;
    let original_dims = (loaded.input.width, loaded.input.height);

    tracing::info!(provider = provider.name(), description, "requesting marker annotation");
    let Some(annotated_bytes) = provider.mark_location(&loaded.input, description).await? else {
        return Ok(LocateReport::missed("No image in API response", None));
    };

    let annotated = image::load_from_memory(&annotated_bytes)?;
    let annotated_path = sibling_path(image_path, ANNOTATED_SUFFIX);
    annotated.save_with_format(&annotated_path, ImageFormat::Png)?;
    let annotated_str = annotated_path.display().to_string();
    tracing::debug!(
        path = %annotated_str,
        width = annotated.width(),
        height = annotated.height(),
        "annotated image saved"
    );

    let (outcome, mask) = locate_marker(original_dims, &annotated, params);

    if debug {
        let mask_path = std::env::temp_dir().join(DEBUG_MASK_FILE);
        match mask.save_with_format(&mask_path, ImageFormat::Png) {
            Ok(()) => tracing::info!(path = %mask_path.display(), "debug mask written"),
            Err(e) => tracing::warn!(error = %e, "failed to write debug mask"),
        }
    }

    match outcome {
        Ok(loc) => {
            tracing::info!(x = loc.x, y = loc.y, "marker located");
            Ok(LocateReport {
                detected: true,
                location: Some(ReportedPoint {
                    x: loc.x,
                    y: loc.y,
                    input_width: loc.original_width,
                    input_height: loc.original_height,
                }),
                error: None,
                annotated_image: Some(annotated_str),
            })
        }
        Err(e) => {
            tracing::warn!(error = %e, "marker detection failed");
            Ok(LocateReport::missed(e.to_string(), Some(annotated_str)))
        }
    }
}

/// Parse the model's JSON, then validate and assign refs in place.
pub fn normalize_tree(raw_json: &str, width: u32, height: u32) -> LocatorResult<(Vec<ElementNode>, Vec<String>)> {
    let tree: ElementTree =
        serde_json::from_str(raw_json).map_err(|e| LocatorError::Schema(e.to_string()))?;
    let mut elements = tree.elements;
    let warnings = validate(&mut elements, width, height);
    assign_refs(&mut elements);
    Ok((elements, warnings))
}

pub async fn run_snapshot(
    provider: &dyn VisionProvider,
    image_path: &Path,
    hint: Option<&str>,
    model: &str,
    render_overlay: bool,
    style: &RenderStyle,
) -> LocatorResult<SnapshotReport> {
    let loaded = load_input(image_path)?;
    let (width, height) = (loaded.input.width, loaded.input.height);

    let request = TreeRequest {
        model: model.to_string(),
        hint: hint.map(str::to_string),
    };
    tracing::info!(provider = provider.name(), model, "requesting element tree");
    let raw = provider.describe_tree(&loaded.input, &request).await?;

    let (elements, validation_warnings) = normalize_tree(&raw, width, height)?;
    tracing::info!(
        top_level = elements.len(),
        warnings = validation_warnings.len(),
        "element tree normalized"
    );

    let annotated_image = if render_overlay {
        let labeled = render(&loaded.image, &elements, style);
        let path = sibling_path(image_path, LABELED_SUFFIX);
        labeled.save_with_format(&path, ImageFormat::Png)?;
        tracing::debug!(path = %path.display(), "labeled image saved");
        Some(path.display().to_string())
    } else {
        None
    };

    Ok(SnapshotReport {
        width,
        height,
        model: model.to_string(),
        elements,
        validation_warnings,
        annotated_image,
    })
}
