use std::path::Path;

use serde::{Deserialize, Serialize};

/// Image payload sent to the vision model.
#[derive(Debug, Clone)]
pub struct ImageInput {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
}

/// Parameters for an element-tree request.
#[derive(Debug, Clone)]
pub struct TreeRequest {
    pub model: String,
    pub hint: Option<String>,
}

/// Outbound mime type from the file extension, PNG when unknown.
pub fn mime_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "image/png",
    }
}

// ── generateContent wire format ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    pub fn image(mime_type: &str, base64_data: String) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: mime_type.to_string(),
                data: base64_data,
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    /// Base64-encoded bytes.
    pub data: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_modalities: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Content,
}

impl GenerateContentResponse {
    fn first_parts(&self) -> &[Part] {
        self.candidates
            .first()
            .map(|c| c.content.parts.as_slice())
            .unwrap_or(&[])
    }

    /// The last inline image of the first candidate.
    pub fn last_image(&self) -> Option<&InlineData> {
        self.first_parts()
            .iter()
            .filter_map(|p| p.inline_data.as_ref())
            .last()
    }

    /// Concatenated text parts of the first candidate.
    pub fn text(&self) -> Option<String> {
        let text: String = self
            .first_parts()
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        (!text.is_empty()).then_some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_type_falls_back_to_png() {
        assert_eq!(mime_type_for(Path::new("a/b/shot.JPG")), "image/jpeg");
        assert_eq!(mime_type_for(Path::new("shot.jpeg")), "image/jpeg");
        assert_eq!(mime_type_for(Path::new("shot.webp")), "image/webp");
        assert_eq!(mime_type_for(Path::new("shot.gif")), "image/gif");
        assert_eq!(mime_type_for(Path::new("shot.bmp")), "image/png");
        assert_eq!(mime_type_for(Path::new("shot")), "image/png");
    }

    #[test]
    fn request_uses_camel_case() {
        let req = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".into()),
                parts: vec![Part::text("hi"), Part::image("image/png", "AAAA".into())],
            }],
            system_instruction: None,
            generation_config: Some(GenerationConfig {
                response_mime_type: Some("application/json".into()),
                ..Default::default()
            }),
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["contents"][0]["parts"][1]["inlineData"]["mimeType"], "image/png");
        assert_eq!(v["generationConfig"]["responseMimeType"], "application/json");
        assert!(v.get("systemInstruction").is_none());
        assert!(v["generationConfig"].get("responseSchema").is_none());
    }

    #[test]
    fn response_picks_last_image_and_joins_text() {
        let resp: GenerateContentResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{
                "content": {
                    "parts": [
                        {"text": "{\"elements\":"},
                        {"inlineData": {"mimeType": "image/png", "data": "Zmlyc3Q="}},
                        {"text": "[]}"},
                        {"inlineData": {"mimeType": "image/png", "data": "c2Vjb25k"}}
                    ]
                }
            }]
        }))
        .unwrap();
        assert_eq!(resp.last_image().unwrap().data, "c2Vjb25k");
        assert_eq!(resp.text().as_deref(), Some("{\"elements\":[]}"));
    }

    #[test]
    fn empty_response_has_nothing() {
        let resp: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.last_image().is_none());
        assert!(resp.text().is_none());
    }
}
