use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;

use crate::config::VisionConfig;
use crate::errors::{LocatorError, LocatorResult};
use crate::llm::prompts::{
    build_mark_prompt, build_tree_prompt, tree_response_schema, TREE_SCHEMA_DEPTH,
    TREE_SYSTEM_PROMPT,
};
use crate::llm::provider::VisionProvider;
use crate::llm::types::{
    Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, ImageInput, Part,
    TreeRequest,
};

/// Google Generative Language `generateContent` client.
pub struct GeminiProvider {
    api_base: String,
    api_key: String,
    mark_model: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(api_base: String, api_key: String, mark_model: String, timeout: Duration) -> LocatorResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key,
            mark_model,
            client,
        })
    }

    /// Build from config; fails with `MissingCredential` when the key is unset.
    pub fn from_config(cfg: &VisionConfig) -> LocatorResult<Self> {
        Self::new(
            cfg.api_base.clone(),
            cfg.api_key()?,
            cfg.mark_model.clone(),
            Duration::from_secs(cfg.timeout_secs),
        )
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.api_base, model)
    }

    async fn generate(
        &self,
        model: &str,
        body: &GenerateContentRequest,
    ) -> LocatorResult<GenerateContentResponse> {
        tracing::debug!(provider = "gemini", model = %model, "sending generateContent request");

        let response = self
            .client
            .post(self.endpoint(model))
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let err_body = response.text().await.unwrap_or_default();
            return Err(LocatorError::Provider(format!("{}: {}", status, err_body)));
        }

        let parsed: GenerateContentResponse = response.json().await?;
        tracing::debug!(candidates = parsed.candidates.len(), "generateContent response received");
        Ok(parsed)
    }
}

fn image_part(image: &ImageInput) -> Part {
    Part::image(
        &image.mime_type,
        base64::engine::general_purpose::STANDARD.encode(&image.bytes),
    )
}

#[async_trait]
impl VisionProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn mark_location(
        &self,
        image: &ImageInput,
        description: &str,
    ) -> LocatorResult<Option<Vec<u8>>> {
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".into()),
                parts: vec![Part::text(build_mark_prompt(description)), image_part(image)],
            }],
            system_instruction: None,
            generation_config: Some(GenerationConfig {
                response_modalities: Some(vec!["TEXT".into(), "IMAGE".into()]),
                ..Default::default()
            }),
        };

        let response = self.generate(&self.mark_model, &body).await?;
        let Some(inline) = response.last_image() else {
            tracing::warn!("marker response contained no image");
            return Ok(None);
        };
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(inline.data.as_bytes())
            .map_err(|e| LocatorError::Provider(format!("invalid base64 image data: {e}")))?;
        Ok(Some(bytes))
    }

    async fn describe_tree(
        &self,
        image: &ImageInput,
        request: &TreeRequest,
    ) -> LocatorResult<String> {
        let prompt = build_tree_prompt(image.width, image.height, request.hint.as_deref());
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".into()),
                parts: vec![Part::text(prompt), image_part(image)],
            }],
            system_instruction: Some(Content {
                role: None,
                parts: vec![Part::text(TREE_SYSTEM_PROMPT)],
            }),
            generation_config: Some(GenerationConfig {
                response_mime_type: Some("application/json".into()),
                response_schema: Some(tree_response_schema(TREE_SCHEMA_DEPTH)),
                ..Default::default()
            }),
        };

        let response = self.generate(&request.model, &body).await?;
        response
            .text()
            .ok_or_else(|| LocatorError::Schema("response contained no text".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_model() {
        let p = GeminiProvider::new(
            "https://example.test/v1beta/".into(),
            "k".into(),
            "m".into(),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(
            p.endpoint("gemini-2.0-flash-exp"),
            "https://example.test/v1beta/models/gemini-2.0-flash-exp:generateContent"
        );
        assert_eq!(p.name(), "gemini");
    }
}
