// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Gemini `generateContent` REST client.

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::services::oracle::{ContentPart, GenerationOracle, OracleError, OracleRequest};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ContentResponse>,
}

#[derive(Debug, Deserialize)]
struct ContentResponse {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Debug, Deserialize)]
struct PartResponse {
    text: Option<String>,
}

/// Gemini API client.
#[derive(Clone)]
pub struct GeminiClient {
    api_key: String,
    http_client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(api_key: &str) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            api_key: api_key.to_string(),
            http_client,
        })
    }

    async fn call(&self, model: &str, body: &GenerateContentRequest) -> Result<String, OracleError> {
        let url = format!("{}/models/{}:generateContent", API_BASE, model);

        let response = self
            .http_client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, model = model, "Gemini request failed");
                OracleError::Transport(e.to_string())
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status, body = %body, "Gemini API error");
            return Err(OracleError::Status { status, body });
        }

        let parsed: GenerateContentResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to parse Gemini response");
            OracleError::Decode(e.to_string())
        })?;

        extract_text(parsed)
    }
}

fn build_request(request: OracleRequest) -> GenerateContentRequest {
    let parts = request
        .parts
        .into_iter()
        .map(|part| match part {
            ContentPart::Text(text) => Part::Text { text },
            ContentPart::InlineImage { mime_type, data } => Part::InlineData {
                inline_data: InlineData {
                    mime_type,
                    data: general_purpose::STANDARD.encode(&data),
                },
            },
        })
        .collect();

    GenerateContentRequest {
        system_instruction: request.system_directive.map(|text| Content {
            role: None,
            parts: vec![Part::Text { text }],
        }),
        contents: vec![Content {
            role: Some("user"),
            parts,
        }],
        generation_config: request.contract.map(|schema| GenerationConfig {
            response_mime_type: "application/json",
            response_schema: schema,
        }),
    }
}

/// Concatenate the text parts of the first candidate.
fn extract_text(response: GenerateContentResponse) -> Result<String, OracleError> {
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(OracleError::EmptyResponse);
    }
    Ok(text)
}

#[async_trait]
impl GenerationOracle for GeminiClient {
    async fn generate(&self, request: OracleRequest) -> Result<String, OracleError> {
        let model = request.model.clone();
        let body = build_request(request);
        tracing::debug!(model = %model, "Calling Gemini generateContent");
        self.call(&model, &body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_wire_format() {
        let req = OracleRequest::text("gemini-2.5-flash", "Analyze".to_string())
            .with_image("image/png", vec![0xff, 0x00])
            .with_system_directive("Be brief".to_string())
            .with_contract(json!({"type": "OBJECT"}));

        let wire = serde_json::to_value(build_request(req)).unwrap();
        assert_eq!(wire["systemInstruction"]["parts"][0]["text"], "Be brief");
        assert_eq!(wire["contents"][0]["role"], "user");
        assert_eq!(wire["contents"][0]["parts"][0]["text"], "Analyze");
        assert_eq!(
            wire["contents"][0]["parts"][1]["inlineData"]["mimeType"],
            "image/png"
        );
        assert_eq!(wire["contents"][0]["parts"][1]["inlineData"]["data"], "/wA=");
        assert_eq!(
            wire["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(wire["generationConfig"]["responseSchema"]["type"], "OBJECT");
    }

    #[test]
    fn test_plain_text_request_has_no_generation_config() {
        let wire =
            serde_json::to_value(build_request(OracleRequest::text("m", "hi".into()))).unwrap();
        assert!(wire.get("generationConfig").is_none());
        assert!(wire.get("systemInstruction").is_none());
    }

    #[test]
    fn test_extract_text_joins_parts_and_rejects_empty() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{"content": {"parts": [{"text": "{\"a\":"}, {"text": "1}"}]}}]
        }))
        .unwrap();
        assert_eq!(extract_text(response).unwrap(), "{\"a\":1}");

        let blocked: GenerateContentResponse =
            serde_json::from_value(json!({"candidates": [{}]})).unwrap();
        assert!(matches!(
            extract_text(blocked),
            Err(OracleError::EmptyResponse)
        ));
    }
}
