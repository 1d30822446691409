use base64::{engine::general_purpose, Engine as _};
use serde::Serialize;

/// Instruction sent alongside every photo. The model is asked for a bare JSON
/// object, but answers are still parsed defensively.
pub const IDENTIFICATION_PROMPT: &str = r#"
You are an expert valuer. Identify the item in this photo and describe its type, brand, category, and condition.
If a description is provided, use it to refine accuracy.
Return a JSON object ONLY in this format:
{
  "item": "Item name",
  "attributes": {
    "brand": "string",
    "category": "string",
    "condition": "string"
  },
  "search_queries": ["query1", "query2"]
}"#;

/// `models/{model}:generateContent` request body
#[derive(Debug, Clone, Serialize)]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Content {
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Part {
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
    Text {
        text: String,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    /// Base64 (standard alphabet, padded)
    pub data: String,
}

impl GenerateContentRequest {
    /// One user turn: the photo first, then the prompt with the caller's description.
    pub fn identification(image: &[u8], mime_type: &str, description: &str) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: mime_type.to_string(),
                            data: general_purpose::STANDARD.encode(image),
                        },
                    },
                    Part::Text {
                        text: format!("{}\nUser description: {}", IDENTIFICATION_PROMPT, description),
                    },
                ],
            }],
        }
    }
}

/// Image content type from a file name's extension, JPEG when unknown.
pub fn mime_type_for_file_name(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "heic" => "image/heic",
        "heif" => "image/heif",
        _ => "image/jpeg",
    }
}
