use crate::{Identification, IdentificationResult};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("No JSON object found in model output")]
    NoJsonObject,
    #[error("Malformed identification JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// Parse the vision model's answer. Never fails: output without a usable JSON
/// object comes back as [`Identification::Unstructured`].
pub fn parse_identification(text: &str) -> Identification {
    match extract_identification(text) {
        Ok(result) => Identification::Identified(result),
        Err(e) => {
            debug!("Falling back to raw identification text: {}", e);
            Identification::Unstructured {
                raw: text.to_string(),
            }
        }
    }
}

/// Parse the span from the first `{` to the last `}`, ignoring surrounding prose.
fn extract_identification(text: &str) -> Result<IdentificationResult, ParseError> {
    let start = text.find('{').ok_or(ParseError::NoJsonObject)?;
    let end = text.rfind('}').ok_or(ParseError::NoJsonObject)?;
    if end < start {
        return Err(ParseError::NoJsonObject);
    }

    Ok(serde_json::from_str(&text[start..=end])?)
}
