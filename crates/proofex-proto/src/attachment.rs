//! Base64 JSON attachments.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::errors::{ProtocolError, Result};

/// MIME type of every attachment this protocol produces.
pub const JSON_MIME_TYPE: &str = "application/json";

/// Attachment payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentData {
    /// Base64 (standard alphabet, padded) encoding of the content
    pub base64: String,
}

/// A JSON document embedded in a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Attachment identifier, unique within the message
    #[serde(rename = "@id")]
    pub id: String,
    /// Content type
    #[serde(rename = "mime-type")]
    pub mime_type: String,
    /// Encoded content
    pub data: AttachmentData,
}

impl Attachment {
    /// Encode `content` as a JSON attachment.
    pub fn from_json<T: Serialize>(id: impl Into<String>, content: &T) -> Result<Self> {
        let bytes = serde_json::to_vec(content)?;
        Ok(Self {
            id: id.into(),
            mime_type: JSON_MIME_TYPE.to_string(),
            data: AttachmentData { base64: STANDARD.encode(bytes) },
        })
    }

    /// Decode the attachment content as `T`.
    pub fn decode_json<T: DeserializeOwned>(&self) -> Result<T> {
        let bytes = STANDARD.decode(&self.data.base64).map_err(|err| {
            ProtocolError::InvalidAttachment { id: self.id.clone(), reason: err.to_string() }
        })?;
        serde_json::from_slice(&bytes).map_err(|err| ProtocolError::InvalidAttachment {
            id: self.id.clone(),
            reason: err.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_base64() {
        let attachment = Attachment {
            id: "a-0".to_string(),
            mime_type: JSON_MIME_TYPE.to_string(),
            data: AttachmentData { base64: "%%%".to_string() },
        };
        let result = attachment.decode_json::<serde_json::Value>();
        assert!(matches!(result, Err(ProtocolError::InvalidAttachment { .. })));
    }

    #[test]
    fn rejects_non_json_content() {
        let attachment = Attachment {
            id: "a-0".to_string(),
            mime_type: JSON_MIME_TYPE.to_string(),
            data: AttachmentData { base64: STANDARD.encode(b"not json") },
        };
        let result = attachment.decode_json::<serde_json::Value>();
        assert!(matches!(result, Err(ProtocolError::InvalidAttachment { .. })));
    }
}
