//! Boundary call shapes for `saveFile` and `openFile`.
//!
//! These mirror the JSON objects the embedding application sends. Every
//! field is optional on the wire; defaults come from [`BridgeConfig`].

use serde::{Deserialize, Serialize};

use crate::config::BridgeConfig;
use crate::transfer::TransferRequest;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveFileOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Base64 file content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenFileOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// Empty strings count as absent, so `{"fileName": ""}` still gets the default.
fn or_default(value: Option<String>, default: &str) -> String {
    match value {
        Some(v) if !v.is_empty() => v,
        _ => default.to_string(),
    }
}

impl SaveFileOptions {
    pub fn into_request(self, config: &BridgeConfig) -> TransferRequest {
        TransferRequest {
            target_name: or_default(self.file_name, &config.default_file_name),
            content_type: or_default(self.mime_type, &config.default_save_mime),
            payload: self.data,
        }
    }
}

impl OpenFileOptions {
    pub fn into_request(self, config: &BridgeConfig) -> TransferRequest {
        TransferRequest {
            target_name: String::new(),
            content_type: or_default(self.mime_type, &config.default_open_mime),
            payload: None,
        }
    }
}
