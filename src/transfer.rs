//! Transfer requests, outcomes and the replies sent back across the boundary.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Rejection code the application uses to tell a cancel from a failure.
pub const CANCELLED_CODE: &str = "CANCELLED";
const CANCELLED_MESSAGE: &str = "user cancelled";

/// One save or load request, with defaults already applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub target_name: String,
    pub content_type: String,
    /// Base64 payload; only meaningful for saves.
    pub payload: Option<String>,
}

/// Terminal result of one save or load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    Success {
        uri: String,
        data: Option<String>,
        name: Option<String>,
    },
    Cancelled,
    Failed {
        reason: String,
    },
}

impl TransferOutcome {
    pub fn failed(reason: impl Into<String>) -> Self {
        TransferOutcome::Failed { reason: reason.into() }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TransferOutcome::Success { .. })
    }

    /// Short tag for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            TransferOutcome::Success { .. } => "success",
            TransferOutcome::Cancelled => "cancelled",
            TransferOutcome::Failed { .. } => "failed",
        }
    }

    /// Shape the outcome as the reply the application receives.
    pub fn into_reply(self) -> CallReply {
        match self {
            TransferOutcome::Success { uri, data, name } => {
                let body = SuccessBody { data, name, uri };
                // A struct of strings always serializes.
                CallReply::Resolved(serde_json::to_value(body).unwrap_or(Value::Null))
            }
            TransferOutcome::Cancelled => CallReply::Rejected {
                message: CANCELLED_MESSAGE.to_string(),
                code: Some(CANCELLED_CODE.to_string()),
            },
            TransferOutcome::Failed { reason } => CallReply::Rejected { message: reason, code: None },
        }
    }
}

#[derive(Serialize)]
struct SuccessBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    uri: String,
}

/// One call, one reply: resolved with a JSON object or rejected with a reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum CallReply {
    Resolved(Value),
    Rejected {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        code: Option<String>,
    },
}

impl CallReply {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, CallReply::Rejected { code: Some(c), .. } if c == CANCELLED_CODE)
    }
}
