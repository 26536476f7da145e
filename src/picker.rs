//! The OS document picker as seen by the bridge.
//!
//! The picker runs out of process. The bridge only builds a
//! [`PickerRequest`] and hands it to a [`DocumentPicker`] together with the
//! token of the pending operation; the host later feeds the matching
//! [`PickerResult`] to [`crate::bridge::FileSaveBridge::complete`].

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::handle::ResourceHandle;
use crate::pending::Token;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickerAction {
    /// Let the user name a new document and choose where it goes.
    CreateDocument,
    /// Let the user choose an existing document.
    OpenDocument,
}

/// What the picker is asked to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickerRequest {
    pub action: PickerAction,
    /// MIME-type hint, e.g. `application/octet-stream` or `*/*`.
    pub mime_type: String,
    /// Suggested file name (create only).
    pub title: Option<String>,
    /// Restrict to locations that can be opened as a byte stream.
    pub openable_only: bool,
    pub allow_multiple: bool,
}

impl PickerRequest {
    pub fn create_document(title: &str, mime_type: &str) -> Self {
        PickerRequest {
            action: PickerAction::CreateDocument,
            mime_type: mime_type.to_string(),
            title: Some(title.to_string()),
            openable_only: true,
            allow_multiple: false,
        }
    }

    pub fn open_document(mime_type: &str) -> Self {
        PickerRequest {
            action: PickerAction::OpenDocument,
            mime_type: mime_type.to_string(),
            title: None,
            openable_only: true,
            allow_multiple: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultCode {
    Ok,
    Cancelled,
    /// Any other platform code; treated like a cancel.
    Other(i32),
}

/// The data part of a picker result. `reference` is absent when the OS
/// reported success without naming a location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickerData {
    pub reference: Option<ResourceHandle>,
}

/// Raw picker callback payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickerResult {
    pub code: ResultCode,
    pub data: Option<PickerData>,
}

impl PickerResult {
    pub fn picked(handle: ResourceHandle) -> Self {
        PickerResult {
            code: ResultCode::Ok,
            data: Some(PickerData { reference: Some(handle) }),
        }
    }

    pub fn cancelled() -> Self {
        PickerResult { code: ResultCode::Cancelled, data: None }
    }

    /// Success reported, but no reference came back.
    pub fn without_reference() -> Self {
        PickerResult {
            code: ResultCode::Ok,
            data: Some(PickerData { reference: None }),
        }
    }
}

/// Host-side launcher for the OS picker.
///
/// `present` must return promptly; the user interaction happens elsewhere
/// and its result is delivered later under `token`.
pub trait DocumentPicker: Send + Sync {
    fn present(&self, token: Token, request: PickerRequest);
}

/// Picker that only queues what it was asked to show. The host (or a test,
/// or the CLI) drains the queue and answers each request itself.
#[derive(Debug, Default)]
pub struct QueuedPicker {
    presented: Mutex<VecDeque<(Token, PickerRequest)>>,
}

impl QueuedPicker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Oldest request not yet answered.
    pub fn next_presented(&self) -> Option<(Token, PickerRequest)> {
        self.presented.lock().unwrap_or_else(|p| p.into_inner()).pop_front()
    }

    pub fn presented_len(&self) -> usize {
        self.presented.lock().unwrap_or_else(|p| p.into_inner()).len()
    }
}

impl DocumentPicker for QueuedPicker {
    fn present(&self, token: Token, request: PickerRequest) {
        self.presented
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push_back((token, request));
    }
}

impl<P: DocumentPicker + ?Sized> DocumentPicker for std::sync::Arc<P> {
    fn present(&self, token: Token, request: PickerRequest) {
        (**self).present(token, request)
    }
}
