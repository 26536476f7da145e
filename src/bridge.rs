//! Save/open workflows around the OS document picker.
//!
//! A launch registers the request, asks the picker to show itself and
//! returns at once with a [`PendingTransfer`]. The host later calls
//! [`FileSaveBridge::complete`] with the picker's result; that runs the
//! matching result handler and resolves the pending transfer with exactly
//! one [`TransferOutcome`]. Nothing raised while moving bytes escapes the
//! result handlers: errors and store panics both become `Failed`.

use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, warn};

use crate::call::{OpenFileOptions, SaveFileOptions};
use crate::config::BridgeConfig;
use crate::error::{BridgeError, Direction};
use crate::handle::{DocumentStore, ResourceHandle};
use crate::metadata;
use crate::pending::{PendingRegistry, PendingTransfer, Token};
use crate::picker::{DocumentPicker, PickerRequest, PickerResult, ResultCode};
use crate::stream;
use crate::transcode;
use crate::transfer::{TransferOutcome, TransferRequest};

/// Which workflow a pending token belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PendingOp {
    Save(TransferRequest),
    Open(TransferRequest),
}

pub struct FileSaveBridge<P, S> {
    picker: P,
    store: S,
    config: BridgeConfig,
    pending: PendingRegistry<PendingOp>,
}

impl<P, S> FileSaveBridge<P, S>
where
    P: DocumentPicker,
    S: DocumentStore,
{
    pub fn new(picker: P, store: S, config: BridgeConfig) -> Self {
        FileSaveBridge {
            picker,
            store,
            config,
            pending: PendingRegistry::new(),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn picker(&self) -> &P {
        &self.picker
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Operations launched and not yet completed.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Ask the user where to save. The payload stays with the pending
    /// request until the picker answers.
    pub fn launch_save(&self, options: SaveFileOptions) -> PendingTransfer {
        let request = options.into_request(&self.config);
        let picker_request = PickerRequest::create_document(&request.target_name, &request.content_type);
        let pending = self.pending.register(PendingOp::Save(request));
        debug!(token = %pending.token(), title = ?picker_request.title, "launching save picker");
        self.picker.present(pending.token(), picker_request);
        pending
    }

    /// Ask the user which document to open.
    pub fn launch_open(&self, options: OpenFileOptions) -> PendingTransfer {
        let request = options.into_request(&self.config);
        let picker_request = PickerRequest::open_document(&request.content_type);
        let pending = self.pending.register(PendingOp::Open(request));
        debug!(token = %pending.token(), mime = %picker_request.mime_type, "launching open picker");
        self.picker.present(pending.token(), picker_request);
        pending
    }

    /// Deliver the picker's result for `token`.
    ///
    /// The entry is removed before any work starts, so a repeated delivery
    /// for the same token gets [`BridgeError::UnknownToken`] and cannot
    /// produce a second outcome.
    pub fn complete(&self, token: Token, result: PickerResult) -> Result<(), BridgeError> {
        let Some((op, resolver)) = self.pending.take(token) else {
            warn!(%token, "picker result for a token that is not pending");
            return Err(BridgeError::UnknownToken(token.get()));
        };
        let outcome = match op {
            PendingOp::Save(request) => self.handle_save_result(&request, result),
            PendingOp::Open(request) => self.handle_open_result(&request, result),
        };
        resolver.resolve(outcome);
        Ok(())
    }

    /// Turn a create-document result into the save outcome.
    pub fn handle_save_result(&self, request: &TransferRequest, result: PickerResult) -> TransferOutcome {
        let handle = match accept(result) {
            Ok(Some(handle)) => handle,
            Ok(None) => return TransferOutcome::Cancelled,
            Err(e) => return fail(e, Direction::Output),
        };
        let Some(payload) = request.payload.as_deref() else {
            return fail(BridgeError::MissingInput("data"), Direction::Output);
        };

        match guarded(|| stream::write_payload(&self.store, &handle, payload)) {
            Ok(_) => TransferOutcome::Success {
                uri: handle.as_str().to_string(),
                data: None,
                name: None,
            },
            Err(e) => fail(e, Direction::Output),
        }
    }

    /// Turn an open-document result into the load outcome.
    pub fn handle_open_result(&self, _request: &TransferRequest, result: PickerResult) -> TransferOutcome {
        let handle = match accept(result) {
            Ok(Some(handle)) => handle,
            Ok(None) => return TransferOutcome::Cancelled,
            Err(e) => return fail(e, Direction::Input),
        };

        let limit = self.config.max_read_bytes;
        match guarded(|| stream::read_all(&self.store, &handle, limit)) {
            Ok(bytes) => {
                let data = transcode::encode(&bytes);
                let name = metadata::resolve_name(&self.store, &handle);
                TransferOutcome::Success {
                    uri: handle.as_str().to_string(),
                    data: Some(data),
                    name: Some(name),
                }
            }
            Err(e) => fail(e, Direction::Input),
        }
    }
}

/// `Ok(None)` is a cancel: any non-OK code, or OK without data.
fn accept(result: PickerResult) -> Result<Option<ResourceHandle>, BridgeError> {
    match (result.code, result.data) {
        (ResultCode::Ok, Some(data)) => data.reference.map(Some).ok_or(BridgeError::InvalidHandle),
        _ => Ok(None),
    }
}

fn fail(err: BridgeError, direction: Direction) -> TransferOutcome {
    let reason = err.reason(direction);
    warn!(error = %err, %reason, "transfer failed");
    TransferOutcome::failed(reason)
}

/// Run store work, turning a panic into an error.
fn guarded<T>(work: impl FnOnce() -> Result<T, BridgeError>) -> Result<T, BridgeError> {
    panic::catch_unwind(AssertUnwindSafe(work)).unwrap_or_else(|payload| {
        let msg = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        Err(BridgeError::Panicked(msg))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::picker::{PickerAction, QueuedPicker};
    use crate::testing::{MemoryStore, StoreFault};
    use crate::transfer::CallReply;

    fn bridge() -> FileSaveBridge<QueuedPicker, MemoryStore> {
        FileSaveBridge::new(QueuedPicker::new(), MemoryStore::new(), BridgeConfig::default())
    }

    fn save_opts(data: Option<&str>) -> SaveFileOptions {
        SaveFileOptions {
            file_name: Some("game.sb3".into()),
            mime_type: None,
            data: data.map(str::to_string),
        }
    }

    #[test]
    fn launch_save_presents_create_document() {
        let b = bridge();
        let pending = b.launch_save(SaveFileOptions::default());
        let (token, req) = b.picker().next_presented().unwrap();
        assert_eq!(token, pending.token());
        assert_eq!(req.action, PickerAction::CreateDocument);
        assert_eq!(req.title.as_deref(), Some("project.sb3"));
        assert_eq!(req.mime_type, "application/octet-stream");
        assert!(req.openable_only);
        assert_eq!(b.pending_count(), 1);
        assert!(pending.try_outcome().is_err());
    }

    #[test]
    fn launch_open_presents_open_document() {
        let b = bridge();
        let _pending = b.launch_open(OpenFileOptions::default());
        let (_, req) = b.picker().next_presented().unwrap();
        assert_eq!(req.action, PickerAction::OpenDocument);
        assert_eq!(req.mime_type, "*/*");
        assert_eq!(req.title, None);
        assert!(!req.allow_multiple);
    }

    #[test]
    fn save_writes_payload_and_reports_uri() {
        let b = bridge();
        let handle = b.store().create("content://docs/doc/7");
        let pending = b.launch_save(save_opts(Some("aGVsbG8=")));
        b.complete(pending.token(), PickerResult::picked(handle.clone())).unwrap();

        assert_eq!(
            pending.wait(),
            TransferOutcome::Success { uri: "content://docs/doc/7".into(), data: None, name: None }
        );
        assert_eq!(b.store().contents(&handle).unwrap(), b"hello".to_vec());
        assert_eq!(b.pending_count(), 0);
    }

    #[test]
    fn each_picker_result_yields_one_outcome() {
        let cases: Vec<(PickerResult, &str)> = vec![
            (PickerResult::cancelled(), "cancelled"),
            (PickerResult { code: ResultCode::Other(-7), data: None }, "cancelled"),
            (PickerResult { code: ResultCode::Ok, data: None }, "cancelled"),
            (PickerResult::without_reference(), "failed"),
            (PickerResult::picked(ResourceHandle::new("content://docs/doc/1")), "success"),
        ];
        for (result, expected) in cases {
            for saving in [true, false] {
                let b = bridge();
                b.store().insert("content://docs/doc/1", "doc.sb3", b"abc".to_vec());
                let pending = if saving {
                    b.launch_save(save_opts(Some("AA==")))
                } else {
                    b.launch_open(OpenFileOptions::default())
                };
                let token = pending.token();
                b.complete(token, result.clone()).unwrap();
                // second delivery is refused and produces nothing
                assert!(matches!(b.complete(token, result.clone()), Err(BridgeError::UnknownToken(_))));
                let outcome = pending.wait();
                assert_eq!(outcome.kind(), expected, "save={} {:?}", saving, outcome);
                assert_eq!(b.pending_count(), 0);
            }
        }
    }

    #[test]
    fn missing_reference_is_reported() {
        let b = bridge();
        let pending = b.launch_open(OpenFileOptions::default());
        b.complete(pending.token(), PickerResult::without_reference()).unwrap();
        assert_eq!(pending.wait(), TransferOutcome::failed("no reference returned"));
    }

    #[test]
    fn save_without_data_performs_no_write() {
        let b = bridge();
        let handle = b.store().create("content://docs/doc/2");
        let pending = b.launch_save(save_opts(None));
        b.complete(pending.token(), PickerResult::picked(handle.clone())).unwrap();
        assert_eq!(pending.wait(), TransferOutcome::failed("no data provided"));
        assert_eq!(b.store().outputs_opened(), 0);
        assert_eq!(b.store().contents(&handle), None);
    }

    #[test]
    fn malformed_payload_is_rejected_before_opening() {
        let b = bridge();
        let handle = b.store().create("content://docs/doc/3");
        let pending = b.launch_save(save_opts(Some("aGVs#G8=")));
        b.complete(pending.token(), PickerResult::picked(handle)).unwrap();
        match pending.wait() {
            TransferOutcome::Failed { reason } => {
                assert!(reason.starts_with("failed to write file: invalid base64 data"), "{}", reason)
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(b.store().outputs_opened(), 0);
    }

    #[test]
    fn store_failures_map_to_boundary_reasons() {
        let b = bridge();
        let h = b.store().create("content://docs/doc/4");
        b.store().set_fault(&h, StoreFault::RefuseOutput);
        let pending = b.launch_save(save_opts(Some("AA==")));
        b.complete(pending.token(), PickerResult::picked(h)).unwrap();
        assert_eq!(pending.wait(), TransferOutcome::failed("could not open output stream"));

        let h = b.store().create("content://docs/doc/5");
        b.store().set_fault(&h, StoreFault::PermissionRevoked);
        let pending = b.launch_save(save_opts(Some("AA==")));
        b.complete(pending.token(), PickerResult::picked(h)).unwrap();
        assert_eq!(pending.wait(), TransferOutcome::failed("could not open output stream"));

        let h = b.store().create("content://docs/doc/6");
        b.store().set_fault(&h, StoreFault::FailWriteAfter(0));
        let pending = b.launch_save(save_opts(Some("AAAA")));
        b.complete(pending.token(), PickerResult::picked(h.clone())).unwrap();
        assert_eq!(pending.wait(), TransferOutcome::failed("failed to write file: no space left on device"));
        assert_eq!(b.store().contents(&h), None);
        assert_eq!(b.store().open_streams(), 0);
    }

    #[test]
    fn open_reads_data_and_name() {
        let b = bridge();
        let h = b.store().insert("content://docs/doc/8", "Cat Game.sb3", vec![0, 1, 2, 253, 254, 255]);
        let pending = b.launch_open(OpenFileOptions::default());
        b.complete(pending.token(), PickerResult::picked(h)).unwrap();
        assert_eq!(
            pending.wait(),
            TransferOutcome::Success {
                uri: "content://docs/doc/8".into(),
                data: Some("AAEC/f7/".into()),
                name: Some("Cat Game.sb3".into()),
            }
        );
        assert_eq!(b.store().open_streams(), 0);
    }

    #[test]
    fn open_without_index_row_still_succeeds() {
        let b = bridge();
        let h = b.store().insert("content://docs/doc/9", "hidden.sb3", b"abc".to_vec());
        b.store().set_fault(&h, StoreFault::NoIndexRow);
        let pending = b.launch_open(OpenFileOptions::default());
        b.complete(pending.token(), PickerResult::picked(h)).unwrap();
        let reply = pending.wait().into_reply();
        assert_eq!(
            reply,
            CallReply::Resolved(serde_json::json!({ "data": "YWJj", "name": "", "uri": "content://docs/doc/9" }))
        );
    }

    #[test]
    fn open_failures_map_to_boundary_reasons() {
        let b = bridge();
        let h = b.store().insert("content://docs/doc/10", "a", vec![1; 20_000]);
        b.store().set_fault(&h, StoreFault::RefuseInput);
        let pending = b.launch_open(OpenFileOptions::default());
        b.complete(pending.token(), PickerResult::picked(h)).unwrap();
        assert_eq!(pending.wait(), TransferOutcome::failed("could not open input stream"));

        let h = b.store().insert("content://docs/doc/11", "b", vec![1; 20_000]);
        b.store().set_fault(&h, StoreFault::FailReadAfter(9000));
        let pending = b.launch_open(OpenFileOptions::default());
        b.complete(pending.token(), PickerResult::picked(h)).unwrap();
        assert_eq!(pending.wait(), TransferOutcome::failed("failed to read file: provider disconnected"));
        assert_eq!(b.store().open_streams(), 0);
    }

    #[test]
    fn store_panics_become_failures() {
        let b = bridge();
        let h = b.store().insert("content://docs/doc/12", "p", vec![1, 2, 3]);
        b.store().set_fault(&h, StoreFault::PanicOnRead);
        let pending = b.launch_open(OpenFileOptions::default());
        b.complete(pending.token(), PickerResult::picked(h)).unwrap();
        assert_eq!(
            pending.wait(),
            TransferOutcome::failed("failed to read file: store panicked: document provider crashed during read")
        );

        let h = b.store().create("content://docs/doc/13");
        b.store().set_fault(&h, StoreFault::PanicOnWrite);
        let pending = b.launch_save(save_opts(Some("AA==")));
        b.complete(pending.token(), PickerResult::picked(h)).unwrap();
        assert!(matches!(pending.wait(), TransferOutcome::Failed { .. }));
        assert_eq!(b.store().open_streams(), 0);
    }

    #[test]
    fn read_limit_rejects_large_documents() {
        let config = BridgeConfig { max_read_bytes: Some(100), ..BridgeConfig::default() };
        let b = FileSaveBridge::new(QueuedPicker::new(), MemoryStore::new(), config);
        let h = b.store().insert("content://docs/doc/14", "big", vec![0; 101]);
        let pending = b.launch_open(OpenFileOptions::default());
        b.complete(pending.token(), PickerResult::picked(h)).unwrap();
        assert_eq!(pending.wait(), TransferOutcome::failed("failed to read file: file exceeds 100 byte limit"));
    }

    #[test]
    fn unknown_token_is_refused() {
        let b = bridge();
        let err = b.complete(Token::from(999), PickerResult::cancelled()).unwrap_err();
        assert!(matches!(err, BridgeError::UnknownToken(999)));
    }

    #[test]
    fn independent_requests_resolve_separately() {
        let b = bridge();
        let h1 = b.store().create("content://docs/a");
        let h2 = b.store().create("content://docs/b");
        let p1 = b.launch_save(save_opts(Some("AQ==")));
        let p2 = b.launch_save(save_opts(Some("Ag==")));
        // answered out of order
        b.complete(p2.token(), PickerResult::picked(h2.clone())).unwrap();
        b.complete(p1.token(), PickerResult::picked(h1.clone())).unwrap();
        assert!(p1.wait().is_success());
        assert!(p2.wait().is_success());
        assert_eq!(b.store().contents(&h1).unwrap(), vec![1]);
        assert_eq!(b.store().contents(&h2).unwrap(), vec![2]);
    }
}
