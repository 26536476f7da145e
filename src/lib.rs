//! # filesave-bridge
//!
//! Lets a sandboxed application ask the host OS for its native "save file" /
//! "open file" picker, then moves the file bytes between the location the
//! user picked and the application's in-memory copy.
//!
//! File content crosses the host transport as base64 text. Locations are
//! opaque [`handle::ResourceHandle`]s that only the granting
//! [`handle::DocumentStore`] can turn into byte streams.
//!
//! ## Key Modules
//!
//! - [`bridge`]: launch save/open pickers and handle their results.
//! - [`pending`]: tokens and channel-delivered outcomes for launched operations.
//! - [`stream`]: chunked reads and single-shot writes against a store.
//! - [`metadata`]: best-effort display-name lookup.
//! - [`transcode`]: base64 encode/decode.
//! - [`fs_store`]: `file://` store for desktop hosts.
//!
//! ## Examples
//!
//! ```no_run
//! use filesave_bridge::bridge::FileSaveBridge;
//! use filesave_bridge::call::SaveFileOptions;
//! use filesave_bridge::config::BridgeConfig;
//! use filesave_bridge::fs_store::FsDocumentStore;
//! use filesave_bridge::picker::{PickerResult, QueuedPicker};
//!
//! let bridge = FileSaveBridge::new(QueuedPicker::new(), FsDocumentStore, BridgeConfig::default());
//! let pending = bridge.launch_save(SaveFileOptions {
//!     data: Some(filesave_bridge::transcode::encode(b"hello")),
//!     ..Default::default()
//! });
//! // ... the host shows the picker, the user chooses a location ...
//! let handle = FsDocumentStore::handle_for("/tmp/project.sb3".as_ref()).unwrap();
//! bridge.complete(pending.token(), PickerResult::picked(handle)).unwrap();
//! println!("{:?}", pending.wait());
//! ```

pub mod bridge;
pub mod call;
pub mod cli;
pub mod cli_runner;
pub mod config;
pub mod error;
pub use error::BridgeError;

pub mod fs_store;
pub mod handle;
pub mod metadata;
pub mod pending;
pub mod picker;
pub mod stream;
pub mod transcode;
pub mod transfer;

// In-memory store with fault injection, used by tests
pub mod testing;
