//! Drives the bridge from the command line against the local filesystem.
//!
//! The CLI plays both sides: it launches the operation like an embedding
//! application would, then answers the queued picker request itself with
//! the location given on the command line (or a cancel).

use std::fs;
use std::path::Path;

use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::bridge::FileSaveBridge;
use crate::call::{OpenFileOptions, SaveFileOptions};
use crate::cli::{self, Commands};
use crate::config::BridgeConfig;
use crate::fs_store::FsDocumentStore;
use crate::handle::ResourceHandle;
use crate::picker::{PickerResult, QueuedPicker};
use crate::transcode;
use crate::transfer::CallReply;

type CliBridge = FileSaveBridge<QueuedPicker, FsDocumentStore>;

/// Public entry for running CLI logic.
pub fn run_cli_app() -> Result<(), Box<dyn std::error::Error>> {
    let args = cli::run()?;
    init_tracing(args.verbose);

    let mut config = BridgeConfig::from_env()?;
    if let Some(limit) = args.max_read_bytes {
        config.max_read_bytes = Some(limit);
    }
    let bridge = FileSaveBridge::new(QueuedPicker::new(), FsDocumentStore::new(), config);

    match args.command {
        Commands::Save { input, to, name, mime, cancel } => {
            let bytes = fs::read(&input)?;
            let pending = bridge.launch_save(SaveFileOptions {
                file_name: name,
                mime_type: mime,
                data: Some(transcode::encode(&bytes)),
            });
            answer_picker(&bridge, &to, cancel)?;
            let reply = pending.wait().into_reply();
            print_reply(&reply)?;
            ensure_resolved(reply)?;
        }
        Commands::Open { from, mime, out, cancel } => {
            let pending = bridge.launch_open(OpenFileOptions { mime_type: mime });
            answer_picker(&bridge, &from, cancel)?;
            let mut reply = pending.wait().into_reply();

            if let (Some(out), CallReply::Resolved(body)) = (&out, &mut reply) {
                // Written to disk, so keep the printed reply small.
                let data = body
                    .as_object_mut()
                    .and_then(|o| o.remove("data"))
                    .and_then(|d| d.as_str().map(str::to_string))
                    .unwrap_or_default();
                let bytes = transcode::decode(&data)?;
                fs::write(out, &bytes)?;
                debug!(out = %out.display(), len = bytes.len(), "wrote decoded document");
            }
            print_reply(&reply)?;
            ensure_resolved(reply)?;
        }
    }

    Ok(())
}

// --- picker side -------------------------------------------------------------

fn answer_picker(bridge: &CliBridge, location: &str, cancel: bool) -> Result<(), Box<dyn std::error::Error>> {
    let (token, request) = bridge
        .picker()
        .next_presented()
        .ok_or("picker was never presented")?;
    debug!(%token, action = ?request.action, mime = %request.mime_type, "answering picker");

    let result = if cancel {
        PickerResult::cancelled()
    } else {
        PickerResult::picked(parse_location(location)?)
    };
    bridge.complete(token, result)?;
    Ok(())
}

/// Accept either a ready `file://` handle or a plain path.
fn parse_location(location: &str) -> std::io::Result<ResourceHandle> {
    if location.starts_with("file://") {
        Ok(ResourceHandle::new(location))
    } else {
        FsDocumentStore::handle_for(Path::new(location))
    }
}

// --- output ------------------------------------------------------------------

fn print_reply(reply: &CallReply) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(reply)?);
    Ok(())
}

fn ensure_resolved(reply: CallReply) -> Result<(), Box<dyn std::error::Error>> {
    match reply {
        CallReply::Resolved(_) => Ok(()),
        CallReply::Rejected { message, .. } => Err(message.into()),
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
