//! Moving bytes between memory and the streams a [`DocumentStore`] grants.
//!
//! Streams are held only inside these functions and are released on every
//! exit path. A write becomes visible only through
//! [`OutputSink::finish`](crate::handle::OutputSink::finish);
//! a sink dropped early discards what it got.

use std::io::{self, Read, Write};

use scopeguard::ScopeGuard;
use tracing::{debug, warn};

use crate::error::{BridgeError, Direction};
use crate::handle::{DocumentStore, OutputSink, ResourceHandle};
use crate::transcode;

/// Size of the buffer used for each read from an input stream.
pub const READ_CHUNK_SIZE: usize = 8192;

/// Decode a base64 payload and write it to `handle`.
///
/// Decoding happens before any stream is requested, so malformed input
/// never touches the target. Returns the number of bytes written.
pub fn write_payload<S>(store: &S, handle: &ResourceHandle, payload: &str) -> Result<usize, BridgeError>
where
    S: DocumentStore + ?Sized,
{
    let bytes = transcode::decode(payload)?;
    write_bytes(store, handle, &bytes)?;
    Ok(bytes.len())
}

/// Write `bytes` to `handle` in one logical operation. No retry: a grant
/// is single-shot.
pub fn write_bytes<S>(store: &S, handle: &ResourceHandle, bytes: &[u8]) -> Result<(), BridgeError>
where
    S: DocumentStore + ?Sized,
{
    let sink = store
        .open_output(handle)
        .map_err(|e| BridgeError::stream_unavailable(Direction::Output, Some(e)))?
        .ok_or_else(|| BridgeError::stream_unavailable(Direction::Output, None))?;

    let mut sink = scopeguard::guard(sink, |_| {
        warn!(%handle, "output stream released before the write completed");
    });
    sink.write_all(bytes).map_err(|e| BridgeError::io("write", e))?;
    sink.flush().map_err(|e| BridgeError::io("flush", e))?;

    let sink = ScopeGuard::into_inner(sink);
    sink.finish().map_err(|e| BridgeError::io("finish", e))?;
    debug!(%handle, len = bytes.len(), "wrote document");
    Ok(())
}

/// Read everything from `handle` into memory.
///
/// With `limit == None` there is no upper bound; callers handling very
/// large documents should pass one.
pub fn read_all<S>(store: &S, handle: &ResourceHandle, limit: Option<u64>) -> Result<Vec<u8>, BridgeError>
where
    S: DocumentStore + ?Sized,
{
    let source = store
        .open_input(handle)
        .map_err(|e| BridgeError::stream_unavailable(Direction::Input, Some(e)))?
        .ok_or_else(|| BridgeError::stream_unavailable(Direction::Input, None))?;

    let bytes = read_chunked(source, limit)?;
    debug!(%handle, len = bytes.len(), "read document");
    Ok(bytes)
}

/// Drain `source` through a fixed [`READ_CHUNK_SIZE`] buffer. On error the
/// partial buffer is dropped, never returned.
pub fn read_chunked<R: Read>(mut source: R, limit: Option<u64>) -> Result<Vec<u8>, BridgeError> {
    let mut out = Vec::new();
    let mut chunk = [0u8; READ_CHUNK_SIZE];
    loop {
        let n = match source.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(BridgeError::io("read", e)),
        };
        if let Some(limit) = limit {
            if (out.len() + n) as u64 > limit {
                return Err(BridgeError::TooLarge { limit });
            }
        }
        out.extend_from_slice(&chunk[..n]);
    }
    Ok(out)
}
