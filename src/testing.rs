//! In-memory document store for tests and for hosts that want to exercise
//! the bridge without a real OS.
//!
//! Writes become visible only when the sink is finished, like a real
//! provider committing a document. Faults can be injected per handle.

use std::collections::HashMap;
use std::io::{self, Cursor, Read, Write};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::handle::{DocumentStore, IndexRow, InputStream, OutputSink, OutputStream, ResourceHandle, DISPLAY_NAME};

/// Failure to inject for one handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreFault {
    /// `open_output` grants nothing.
    RefuseOutput,
    /// `open_input` grants nothing.
    RefuseInput,
    /// Both opens fail with `PermissionDenied`.
    PermissionRevoked,
    /// The sink errors once more than this many bytes were written.
    FailWriteAfter(usize),
    /// The source errors after yielding this many bytes.
    FailReadAfter(usize),
    NoIndexRow,
    NoNameColumn,
    NullName,
    IndexError,
    PanicOnWrite,
    PanicOnRead,
    PanicOnQuery,
}

#[derive(Debug, Default)]
struct Doc {
    name: Option<String>,
    bytes: Option<Vec<u8>>,
}

#[derive(Debug, Default)]
struct State {
    docs: HashMap<String, Doc>,
    faults: HashMap<String, StoreFault>,
    inputs_opened: usize,
    outputs_opened: usize,
    live_streams: usize,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A location with no content yet, as granted by a create-document picker.
    pub fn create(&self, uri: &str) -> ResourceHandle {
        self.lock().docs.insert(uri.to_string(), Doc::default());
        ResourceHandle::new(uri)
    }

    /// An existing document with a display name.
    pub fn insert(&self, uri: &str, name: &str, bytes: Vec<u8>) -> ResourceHandle {
        self.lock().docs.insert(
            uri.to_string(),
            Doc { name: Some(name.to_string()), bytes: Some(bytes) },
        );
        ResourceHandle::new(uri)
    }

    pub fn set_fault(&self, handle: &ResourceHandle, fault: StoreFault) {
        self.lock().faults.insert(handle.as_str().to_string(), fault);
    }

    /// Committed bytes at `handle`, if any.
    pub fn contents(&self, handle: &ResourceHandle) -> Option<Vec<u8>> {
        self.lock().docs.get(handle.as_str()).and_then(|d| d.bytes.clone())
    }

    pub fn inputs_opened(&self) -> usize {
        self.lock().inputs_opened
    }

    pub fn outputs_opened(&self) -> usize {
        self.lock().outputs_opened
    }

    /// Streams granted and not yet released.
    pub fn open_streams(&self) -> usize {
        self.lock().live_streams
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn fault(&self, handle: &ResourceHandle) -> Option<StoreFault> {
        self.lock().faults.get(handle.as_str()).copied()
    }
}

fn not_found(handle: &ResourceHandle) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("no document at {}", handle))
}

fn revoked() -> io::Error {
    io::Error::new(io::ErrorKind::PermissionDenied, "permission revoked")
}

impl DocumentStore for MemoryStore {
    fn open_input(&self, handle: &ResourceHandle) -> io::Result<Option<InputStream>> {
        let fault = self.fault(handle);
        match fault {
            Some(StoreFault::RefuseInput) => return Ok(None),
            Some(StoreFault::PermissionRevoked) => return Err(revoked()),
            _ => {}
        }
        let bytes = {
            let mut state = self.lock();
            let bytes = state
                .docs
                .get(handle.as_str())
                .and_then(|d| d.bytes.clone())
                .ok_or_else(|| not_found(handle))?;
            state.inputs_opened += 1;
            state.live_streams += 1;
            bytes
        };
        let fail_after = match fault {
            Some(StoreFault::FailReadAfter(n)) => Some(n),
            _ => None,
        };
        Ok(Some(Box::new(MemorySource {
            state: self.state.clone(),
            inner: Cursor::new(bytes),
            fail_after,
            panic: fault == Some(StoreFault::PanicOnRead),
        })))
    }

    fn open_output(&self, handle: &ResourceHandle) -> io::Result<Option<OutputStream>> {
        let fault = self.fault(handle);
        match fault {
            Some(StoreFault::RefuseOutput) => return Ok(None),
            Some(StoreFault::PermissionRevoked) => return Err(revoked()),
            _ => {}
        }
        {
            let mut state = self.lock();
            if !state.docs.contains_key(handle.as_str()) {
                return Err(not_found(handle));
            }
            state.outputs_opened += 1;
            state.live_streams += 1;
        }
        let fail_after = match fault {
            Some(StoreFault::FailWriteAfter(n)) => Some(n),
            _ => None,
        };
        Ok(Some(Box::new(MemorySink {
            state: self.state.clone(),
            key: handle.as_str().to_string(),
            buf: Vec::new(),
            fail_after,
            panic: fault == Some(StoreFault::PanicOnWrite),
        })))
    }

    fn query(&self, handle: &ResourceHandle) -> io::Result<Option<IndexRow>> {
        let fault = self.fault(handle);
        match fault {
            Some(StoreFault::NoIndexRow) => return Ok(None),
            Some(StoreFault::IndexError) => {
                return Err(io::Error::new(io::ErrorKind::Other, "index unavailable"))
            }
            Some(StoreFault::PanicOnQuery) => panic!("index provider crashed"),
            _ => {}
        }
        let state = self.lock();
        let Some(doc) = state.docs.get(handle.as_str()) else {
            return Ok(None);
        };
        let size = doc.bytes.as_ref().map(|b| b.len().to_string());
        let mut row = IndexRow::new().with("_size", size.as_deref());
        match fault {
            Some(StoreFault::NoNameColumn) => {}
            Some(StoreFault::NullName) => row = row.with(DISPLAY_NAME, None),
            _ => row = row.with(DISPLAY_NAME, doc.name.as_deref()),
        }
        Ok(Some(row))
    }
}

struct MemorySource {
    state: Arc<Mutex<State>>,
    inner: Cursor<Vec<u8>>,
    fail_after: Option<usize>,
    panic: bool,
}

impl Read for MemorySource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.panic {
            panic!("document provider crashed during read");
        }
        if let Some(limit) = self.fail_after {
            let pos = self.inner.position() as usize;
            if pos >= limit {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "provider disconnected"));
            }
            let room = (limit - pos).min(buf.len());
            return self.inner.read(&mut buf[..room]);
        }
        self.inner.read(buf)
    }
}

impl Drop for MemorySource {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        state.live_streams -= 1;
    }
}

struct MemorySink {
    state: Arc<Mutex<State>>,
    key: String,
    buf: Vec<u8>,
    fail_after: Option<usize>,
    panic: bool,
}

impl Write for MemorySink {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        if self.panic {
            panic!("document provider crashed during write");
        }
        if let Some(limit) = self.fail_after {
            if self.buf.len() >= limit {
                return Err(io::Error::new(io::ErrorKind::Other, "no space left on device"));
            }
            let room = (limit - self.buf.len()).min(data.len());
            self.buf.extend_from_slice(&data[..room]);
            return Ok(room);
        }
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl OutputSink for MemorySink {
    fn finish(mut self: Box<Self>) -> io::Result<()> {
        let bytes = std::mem::take(&mut self.buf);
        {
            let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
            state.docs.entry(self.key.clone()).or_default().bytes = Some(bytes);
        }
        Ok(())
    }
}

impl Drop for MemorySink {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        state.live_streams -= 1;
    }
}
