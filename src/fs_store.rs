//! Local-filesystem document store for desktop hosts.
//!
//! Handles are `file://` references to absolute paths (no percent
//! encoding). Writes land in a temporary file next to the target and are
//! renamed over it only once the whole payload is written, so an
//! interrupted save never leaves a half-written document behind.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::handle::{DocumentStore, IndexRow, InputStream, OutputSink, OutputStream, ResourceHandle, DISPLAY_NAME};

const SCHEME: &str = "file://";

#[derive(Debug, Clone, Copy, Default)]
pub struct FsDocumentStore;

impl FsDocumentStore {
    pub fn new() -> Self {
        FsDocumentStore
    }

    /// Build the handle a desktop picker would return for `path`.
    pub fn handle_for(path: &Path) -> io::Result<ResourceHandle> {
        let abs = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()?.join(path)
        };
        let text = abs.to_str().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("path is not valid UTF-8: {}", abs.display()),
            )
        })?;
        Ok(ResourceHandle::new(format!("{}{}", SCHEME, text)))
    }

    /// Path behind a `file://` handle.
    pub fn path_of(handle: &ResourceHandle) -> io::Result<PathBuf> {
        let raw = handle.as_str().strip_prefix(SCHEME).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, format!("not a file handle: {}", handle))
        })?;
        let path = PathBuf::from(raw);
        if !path.is_absolute() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("file handle is not absolute: {}", handle),
            ));
        }
        Ok(path)
    }
}

impl DocumentStore for FsDocumentStore {
    fn open_input(&self, handle: &ResourceHandle) -> io::Result<Option<InputStream>> {
        let path = Self::path_of(handle)?;
        let file = File::open(&path)?;
        Ok(Some(Box::new(file)))
    }

    fn open_output(&self, handle: &ResourceHandle) -> io::Result<Option<OutputStream>> {
        let target = Self::path_of(handle)?;
        let dir = target
            .parent()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "handle has no parent directory"))?;
        // an existing document keeps its mode across the rename
        let keep = fs::metadata(&target).ok().map(|m| m.permissions());
        let tmp = staging_file(dir)?;
        debug!(tmp = %tmp.path().display(), target = %target.display(), "staging write");
        Ok(Some(Box::new(StagedFile { tmp, target, keep })))
    }

    fn query(&self, handle: &ResourceHandle) -> io::Result<Option<IndexRow>> {
        let path = Self::path_of(handle)?;
        let meta = match fs::metadata(&path) {
            Ok(m) => m,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned());
        let size = meta.len().to_string();
        Ok(Some(
            IndexRow::new()
                .with(DISPLAY_NAME, name.as_deref())
                .with("_size", Some(size.as_str())),
        ))
    }
}

/// Temp file created with the mode a plain `File::create` would get,
/// rather than tempfile's private 0o600.
fn staging_file(dir: &Path) -> io::Result<NamedTempFile> {
    let mut builder = tempfile::Builder::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(fs::Permissions::from_mode(0o666));
    }
    builder.tempfile_in(dir)
}

/// Temp file that replaces `target` on finish; removed if dropped first.
struct StagedFile {
    tmp: NamedTempFile,
    target: PathBuf,
    keep: Option<fs::Permissions>,
}

impl Write for StagedFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.tmp.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.tmp.flush()
    }
}

impl OutputSink for StagedFile {
    fn finish(self: Box<Self>) -> io::Result<()> {
        let StagedFile { tmp, target, keep } = *self;
        if let Some(perms) = keep {
            tmp.as_file().set_permissions(perms)?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&target).map_err(|e| e.error)?;
        Ok(())
    }
}
