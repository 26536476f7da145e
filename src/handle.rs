//! Opaque resource handles and the store that resolves them to byte streams.

use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Read, Write};

/// An OS-issued reference to a storage location.
///
/// This is a capability, not a path: it is only meaningful to the
/// [`DocumentStore`] that granted it, and only for the lifetime of that grant.
/// Do not persist it across process restarts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceHandle(String);

impl ResourceHandle {
    pub fn new(reference: impl Into<String>) -> Self {
        ResourceHandle(reference.into())
    }

    /// The handle-reference string reported back to the application as `uri`.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Name of the display-name column in the resource index.
pub const DISPLAY_NAME: &str = "_display_name";

/// One row returned by a resource-index query: column name to value.
/// A column may exist with a null value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexRow {
    columns: BTreeMap<String, Option<String>>,
}

impl IndexRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: &str, value: Option<&str>) -> Self {
        self.columns.insert(column.to_string(), value.map(str::to_string));
        self
    }

    /// `None` if the column is absent, `Some(None)` if present but null.
    pub fn get(&self, column: &str) -> Option<Option<&str>> {
        self.columns.get(column).map(|v| v.as_deref())
    }
}

/// Writable byte sink for one handle.
pub trait OutputSink: Write + Send {
    /// Make everything written so far visible at the target and close it.
    /// A sink dropped without `finish` discards what it received.
    fn finish(self: Box<Self>) -> io::Result<()>;
}

/// Readable byte source granted for a handle.
pub type InputStream = Box<dyn Read + Send>;
/// Writable byte sink granted for a handle.
pub type OutputStream = Box<dyn OutputSink>;

/// Resolver from opaque handles to byte streams plus the resource index.
///
/// Streams are released when dropped; callers hold them only for the
/// duration of one read or write.
pub trait DocumentStore: Send + Sync {
    /// Grant a readable stream. `Ok(None)` means the OS granted nothing.
    fn open_input(&self, handle: &ResourceHandle) -> io::Result<Option<InputStream>>;

    /// Grant a writable stream that truncates the target.
    /// `Ok(None)` means the OS granted nothing.
    fn open_output(&self, handle: &ResourceHandle) -> io::Result<Option<OutputStream>>;

    /// Look up the index row for a handle. `Ok(None)` means no row.
    fn query(&self, handle: &ResourceHandle) -> io::Result<Option<IndexRow>>;
}

impl<S: DocumentStore + ?Sized> DocumentStore for std::sync::Arc<S> {
    fn open_input(&self, handle: &ResourceHandle) -> io::Result<Option<InputStream>> {
        (**self).open_input(handle)
    }

    fn open_output(&self, handle: &ResourceHandle) -> io::Result<Option<OutputStream>> {
        (**self).open_output(handle)
    }

    fn query(&self, handle: &ResourceHandle) -> io::Result<Option<IndexRow>> {
        (**self).query(handle)
    }
}
