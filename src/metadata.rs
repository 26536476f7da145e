//! Best-effort display-name lookup for a handle.

use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, warn};

use crate::handle::{DocumentStore, ResourceHandle, DISPLAY_NAME};

/// Query the resource index for the handle's display name.
///
/// Advisory only: no row, no `_display_name` column, a null value, a failed
/// query or a panicking store all yield `""`.
pub fn resolve_name<S>(store: &S, handle: &ResourceHandle) -> String
where
    S: DocumentStore + ?Sized,
{
    let queried = panic::catch_unwind(AssertUnwindSafe(|| store.query(handle)));
    match queried {
        Ok(Ok(Some(row))) => match row.get(DISPLAY_NAME) {
            Some(Some(name)) => name.to_string(),
            Some(None) => {
                debug!(%handle, "display name is null");
                String::new()
            }
            None => {
                debug!(%handle, "index row has no display-name column");
                String::new()
            }
        },
        Ok(Ok(None)) => {
            debug!(%handle, "no index row for handle");
            String::new()
        }
        Ok(Err(e)) => {
            warn!(%handle, error = %e, "index query failed");
            String::new()
        }
        Err(_) => {
            warn!(%handle, "index query panicked");
            String::new()
        }
    }
}
