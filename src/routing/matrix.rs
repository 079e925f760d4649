//! The routing matrix: which low-level operation a drop turns into.

use crate::routing::types::{Route, SystemTag};

/// Pick the route for moving or copying from `source` to `dest`.
///
/// Decided by the panes' system tags alone. Crossing systems always
/// transfers and never removes the source, whatever the modifier.
pub fn classify(source: &SystemTag, dest: &SystemTag, is_copy: bool) -> Route {
    match (source.is_local(), dest.is_local(), is_copy) {
        (true, true, true) => Route::LocalCopy,
        (true, true, false) => Route::LocalMove,
        (false, false, true) => Route::RemoteCopy,
        (false, false, false) => Route::RemoteMove,
        (true, false, _) => Route::Upload,
        (false, true, _) => Route::Download,
    }
}
