//! The eight diff-event kinds published by every observable list.

/// A change notification.
///
/// `Changing`/`Changed`, `Removing`/`Removed` and `Resetting`/`Reset` always
/// arrive as pairs; between the two halves the list still shows its old
/// contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListEvent {
    Added { start: usize, count: usize },
    Changing { start: usize, count: usize },
    Changed { start: usize, count: usize },
    Removing { start: usize, count: usize },
    Removed { start: usize, count: usize },
    Moved { from: usize, to: usize, count: usize },
    Resetting,
    Reset,
}
