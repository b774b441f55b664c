//! Refresh notifications for UI collaborators.

use std::path::PathBuf;

use tokio::sync::broadcast;

/// A signal that decorations should refresh.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notification {
    /// The change set of the project at `root` changed; file and folder
    /// decorations should refresh.
    StatusChanged { root: PathBuf },
    /// The current document or its line markers changed; the gutter should
    /// refresh.
    CurrentFileDiffChanged,
}

/// A broadcast receiver for cache notifications.
pub type NotificationStream = broadcast::Receiver<Notification>;
