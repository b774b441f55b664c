use std::fmt;
use std::path::PathBuf;

/// A lifecycle signal from the IDE.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StatusEvent {
    /// A project was opened at this root.
    ProjectAdded(PathBuf),
    /// The project at this root was closed.
    ProjectRemoved(PathBuf),
    /// The user switched projects.
    CurrentProjectChanged(Option<PathBuf>),
    /// A document was written to disk.
    DocumentSaved(PathBuf),
    /// The focused editor now shows this document.
    CurrentEditorChanged(Option<PathBuf>),
    /// A document was closed.
    DocumentClosed(PathBuf),
    /// Nodes were added or removed below this project root.
    SubtreeChanged(PathBuf),
    /// The repository of this project changed outside the editor.
    RepositoryChanged(PathBuf),
    /// The application regained focus.
    ApplicationActivated,
}

impl fmt::Display for StatusEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProjectAdded(root) => write!(f, "project added: {}", root.display()),
            Self::ProjectRemoved(root) => write!(f, "project removed: {}", root.display()),
            Self::CurrentProjectChanged(Some(root)) => {
                write!(f, "current project: {}", root.display())
            }
            Self::CurrentProjectChanged(None) => write!(f, "current project: none"),
            Self::DocumentSaved(path) => write!(f, "document saved: {}", path.display()),
            Self::CurrentEditorChanged(Some(path)) => {
                write!(f, "current editor: {}", path.display())
            }
            Self::CurrentEditorChanged(None) => write!(f, "current editor: none"),
            Self::DocumentClosed(path) => write!(f, "document closed: {}", path.display()),
            Self::SubtreeChanged(root) => write!(f, "subtree changed: {}", root.display()),
            Self::RepositoryChanged(root) => write!(f, "repository changed: {}", root.display()),
            Self::ApplicationActivated => write!(f, "application activated"),
        }
    }
}
