//! User-facing notifications produced by settled mutations.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    pub kind: NoticeKind,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: NoticeKind::Info,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: NoticeKind::Error,
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == NoticeKind::Error
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Create,
    Update,
    Delete,
}

impl MutationKind {
    pub fn label(&self) -> &'static str {
        match self {
            MutationKind::Create => "create",
            MutationKind::Update => "update",
            MutationKind::Delete => "delete",
        }
    }

    /// Updates settle without a notice.
    pub fn success(&self) -> Option<Notice> {
        match self {
            MutationKind::Create => Some(Notice::info("Task Added!")),
            MutationKind::Update => None,
            MutationKind::Delete => Some(Notice::info("Task deleted!")),
        }
    }

    pub fn failure(&self) -> Notice {
        match self {
            MutationKind::Create => Notice::error("Failed to add task"),
            MutationKind::Update => Notice::error("Failed to update task"),
            MutationKind::Delete => Notice::error("Failed to delete task"),
        }
    }
}
