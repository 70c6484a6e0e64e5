use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of a content node. Topics are containers; everything else is a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Topic,
    Video,
    Audio,
    Exercise,
    Document,
    Html5,
    Slideshow,
}

impl ContentKind {
    pub const ALL: [ContentKind; 7] = [
        ContentKind::Topic,
        ContentKind::Video,
        ContentKind::Audio,
        ContentKind::Exercise,
        ContentKind::Document,
        ContentKind::Html5,
        ContentKind::Slideshow,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ContentKind::Topic => "topic",
            ContentKind::Video => "video",
            ContentKind::Audio => "audio",
            ContentKind::Exercise => "exercise",
            ContentKind::Document => "document",
            ContentKind::Html5 => "html5",
            ContentKind::Slideshow => "slideshow",
        }
    }

    pub fn parse(s: &str) -> Option<ContentKind> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }

    #[must_use]
    pub const fn is_resource(self) -> bool {
        !matches!(self, ContentKind::Topic)
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Access level carried by an invitation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShareMode {
    Edit,
    View,
}

impl ShareMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ShareMode::Edit => "edit",
            ShareMode::View => "view",
        }
    }

    pub fn parse(s: &str) -> Option<ShareMode> {
        match s {
            "edit" => Some(ShareMode::Edit),
            "view" => Some(ShareMode::View),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskStatus {
    Queued,
    Started,
    Success,
    Failure,
}

impl TaskStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Queued => "QUEUED",
            TaskStatus::Started => "STARTED",
            TaskStatus::Success => "SUCCESS",
            TaskStatus::Failure => "FAILURE",
        }
    }

    pub fn parse(s: &str) -> Option<TaskStatus> {
        match s {
            "QUEUED" => Some(TaskStatus::Queued),
            "STARTED" => Some(TaskStatus::Started),
            "SUCCESS" => Some(TaskStatus::Success),
            "FAILURE" => Some(TaskStatus::Failure),
            _ => None,
        }
    }
}
