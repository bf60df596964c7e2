use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    Post,
    Comment,
}

impl ContentKind {
    /// Fullname prefix used by the platform for this kind of thing.
    pub fn prefix(&self) -> &'static str {
        match self {
            ContentKind::Post => "t3_",
            ContentKind::Comment => "t1_",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ContentKind::Post => "post",
            ContentKind::Comment => "comment",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Fields the platform reports for a post or comment. Any of them may be
/// missing, e.g. when the author deleted their account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentInfo {
    /// Base36 id without the kind prefix.
    pub id: Option<String>,
    pub author: Option<String>,
    pub permalink: Option<String>,
}

/// The post or comment a moderator action was invoked on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetContent {
    Post(ContentInfo),
    Comment(ContentInfo),
}

impl TargetContent {
    pub fn kind(&self) -> ContentKind {
        match self {
            TargetContent::Post(_) => ContentKind::Post,
            TargetContent::Comment(_) => ContentKind::Comment,
        }
    }

    pub fn info(&self) -> &ContentInfo {
        match self {
            TargetContent::Post(info) | TargetContent::Comment(info) => info,
        }
    }
}

/// Normalized view of the content an action targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModerationContext {
    pub kind: ContentKind,
    /// Fullname, e.g. `t3_abc123`.
    pub content_id: Option<String>,
    pub author: Option<String>,
    pub permalink: Option<String>,
}

impl From<&TargetContent> for ModerationContext {
    fn from(target: &TargetContent) -> Self {
        let kind = target.kind();
        let info = target.info();
        Self {
            kind,
            content_id: non_empty(&info.id).map(|id| {
                if id.starts_with(kind.prefix()) {
                    id.to_string()
                } else {
                    format!("{}{}", kind.prefix(), id)
                }
            }),
            author: non_empty(&info.author).map(str::to_string),
            permalink: non_empty(&info.permalink).map(str::to_string),
        }
    }
}

impl From<TargetContent> for ModerationContext {
    fn from(target: TargetContent) -> Self {
        ModerationContext::from(&target)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}
