use chrono::{DateTime, Utc};
use smallvec::SmallVec;
use uuid::Uuid;

pub type Date = DateTime<Utc>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PromptId(pub Uuid);

impl From<Uuid> for PromptId {
    fn from(u: Uuid) -> Self { Self(u) }
}
impl ::core::fmt::Display for PromptId {
    fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserId(pub Uuid);

impl From<Uuid> for UserId {
    fn from(u: Uuid) -> Self { Self(u) }
}
impl ::core::fmt::Display for UserId {
    fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
        self.0.fmt(f)
    }
}

/// the unit of shared content.
///
/// read-only to this crate except the two counters, which the interaction
/// subsystem moves on the store side.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub id: PromptId,
    pub title: String,
    pub content: String,
    pub owner: UserId,
    pub tags: SmallVec<[String; 4]>,
    pub created_at: Date,
    pub likes_count: u32,
    pub bookmarks_count: u32,
}

/// chars a collapsed card shows before "Read more".
pub const PREVIEW_CHARS: usize = 200;

impl Prompt {
    /// collapsed-card view of `content`: the leading slice and whether a
    /// "Read more" affordance is needed.
    pub fn preview(&self) -> (&str, bool) {
        match self.content.char_indices().nth(PREVIEW_CHARS) {
            Some((i, _)) => (&self.content[..i], true),
            None => (self.content.as_str(), false),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InteractionKind {
    Like,
    Bookmark,
}

impl InteractionKind {
    /// edge table this kind lives in.
    pub fn table(self) -> &'static str {
        match self {
            InteractionKind::Like => "likes",
            InteractionKind::Bookmark => "bookmarks",
        }
    }

    pub fn verb(self) -> &'static str {
        match self {
            InteractionKind::Like => "like",
            InteractionKind::Bookmark => "bookmark",
        }
    }
}

/// interaction edge: at most one per (user, prompt, kind).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mark {
    pub kind: InteractionKind,
    pub prompt_id: PromptId,
    pub user_id: UserId,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt_with_content(content: &str) -> Prompt {
        Prompt {
            id: Uuid::new_v4().into(),
            title: "t".to_string(),
            content: content.to_string(),
            owner: Uuid::new_v4().into(),
            tags: Default::default(),
            created_at: Utc::now(),
            likes_count: 0,
            bookmarks_count: 0,
        }
    }

    #[test]
    fn preview_short_content_is_whole() {
        let p = prompt_with_content("short enough");
        assert_eq!(p.preview(), ("short enough", false));
    }

    #[test]
    fn preview_long_content_is_truncated() {
        let p = prompt_with_content(&"x".repeat(300));
        let (head, more) = p.preview();
        assert_eq!(head.chars().count(), PREVIEW_CHARS);
        assert!(more);
    }

    #[test]
    fn preview_respects_char_boundaries() {
        let p = prompt_with_content(&"あ".repeat(250));
        let (head, more) = p.preview();
        assert_eq!(head.chars().count(), PREVIEW_CHARS);
        assert!(more);
    }
}
