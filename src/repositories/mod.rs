use std::collections::HashSet;

use async_trait::async_trait;
use regex::Regex;

use crate::entities::{InteractionKind, Prompt, PromptId, UserId};

pub mod mock;
pub mod mongo;

type StdResult<T, E> = ::std::result::Result<T, E>;
pub type Result<T> = ::std::result::Result<T, RepositoryError>;

/// row access to the `prompts` table. this crate only ever reads prompt
/// rows and seeds them; publishing/editing lives outside the core.
#[async_trait]
pub trait PromptRepository {
    /// `false` when a prompt with the same id already exists.
    async fn insert(&self, item: Prompt) -> Result<bool>;

    async fn find(&self, id: PromptId) -> Result<Prompt>;

    /// filtered, `created_at`-descending window. see [`PromptQuery`].
    async fn finds(&self, query: PromptQuery) -> Result<Vec<Prompt>>;
}

/// row access to the edge tables (`likes` / `bookmarks`).
///
/// uniqueness on (prompt, user) per kind is the store's responsibility;
/// duplicate inserts come back as `Ok(false)`, never as a second edge.
#[async_trait]
pub trait InteractionRepository {
    async fn is_marked(
        &self,
        kind: InteractionKind,
        prompt_id: PromptId,
        user_id: UserId,
    ) -> Result<bool>;

    /// `false` when the edge already existed.
    async fn insert_mark(
        &self,
        kind: InteractionKind,
        prompt_id: PromptId,
        user_id: UserId,
    ) -> Result<bool>;

    /// `false` when there was no edge to delete.
    async fn delete_mark(
        &self,
        kind: InteractionKind,
        prompt_id: PromptId,
        user_id: UserId,
    ) -> Result<bool>;

    /// every prompt the user marked with `kind`. callers feed the result
    /// into [`PromptQuery::ids`] -- the join emulation for the profile
    /// views.
    async fn marks_of(&self, kind: InteractionKind, user_id: UserId) -> Result<Vec<PromptId>>;
}

/// filter set for [`PromptRepository::finds`]. every field is conjunctive;
/// ordering is always `created_at` descending.
#[derive(Debug, Clone, Default)]
pub struct PromptQuery {
    /// case-insensitive pattern matched against title OR any tag.
    pub search: Option<Regex>,
    pub ids: Option<HashSet<PromptId>>,
    pub owner: Option<UserId>,
    pub range: Option<PageRange>,
}

impl PromptQuery {
    /// compiles a raw search term into the pattern `search` expects.
    /// the term is taken literally (escaped), matched case-insensitively.
    pub fn term_pattern(term: &str) -> StdResult<Regex, ::regex::Error> {
        Regex::new(&format!("(?i){}", ::regex::escape(term)))
    }
}

/// inclusive row window, `.range(from, to)` style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    pub from: u64,
    pub to: u64,
}

impl PageRange {
    /// window of the 1-based `page`, `per_page` rows each.
    pub fn of_page(page: u32, per_page: usize) -> Self {
        let per_page = per_page as u64;
        let from = (page.max(1) as u64 - 1) * per_page;
        Self {
            from,
            to: from + per_page - 1,
        }
    }

    pub fn limit(&self) -> u64 {
        if self.to < self.from {
            return 0;
        }
        self.to - self.from + 1
    }
}

#[derive(Debug)]
pub enum RepositoryError {
    NotFound,
    NoUnique { matched: u32 },
    Internal(anyhow::Error),
}

impl ::std::fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
        match self {
            RepositoryError::NotFound => write!(f, "cannot find object."),
            RepositoryError::NoUnique { matched } => write!(
                f,
                "expected unique object, found non-unique objects (matched: {})",
                matched
            ),
            RepositoryError::Internal(e) => write!(f, "internal error: {}", e),
        }
    }
}

impl ::std::error::Error for RepositoryError {}
