use chrono::{TimeZone, Utc};
use mongodb::bson::{doc, Document};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{PromptQuery, RepositoryError, Result};
use crate::entities::{Mark, Prompt, PromptId, UserId};
use crate::utils::LetChain;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(super) struct MongoPromptModel {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub owner_id: Uuid,
    pub tags: Vec<String>,
    pub created_at: i64,
    pub likes_count: i64,
    pub bookmarks_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(super) struct MongoMarkModel {
    pub prompt_id: Uuid,
    pub user_id: Uuid,
}

impl From<Prompt> for MongoPromptModel {
    fn from(p: Prompt) -> Self {
        Self {
            id: p.id.0,
            title: p.title,
            content: p.content,
            owner_id: p.owner.0,
            tags: p.tags.into_vec(),
            created_at: p.created_at.timestamp_millis(),
            likes_count: p.likes_count as i64,
            bookmarks_count: p.bookmarks_count as i64,
        }
    }
}

impl From<MongoPromptModel> for Prompt {
    fn from(m: MongoPromptModel) -> Self {
        let created_at = match Utc.timestamp_millis_opt(m.created_at) {
            chrono::LocalResult::Single(d) => d,
            _ => unreachable!("stored timestamp out of range"),
        };

        Self {
            id: PromptId(m.id),
            title: m.title,
            content: m.content,
            owner: UserId(m.owner_id),
            tags: m.tags.into_iter().collect(),
            created_at,
            likes_count: m.likes_count.max(0) as u32,
            bookmarks_count: m.bookmarks_count.max(0) as u32,
        }
    }
}

impl From<Mark> for MongoMarkModel {
    fn from(m: Mark) -> Self {
        Self {
            prompt_id: m.prompt_id.0,
            user_id: m.user_id.0,
        }
    }
}

/// filter part of a [`PromptQuery`]. the row window is carried by find
/// options, not by the filter, so `range` is ignored here.
impl From<PromptQuery> for Document {
    fn from(
        PromptQuery {
            search,
            ids,
            owner,
            range: _,
        }: PromptQuery,
    ) -> Self {
        let mut query = doc! {};

        if let Some(pattern) = search {
            let regex = doc! { "$regex": pattern.as_str() };
            query.insert(
                "$or",
                vec![
                    doc! { "title": regex.clone() },
                    doc! { "tags": regex },
                ],
            );
        }

        if let Some(set) = ids {
            // an empty set must match nothing (a user with no marks has an
            // empty profile tab), and `$in: []` does exactly that
            let set = set.iter().map(|i| i.to_string()).collect::<Vec<_>>();
            query.insert("id", doc! { "$in": set });
        }

        if let Some(owner) = owner {
            query.insert("owner_id", owner.to_string());
        }

        query
    }
}

pub(super) trait CvtError<T> {
    fn cvt(self) -> Result<T>;
}
impl<T> CvtError<T> for ::mongodb::error::Result<T> {
    fn cvt(self) -> Result<T> {
        self.map_err(|e| e.let_(::anyhow::Error::new).let_(RepositoryError::Internal))
    }
}

pub(super) trait OptCvt<T> {
    fn opt_cvt(self) -> Result<T>;
}
impl<T> OptCvt<T> for Option<T> {
    fn opt_cvt(self) -> Result<T> {
        self.ok_or(RepositoryError::NotFound)
    }
}

pub(super) trait IntoBool {
    fn into_bool(self) -> bool;
}
impl IntoBool for u64 {
    // checking "is `0 | 1`" (= "unique")
    fn into_bool(self) -> bool {
        match self {
            0 => false,
            1 => true,
            i => unreachable!("expected unique match, counted: {}", i),
        }
    }
}

#[cfg(test)]
mod tests {
    use smallvec::smallvec;

    use super::*;

    #[test]
    fn prompt_model_round_trip() {
        let p = Prompt {
            id: PromptId(Uuid::new_v4()),
            title: "title".to_string(),
            content: "content".to_string(),
            owner: UserId(Uuid::new_v4()),
            tags: smallvec!["a".to_string(), "b".to_string()],
            created_at: Utc.timestamp_millis_opt(1_700_000_000_000).unwrap(),
            likes_count: 3,
            bookmarks_count: 1,
        };

        let back: Prompt = MongoPromptModel::from(p.clone()).into();
        assert_eq!(back, p);
    }

    #[test]
    fn search_query_targets_title_and_tags() {
        let q = PromptQuery {
            search: Some(PromptQuery::term_pattern("foo").unwrap()),
            ..Default::default()
        };

        let d: Document = q.into();
        assert!(d.contains_key("$or"));
    }
}
