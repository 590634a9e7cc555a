use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{
    InteractionRepository, PromptQuery, PromptRepository, RepositoryError, Result,
};
use crate::entities::{InteractionKind, Mark, Prompt, PromptId, UserId};

/// in-memory backend over a flat row vec. the test double, and the backend
/// `in_memory()` wires up.
///
/// mark writes do not touch the counters stored on seeded prompts; count
/// movement belongs to the real store (the mongo backend's transactions).
pub struct InMemoryRepository<T>(Mutex<Vec<T>>);

impl<T> InMemoryRepository<T> {
    pub fn new() -> Self { Self(Mutex::new(vec![])) }
}
impl<T> Default for InMemoryRepository<T> {
    fn default() -> Self { Self::new() }
}

fn find_ref<T, P>(v: &[T], predicate: P) -> Result<&T>
where
    T: ::core::fmt::Debug,
    P: FnMut(&&T) -> bool,
{
    let mut res = v.iter().filter(predicate).collect::<Vec<_>>();

    tracing::trace!("found - {:?}", res);

    match res.len() {
        0 => Err(RepositoryError::NotFound),
        1 => Ok(res.remove(0)),
        i => Err(RepositoryError::NoUnique { matched: i as u32 }),
    }
}

#[async_trait]
impl PromptRepository for InMemoryRepository<Prompt> {
    async fn insert(&self, item: Prompt) -> Result<bool> {
        let mut guard = self.0.lock().await;

        match find_ref(&guard, |p| p.id == item.id) {
            Ok(_) => return Ok(false),
            Err(RepositoryError::NotFound) => (),
            Err(e) => return Err(e),
        }

        guard.push(item);
        Ok(true)
    }

    async fn find(&self, id: PromptId) -> Result<Prompt> {
        let guard = self.0.lock().await;

        Ok(find_ref(&guard, |p| p.id == id)?.clone())
    }

    async fn finds(
        &self,
        PromptQuery {
            search,
            ids,
            owner,
            range,
        }: PromptQuery,
    ) -> Result<Vec<Prompt>> {
        let guard = self.0.lock().await;

        let mut matched = guard
            .iter()
            .filter(|p| {
                search
                    .as_ref()
                    .map(|r| r.is_match(&p.title) || p.tags.iter().any(|t| r.is_match(t)))
                    .unwrap_or(true)
            })
            .filter(|p| ids.as_ref().map(|s| s.contains(&p.id)).unwrap_or(true))
            .filter(|p| owner.as_ref().map(|o| *o == p.owner).unwrap_or(true))
            .collect::<Vec<_>>();

        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let res = match range {
            None => matched.iter().map(|p| (*p).clone()).collect(),
            Some(r) => matched
                .iter()
                .skip(r.from as usize)
                .take(r.limit() as usize)
                .map(|p| (*p).clone())
                .collect(),
        };

        Ok(res)
    }
}

#[async_trait]
impl InteractionRepository for InMemoryRepository<Mark> {
    async fn is_marked(
        &self,
        kind: InteractionKind,
        prompt_id: PromptId,
        user_id: UserId,
    ) -> Result<bool> {
        let guard = self.0.lock().await;

        match find_ref(&guard, |m| {
            m.kind == kind && m.prompt_id == prompt_id && m.user_id == user_id
        }) {
            Ok(_) => Ok(true),
            Err(RepositoryError::NotFound) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn insert_mark(
        &self,
        kind: InteractionKind,
        prompt_id: PromptId,
        user_id: UserId,
    ) -> Result<bool> {
        let mut guard = self.0.lock().await;

        match find_ref(&guard, |m| {
            m.kind == kind && m.prompt_id == prompt_id && m.user_id == user_id
        }) {
            Ok(_) => return Ok(false),
            Err(RepositoryError::NotFound) => (),
            Err(e) => return Err(e),
        }

        guard.push(Mark {
            kind,
            prompt_id,
            user_id,
        });
        Ok(true)
    }

    async fn delete_mark(
        &self,
        kind: InteractionKind,
        prompt_id: PromptId,
        user_id: UserId,
    ) -> Result<bool> {
        let mut guard = self.0.lock().await;

        let index = guard
            .iter()
            .position(|m| m.kind == kind && m.prompt_id == prompt_id && m.user_id == user_id);

        match index {
            None => Ok(false),
            Some(i) => {
                guard.remove(i);
                Ok(true)
            },
        }
    }

    async fn marks_of(&self, kind: InteractionKind, user_id: UserId) -> Result<Vec<PromptId>> {
        let guard = self.0.lock().await;

        Ok(guard
            .iter()
            .filter(|m| m.kind == kind && m.user_id == user_id)
            .map(|m| m.prompt_id)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    use super::*;
    use crate::entities::Date;
    use crate::repositories::PageRange;

    fn prompt(title: &str, tags: &[&str], created_at: Date) -> Prompt {
        Prompt {
            id: Uuid::new_v4().into(),
            title: title.to_string(),
            content: "body".to_string(),
            owner: Uuid::new_v4().into(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            created_at,
            likes_count: 0,
            bookmarks_count: 0,
        }
    }

    #[tokio::test]
    async fn duplicate_mark_is_idempotent() {
        let repo = InMemoryRepository::<Mark>::new();
        let (p, u) = (PromptId(Uuid::new_v4()), UserId(Uuid::new_v4()));

        assert!(repo.insert_mark(InteractionKind::Like, p, u).await.unwrap());
        assert!(!repo.insert_mark(InteractionKind::Like, p, u).await.unwrap());

        assert_eq!(repo.marks_of(InteractionKind::Like, u).await.unwrap(), vec![p]);
        assert!(repo.is_marked(InteractionKind::Like, p, u).await.unwrap());
    }

    #[tokio::test]
    async fn kinds_are_independent_edges() {
        let repo = InMemoryRepository::<Mark>::new();
        let (p, u) = (PromptId(Uuid::new_v4()), UserId(Uuid::new_v4()));

        assert!(repo.insert_mark(InteractionKind::Like, p, u).await.unwrap());
        assert!(repo
            .insert_mark(InteractionKind::Bookmark, p, u)
            .await
            .unwrap());

        assert!(repo.delete_mark(InteractionKind::Like, p, u).await.unwrap());
        assert!(!repo.delete_mark(InteractionKind::Like, p, u).await.unwrap());
        assert!(repo
            .is_marked(InteractionKind::Bookmark, p, u)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn finds_matches_title_or_tags_case_insensitively() {
        let repo = InMemoryRepository::<Prompt>::new();
        let now = Utc::now();

        repo.insert(prompt("Foo walkthrough", &[], now)).await.unwrap();
        repo.insert(prompt("other", &["FOOBAR"], now)).await.unwrap();
        repo.insert(prompt("unrelated", &["baz"], now)).await.unwrap();

        let query = PromptQuery {
            search: Some(PromptQuery::term_pattern("foo").unwrap()),
            ..Default::default()
        };
        assert_eq!(repo.finds(query).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn finds_orders_by_recency_and_windows() {
        let repo = InMemoryRepository::<Prompt>::new();
        let base = Utc::now();

        for i in 0..5 {
            repo.insert(prompt(
                &format!("p{}", i),
                &[],
                base + Duration::seconds(i),
            ))
            .await
            .unwrap();
        }

        let query = PromptQuery {
            range: Some(PageRange { from: 1, to: 2 }),
            ..Default::default()
        };
        let page = repo.finds(query).await.unwrap();

        let titles = page.iter().map(|p| p.title.as_str()).collect::<Vec<_>>();
        assert_eq!(titles, vec!["p3", "p2"]);
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_id_and_find_round_trips() {
        let repo = InMemoryRepository::<Prompt>::new();
        let p = prompt("one", &[], Utc::now());

        assert!(repo.insert(p.clone()).await.unwrap());
        assert!(!repo.insert(p.clone()).await.unwrap());
        assert_eq!(repo.find(p.id).await.unwrap(), p);
    }
}
