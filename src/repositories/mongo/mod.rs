use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, Document};
use mongodb::error::{
    ErrorKind, Result as MongoResult, WriteFailure, TRANSIENT_TRANSACTION_ERROR,
    UNKNOWN_TRANSACTION_COMMIT_RESULT,
};
use mongodb::options::{Acknowledgment, FindOptions, ReadConcern, TransactionOptions, WriteConcern};
use mongodb::{Client, ClientSession, Collection, Database};

use super::{InteractionRepository, PromptQuery, PromptRepository, RepositoryError, Result};
use crate::entities::{InteractionKind, Mark, Prompt, PromptId, UserId};
use crate::utils::AlsoChain;

mod type_convert;

use type_convert::{CvtError, IntoBool, MongoMarkModel, MongoPromptModel, OptCvt};

pub struct MongoPromptRepository {
    coll: Collection<MongoPromptModel>,
}

impl MongoPromptRepository {
    pub async fn new_with(db: &Database) -> ::anyhow::Result<Self> {
        db.run_command(
            doc! {
                "createIndexes": "prompts",
                "indexes": [{
                    "name": "unique_id",
                    "key": {
                        "id": 1
                    },
                    "unique": true
                }],
            },
            None,
        )
        .await?;

        Ok(Self {
            coll: db.collection("prompts"),
        })
    }
}

#[async_trait]
impl PromptRepository for MongoPromptRepository {
    async fn insert(&self, item: Prompt) -> Result<bool> {
        let model: MongoPromptModel = item.into();

        match self.coll.insert_one(model, None).await {
            Ok(_) => Ok(true),
            Err(ref e) if is_duplicate_key(e) => Ok(false),
            Err(e) => Err(e).cvt(),
        }
    }

    async fn find(&self, id: PromptId) -> Result<Prompt> {
        let prompt: Prompt = self
            .coll
            .find_one(doc! { "id": id.to_string() }, None)
            .await
            .cvt()?
            .opt_cvt()?
            .into();
        assert_eq!(prompt.id, id, "not matched id!");

        Ok(prompt)
    }

    async fn finds(&self, query: PromptQuery) -> Result<Vec<Prompt>> {
        let range = query.range;
        let filter: Document = query.into();

        let opts = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .build()
            .also_(|o| {
                if let Some(r) = range {
                    o.skip = Some(r.from);
                    o.limit = Some(r.limit() as i64);
                }
            });

        let res = self
            .coll
            .find(filter, opts)
            .await
            .cvt()?
            .try_collect::<Vec<_>>()
            .await
            .cvt()?
            .drain(..)
            .map(|m| m.into())
            .collect();

        Ok(res)
    }
}

pub struct MongoInteractionRepository {
    client: Client,
    likes: Collection<MongoMarkModel>,
    bookmarks: Collection<MongoMarkModel>,
    prompts: Collection<MongoPromptModel>,
}

impl MongoInteractionRepository {
    pub async fn new_with(client: Client, db: &Database) -> ::anyhow::Result<Self> {
        for kind in &[InteractionKind::Like, InteractionKind::Bookmark] {
            db.run_command(
                doc! {
                    "createIndexes": kind.table(),
                    "indexes": [{
                        "name": "unique_edge",
                        "key": {
                            "prompt_id": 1,
                            "user_id": 1
                        },
                        "unique": true
                    }],
                },
                None,
            )
            .await?;
        }

        Ok(Self {
            client,
            likes: db.collection(InteractionKind::Like.table()),
            bookmarks: db.collection(InteractionKind::Bookmark.table()),
            prompts: db.collection("prompts"),
        })
    }

    fn coll_of(&self, kind: InteractionKind) -> &Collection<MongoMarkModel> {
        match kind {
            InteractionKind::Like => &self.likes,
            InteractionKind::Bookmark => &self.bookmarks,
        }
    }

    fn count_field(kind: InteractionKind) -> &'static str {
        match kind {
            InteractionKind::Like => "likes_count",
            InteractionKind::Bookmark => "bookmarks_count",
        }
    }
}

#[async_trait]
impl InteractionRepository for MongoInteractionRepository {
    async fn is_marked(
        &self,
        kind: InteractionKind,
        prompt_id: PromptId,
        user_id: UserId,
    ) -> Result<bool> {
        let res = self
            .coll_of(kind)
            .count_documents(
                doc! {
                    "prompt_id": prompt_id.to_string(),
                    "user_id": user_id.to_string()
                },
                None,
            )
            .await
            .cvt()?
            .into_bool();

        Ok(res)
    }

    async fn insert_mark(
        &self,
        kind: InteractionKind,
        prompt_id: PromptId,
        user_id: UserId,
    ) -> Result<bool> {
        // edge insert and counter move commit together; a duplicate edge
        // aborts without touching the counter.
        async fn transaction(
            this: &MongoInteractionRepository,
            kind: InteractionKind,
            prompt_id: PromptId,
            user_id: UserId,
        ) -> MongoResult<Option<bool>> {
            let mut session = make_session(&this.client).await?;

            let model: MongoMarkModel = Mark {
                kind,
                prompt_id,
                user_id,
            }
            .into();

            match this
                .coll_of(kind)
                .insert_one_with_session(model, None, &mut session)
                .await
            {
                Ok(_) => (),
                Err(ref e) if is_duplicate_key(e) => {
                    session.abort_transaction().await?;
                    return Ok(Some(false));
                },
                Err(e) => return Err(e),
            }

            let field = MongoInteractionRepository::count_field(kind);
            let res = this
                .prompts
                .update_one_with_session(
                    doc! { "id": prompt_id.to_string() },
                    doc! { "$inc": { field: 1 } },
                    None,
                    &mut session,
                )
                .await?;

            if !res.matched_count.into_bool() {
                session.abort_transaction().await?;
                return Ok(None);
            }

            process_transaction(&mut session).await.map(|_| Some(true))
        }

        let res = loop {
            let r = transaction(self, kind, prompt_id, user_id).await;
            if let Err(ref e) = r {
                if e.contains_label(TRANSIENT_TRANSACTION_ERROR) {
                    continue;
                }
            }

            break r;
        };

        res.cvt()?.opt_cvt()
    }

    async fn delete_mark(
        &self,
        kind: InteractionKind,
        prompt_id: PromptId,
        user_id: UserId,
    ) -> Result<bool> {
        async fn transaction(
            this: &MongoInteractionRepository,
            kind: InteractionKind,
            prompt_id: PromptId,
            user_id: UserId,
        ) -> MongoResult<Option<bool>> {
            let mut session = make_session(&this.client).await?;

            let res = this
                .coll_of(kind)
                .delete_one_with_session(
                    doc! {
                        "prompt_id": prompt_id.to_string(),
                        "user_id": user_id.to_string()
                    },
                    None,
                    &mut session,
                )
                .await?;

            if !res.deleted_count.into_bool() {
                session.abort_transaction().await?;
                return Ok(Some(false));
            }

            let field = MongoInteractionRepository::count_field(kind);
            let res = this
                .prompts
                .update_one_with_session(
                    doc! { "id": prompt_id.to_string() },
                    doc! { "$inc": { field: -1 } },
                    None,
                    &mut session,
                )
                .await?;

            if !res.matched_count.into_bool() {
                session.abort_transaction().await?;
                return Ok(None);
            }

            process_transaction(&mut session).await.map(|_| Some(true))
        }

        let res = loop {
            let r = transaction(self, kind, prompt_id, user_id).await;
            if let Err(ref e) = r {
                if e.contains_label(TRANSIENT_TRANSACTION_ERROR) {
                    continue;
                }
            }

            break r;
        };

        res.cvt()?.opt_cvt()
    }

    async fn marks_of(&self, kind: InteractionKind, user_id: UserId) -> Result<Vec<PromptId>> {
        let res = self
            .coll_of(kind)
            .find(doc! { "user_id": user_id.to_string() }, None)
            .await
            .cvt()?
            .try_collect::<Vec<_>>()
            .await
            .cvt()?
            .drain(..)
            .map(|m: MongoMarkModel| PromptId(m.prompt_id))
            .collect();

        Ok(res)
    }
}

async fn make_session(c: &Client) -> MongoResult<ClientSession> {
    let mut s = c.start_session(None).await?;

    let ta_opt = TransactionOptions::builder()
        .read_concern(ReadConcern::snapshot())
        .write_concern(WriteConcern::builder().w(Acknowledgment::Majority).build())
        .build();
    s.start_transaction(ta_opt).await?;

    Ok(s)
}

async fn process_transaction(s: &mut ClientSession) -> MongoResult<()> {
    loop {
        let r = s.commit_transaction().await;
        if let Err(ref e) = r {
            if e.contains_label(UNKNOWN_TRANSACTION_COMMIT_RESULT) {
                continue;
            }
        }

        break r;
    }
}

fn is_duplicate_key(e: &::mongodb::error::Error) -> bool {
    match &*e.kind {
        ErrorKind::Write(WriteFailure::WriteError(we)) => we.code == 11000,
        _ => false,
    }
}
