use std::sync::Arc;

use crate::auth::AuthProvider;
use crate::controllers::{FeedController, FeedScope, InteractionController};
use crate::entities::Prompt;
use crate::presenters::Notifier;
use crate::repositories::mock::InMemoryRepository;
use crate::repositories::mongo::{MongoInteractionRepository, MongoPromptRepository};
use crate::repositories::{InteractionRepository, PromptRepository};

/// wired persistence boundary. the UI layer keeps one of these and mints
/// controllers off it per rendered surface.
pub struct Core {
    pub prompt_repository: Arc<dyn PromptRepository + Sync + Send>,
    pub interaction_repository: Arc<dyn InteractionRepository + Sync + Send>,
}

impl Core {
    /// a feed over `scope`. needs a running tokio runtime (the debounce
    /// worker is spawned here).
    pub fn feed(&self, scope: FeedScope) -> Arc<FeedController> {
        FeedController::new(
            self.prompt_repository.clone(),
            self.interaction_repository.clone(),
            scope,
        )
    }

    /// per-card interaction lifecycle for one prompt.
    pub fn interaction(
        &self,
        prompt: &Prompt,
        auth: Arc<dyn AuthProvider + Sync + Send>,
        notifier: Arc<dyn Notifier + Sync + Send>,
    ) -> InteractionController {
        InteractionController::new(prompt, self.interaction_repository.clone(), auth, notifier)
    }
}

pub fn in_memory() -> Core {
    Core {
        prompt_repository: Arc::new(InMemoryRepository::<Prompt>::new()),
        interaction_repository: Arc::new(InMemoryRepository::<crate::entities::Mark>::new()),
    }
}

pub async fn mongo(
    uri_str: impl AsRef<str>,
    db_name: impl AsRef<str>,
) -> ::anyhow::Result<Core> {
    let c = ::mongodb::Client::with_uri_str(uri_str.as_ref()).await?;
    let db = c.database(db_name.as_ref());

    let core = Core {
        prompt_repository: Arc::new(MongoPromptRepository::new_with(&db).await?),
        interaction_repository: Arc::new(MongoInteractionRepository::new_with(c, &db).await?),
    };

    Ok(core)
}
