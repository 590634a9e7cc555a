use std::sync::Arc;

use tokio::sync::Mutex;

use crate::auth::AuthProvider;
use crate::entities::{InteractionKind, Prompt, PromptId};
use crate::presenters::{Clipboard, Notification, Notifier};
use crate::repositories::InteractionRepository;

/// client-local toggle state for one (prompt, kind). `count` is the
/// displayed counter, seeded from the authoritative row and moved
/// optimistically from then on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleState {
    pub active: bool,
    pub count: u32,
    pending: bool,
}

impl ToggleState {
    fn new(count: u32) -> Self {
        // edge presence is never bulk-preloaded; every view starts inactive
        Self {
            active: false,
            count,
            pending: false,
        }
    }
}

/// what a `toggle` call amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// optimistic flip applied and acknowledged by the store.
    Applied { active: bool, count: u32 },
    /// a mutation for this (prompt, kind) is already in flight; ignored.
    Skipped,
    /// no resolved identity; nothing changed, a notice was emitted.
    Unauthenticated,
    /// store rejected the write. the optimistic flip stays in place.
    Failed { active: bool, count: u32 },
}

/// per-prompt owner of like/bookmark lifecycles.
///
/// one instance per rendered card, constructed with the card and dropped
/// with it. the `pending` flag inside each [`ToggleState`] serializes
/// toggles per kind; kinds are fully independent of each other.
pub struct InteractionController {
    prompt_id: PromptId,
    content: String,
    like: Mutex<ToggleState>,
    bookmark: Mutex<ToggleState>,
    interaction_repository: Arc<dyn InteractionRepository + Sync + Send>,
    auth: Arc<dyn AuthProvider + Sync + Send>,
    notifier: Arc<dyn Notifier + Sync + Send>,
}

impl InteractionController {
    pub fn new(
        prompt: &Prompt,
        interaction_repository: Arc<dyn InteractionRepository + Sync + Send>,
        auth: Arc<dyn AuthProvider + Sync + Send>,
        notifier: Arc<dyn Notifier + Sync + Send>,
    ) -> Self {
        Self {
            prompt_id: prompt.id,
            content: prompt.content.clone(),
            like: Mutex::new(ToggleState::new(prompt.likes_count)),
            bookmark: Mutex::new(ToggleState::new(prompt.bookmarks_count)),
            interaction_repository,
            auth,
            notifier,
        }
    }

    pub fn prompt_id(&self) -> PromptId { self.prompt_id }

    pub async fn state(&self, kind: InteractionKind) -> ToggleState {
        *self.cell_of(kind).lock().await
    }

    /// flips the edge for `kind` on this prompt.
    ///
    /// the flip is optimistic: local state moves first, the row write
    /// follows, and a rejected write is surfaced as a toast without
    /// rolling the flip back (the inherited contract).
    pub async fn toggle(&self, kind: InteractionKind) -> ToggleOutcome {
        let user_id = match self.auth.current_user_id() {
            Some(u) => u,
            None => {
                self.notifier.notify(Notification::Error(format!(
                    "Please sign in to {} prompts",
                    kind.verb()
                )));
                return ToggleOutcome::Unauthenticated;
            },
        };

        let cell = self.cell_of(kind);

        let was_active = {
            let mut state = cell.lock().await;

            if state.pending {
                return ToggleOutcome::Skipped;
            }

            state.pending = true;
            let was = state.active;
            state.active = !was;
            state.count = match was {
                false => state.count.saturating_add(1),
                true => state.count.saturating_sub(1),
            };
            was
        };

        let res = match was_active {
            false => {
                self.interaction_repository
                    .insert_mark(kind, self.prompt_id, user_id)
                    .await
            },
            true => {
                self.interaction_repository
                    .delete_mark(kind, self.prompt_id, user_id)
                    .await
            },
        };

        let mut state = cell.lock().await;
        state.pending = false;

        match res {
            // Ok(false) is an idempotent duplicate/missing edge; the store
            // already holds what the flip asked for.
            Ok(_) => ToggleOutcome::Applied {
                active: state.active,
                count: state.count,
            },
            Err(e) => {
                tracing::warn!("{} write failed for {}: {}", kind.verb(), self.prompt_id, e);
                self.notifier
                    .notify(Notification::Error("Something went wrong".to_string()));
                ToggleOutcome::Failed {
                    active: state.active,
                    count: state.count,
                }
            },
        }
    }

    /// copies the raw prompt body to the clipboard sink. best effort, no
    /// persisted side effect.
    pub fn copy_content(&self, clipboard: &dyn Clipboard) {
        clipboard.write_text(&self.content);
        self.notifier.notify(Notification::Success(
            "Prompt content copied to clipboard".to_string(),
        ));
    }

    fn cell_of(&self, kind: InteractionKind) -> &Mutex<ToggleState> {
        match kind {
            InteractionKind::Like => &self.like,
            InteractionKind::Bookmark => &self.bookmark,
        }
    }
}
