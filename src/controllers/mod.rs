pub mod feed;
pub mod interaction;

pub use feed::{FeedController, FeedScope, FeedSnapshot, PROMPTS_PER_PAGE, SEARCH_DEBOUNCE};
pub use interaction::{InteractionController, ToggleOutcome, ToggleState};
