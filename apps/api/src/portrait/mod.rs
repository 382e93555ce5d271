//! AI portrait studio: selection → prompt → generation → post-processing → storage.

pub mod handlers;
pub mod history;
pub mod pipeline;
pub mod prompts;
pub mod resolver;
pub mod selection;
