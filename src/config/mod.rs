//! Configuration types and loading for cardflow

mod agent;
mod completion;
mod loader;
mod retrieval;

pub use agent::AgentPromptConfig;
pub use completion::{CompletionConfig, DEFAULT_MODEL};
pub use loader::CardflowConfig;
pub use retrieval::RetrievalConfig;
