//! Agent loop, conversation state, run events, and tools.

pub mod conversation;
pub mod events;
pub mod run_loop;
pub mod tools;

pub use conversation::Conversation;
pub use events::{EventOutcome, RunEvent};
pub use run_loop::{Agent, RunBudget, RunReport};
