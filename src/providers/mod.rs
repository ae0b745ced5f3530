pub mod base;
pub mod openai_compat;
pub mod resilient;
pub mod retry;

pub use base::{LLMProvider, LLMResponse, ToolCallRequest};
pub use openai_compat::OpenAICompatProvider;
pub use resilient::ResilientClient;
pub use retry::RetryPolicy;
