//! Agent tool definitions, registry, and built-in tool implementations.

pub mod base;
pub mod code;
pub mod distance;
pub mod final_answer;
pub mod places;
pub mod registry;
pub mod shipping;
pub mod web;

pub use base::{Tool, ToolOutcome};
pub use code::CodeExecutionTool;
pub use distance::DistanceTool;
pub use final_answer::{FinalAnswerTool, FINAL_ANSWER_TOOL};
pub use places::PlaceSearchTool;
pub use registry::ToolRegistry;
pub use shipping::ShippingEstimateTool;
pub use web::{PageFetchTool, WebSearchTool};
