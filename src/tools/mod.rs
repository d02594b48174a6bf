//! Tool System - tool definitions, step vocabulary, and discovery
//!
//! - `Tool`: the two definition shapes (command and structured)
//! - gather and process steps shared by both shapes
//! - `ToolRegistry`: discovery across search directories

mod command;
mod definition;
mod gather;
mod process;
mod registry;
mod structured;

pub use command::{ArgSpec, CommandSpec, CommandTool, Invocation};
pub use definition::{TOOL_SYMBOL, Tool, ToolLocation, ToolShapeError};
pub use gather::{GatherStep, gather};
pub use process::{ProcessStep, process};
pub use registry::{Enumeration, SkipReason, Skipped, ToolRegistry};
pub use structured::{PARAMETER_ARG, StructuredRunner, StructuredTool};
