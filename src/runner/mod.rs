//! Tool runner module - the three-phase execution contract.
//!
//! This module provides:
//! - ToolRunner, the trait structured tools implement
//! - run_tool, which sequences the phases and isolates their failures
//! - RunContext and ExecutionState

mod tool_runner;

pub use tool_runner::{Data, ExecutionState, Parameters, RunContext, ToolRunner, run_tool};
