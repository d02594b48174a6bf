//! Prompt System - Template rendering
//!
//! Tool prompts, and the templated paths and commands used by tool steps, are
//! rendered with Handlebars against the data a tool gathered.

mod render;

pub use render::{PromptRenderer, RenderError};
