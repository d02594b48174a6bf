//! Prompt Renderer - Render tool templates with gathered data using Handlebars
//!
//! Rendering is strict: a template that references a variable the tool did
//! not gather is an error, never a silently empty string.

use handlebars::Handlebars;
use serde::Serialize;
use thiserror::Error;

/// A template could not be rendered
#[derive(Debug, Error)]
#[error("Failed to render template: {0}")]
pub struct RenderError(#[from] handlebars::RenderError);

/// Renders prompt templates using Handlebars templating
#[derive(Debug, Clone)]
pub struct PromptRenderer {
    handlebars: Handlebars<'static>,
}

impl Default for PromptRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptRenderer {
    /// Create a new PromptRenderer with default settings
    pub fn new() -> Self {
        let mut handlebars = Handlebars::new();
        // Missing variables are errors
        handlebars.set_strict_mode(true);
        // Prompts and file paths are not HTML
        handlebars.register_escape_fn(handlebars::no_escape);
        Self { handlebars }
    }

    /// Render a template string with any serializable context
    ///
    /// # Arguments
    /// * `template` - The template string containing {{variable}} placeholders
    /// * `context` - Any type that implements Serialize, usually the gathered data
    ///
    /// # Returns
    /// The rendered template as a string
    pub fn render<T: Serialize>(&self, template: &str, context: &T) -> Result<String, RenderError> {
        Ok(self.handlebars.render_template(template, context)?)
    }
}
