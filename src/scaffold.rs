//! Scaffolding for `clm new`

use std::fs;
use std::path::{Path, PathBuf};

use eyre::{Context, Result, bail};
use serde_json::json;

use crate::cli::ToolKind;
use crate::prompt::PromptRenderer;

const STRUCTURED_TEMPLATE: &str = include_str!("templates/structured.yml.hbs");
const COMMAND_TEMPLATE: &str = include_str!("templates/command.yml.hbs");

/// Write `<dest>/<name>.yml` from the template for `kind`. Never overwrites.
pub fn scaffold(name: &str, dest: &Path, kind: ToolKind) -> Result<PathBuf> {
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        bail!("Invalid tool name `{}`: use letters, digits, `_` and `-`", name);
    }

    let path = dest.join(format!("{}.yml", name));
    if path.exists() {
        bail!("{} already exists", path.display());
    }

    let template = match kind {
        ToolKind::Structured => STRUCTURED_TEMPLATE,
        ToolKind::Command => COMMAND_TEMPLATE,
    };
    let content = PromptRenderer::new().render(template, &json!({ "name": name }))?;

    fs::create_dir_all(dest).context(format!("Failed to create {}", dest.display()))?;
    fs::write(&path, content).context(format!("Failed to write {}", path.display()))?;
    log::info!("Created {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{TOOL_SYMBOL, Tool};
    use tempfile::TempDir;

    fn parse_tool(path: &Path) -> Tool {
        let content = fs::read_to_string(path).unwrap();
        let doc: serde_yaml::Value = serde_yaml::from_str(&content).unwrap();
        Tool::from_value(&doc[TOOL_SYMBOL]).unwrap()
    }

    #[test]
    fn test_structured_scaffold_is_valid_tool() {
        let dir = TempDir::new().unwrap();
        let path = scaffold("summarise", dir.path(), ToolKind::Structured).unwrap();

        assert_eq!(path, dir.path().join("summarise.yml"));
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("clm run summarise"));
        assert!(content.contains("{{text}}"));
        assert_eq!(parse_tool(&path).kind(), "structured");
    }

    #[test]
    fn test_command_scaffold_is_valid_tool() {
        let dir = TempDir::new().unwrap();
        let path = scaffold("poetry", dir.path(), ToolKind::Command).unwrap();
        assert_eq!(parse_tool(&path).kind(), "command");
    }

    #[test]
    fn test_scaffold_creates_dest() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("tools/nested");
        assert!(scaffold("echo", &dest, ToolKind::Structured).is_ok());
        assert!(dest.join("echo.yml").is_file());
    }

    #[test]
    fn test_scaffold_refuses_overwrite() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("echo.yml"), "keep me").unwrap();

        let err = scaffold("echo", dir.path(), ToolKind::Structured).unwrap_err();
        assert!(err.to_string().contains("already exists"));
        assert_eq!(fs::read_to_string(dir.path().join("echo.yml")).unwrap(), "keep me");
    }

    #[test]
    fn test_scaffold_rejects_bad_name() {
        let dir = TempDir::new().unwrap();
        assert!(scaffold("../escape", dir.path(), ToolKind::Structured).is_err());
        assert!(scaffold("", dir.path(), ToolKind::Structured).is_err());
    }
}
