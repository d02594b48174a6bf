//! Gather steps: turn CLI parameters into template data

use std::collections::BTreeMap;
use std::path::PathBuf;

use eyre::{Context, Result, bail, eyre};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::process::Command;

use crate::prompt::PromptRenderer;
use crate::runner::{Data, Parameters};

/// One step of a tool's `gather` list
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatherStep {
    /// Copy every parameter into the data
    Parameters,
    /// Fail unless these parameters were given
    Require(Vec<String>),
    /// Insert constant values
    Set(BTreeMap<String, Value>),
    /// Store a file's contents
    ReadFile { key: String, path: String },
    /// Store `{path, contents}` for every file under a directory
    Files {
        key: String,
        path: String,
        #[serde(default = "default_pattern")]
        pattern: String,
    },
    /// Store the trimmed stdout of a shell command
    Command { key: String, run: String },
}

fn default_pattern() -> String {
    "*".to_string()
}

/// Steps used when a tool declares none
pub fn default_steps() -> Vec<GatherStep> {
    vec![GatherStep::Parameters]
}

/// Run gather steps in order. Paths, file patterns and commands are
/// templates rendered against the data gathered so far.
pub async fn gather(steps: &[GatherStep], params: &Parameters, renderer: &PromptRenderer) -> Result<Data> {
    let mut data = Data::new();

    for step in steps {
        log::debug!("gather step: {:?}", step);
        match step {
            GatherStep::Parameters => {
                for (key, value) in params {
                    data.insert(key.clone(), Value::String(value.clone()));
                }
            }
            GatherStep::Require(keys) => {
                let missing: Vec<&str> = keys
                    .iter()
                    .filter(|k| !params.contains_key(k.as_str()))
                    .map(String::as_str)
                    .collect();
                if !missing.is_empty() {
                    bail!(
                        "Missing required parameter(s): {}. Pass them with --parameter KEY=VALUE",
                        missing.join(", ")
                    );
                }
            }
            GatherStep::Set(values) => {
                data.extend(values.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
            GatherStep::ReadFile { key, path } => {
                let path = renderer.render(path, &data)?;
                let content = tokio::fs::read_to_string(&path)
                    .await
                    .context(format!("Failed to read {}", path))?;
                data.insert(key.clone(), Value::String(content));
            }
            GatherStep::Files { key, path, pattern } => {
                let root = renderer.render(path, &data)?;
                let pattern = renderer.render(pattern, &data)?;
                let files = collect_files(&root, &pattern)?;
                data.insert(key.clone(), Value::Array(files));
            }
            GatherStep::Command { key, run } => {
                let command = renderer.render(run, &data)?;
                let stdout = run_shell(&command).await?;
                data.insert(key.clone(), Value::String(stdout));
            }
        }
    }

    Ok(data)
}

/// Files under `root` matching `pattern` at any depth, sorted by path.
/// Files that are not valid UTF-8 are left out.
fn collect_files(root: &str, pattern: &str) -> Result<Vec<Value>> {
    if !std::path::Path::new(root).is_dir() {
        bail!("Not a directory: {}", root);
    }

    let full_pattern = format!("{}/**/{}", glob::Pattern::escape(root.trim_end_matches('/')), pattern);
    let mut paths: Vec<PathBuf> = glob::glob(&full_pattern)
        .context(format!("Invalid file pattern {}", pattern))?
        .filter_map(|entry| entry.ok())
        .filter(|path| path.is_file())
        .collect();
    paths.sort();

    let mut files = Vec::new();
    for path in paths {
        match std::fs::read_to_string(&path) {
            Ok(contents) => files.push(json!({
                "path": path.display().to_string(),
                "contents": contents,
            })),
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                log::debug!("Skipping non UTF-8 file {}", path.display());
            }
            Err(e) => return Err(e).context(format!("Failed to read {}", path.display())),
        }
    }
    Ok(files)
}

/// Run a command with `sh -c` and return its stdout without trailing whitespace
async fn run_shell(command: &str) -> Result<String> {
    log::info!("Running: {}", command);
    let output = Command::new("sh")
        .arg("-c")
        .arg(command)
        .output()
        .await
        .context(format!("Failed to run `{}`", command))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(eyre!(
            "`{}` exited with {}: {}",
            command,
            output.status,
            stderr.trim()
        ));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim_end().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn params(pairs: &[(&str, &str)]) -> Parameters {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    /// Parse steps the way tool definitions are parsed, through serde_json
    fn steps(yaml: &str) -> Vec<GatherStep> {
        let value: serde_yaml::Value = serde_yaml::from_str(yaml).unwrap();
        serde_json::from_value(serde_json::to_value(value).unwrap()).unwrap()
    }

    #[test]
    fn test_step_forms_deserialize() {
        let parsed = steps(concat!(
            "- parameters\n",
            "- require: [text]\n",
            "- set: {tone: dry}\n",
            "- read_file: {key: body, path: a.txt}\n",
            "- files: {key: src, path: src}\n",
            "- command: {key: log, run: git log}\n",
        ));
        assert_eq!(parsed[0], GatherStep::Parameters);
        assert_eq!(parsed[1], GatherStep::Require(vec!["text".to_string()]));
        assert!(matches!(&parsed[4], GatherStep::Files { pattern, .. } if pattern == "*"));
        assert_eq!(parsed.len(), 6);
    }

    #[tokio::test]
    async fn test_parameters_copied() {
        let data = gather(&default_steps(), &params(&[("key1", "value1")]), &PromptRenderer::new())
            .await
            .unwrap();
        assert_eq!(data.get("key1"), Some(&json!("value1")));
    }

    #[tokio::test]
    async fn test_require_reports_missing() {
        let err = gather(
            &steps("- require: [text, tone]\n"),
            &params(&[("tone", "dry")]),
            &PromptRenderer::new(),
        )
        .await
        .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("text"));
        assert!(!msg.contains("tone,"));
    }

    #[tokio::test]
    async fn test_read_file_with_templated_path() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("input.txt");
        fs::write(&file, "some text").unwrap();

        let data = gather(
            &steps("- parameters\n- read_file: {key: text, path: '{{file}}'}\n"),
            &params(&[("file", file.to_str().unwrap())]),
            &PromptRenderer::new(),
        )
        .await
        .unwrap();
        assert_eq!(data.get("text"), Some(&json!("some text")));
    }

    #[tokio::test]
    async fn test_read_missing_file_fails() {
        let result = gather(
            &steps("- read_file: {key: text, path: /nonexistent/clm/input.txt}\n"),
            &Parameters::new(),
            &PromptRenderer::new(),
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_files_sorted_and_skip_binary() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("b.rs"), "b").unwrap();
        fs::write(dir.path().join("sub/a.rs"), "a").unwrap();
        fs::write(dir.path().join("c.rs"), [0xff, 0xfe, 0x00]).unwrap();
        fs::write(dir.path().join("notes.md"), "md").unwrap();

        let yaml = format!("- files: {{key: src, path: '{}', pattern: '*.rs'}}\n", dir.path().display());
        let data = gather(&steps(&yaml), &Parameters::new(), &PromptRenderer::new()).await.unwrap();

        let files = data.get("src").and_then(Value::as_array).unwrap();
        let names: Vec<&str> = files.iter().filter_map(|f| f["contents"].as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn test_command_stdout_trimmed() {
        let data = gather(
            &steps("- command: {key: out, run: 'echo hello'}\n"),
            &Parameters::new(),
            &PromptRenderer::new(),
        )
        .await
        .unwrap();
        assert_eq!(data.get("out"), Some(&json!("hello")));
    }

    #[tokio::test]
    async fn test_command_failure() {
        let steps = steps("- command: {key: out, run: 'exit 3'}\n");
        let result = gather(&steps, &Parameters::new(), &PromptRenderer::new()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_unknown_template_variable_fails() {
        let steps = steps("- read_file: {key: text, path: '{{missing}}'}\n");
        let result = gather(&steps, &Parameters::new(), &PromptRenderer::new()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_files_pattern_from_parameter() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.rs"), "fn main() {}").unwrap();
        fs::write(dir.path().join("b.md"), "notes").unwrap();

        let data = gather(
            &steps("- parameters\n- files: {key: files, path: '{{path}}', pattern: '{{pattern}}'}\n"),
            &params(&[("path", dir.path().to_str().unwrap()), ("pattern", "*.rs")]),
            &PromptRenderer::new(),
        )
        .await
        .unwrap();

        let files = data.get("files").and_then(Value::as_array).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0]["contents"], json!("fn main() {}"));
    }
}
