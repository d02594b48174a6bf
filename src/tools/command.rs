//! Command tools: declare their own arguments and subcommands, then run
//! their steps inline with no phase isolation.

use std::collections::{BTreeMap, HashSet};

use clap::builder::PossibleValuesParser;
use clap::{Arg, ArgAction, ArgMatches};
use eyre::{Result, WrapErr};
use serde::Deserialize;

use super::gather::{self, GatherStep};
use super::process::{self, ProcessStep};
use crate::runner::{Parameters, RunContext};

/// One declared argument
#[derive(Debug, Clone, Deserialize)]
pub struct ArgSpec {
    /// Parameter name the value is gathered under
    pub name: String,

    #[serde(default)]
    pub help: Option<String>,

    /// `--long` form; positional when neither long nor short is set
    #[serde(default)]
    pub long: Option<String>,

    #[serde(default)]
    pub short: Option<char>,

    #[serde(default)]
    pub default: Option<String>,

    #[serde(default)]
    pub choices: Vec<String>,

    /// Boolean switch, gathered as "true" or "false"
    #[serde(default)]
    pub flag: bool,

    /// Required unless a default is given; positionals are required by default
    #[serde(default)]
    pub required: Option<bool>,
}

impl ArgSpec {
    fn is_positional(&self) -> bool {
        self.long.is_none() && self.short.is_none()
    }

    fn is_required(&self) -> bool {
        !self.flag && self.default.is_none() && self.required.unwrap_or(self.is_positional())
    }

    fn to_arg(&self) -> Arg {
        let mut arg = Arg::new(self.name.clone());
        if let Some(long) = &self.long {
            arg = arg.long(long.clone());
        }
        if let Some(short) = self.short {
            arg = arg.short(short);
        }
        if let Some(help) = &self.help {
            arg = arg.help(help.clone());
        }

        if self.flag {
            return arg.action(ArgAction::SetTrue);
        }

        if !self.choices.is_empty() {
            arg = arg.value_parser(PossibleValuesParser::new(self.choices.clone()));
        }
        match &self.default {
            Some(default) => arg.default_value(default.clone()),
            None => arg.required(self.is_required()),
        }
    }
}

/// A command or subcommand declaration
#[derive(Debug, Clone, Deserialize)]
pub struct CommandSpec {
    #[serde(default)]
    pub about: Option<String>,

    #[serde(default)]
    pub args: Vec<ArgSpec>,

    #[serde(default)]
    pub subcommands: BTreeMap<String, CommandSpec>,

    /// Template to send to the model; absent on pure subcommand groups
    #[serde(default)]
    pub prompt: Option<String>,

    #[serde(default = "gather::default_steps")]
    pub gather: Vec<GatherStep>,

    #[serde(default = "process::default_steps")]
    pub process: Vec<ProcessStep>,
}

impl CommandSpec {
    fn build(&self, name: &str) -> clap::Command {
        let mut command = clap::Command::new(name.to_string());
        if let Some(about) = &self.about {
            command = command.about(about.clone());
        }
        for arg in &self.args {
            command = command.arg(arg.to_arg());
        }
        for (sub_name, sub) in &self.subcommands {
            command = command.subcommand(sub.build(sub_name));
        }
        if self.prompt.is_none() {
            command = command.subcommand_required(true).arg_required_else_help(true);
        }
        command
    }

    fn validate(&self, path: &str) -> Result<(), String> {
        if self.prompt.is_none() && self.subcommands.is_empty() {
            return Err(format!("command `{}` needs a prompt or subcommands", path));
        }

        let mut seen = HashSet::new();
        let mut longs = HashSet::new();
        let mut shorts = HashSet::new();
        let mut optional_positional: Option<&str> = None;
        for arg in &self.args {
            if arg.name.is_empty() {
                return Err(format!("command `{}` has an argument without a name", path));
            }
            if arg.name == "help" || arg.long.as_deref() == Some("help") || arg.short == Some('h') {
                return Err(format!("command `{}`: `help` and `-h` are reserved", path));
            }
            if !seen.insert(arg.name.as_str()) {
                return Err(format!("command `{}` declares `{}` twice", path, arg.name));
            }
            if let Some(long) = &arg.long {
                if long.is_empty() || long.starts_with('-') {
                    return Err(format!(
                        "command `{}`: long name `{}` for `{}` must be non-empty without leading `-`",
                        path, long, arg.name
                    ));
                }
                if !longs.insert(long.as_str()) {
                    return Err(format!("command `{}` uses `--{}` twice", path, long));
                }
            }
            if let Some(short) = arg.short {
                if short == '-' || short.is_whitespace() {
                    return Err(format!("command `{}`: `{}` is not a valid short name", path, short));
                }
                if !shorts.insert(short) {
                    return Err(format!("command `{}` uses `-{}` twice", path, short));
                }
            }
            if arg.is_positional() {
                if arg.flag {
                    return Err(format!("command `{}`: flag `{}` needs a long or short name", path, arg.name));
                }
                match (optional_positional, arg.is_required()) {
                    (Some(optional), true) => {
                        return Err(format!(
                            "command `{}`: required `{}` follows optional `{}`",
                            path, arg.name, optional
                        ));
                    }
                    (None, false) => optional_positional = Some(arg.name.as_str()),
                    _ => {}
                }
            }
            if let Some(default) = &arg.default
                && !arg.choices.is_empty()
                && !arg.choices.contains(default)
            {
                return Err(format!(
                    "command `{}`: default `{}` for `{}` is not one of its choices",
                    path, default, arg.name
                ));
            }
        }

        for (name, sub) in &self.subcommands {
            if name.is_empty() || name == "help" {
                return Err(format!("command `{}`: `{}` is not a valid subcommand name", path, name));
            }
            sub.validate(&format!("{} {}", path, name))?;
        }
        Ok(())
    }

    /// Collect this level's argument values into parameters
    fn collect(&self, matches: &ArgMatches, params: &mut Parameters) {
        for arg in &self.args {
            if arg.flag {
                params.insert(arg.name.clone(), matches.get_flag(&arg.name).to_string());
            } else if let Some(value) = matches.get_one::<String>(&arg.name) {
                params.insert(arg.name.clone(), value.clone());
            }
        }
    }
}

/// A self-contained command tool
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct CommandTool {
    pub spec: CommandSpec,
}

/// A parsed command tool invocation, ready to execute
#[derive(Debug)]
pub struct Invocation<'a> {
    /// Command path, e.g. `poetry haiku`
    pub path: String,
    pub spec: &'a CommandSpec,
    pub params: Parameters,
}

impl CommandTool {
    pub fn about(&self) -> Option<&str> {
        self.spec.about.as_deref()
    }

    pub(crate) fn clap_command(&self, name: &str) -> clap::Command {
        self.spec.build(name)
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        self.spec.validate("tool")
    }

    /// Parse raw tokens with the tool's own argument parser.
    ///
    /// Values from outer levels are visible to subcommands; an inner
    /// argument with the same name wins.
    pub fn parse(&self, name: &str, tokens: &[String]) -> Result<Invocation<'_>, clap::Error> {
        let matches = self
            .clap_command(name)
            .try_get_matches_from(std::iter::once(name.to_string()).chain(tokens.iter().cloned()))?;

        let mut spec = &self.spec;
        let mut matches = &matches;
        let mut path = name.to_string();
        let mut params = Parameters::new();
        spec.collect(matches, &mut params);

        while let Some((sub_name, sub_matches)) = matches.subcommand() {
            let Some(sub) = spec.subcommands.get(sub_name) else {
                break;
            };
            spec = sub;
            matches = sub_matches;
            path.push(' ');
            path.push_str(sub_name);
            spec.collect(matches, &mut params);
        }

        Ok(Invocation { path, spec, params })
    }
}

impl Invocation<'_> {
    /// Gather, render, prompt and process inline. Errors propagate unchanged.
    pub async fn execute(self, ctx: &RunContext) -> Result<()> {
        let Some(template) = &self.spec.prompt else {
            eyre::bail!("`{}` needs a subcommand", self.path);
        };

        let data = gather::gather(&self.spec.gather, &self.params, &ctx.renderer)
            .await
            .wrap_err_with(|| format!("Failed to gather data for `{}`", self.path))?;
        let prompt = ctx.renderer.render(template, &data)?;
        log::debug!("Rendered prompt for `{}`:\n{}", self.path, prompt);

        ctx.console.notice(format!("Prompting {}", ctx.model.model_id()));
        let mut response = ctx.model.prompt(&prompt).await?;

        let mut stdout = std::io::stdout();
        process::process(&self.spec.process, &mut response, &data, &ctx.renderer, &mut stdout)
            .await
            .wrap_err_with(|| format!("Failed to process the response for `{}`", self.path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::Tool;

    const POETRY: &str = r#"
kind: command
about: Write poetry
args:
  - name: tone
    long: tone
    short: t
    default: wistful
    choices: [wistful, cheerful]
subcommands:
  haiku:
    about: Write a haiku
    prompt: "A {{tone}} haiku about {{topic}}"
    args:
      - name: topic
      - name: title
        long: title
        flag: true
  sonnet:
    about: Write a sonnet
    prompt: "A {{tone}} sonnet about {{topic}}"
    args:
      - name: topic
"#;

    fn poetry() -> CommandTool {
        let value: serde_yaml::Value = serde_yaml::from_str(POETRY).unwrap();
        match Tool::from_value(&value).unwrap() {
            Tool::Command(tool) => tool,
            other => panic!("expected command tool, got {}", other.kind()),
        }
    }

    fn tokens(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_subcommand_with_defaults() {
        let tool = poetry();
        let invocation = tool.parse("poetry", &tokens(&["haiku", "autumn"])).unwrap();
        assert_eq!(invocation.path, "poetry haiku");
        assert_eq!(invocation.params.get("topic").map(String::as_str), Some("autumn"));
        assert_eq!(invocation.params.get("tone").map(String::as_str), Some("wistful"));
        assert_eq!(invocation.params.get("title").map(String::as_str), Some("false"));
    }

    #[test]
    fn test_parse_outer_option_and_flag() {
        let tool = poetry();
        let invocation = tool
            .parse("poetry", &tokens(&["--tone", "cheerful", "haiku", "spring", "--title"]))
            .unwrap();
        assert_eq!(invocation.params.get("tone").map(String::as_str), Some("cheerful"));
        assert_eq!(invocation.params.get("title").map(String::as_str), Some("true"));
    }

    #[test]
    fn test_parse_rejects_bad_choice() {
        let tool = poetry();
        assert!(tool.parse("poetry", &tokens(&["--tone", "angry", "haiku", "x"])).is_err());
    }

    #[test]
    fn test_parse_requires_subcommand() {
        let tool = poetry();
        assert!(tool.parse("poetry", &[]).is_err());
    }

    #[test]
    fn test_parse_requires_positional() {
        let tool = poetry();
        assert!(tool.parse("poetry", &tokens(&["sonnet"])).is_err());
    }

    #[test]
    fn test_validate_needs_prompt_or_subcommands() {
        let value: serde_yaml::Value = serde_yaml::from_str("kind: command\nabout: empty\n").unwrap();
        let err = Tool::from_value(&value).unwrap_err();
        assert!(err.to_string().contains("needs a prompt or subcommands"));
    }

    #[test]
    fn test_validate_duplicate_args() {
        let yaml = "kind: command\nprompt: x\nargs:\n  - name: a\n  - name: a\n    long: other\n";
        let value: serde_yaml::Value = serde_yaml::from_str(yaml).unwrap();
        let err = Tool::from_value(&value).unwrap_err();
        assert!(err.to_string().contains("twice"));
    }

    #[test]
    fn test_validate_default_outside_choices() {
        let yaml = "kind: command\nprompt: x\nargs:\n  - name: a\n    long: a\n    default: z\n    choices: [x, y]\n";
        let value: serde_yaml::Value = serde_yaml::from_str(yaml).unwrap();
        assert!(Tool::from_value(&value).is_err());
    }

    #[test]
    fn test_clap_command_lists_subcommands() {
        let command = poetry().clap_command("poetry");
        let names: Vec<&str> = command.get_subcommands().map(|c| c.get_name()).collect();
        assert_eq!(names, vec!["haiku", "sonnet"]);
    }

    fn command_with_args(args: &str) -> Result<Tool, crate::tools::ToolShapeError> {
        let yaml = format!("kind: command\nprompt: x\nargs: {}\n", args);
        let value: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();
        Tool::from_value(&value)
    }

    #[test]
    fn test_validate_duplicate_long_and_short() {
        let err = command_with_args("[{name: a, long: same}, {name: b, long: same}]").unwrap_err();
        assert!(err.to_string().contains("`--same` twice"));

        let err = command_with_args("[{name: a, short: s}, {name: b, short: s}]").unwrap_err();
        assert!(err.to_string().contains("`-s` twice"));
    }

    #[test]
    fn test_validate_long_with_leading_dash() {
        assert!(command_with_args("[{name: a, long: '--a'}]").is_err());
        assert!(command_with_args("[{name: a, long: ''}]").is_err());
    }

    #[test]
    fn test_validate_required_positional_after_optional() {
        let err = command_with_args("[{name: a, default: x}, {name: b}]").unwrap_err();
        assert!(err.to_string().contains("required `b` follows optional `a`"));

        assert!(command_with_args("[{name: a}, {name: b, default: x}]").is_ok());
        assert!(command_with_args("[{name: a, required: false}, {name: b, required: false}]").is_ok());
    }

    #[test]
    fn test_validate_positional_flag() {
        assert!(command_with_args("[{name: a, flag: true}]").is_err());
        assert!(command_with_args("[{name: a, long: a, flag: true}]").is_ok());
    }

    #[test]
    fn test_accepted_args_build_a_parser() {
        let tool = command_with_args(concat!(
            "[{name: a}, ",
            "{name: b, long: bee, short: b, default: x}, ",
            "{name: c, long: c, flag: true}]",
        ));
        let Tool::Command(tool) = tool.unwrap() else {
            panic!("expected command tool");
        };
        let invocation = tool.parse("t", &tokens(&["one", "-b", "two", "--c"])).unwrap();
        assert_eq!(invocation.params.get("b").map(String::as_str), Some("two"));
        assert_eq!(invocation.params.get("c").map(String::as_str), Some("true"));
    }
}
