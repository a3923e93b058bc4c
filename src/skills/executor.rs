//! Skill Executor
//!
//! Runs approved skills with bound parameters under timeouts. Script bodies
//! run as installed executables with positional arguments; command bodies
//! run step by step through `sh -c`, failing fast on the first error.

use super::store::SCRIPT_EXTENSION;
use super::types::{display_value, CommandStep, SkillBody, SkillDefinition};
use crate::config::EngineConfig;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::{Output, Stdio};
use std::time::Instant;
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};

/// Exit code reported when an execution hits its time budget.
pub const TIMEOUT_EXIT_CODE: i32 = 124;

/// Skill execution errors
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    #[error("Required parameter missing: {0}")]
    MissingParameter(String),

    #[error("Script not found: {}", .0.display())]
    ScriptMissing(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Outcome of one skill invocation.
///
/// Fresh per call and never persisted. `exit_code` is the child's code,
/// [`TIMEOUT_EXIT_CODE`] for timeouts, or `-1` when the child was killed by
/// a signal and reports no code.
#[derive(Debug, Clone)]
pub struct SkillExecutionResult {
    pub success: bool,
    /// Captured stdout, or the aggregated transcript for command bodies
    pub output: String,
    /// Captured stderr or a failure explanation
    pub error: String,
    pub exit_code: i32,
    /// Wall-clock seconds for the whole invocation
    pub duration: f64,
}

impl SkillExecutionResult {
    fn failure(error: String, exit_code: i32) -> Self {
        Self {
            success: false,
            output: String::new(),
            error,
            exit_code,
            duration: 0.0,
        }
    }
}

/// Runs skills against one project's installed skill directory
pub struct SkillExecutor {
    project_root: PathBuf,
    skills_dir: PathBuf,
    script_timeout: Duration,
    command_timeout: Duration,
}

impl SkillExecutor {
    /// Executor for the configured project
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            project_root: config.project_root.clone(),
            skills_dir: config.skills_dir(),
            script_timeout: Duration::from_secs(config.script_timeout_secs),
            command_timeout: Duration::from_secs(config.command_timeout_secs),
        }
    }

    /// Override both time budgets
    pub fn with_timeouts(mut self, script: Duration, command: Duration) -> Self {
        self.script_timeout = script;
        self.command_timeout = command;
        self
    }

    /// Run a skill with the supplied parameters.
    ///
    /// Never returns an error: validation failures, missing scripts, spawn
    /// failures and timeouts all become failed results. `duration` is the
    /// measured wall clock of the whole call, timeouts included.
    pub async fn execute(
        &self,
        skill: &SkillDefinition,
        parameters: &HashMap<String, Value>,
    ) -> SkillExecutionResult {
        let started = Instant::now();
        debug!("Executing skill '{}'", skill.name);

        let mut result = match self.try_execute(skill, parameters).await {
            Ok(result) => result,
            Err(e) => {
                warn!("Skill '{}' failed: {}", skill.name, e);
                SkillExecutionResult::failure(e.to_string(), 1)
            }
        };
        result.duration = started.elapsed().as_secs_f64();
        result
    }

    /// Render the commands `execute` would run, without running anything.
    ///
    /// Parameters are bound exactly as in `execute`, so validation failures
    /// surface here as errors and defaults appear in the rendered text.
    pub fn dry_run(
        &self,
        skill: &SkillDefinition,
        parameters: &HashMap<String, Value>,
    ) -> Result<Vec<String>, ExecutionError> {
        let bound = bind_parameters(skill, parameters)?;
        match &skill.body {
            SkillBody::Script(_) => {
                let mut line = self.script_path(&skill.name).display().to_string();
                for arg in script_args(skill, &bound) {
                    line.push(' ');
                    line.push_str(&arg);
                }
                Ok(vec![line])
            }
            SkillBody::Commands(steps) => Ok(steps
                .iter()
                .map(|step| substitute(step.command(), &bound))
                .collect()),
        }
    }

    async fn try_execute(
        &self,
        skill: &SkillDefinition,
        parameters: &HashMap<String, Value>,
    ) -> Result<SkillExecutionResult, ExecutionError> {
        let bound = bind_parameters(skill, parameters)?;
        match &skill.body {
            SkillBody::Script(_) => self.run_script(skill, &bound).await,
            SkillBody::Commands(steps) => self.run_commands(steps, &bound).await,
        }
    }

    fn script_path(&self, name: &str) -> PathBuf {
        self.skills_dir.join(format!("{}.{}", name, SCRIPT_EXTENSION))
    }

    async fn run_script(
        &self,
        skill: &SkillDefinition,
        bound: &HashMap<String, Value>,
    ) -> Result<SkillExecutionResult, ExecutionError> {
        let script = self.script_path(&skill.name);
        if !script.exists() {
            return Err(ExecutionError::ScriptMissing(script));
        }

        let mut cmd = Command::new(&script);
        cmd.args(script_args(skill, bound))
            .current_dir(&self.project_root)
            .kill_on_drop(true)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        match run_with_timeout(cmd, self.script_timeout).await? {
            Some(output) => Ok(SkillExecutionResult {
                success: output.status.success(),
                output: String::from_utf8_lossy(&output.stdout).to_string(),
                error: String::from_utf8_lossy(&output.stderr).to_string(),
                exit_code: output.status.code().unwrap_or(-1),
                duration: 0.0,
            }),
            None => Ok(SkillExecutionResult {
                success: false,
                output: String::new(),
                error: format!(
                    "Execution timed out after {} seconds",
                    self.script_timeout.as_secs()
                ),
                exit_code: TIMEOUT_EXIT_CODE,
                duration: self.script_timeout.as_secs_f64(),
            }),
        }
    }

    async fn run_commands(
        &self,
        steps: &[CommandStep],
        bound: &HashMap<String, Value>,
    ) -> Result<SkillExecutionResult, ExecutionError> {
        let mut transcript: Vec<String> = Vec::new();

        for step in steps {
            if let Some(description) = step.description() {
                if !description.is_empty() {
                    transcript.push(format!("# {}", description));
                }
            }

            let command = substitute(step.command(), bound);
            debug!("Running command: {}", command);

            let mut cmd = Command::new("sh");
            cmd.arg("-c")
                .arg(&command)
                .current_dir(&self.project_root)
                .kill_on_drop(true)
                .stdout(Stdio::piped())
                .stderr(Stdio::piped());

            let output = match run_with_timeout(cmd, self.command_timeout).await? {
                Some(output) => output,
                None => {
                    return Ok(SkillExecutionResult {
                        success: false,
                        output: transcript.join("\n"),
                        error: format!("Command timeout: {}", command),
                        exit_code: TIMEOUT_EXIT_CODE,
                        duration: self.command_timeout.as_secs_f64(),
                    })
                }
            };

            transcript.push(format!("$ {}", command));
            transcript.push(String::from_utf8_lossy(&output.stdout).to_string());

            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                return Ok(SkillExecutionResult {
                    success: false,
                    output: transcript.join("\n"),
                    error: format!("Command failed: {}\n{}", command, stderr),
                    exit_code: output.status.code().unwrap_or(-1),
                    duration: 0.0,
                });
            }
        }

        Ok(SkillExecutionResult {
            success: true,
            output: transcript.join("\n"),
            error: String::new(),
            exit_code: 0,
            duration: 0.0,
        })
    }
}

/// Build the effective parameter map: supplied values win, declared defaults
/// fill the gaps, and a required parameter with neither is an error. Extra
/// supplied keys are kept and participate in substitution.
fn bind_parameters(
    skill: &SkillDefinition,
    supplied: &HashMap<String, Value>,
) -> Result<HashMap<String, Value>, ExecutionError> {
    let mut bound = supplied.clone();
    for parameter in &skill.parameters {
        if bound.contains_key(&parameter.name) {
            continue;
        }
        if parameter.required {
            return Err(ExecutionError::MissingParameter(parameter.name.clone()));
        }
        if let Some(default) = &parameter.default {
            bound.insert(parameter.name.clone(), default.clone());
        }
    }
    Ok(bound)
}

/// Positional script arguments, projected in declaration order; parameters
/// that ended up unbound are skipped.
fn script_args(skill: &SkillDefinition, bound: &HashMap<String, Value>) -> Vec<String> {
    skill
        .parameters
        .iter()
        .filter_map(|parameter| bound.get(&parameter.name).map(display_value))
        .collect()
}

/// Replace `${name}` and `$name` with the bound value's text. Longer names
/// are substituted first so `$name` never corrupts `$name_extra`.
fn substitute(template: &str, bound: &HashMap<String, Value>) -> String {
    let mut names: Vec<&String> = bound.keys().collect();
    names.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

    let mut rendered = template.to_string();
    for name in names {
        let value = display_value(&bound[name.as_str()]);
        rendered = rendered.replace(&format!("${{{}}}", name), &value);
        rendered = rendered.replace(&format!("${}", name), &value);
    }
    rendered
}

async fn run_with_timeout(mut cmd: Command, limit: Duration) -> std::io::Result<Option<Output>> {
    let child = cmd.spawn()?;
    match timeout(limit, child.wait_with_output()).await {
        Ok(result) => result.map(Some),
        // kill_on_drop reaps the abandoned child
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skills::store::SkillStore;
    use crate::skills::types::ParameterSpec;
    use serde_json::json;
    use tempfile::TempDir;

    fn executor_for(root: &std::path::Path) -> SkillExecutor {
        SkillExecutor::new(&EngineConfig::new(root))
            .with_timeouts(Duration::from_secs(5), Duration::from_secs(5))
    }

    fn command_skill(steps: Vec<CommandStep>) -> SkillDefinition {
        SkillDefinition::new("under-test", "Test skill", SkillBody::Commands(steps)).unwrap()
    }

    fn params(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
        pairs
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn test_substitute_prefers_longer_names() {
        let bound = params(&[("file", json!("a.txt")), ("file_name", json!("b.txt"))]);
        assert_eq!(
            substitute("cp $file_name ${file}", &bound),
            "cp b.txt a.txt"
        );
    }

    #[test]
    fn test_substitute_value_forms() {
        let bound = params(&[("count", json!(3)), ("verbose", json!(true))]);
        assert_eq!(
            substitute("run --count ${count} --verbose $verbose", &bound),
            "run --count 3 --verbose true"
        );
    }

    #[test]
    fn test_bind_fills_defaults_and_keeps_extras() {
        let skill = command_skill(vec![CommandStep::Line("echo hi".to_string())])
            .with_parameter(ParameterSpec::required("host"))
            .with_parameter(ParameterSpec::optional("port").with_default(json!(8080)));

        let bound = bind_parameters(&skill, &params(&[("host", json!("db1")), ("extra", json!("x"))]))
            .unwrap();
        assert_eq!(bound["host"], json!("db1"));
        assert_eq!(bound["port"], json!(8080));
        assert_eq!(bound["extra"], json!("x"));

        let err = bind_parameters(&skill, &HashMap::new()).unwrap_err();
        assert!(err.to_string().contains("Required parameter missing: host"));
    }

    #[tokio::test]
    async fn test_execute_reports_missing_parameter() {
        let temp = TempDir::new().unwrap();
        let skill = command_skill(vec![CommandStep::Line("echo ${environment}".to_string())])
            .with_parameter(ParameterSpec::required("environment"));

        let result = executor_for(temp.path()).execute(&skill, &HashMap::new()).await;
        assert!(!result.success);
        assert_eq!(result.exit_code, 1);
        assert!(result
            .error
            .contains("Required parameter missing: environment"));
        assert!(result.output.is_empty());
    }

    #[tokio::test]
    async fn test_empty_command_list_is_a_noop() {
        let temp = TempDir::new().unwrap();
        let result = executor_for(temp.path())
            .execute(&command_skill(Vec::new()), &HashMap::new())
            .await;
        assert!(result.success);
        assert_eq!(result.exit_code, 0);
        assert!(result.output.is_empty());
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn test_execute_command_sequence_transcript() {
        let temp = TempDir::new().unwrap();
        let skill = command_skill(vec![
            CommandStep::Annotated {
                command: "echo first ${name}".to_string(),
                description: Some("Greet".to_string()),
            },
            CommandStep::Line("echo second".to_string()),
        ]);

        let result = executor_for(temp.path())
            .execute(&skill, &params(&[("name", json!("world"))]))
            .await;

        assert!(result.success, "unexpected failure: {}", result.error);
        assert_eq!(result.exit_code, 0);
        assert!(result.output.contains("# Greet"));
        assert!(result.output.contains("$ echo first world"));
        assert!(result.output.contains("first world"));
        assert!(result.output.contains("$ echo second"));
        assert!(result.duration > 0.0);
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn test_execute_fails_fast_on_command_failure() {
        let temp = TempDir::new().unwrap();
        let skill = command_skill(vec![
            CommandStep::Line("echo before".to_string()),
            CommandStep::Line("echo oops >&2 && exit 7".to_string()),
            CommandStep::Line("echo after".to_string()),
        ]);

        let result = executor_for(temp.path()).execute(&skill, &HashMap::new()).await;
        assert!(!result.success);
        assert_eq!(result.exit_code, 7);
        assert!(result.output.contains("$ echo before"));
        assert!(result.output.contains("before"));
        assert!(!result.output.contains("after"));
        assert!(result.error.contains("Command failed: echo oops"));
        assert!(result.error.contains("oops"));
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn test_command_timeout_stops_the_sequence() {
        let temp = TempDir::new().unwrap();
        let skill = command_skill(vec![
            CommandStep::Line("echo quick".to_string()),
            CommandStep::Line("sleep 5".to_string()),
        ]);

        let executor = SkillExecutor::new(&EngineConfig::new(temp.path()))
            .with_timeouts(Duration::from_secs(5), Duration::from_secs(1));
        let result = executor.execute(&skill, &HashMap::new()).await;

        assert!(!result.success);
        assert_eq!(result.exit_code, TIMEOUT_EXIT_CODE);
        assert!(result.error.contains("Command timeout: sleep 5"));
        assert!(result.output.contains("$ echo quick"));
        assert!(!result.output.contains("$ sleep"));
        assert!(result.duration >= 1.0);
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn test_script_runs_with_positional_args() {
        let temp = TempDir::new().unwrap();
        let config = EngineConfig::new(temp.path());
        let store = SkillStore::open(config.skills_dir()).unwrap();

        let skill = SkillDefinition::new(
            "deploy-status",
            "Report target",
            SkillBody::Script("#!/bin/sh\necho \"target: $1 mode: $2\"\n".to_string()),
        )
        .unwrap()
        .with_parameter(ParameterSpec::required("environment"))
        .with_parameter(ParameterSpec::optional("mode").with_default(json!("fast")));
        store.save(&skill).unwrap();

        let result = SkillExecutor::new(&config)
            .execute(&skill, &params(&[("environment", json!("prod"))]))
            .await;

        assert!(result.success, "unexpected failure: {}", result.error);
        assert!(result.output.contains("target: prod mode: fast"));
        assert_eq!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn test_missing_script_is_a_failed_result() {
        let temp = TempDir::new().unwrap();
        let skill = SkillDefinition::new(
            "ghost",
            "Never installed",
            SkillBody::Script("#!/bin/sh\necho hi\n".to_string()),
        )
        .unwrap();

        let result = executor_for(temp.path()).execute(&skill, &HashMap::new()).await;
        assert!(!result.success);
        assert_eq!(result.exit_code, 1);
        assert!(result.error.contains("Script not found"));
        assert!(result.error.contains("ghost.sh"));
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn test_script_timeout() {
        let temp = TempDir::new().unwrap();
        let config = EngineConfig::new(temp.path());
        let store = SkillStore::open(config.skills_dir()).unwrap();

        let skill = SkillDefinition::new(
            "slow",
            "Sleep forever",
            SkillBody::Script("#!/bin/sh\nsleep 5\n".to_string()),
        )
        .unwrap();
        store.save(&skill).unwrap();

        let executor = SkillExecutor::new(&config)
            .with_timeouts(Duration::from_secs(1), Duration::from_secs(5));
        let result = executor.execute(&skill, &HashMap::new()).await;

        assert!(!result.success);
        assert_eq!(result.exit_code, TIMEOUT_EXIT_CODE);
        assert!(result.error.contains("timed out after 1 seconds"));
        assert!(result.output.is_empty());
        assert!(result.duration >= 1.0);
    }

    #[test]
    fn test_dry_run_renders_commands() {
        let temp = TempDir::new().unwrap();
        let skill = command_skill(vec![
            CommandStep::Line("echo ${name}".to_string()),
            CommandStep::Line("echo $extra".to_string()),
        ])
        .with_parameter(ParameterSpec::optional("name").with_default(json!("default-name")));

        let rendered = executor_for(temp.path())
            .dry_run(&skill, &params(&[("extra", json!("boo"))]))
            .unwrap();
        assert_eq!(rendered, vec!["echo default-name", "echo boo"]);
    }

    #[test]
    fn test_dry_run_renders_script_line_and_validates() {
        let temp = TempDir::new().unwrap();
        let skill = SkillDefinition::new(
            "deploy-status",
            "Report target",
            SkillBody::Script("#!/bin/sh\necho hi\n".to_string()),
        )
        .unwrap()
        .with_parameter(ParameterSpec::required("environment"));

        let executor = executor_for(temp.path());
        let rendered = executor
            .dry_run(&skill, &params(&[("environment", json!("prod"))]))
            .unwrap();
        assert_eq!(rendered.len(), 1);
        assert!(rendered[0].contains("deploy-status.sh"));
        assert!(rendered[0].ends_with(" prod"));

        let err = executor.dry_run(&skill, &HashMap::new()).unwrap_err();
        assert!(matches!(err, ExecutionError::MissingParameter(_)));
    }
}
