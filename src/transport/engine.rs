//! Child-process realization of [`LocalCommands`].
//!
//! Readiness is checked against the local model runtime (`<runtime> list`
//! must mention the required model). Every other operation runs
//! `<engine> <operation>` with JSON arguments on stdin and expects JSON on
//! stdout. A non-zero exit surfaces the engine's stderr verbatim.
//!
//! Commands may carry leading arguments (`python3 engine.py`); they are split
//! on whitespace and passed argv-style, never through a shell.

use std::process::Stdio;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::local::{LocalCommands, QuestionsArgs, SaveQuestionsArgs, SaveSwotArgs, SwotArgs};

#[derive(Debug, Clone)]
pub struct ProcessEngine {
    engine_command: String,
    runtime_command: String,
    required_model: String,
}

impl ProcessEngine {
    pub fn new(engine_command: &str, runtime_command: &str, required_model: &str) -> Self {
        Self {
            engine_command: engine_command.to_string(),
            runtime_command: runtime_command.to_string(),
            required_model: required_model.to_string(),
        }
    }

    async fn run<A, T>(&self, operation: &str, args: &A) -> Result<T, String>
    where
        A: Serialize + Sync,
        T: DeserializeOwned,
    {
        let payload = serde_json::to_vec(args)
            .map_err(|e| format!("Failed to encode {operation} arguments: {e}"))?;

        let mut child = command(&self.engine_command)
            .arg(operation)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                format!(
                    "Failed to start generation engine '{}': {e}",
                    self.engine_command
                )
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&payload)
                .await
                .map_err(|e| format!("Failed to write {operation} arguments: {e}"))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| format!("Failed to wait for generation engine: {e}"))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(if stderr.is_empty() {
                format!("{operation} exited with {}", output.status)
            } else {
                stderr
            });
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| format!("Failed to parse engine output for {operation}: {e}"))
    }
}

fn command(spec: &str) -> Command {
    let mut parts = spec.split_whitespace();
    let mut cmd = Command::new(parts.next().unwrap_or_default());
    cmd.args(parts);
    cmd
}

#[async_trait::async_trait]
impl LocalCommands for ProcessEngine {
    async fn check_readiness(&self) -> Result<String, String> {
        let output = command(&self.runtime_command)
            .arg("list")
            .output()
            .await
            .map_err(|e| {
                format!(
                    "{} not found. Please install {} first: {e}",
                    self.runtime_command, self.runtime_command
                )
            })?;

        if !output.status.success() {
            return Err(format!(
                "{} is not running. Please start the {} service.",
                self.runtime_command, self.runtime_command
            ));
        }

        let models = String::from_utf8_lossy(&output.stdout);
        if !models.contains(&self.required_model) {
            return Err(format!(
                "{} model not found. Please run '{} pull {}' first.",
                self.required_model, self.runtime_command, self.required_model
            ));
        }

        Ok(format!(
            "{} is ready with {} model",
            self.runtime_command, self.required_model
        ))
    }

    async fn generate_questions(&self, args: &QuestionsArgs) -> Result<Vec<String>, String> {
        self.run("generate-questions", args).await
    }

    async fn generate_swot(&self, args: &SwotArgs) -> Result<String, String> {
        self.run("generate-swot", args).await
    }

    async fn save_questions_as_artifact(&self, args: &SaveQuestionsArgs) -> Result<(), String> {
        self.run::<_, serde_json::Value>("save-questions", args)
            .await
            .map(|_| ())
    }

    async fn save_swot_as_artifact(&self, args: &SaveSwotArgs) -> Result<(), String> {
        self.run::<_, serde_json::Value>("save-swot", args)
            .await
            .map(|_| ())
    }
}
