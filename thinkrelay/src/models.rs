// Copyright 2026 The Thinkrelay Project
// SPDX-License-Identifier: Apache-2.0

// Installed-model listing.
//
// Runs an external command (default `ollama list`) through tokio's process
// support so a slow listing never stalls in-flight relays, then takes the
// first column of every line after the header.

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum ModelListError {
    #[error("model list command is empty")]
    EmptyCommand,

    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status}: {stderr}")]
    Failed {
        command: String,
        status: std::process::ExitStatus,
        stderr: String,
    },
}

/// Source of installed model names.
#[async_trait]
pub trait ModelLister: Send + Sync {
    async fn list_models(&self) -> Result<Vec<String>, ModelListError>;
}

/// Lists models by running a command and parsing its tabular output.
#[derive(Debug, Clone)]
pub struct CommandModelLister {
    command: Vec<String>,
}

impl CommandModelLister {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }

    fn display(&self) -> String {
        self.command.join(" ")
    }
}

impl Default for CommandModelLister {
    fn default() -> Self {
        Self::new(vec!["ollama".into(), "list".into()])
    }
}

#[async_trait]
impl ModelLister for CommandModelLister {
    async fn list_models(&self) -> Result<Vec<String>, ModelListError> {
        let (program, args) = self
            .command
            .split_first()
            .ok_or(ModelListError::EmptyCommand)?;

        let output = tokio::process::Command::new(program)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| ModelListError::Spawn {
                command: self.display(),
                source,
            })?;

        if !output.status.success() {
            return Err(ModelListError::Failed {
                command: self.display(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(parse_model_list(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Parse `ollama list` style output: skip the header row, keep the first
/// whitespace-separated column of each non-blank line.
pub fn parse_model_list(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .skip(1)
        .filter_map(|line| line.split_whitespace().next())
        .map(str::to_string)
        .collect()
}
