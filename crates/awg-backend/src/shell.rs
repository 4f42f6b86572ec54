//! Privileged Shell
//!
//! The backend never spawns processes itself; it hands complete command
//! lines to a [`RootShell`]. Tests substitute a scripted shell.

use crate::error::BackendError;
use crate::settings::BackendSettings;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::process::Command;
use tracing::debug;

/// Exit code and captured stdout of one command line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShellOutput {
    pub code: i32,
    pub stdout: Vec<String>,
}

impl ShellOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// Runs a command line with elevated privileges
#[async_trait]
pub trait RootShell: Send + Sync {
    /// Run `command` to completion and capture its stdout lines.
    ///
    /// `Err` means the command could not be run at all; a command that ran
    /// and failed is reported through [`ShellOutput::code`].
    async fn run(&self, command: &str) -> Result<ShellOutput, BackendError>;
}

/// Makes sure the query and quick tools can be invoked
#[async_trait]
pub trait ToolsInstaller: Send + Sync {
    async fn ensure_tools_available(&self) -> Result<(), BackendError>;
}

/// [`RootShell`] that runs `<program> <args...> <command>` as a subprocess
#[derive(Debug, Clone)]
pub struct ProcessShell {
    program: String,
    args: Vec<String>,
}

impl ProcessShell {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn from_settings(settings: &BackendSettings) -> Self {
        Self::new(settings.shell_program.clone(), settings.shell_args.clone())
    }
}

#[async_trait]
impl RootShell for ProcessShell {
    async fn run(&self, command: &str) -> Result<ShellOutput, BackendError> {
        debug!("exec: {} {} {:?}", self.program, self.args.join(" "), command);

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(command)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| BackendError::Shell(format!("failed to spawn {}: {e}", self.program)))?;

        let code = output.status.code().unwrap_or(-1);
        let stdout = String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::to_string)
            .collect();

        debug!("exit={code}");
        Ok(ShellOutput { code, stdout })
    }
}

/// [`ToolsInstaller`] for systems where the tools are preinstalled:
/// verifies they resolve on the shell's `PATH`
pub struct ShellToolsCheck {
    shell: Arc<dyn RootShell>,
    tools: Vec<String>,
}

impl ShellToolsCheck {
    pub fn new(shell: Arc<dyn RootShell>, settings: &BackendSettings) -> Self {
        Self {
            shell,
            tools: vec![settings.tool.clone(), settings.quick_tool.clone()],
        }
    }
}

#[async_trait]
impl ToolsInstaller for ShellToolsCheck {
    async fn ensure_tools_available(&self) -> Result<(), BackendError> {
        for tool in &self.tools {
            let output = self.shell.run(&format!("command -v '{tool}'")).await?;
            if !output.success() {
                return Err(BackendError::ToolsMissing(tool.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_process_shell_captures_stdout_and_code() {
        let shell = ProcessShell::new("sh", vec!["-c".to_string()]);

        let output = shell.run("echo one; echo two").await.unwrap();
        assert!(output.success());
        assert_eq!(output.stdout, vec!["one", "two"]);

        let failed = shell.run("exit 3").await.unwrap();
        assert_eq!(failed.code, 3);
    }

    #[tokio::test]
    async fn test_process_shell_missing_program() {
        let shell = ProcessShell::new("/nonexistent/shell", vec![]);
        assert!(matches!(shell.run("true").await, Err(BackendError::Shell(_))));
    }

    #[tokio::test]
    async fn test_tools_check_reports_missing_tool() {
        let shell: Arc<dyn RootShell> = Arc::new(ProcessShell::new("sh", vec!["-c".to_string()]));
        let settings = BackendSettings {
            tool: "sh".to_string(),
            quick_tool: "definitely-not-a-real-tool-7f3a".to_string(),
            ..BackendSettings::default()
        };

        let check = ShellToolsCheck::new(shell, &settings);
        assert_eq!(
            check.ensure_tools_available().await,
            Err(BackendError::ToolsMissing("definitely-not-a-real-tool-7f3a".to_string()))
        );
    }
}
