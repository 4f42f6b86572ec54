//! Read-only queries
//!
//! Everything here asks the query tool about live state and never changes
//! it. Failures degrade to empty results or a [`HandshakeStatus`] variant.

use crate::error::BackendError;
use crate::handshake::HandshakeStatus;
use crate::poller::HandshakeSource;
use crate::settings::BackendSettings;
use crate::shell::{RootShell, ToolsInstaller};
use crate::statistics::Statistics;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Query tool front end shared by the backend and its poller
pub struct ShellQuery {
    shell: Arc<dyn RootShell>,
    tools: Arc<dyn ToolsInstaller>,
    settings: Arc<BackendSettings>,
}

impl ShellQuery {
    pub fn new(
        shell: Arc<dyn RootShell>,
        tools: Arc<dyn ToolsInstaller>,
        settings: Arc<BackendSettings>,
    ) -> Self {
        Self { shell, tools, settings }
    }

    /// Names of the interfaces the engine currently runs
    pub async fn running_tunnel_names(&self) -> BTreeSet<String> {
        if let Err(e) = self.tools.ensure_tools_available().await {
            warn!("Unable to check running tunnels: {}", e);
            return BTreeSet::new();
        }

        let command = format!("{} show interfaces", self.settings.tool);
        match self.shell.run(&command).await {
            Ok(output) if output.success() => output
                .stdout
                .first()
                .map(|line| line.split(' ').filter(|n| !n.is_empty()).map(str::to_string).collect())
                .unwrap_or_default(),
            Ok(output) => {
                debug!("{} exited with {}", command, output.code);
                BTreeSet::new()
            }
            Err(e) => {
                warn!("Unable to enumerate running tunnels: {}", e);
                BTreeSet::new()
            }
        }
    }

    pub async fn statistics(&self, name: &str) -> Statistics {
        let command = format!("{} show '{}' dump", self.settings.tool, name);
        match self.shell.run(&command).await {
            Ok(output) if output.success() => Statistics::parse_dump(&output.stdout),
            Ok(output) => {
                warn!("Statistics query for {} exited with {}", name, output.code);
                Statistics::new()
            }
            Err(e) => {
                warn!("Statistics query for {} failed: {}", name, e);
                Statistics::new()
            }
        }
    }

    pub async fn last_handshake(&self, name: &str) -> HandshakeStatus {
        if !self.running_tunnel_names().await.contains(name) {
            return HandshakeStatus::NotActive;
        }

        let command = format!("{} show '{}' latest-handshakes", self.settings.tool, name);
        let output = match self.shell.run(&command).await {
            Ok(output) => output,
            Err(e) => {
                warn!("Handshake query for {} failed: {}", name, e);
                return HandshakeStatus::QueryFailed;
            }
        };
        if !output.success() || output.stdout.is_empty() {
            debug!("Handshake query for {} returned nothing (exit {})", name, output.code);
            return HandshakeStatus::QueryFailed;
        }

        HandshakeStatus::parse_latest_handshakes(&output.stdout)
    }

    /// Version string of the loaded kernel module
    pub async fn version(&self) -> Result<String, BackendError> {
        let command = format!("cat {}", self.settings.module_version_path().display());
        let output = self.shell.run(&command).await?;
        match output.stdout.first() {
            Some(version) if output.success() && !version.trim().is_empty() => {
                Ok(version.trim().to_string())
            }
            _ => Err(BackendError::UnknownKernelModule),
        }
    }
}

#[async_trait]
impl HandshakeSource for ShellQuery {
    async fn last_handshake(&self, name: &str) -> HandshakeStatus {
        ShellQuery::last_handshake(self, name).await
    }
}
