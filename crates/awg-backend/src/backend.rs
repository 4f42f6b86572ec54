//! Quick-tool backend
//!
//! Moves tunnels between up and down by handing rendered config files to
//! the quick tool. Unless multi-tunnel mode is enabled, bringing a tunnel up
//! first tears down every other tunnel this backend started. When a step
//! fails part way through, the backend puts back what it changed before
//! returning the error.
//!
//! Liveness is never cached: every transition starts by asking the query
//! tool which interfaces are running.

use crate::error::{BackendError, RollbackOutcome, TransitionError};
use crate::handshake::HandshakeStatus;
use crate::poller::{StatusCallback, StatusPoller};
use crate::query::ShellQuery;
use crate::settings::BackendSettings;
use crate::shell::{ProcessShell, RootShell, ShellToolsCheck, ToolsInstaller};
use crate::statistics::Statistics;
use crate::tunnel::{Tunnel, TunnelState};
use awg_config::Config;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{error, info, warn};

/// A tunnel this backend brought up and the config it was brought up with
#[derive(Clone)]
struct RunningTunnel {
    tunnel: Arc<dyn Tunnel>,
    config: Arc<Config>,
}

/// Tunnel orchestrator backed by `awg` / `awg-quick`
pub struct AwgQuickBackend {
    shell: Arc<dyn RootShell>,
    tools: Arc<dyn ToolsInstaller>,
    query: Arc<ShellQuery>,
    settings: Arc<BackendSettings>,
    running: HashMap<String, RunningTunnel>,
    current: Option<String>,
    poller: StatusPoller,
    status_callback: Option<Arc<dyn StatusCallback>>,
    multiple_tunnels: bool,
}

impl AwgQuickBackend {
    pub fn new(
        shell: Arc<dyn RootShell>,
        tools: Arc<dyn ToolsInstaller>,
        settings: BackendSettings,
    ) -> Self {
        let settings = Arc::new(settings);
        let query = Arc::new(ShellQuery::new(shell.clone(), tools.clone(), settings.clone()));
        let poller = StatusPoller::new(query.clone(), settings.poll_interval());

        Self {
            shell,
            tools,
            query,
            multiple_tunnels: settings.multiple_tunnels,
            settings,
            running: HashMap::new(),
            current: None,
            poller,
            status_callback: None,
        }
    }

    /// Backend that runs commands through the configured privileged shell
    pub fn with_process_shell(settings: BackendSettings) -> Self {
        let shell: Arc<dyn RootShell> = Arc::new(ProcessShell::from_settings(&settings));
        let tools: Arc<dyn ToolsInstaller> = Arc::new(ShellToolsCheck::new(shell.clone(), &settings));
        Self::new(shell, tools, settings)
    }

    pub fn settings(&self) -> &BackendSettings {
        &self.settings
    }

    pub fn set_multiple_tunnels(&mut self, enabled: bool) {
        info!("Multiple tunnels {}", if enabled { "enabled" } else { "disabled" });
        self.multiple_tunnels = enabled;
    }

    pub fn multiple_tunnels(&self) -> bool {
        self.multiple_tunnels
    }

    /// Register the sink for "connected" events. Pollers started after this
    /// call deliver to it.
    pub fn set_status_callback(&mut self, callback: Arc<dyn StatusCallback>) {
        self.status_callback = Some(callback);
    }

    /// Most recently activated tunnel, if still up
    pub fn current_tunnel(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Config a running tunnel was last brought up with
    pub fn running_config(&self, name: &str) -> Option<Arc<Config>> {
        self.running.get(name).map(|r| r.config.clone())
    }

    pub fn is_polling(&self) -> bool {
        self.poller.is_running()
    }

    pub async fn get_running_tunnel_names(&self) -> BTreeSet<String> {
        self.query.running_tunnel_names().await
    }

    pub async fn get_state(&self, tunnel: &dyn Tunnel) -> TunnelState {
        if self.get_running_tunnel_names().await.contains(tunnel.name()) {
            TunnelState::Up
        } else {
            TunnelState::Down
        }
    }

    pub async fn get_statistics(&self, tunnel: &dyn Tunnel) -> Statistics {
        self.query.statistics(tunnel.name()).await
    }

    pub async fn get_last_handshake(&self, tunnel: &dyn Tunnel) -> HandshakeStatus {
        self.query.last_handshake(tunnel.name()).await
    }

    pub async fn get_version(&self) -> Result<String, BackendError> {
        self.query.version().await
    }

    pub fn has_kernel_support(&self) -> bool {
        self.settings.module_dir.exists()
    }

    /// Move `tunnel` to `requested`.
    ///
    /// `config` is required to bring a tunnel up unless it is already running
    /// under a config this backend knows. Returns the state actually reached.
    pub async fn set_state(
        &mut self,
        tunnel: &Arc<dyn Tunnel>,
        requested: TunnelState,
        config: Option<Arc<Config>>,
    ) -> Result<TunnelState, TransitionError> {
        let name = tunnel.name().to_string();
        let was_up = self.get_running_tunnel_names().await.contains(&name);
        let original = if was_up { TunnelState::Up } else { TunnelState::Down };
        let state = requested.resolve(was_up);
        let original_config = self.running_config(&name);

        info!("Changing tunnel {} to state {} (currently {})", name, state, original);

        if state == TunnelState::Down {
            if original == TunnelState::Down {
                return Ok(state);
            }
            let down_config = original_config
                .or(config)
                .ok_or_else(|| BackendError::MissingConfig(name.clone()))?;
            self.set_state_internal(tunnel, &down_config, TunnelState::Down).await?;
            return Ok(state);
        }

        let config = config
            .or_else(|| original_config.clone())
            .ok_or_else(|| BackendError::MissingConfig(name.clone()))?;
        if original == TunnelState::Up
            && original_config.as_ref().is_some_and(|c| Arc::ptr_eq(c, &config))
        {
            return Ok(state);
        }

        self.tools.ensure_tools_available().await?;

        let mut torn_down: Vec<RunningTunnel> = Vec::new();
        if !self.multiple_tunnels && original == TunnelState::Down {
            let mut others: Vec<(String, RunningTunnel)> = self
                .running
                .iter()
                .filter(|(other, _)| **other != name)
                .map(|(other, running)| (other.clone(), running.clone()))
                .collect();
            others.sort_by(|a, b| a.0.cmp(&b.0));

            for (other, running) in others {
                info!("Stopping {} before starting {}", other, name);
                if let Err(e) = self
                    .set_state_internal(&running.tunnel, &running.config, TunnelState::Down)
                    .await
                {
                    error!("Failed to stop {}: {}", other, e);
                    let failed = self.restore(&torn_down).await;
                    return Err(TransitionError::new(e, rollback_outcome(&torn_down, failed)));
                }
                torn_down.push(running);
            }
        }

        if original == TunnelState::Up {
            let down_config = original_config.clone().unwrap_or_else(|| config.clone());
            if let Err(e) = self.set_state_internal(tunnel, &down_config, TunnelState::Down).await {
                error!("Failed to stop {} for reconfiguration: {}", name, e);
                let failed = self.restore(&torn_down).await;
                return Err(TransitionError::new(e, rollback_outcome(&torn_down, failed)));
            }
        }

        if let Err(e) = self.set_state_internal(tunnel, &config, TunnelState::Up).await {
            error!("Failed to start {}: {}", name, e);

            let mut attempted = !torn_down.is_empty();
            let mut failed = Vec::new();
            if let (TunnelState::Up, Some(previous)) = (original, &original_config) {
                attempted = true;
                if let Err(restore_err) =
                    self.set_state_internal(tunnel, previous, TunnelState::Up).await
                {
                    warn!("Failed to restore {} with its previous config: {}", name, restore_err);
                    failed.push(name.clone());
                }
            }
            failed.extend(self.restore(&torn_down).await);

            let rollback = if attempted {
                RollbackOutcome::from_failures(failed)
            } else {
                RollbackOutcome::NotNeeded
            };
            return Err(TransitionError::new(e, rollback));
        }

        Ok(state)
    }

    /// Apply one transition through the quick tool without any policy.
    ///
    /// The rendered config is written to `<temp_dir>/<name>.conf` and removed
    /// afterwards whatever the outcome. `Toggle` resolves against the
    /// tunnels this backend has brought up.
    pub async fn set_state_internal(
        &mut self,
        tunnel: &Arc<dyn Tunnel>,
        config: &Arc<Config>,
        state: TunnelState,
    ) -> Result<(), BackendError> {
        let name = tunnel.name().to_string();
        let state = state.resolve(self.running.contains_key(&name));

        tokio::fs::create_dir_all(&self.settings.temp_dir).await?;
        let path = self.settings.temp_dir.join(format!("{name}.conf"));
        tokio::fs::write(&path, config.to_awg_quick_string()).await?;

        let mut command = format!(
            "{} {} '{}'",
            self.settings.quick_tool,
            state,
            path.display()
        );
        if state == TunnelState::Up {
            command = format!("cat {} && {}", self.settings.module_version_path().display(), command);
        }

        let result = self.shell.run(&command).await;
        if let Err(e) = tokio::fs::remove_file(&path).await {
            warn!("Failed to remove {}: {}", path.display(), e);
        }

        let output = result?;
        if !output.success() {
            return Err(BackendError::QuickTool { code: output.code });
        }

        match state {
            TunnelState::Up => {
                self.running.insert(
                    name.clone(),
                    RunningTunnel {
                        tunnel: tunnel.clone(),
                        config: config.clone(),
                    },
                );
                self.current = Some(name.clone());
                self.poller.start(name.clone(), self.status_callback.clone());
            }
            _ => {
                self.running.remove(&name);
                // Only the current tunnel owns the poller
                if self.current.as_deref() == Some(name.as_str()) {
                    self.poller.stop();
                    self.current = None;
                }
            }
        }

        info!("Tunnel {} is {}", name, state);
        tunnel.on_state_change(state);
        Ok(())
    }

    /// Bring previously torn-down tunnels back up, returning the names that
    /// could not be restored
    async fn restore(&mut self, tunnels: &[RunningTunnel]) -> Vec<String> {
        let mut failed = Vec::new();
        for running in tunnels {
            if let Err(e) = self
                .set_state_internal(&running.tunnel, &running.config, TunnelState::Up)
                .await
            {
                warn!("Failed to restore {}: {}", running.tunnel.name(), e);
                failed.push(running.tunnel.name().to_string());
            }
        }
        failed
    }
}

fn rollback_outcome(torn_down: &[RunningTunnel], failed: Vec<String>) -> RollbackOutcome {
    if torn_down.is_empty() {
        RollbackOutcome::NotNeeded
    } else {
        RollbackOutcome::from_failures(failed)
    }
}
