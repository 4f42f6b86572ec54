//! Backend errors
//!
//! State-changing commands surface failures as [`BackendError`]. A failed
//! transition wraps the triggering error in a [`TransitionError`] together
//! with what happened when the backend tried to undo its partial work.

/// Backend errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("Kernel module not found or unreadable")]
    UnknownKernelModule,

    #[error("Required tools are not available: {0}")]
    ToolsMissing(String),

    #[error("Quick tool exited with code {code}")]
    QuickTool { code: i32 },

    #[error("No configuration available for tunnel {0}")]
    MissingConfig(String),

    #[error("Shell error: {0}")]
    Shell(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl From<std::io::Error> for BackendError {
    fn from(e: std::io::Error) -> Self {
        BackendError::Io(e.to_string())
    }
}

/// Result of the compensating actions run after a failed step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RollbackOutcome {
    /// Nothing had been applied yet
    NotNeeded,
    /// Every compensating step succeeded
    Restored,
    /// These tunnels could not be restored; external state is unknown
    Failed { tunnels: Vec<String> },
}

impl RollbackOutcome {
    pub(crate) fn from_failures(tunnels: Vec<String>) -> Self {
        if tunnels.is_empty() {
            RollbackOutcome::Restored
        } else {
            RollbackOutcome::Failed { tunnels }
        }
    }

    pub fn is_consistent(&self) -> bool {
        !matches!(self, RollbackOutcome::Failed { .. })
    }
}

/// A failed state transition
///
/// `cause` is always the error that triggered the failure, never one raised
/// while rolling back.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{cause}{}", rollback_suffix(.rollback))]
pub struct TransitionError {
    #[source]
    pub cause: BackendError,
    pub rollback: RollbackOutcome,
}

impl TransitionError {
    pub fn new(cause: BackendError, rollback: RollbackOutcome) -> Self {
        Self { cause, rollback }
    }
}

impl From<BackendError> for TransitionError {
    fn from(cause: BackendError) -> Self {
        Self::new(cause, RollbackOutcome::NotNeeded)
    }
}

fn rollback_suffix(rollback: &RollbackOutcome) -> String {
    match rollback {
        RollbackOutcome::Failed { tunnels } => {
            format!(" (rollback failed for {})", tunnels.join(", "))
        }
        _ => String::new(),
    }
}
