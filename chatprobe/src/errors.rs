use thiserror::Error;

#[derive(Error, Debug)]
pub enum AutomationError {
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Interaction failed: {0}")]
    InteractionFailed(String),

    #[error("Failed to launch app: {0}")]
    AppLaunchFailed(String),

    #[error("Failed to load prompts: {0}")]
    InputLoadFailed(String),

    #[error("Failed to initialize driver session: {0}")]
    DriverInitFailed(String),

    #[error("Driver session lost: {0}")]
    DriverDisconnected(String),

    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("Run cancelled: {0}")]
    Cancelled(String),

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AutomationError {
    /// Whether a single exchange can shrug this off and let the session
    /// move on to the next prompt.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AutomationError::ElementNotFound(_)
                | AutomationError::InteractionFailed(_)
                | AutomationError::Timeout(_)
                | AutomationError::InvalidSelector(_)
        )
    }
}
