use crate::config::DriverConfig;
use crate::element::UIElement;
use crate::errors::AutomationError;
use crate::selector::Selector;
use std::sync::Arc;

pub mod appium;

pub use appium::AppiumDriver;

/// The device-side capability everything else is built on.
///
/// Implementations hold one exclusive automation session; callers share it
/// through an `Arc` but never drive it from two places at once.
#[async_trait::async_trait]
pub trait AutomationDriver: Send + Sync {
    /// All elements matching a selector, in traversal order.
    /// No match is an empty list, not an error.
    async fn find_elements(&self, selector: &Selector) -> Result<Vec<UIElement>, AutomationError>;

    /// Visible text of an element
    async fn element_text(&self, element: &UIElement) -> Result<String, AutomationError>;

    /// Clear an editable element
    async fn clear(&self, element: &UIElement) -> Result<(), AutomationError>;

    /// Type text into an element
    async fn send_keys(&self, element: &UIElement, text: &str) -> Result<(), AutomationError>;

    /// Tap an element
    async fn click(&self, element: &UIElement) -> Result<(), AutomationError>;

    /// Launch (or bring to the foreground) an app by package identifier
    async fn activate_app(&self, app_id: &str) -> Result<(), AutomationError>;

    /// Start an app through a specific activity
    async fn start_activity(&self, app_id: &str, activity: &str) -> Result<(), AutomationError>;

    /// Terminate an app. Returns whether it was running.
    async fn terminate_app(&self, app_id: &str) -> Result<bool, AutomationError>;

    /// End the automation session
    async fn quit(&self) -> Result<(), AutomationError>;
}

/// Open a session against the configured Appium server
pub async fn create_driver(
    config: &DriverConfig,
) -> Result<Arc<dyn AutomationDriver>, AutomationError> {
    let driver = AppiumDriver::connect(config).await?;
    Ok(Arc::new(driver))
}
