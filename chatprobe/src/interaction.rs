use crate::driver::AutomationDriver;
use crate::element::UIElement;
use crate::errors::AutomationError;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

/// Single UI actions against a resolved element.
///
/// Nothing here retries. Recoverable driver failures surface as
/// `InteractionFailed`; a lost session passes through untouched.
#[derive(Clone)]
pub struct Interactor {
    driver: Arc<dyn AutomationDriver>,
    focus_settle: Duration,
}

impl Interactor {
    pub fn new(driver: Arc<dyn AutomationDriver>, focus_settle: Duration) -> Self {
        Self {
            driver,
            focus_settle,
        }
    }

    /// Fixed pause standing in for a readiness signal the apps don't expose
    pub async fn settle(&self, duration: Duration) {
        if duration.is_zero() {
            return;
        }
        debug!("Settling for {:?}", duration);
        tokio::time::sleep(duration).await;
    }

    /// Clear the field, type the text, then let focus/IME animations finish
    #[instrument(level = "debug", skip(self, text), fields(element = %element.id()))]
    pub async fn type_into(&self, element: &UIElement, text: &str) -> Result<(), AutomationError> {
        self.driver
            .clear(element)
            .await
            .map_err(|e| interaction_error("clear", element, e))?;
        self.driver
            .send_keys(element, text)
            .await
            .map_err(|e| interaction_error("type", element, e))?;
        self.settle(self.focus_settle).await;
        Ok(())
    }

    #[instrument(level = "debug", skip(self), fields(element = %element.id()))]
    pub async fn tap(&self, element: &UIElement) -> Result<(), AutomationError> {
        self.driver
            .click(element)
            .await
            .map_err(|e| interaction_error("tap", element, e))
    }

    pub async fn read_text(&self, element: &UIElement) -> Result<String, AutomationError> {
        self.driver
            .element_text(element)
            .await
            .map_err(|e| interaction_error("read", element, e))
    }
}

fn interaction_error(action: &str, element: &UIElement, e: AutomationError) -> AutomationError {
    if e.is_recoverable() {
        AutomationError::InteractionFailed(format!("{action} on {}: {e}", element.id()))
    } else {
        e
    }
}
