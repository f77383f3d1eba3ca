//! Black-box conversation harness for mobile chatbot apps
//!
//! Drives third-party chat apps through an Appium server: finds their chat
//! widgets through fallback selector chains, sends a scripted list of prompts,
//! captures whatever the bot answers and collects the exchanges into
//! timestamped transcripts.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

pub mod config;
pub mod driver;
pub mod element;
pub mod errors;
pub mod exchange;
pub mod interaction;
pub mod locator;
pub mod profile;
pub mod prompts;
pub mod selector;
pub mod session;
#[cfg(test)]
mod tests;
pub mod transcript;

pub use config::{CapturePolicy, DriverConfig, HarnessConfig, Timings};
pub use driver::{AppiumDriver, AutomationDriver};
pub use element::UIElement;
pub use errors::AutomationError;
pub use exchange::ExchangeDriver;
pub use interaction::Interactor;
pub use locator::{ElementLocator, Locator, MatchPick};
pub use profile::{AppProfile, ElementRole, OnboardingPolicy};
pub use prompts::{load_prompts, read_prompts, Prompt};
pub use selector::Selector;
pub use session::{SessionReport, SessionRunner, SessionState};
pub use transcript::{Conversation, Message, Role, TestSession, TranscriptFiles};

/// An app whose session ended early
#[derive(Debug)]
pub struct SessionFailure {
    pub app_name: String,
    pub error: AutomationError,
}

/// Everything one harness run produced: the transcripts to persist and the
/// sessions that did not run to completion.
#[derive(Debug)]
pub struct RunReport {
    pub session: TestSession,
    pub failures: Vec<SessionFailure>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// The main entry point: one driver session, many apps tested in turn
pub struct Harness {
    driver: Arc<dyn AutomationDriver>,
    config: HarnessConfig,
    cancel: CancellationToken,
}

impl Harness {
    /// Connect to the Appium server named in the configuration
    #[instrument(skip(config), fields(server = %config.driver.server_url))]
    pub async fn connect(config: HarnessConfig) -> Result<Self, AutomationError> {
        let driver = driver::create_driver(&config.driver).await?;
        Ok(Self::with_driver(driver, config))
    }

    /// Build a harness around an existing driver session
    pub fn with_driver(driver: Arc<dyn AutomationDriver>, config: HarnessConfig) -> Self {
        Self {
            driver,
            config,
            cancel: CancellationToken::new(),
        }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Token that stops the run between prompts and between apps
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Ad-hoc locator over the shared driver session
    pub fn locator<S: Into<Selector>>(&self, strategies: impl IntoIterator<Item = S>) -> Locator {
        Locator::new(self.driver.clone(), strategies)
            .set_default_timeout(self.config.timings.locate_timeout)
            .poll_every(self.config.timings.poll_interval)
    }

    /// Run the prompts against every configured app, strictly one after another.
    ///
    /// Apps skipped after cancellation have no conversation and are not
    /// listed as failures; check the cancellation token for that case.
    pub async fn run(&self, prompts: &[Prompt]) -> RunReport {
        let mut runner = SessionRunner::new(
            self.driver.clone(),
            self.config.timings.clone(),
            self.config.capture,
            self.cancel.clone(),
        );

        let mut conversations = Vec::with_capacity(self.config.apps.len());
        let mut failures = Vec::new();
        for profile in &self.config.apps {
            if self.cancel.is_cancelled() {
                warn!("Run cancelled, skipping {}", profile.name);
                continue;
            }
            let report = runner.run(profile, prompts).await;
            if let Some(error) = report.error {
                failures.push(SessionFailure {
                    app_name: profile.name.clone(),
                    error,
                });
            }
            conversations.push(report.conversation);
        }

        info!(
            "Collected {} conversations, {} ended early",
            conversations.len(),
            failures.len()
        );
        RunReport {
            session: TestSession::aggregate(conversations),
            failures,
        }
    }

    /// End the driver session
    pub async fn shutdown(&self) -> Result<(), AutomationError> {
        self.driver.quit().await
    }
}
