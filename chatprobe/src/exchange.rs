use crate::config::{CapturePolicy, Timings};
use crate::errors::AutomationError;
use crate::interaction::Interactor;
use crate::locator::ElementLocator;
use crate::profile::ElementRole;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Runs one prompt → response cycle against the foreground app.
///
/// Message bookkeeping belongs to the caller; this only reports what the bot
/// said, if anything.
pub struct ExchangeDriver {
    locator: ElementLocator,
    interactor: Interactor,
    capture: CapturePolicy,
    timings: Timings,
}

impl ExchangeDriver {
    pub fn new(
        locator: ElementLocator,
        interactor: Interactor,
        capture: CapturePolicy,
        timings: Timings,
    ) -> Self {
        Self {
            locator,
            interactor,
            capture,
            timings,
        }
    }

    /// Deliver a prompt and capture the reply.
    ///
    /// `Ok(None)` covers every recoverable failure along the way (missing
    /// widgets, stale elements, no reply). `Err` is reserved for failures
    /// that make further exchanges pointless, such as a lost driver session.
    #[instrument(level = "debug", skip(self, prompt), fields(app = %self.locator.profile().name))]
    pub async fn exchange(&self, prompt: &str) -> Result<Option<String>, AutomationError> {
        match self.deliver_and_capture(prompt).await {
            Ok(Some(response)) => {
                debug!(chars = response.len(), "Captured bot response");
                Ok(Some(response))
            }
            Ok(None) => {
                warn!("No bot response captured");
                Ok(None)
            }
            Err(e) if e.is_recoverable() => {
                warn!("Exchange failed: {}", e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn deliver_and_capture(&self, prompt: &str) -> Result<Option<String>, AutomationError> {
        let before = match self.capture {
            CapturePolicy::AwaitChange => self.latest_message_text().await?,
            CapturePolicy::FixedDelay => None,
        };

        let input = self.locator.locate(ElementRole::ChatInput).await?;
        self.interactor.type_into(&input, prompt).await?;

        let send = self.locator.locate(ElementRole::SendControl).await?;
        self.interactor.tap(&send).await?;
        info!("Prompt sent, waiting for the bot to answer");
        self.interactor.settle(self.timings.send_settle).await;

        match self.capture {
            CapturePolicy::FixedDelay => {
                let latest = self.locator.locate(ElementRole::LatestBotMessage).await?;
                let text = self.interactor.read_text(&latest).await?;
                Ok(non_blank(text))
            }
            CapturePolicy::AwaitChange => self.await_new_content(prompt, before).await,
        }
    }

    /// Text of the newest message right now, without waiting
    async fn latest_message_text(&self) -> Result<Option<String>, AutomationError> {
        match self.locator.locate_now(ElementRole::LatestBotMessage).await? {
            Some(element) => match self.interactor.read_text(&element).await {
                Ok(text) => Ok(non_blank(text)),
                Err(e) if e.is_recoverable() => Ok(None),
                Err(e) => Err(e),
            },
            None => Ok(None),
        }
    }

    /// Poll until the newest message is neither the pre-send snapshot nor an
    /// echo of the prompt itself.
    async fn await_new_content(
        &self,
        prompt: &str,
        before: Option<String>,
    ) -> Result<Option<String>, AutomationError> {
        let deadline = Instant::now() + self.timings.response_timeout;
        loop {
            if let Some(text) = self.latest_message_text().await? {
                if before.as_deref() != Some(text.as_str()) && text.trim() != prompt.trim() {
                    return Ok(Some(text));
                }
            }
            let now = Instant::now();
            if now >= deadline {
                debug!(
                    "Latest message unchanged after {:?}",
                    self.timings.response_timeout
                );
                return Ok(None);
            }
            tokio::time::sleep(
                self.timings
                    .poll_interval
                    .max(MIN_POLL_INTERVAL)
                    .min(deadline - now),
            )
            .await;
        }
    }
}

fn non_blank(text: String) -> Option<String> {
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}
