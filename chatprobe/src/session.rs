use crate::config::{CapturePolicy, Timings};
use crate::driver::AutomationDriver;
use crate::errors::AutomationError;
use crate::exchange::ExchangeDriver;
use crate::interaction::Interactor;
use crate::locator::{ElementLocator, Locator};
use crate::profile::{AppProfile, ElementRole, OnboardingPolicy};
use crate::prompts::Prompt;
use crate::transcript::{timestamp_now, Conversation, Message, SessionIdGenerator};
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Lifecycle of one app session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NotLaunched,
    Launched,
    OnboardingDismissed,
    SkipOnboarding,
    Exchanging,
    Terminating,
    Done,
}

/// Outcome of one app session: the (possibly partial) conversation and the
/// error that ended it early, if any.
#[derive(Debug)]
pub struct SessionReport {
    pub conversation: Conversation,
    pub error: Option<AutomationError>,
}

impl SessionReport {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Drives the whole prompt list through one app at a time.
///
/// The runner is the only holder of the driver session while an app is under
/// test, and every `run` ends with exactly one teardown of that app.
pub struct SessionRunner {
    driver: Arc<dyn AutomationDriver>,
    timings: Timings,
    capture: CapturePolicy,
    cancel: CancellationToken,
    ids: SessionIdGenerator,
    state: SessionState,
}

impl SessionRunner {
    pub fn new(
        driver: Arc<dyn AutomationDriver>,
        timings: Timings,
        capture: CapturePolicy,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            driver,
            timings,
            capture,
            cancel,
            ids: SessionIdGenerator::new(),
            state: SessionState::NotLaunched,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    fn transition(&mut self, next: SessionState) {
        debug!("Session state {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Test one app end to end.
    ///
    /// Never fails outright: launch errors, a lost driver or cancellation end
    /// the exchange loop early and are handed back in the report alongside
    /// the partial conversation, after teardown.
    #[instrument(skip(self, profile, prompts), fields(app = %profile.name))]
    pub async fn run(&mut self, profile: &AppProfile, prompts: &[Prompt]) -> SessionReport {
        info!("Starting {} automation ({} prompts)", profile.name, prompts.len());
        self.transition(SessionState::NotLaunched);

        let session_id = self.ids.next(&profile.name);
        let start_time = timestamp_now();
        let mut messages = Vec::with_capacity(prompts.len() * 2);

        let error = self.drive(profile, prompts, &mut messages).await.err();
        if let Some(e) = &error {
            error!("Error in {} automation: {}", profile.name, e);
        }
        let end_time = timestamp_now();

        self.transition(SessionState::Terminating);
        self.teardown(profile).await;
        self.transition(SessionState::Done);

        let conversation = Conversation {
            app_name: profile.name.clone(),
            session_id,
            start_time,
            end_time,
            messages,
        };
        info!(
            "Finished {} automation: {} messages",
            profile.name,
            conversation.messages.len()
        );
        SessionReport {
            conversation,
            error,
        }
    }

    async fn drive(
        &mut self,
        profile: &AppProfile,
        prompts: &[Prompt],
        messages: &mut Vec<Message>,
    ) -> Result<(), AutomationError> {
        let interactor = Interactor::new(self.driver.clone(), self.timings.focus_settle);
        let locator = ElementLocator::new(
            self.driver.clone(),
            profile.clone(),
            self.timings.locate_timeout,
            self.timings.poll_interval,
        );

        self.launch(profile).await?;
        self.transition(SessionState::Launched);
        self.pause(profile.warmup).await?;

        match profile.onboarding {
            OnboardingPolicy::Dismiss => {
                let dismissed = self.dismiss_onboarding(&locator, &interactor).await;
                info!("Dismissed {} onboarding controls", dismissed);
                self.transition(SessionState::OnboardingDismissed);
            }
            OnboardingPolicy::Skip => self.transition(SessionState::SkipOnboarding),
        }

        self.transition(SessionState::Exchanging);
        let exchange =
            ExchangeDriver::new(locator, interactor, self.capture, self.timings.clone());

        for (index, prompt) in prompts.iter().enumerate() {
            if self.cancel.is_cancelled() {
                return Err(AutomationError::Cancelled(format!(
                    "stopped before prompt {} of {}",
                    index + 1,
                    prompts.len()
                )));
            }
            info!("Prompt {}/{}", index + 1, prompts.len());

            let sent_at = timestamp_now();
            let response = exchange.exchange(&prompt.text).await?;

            messages.push(Message::user(prompt.text.clone(), sent_at));
            match response {
                Some(text) => messages.push(Message::bot(text, timestamp_now())),
                None => warn!("No response recorded for prompt {}", index + 1),
            }

            if index + 1 < prompts.len() {
                self.pause(self.timings.inter_prompt).await?;
            }
        }
        Ok(())
    }

    async fn launch(&self, profile: &AppProfile) -> Result<(), AutomationError> {
        let launched = match &profile.activity {
            Some(activity) => {
                debug!("Starting {}/{}", profile.package, activity);
                self.driver.start_activity(&profile.package, activity).await
            }
            None => self.driver.activate_app(&profile.package).await,
        };
        launched.map_err(|e| match e {
            AutomationError::AppLaunchFailed(_) | AutomationError::DriverDisconnected(_) => e,
            other => AutomationError::AppLaunchFailed(format!("{}: {other}", profile.package)),
        })
    }

    /// Tap every known dismiss control that happens to be on screen.
    /// Absent controls are expected and ignored.
    async fn dismiss_onboarding(&self, locator: &ElementLocator, interactor: &Interactor) -> usize {
        let mut dismissed = 0;
        for selector in locator.profile().strategies_for(ElementRole::OnboardingDismiss) {
            let single = Locator::new(self.driver.clone(), [selector.clone()]);
            let tapped = best_effort("dismiss onboarding", async {
                match single.try_once().await? {
                    Some(control) => {
                        interactor.tap(&control).await?;
                        interactor.settle(self.timings.tap_settle).await;
                        Ok(true)
                    }
                    None => Ok(false),
                }
            })
            .await;
            if tapped == Some(true) {
                debug!(strategy = %selector, "Dismissed onboarding control");
                dismissed += 1;
            }
        }
        dismissed
    }

    /// Sleep that gives way to cancellation
    async fn pause(&self, duration: std::time::Duration) -> Result<(), AutomationError> {
        tokio::select! {
            _ = tokio::time::sleep(duration) => Ok(()),
            _ = self.cancel.cancelled() => {
                Err(AutomationError::Cancelled("cancelled while waiting".to_string()))
            }
        }
    }

    async fn teardown(&self, profile: &AppProfile) {
        match self.driver.terminate_app(&profile.package).await {
            Ok(true) => info!("Closed {}", profile.package),
            Ok(false) => debug!("{} was not running at teardown", profile.package),
            Err(e) => warn!("Failed to close {}: {}", profile.package, e),
        }
    }
}

/// Run a step whose failure is acceptable, logging instead of propagating
async fn best_effort<T, F>(step: &str, fut: F) -> Option<T>
where
    F: Future<Output = Result<T, AutomationError>>,
{
    match fut.await {
        Ok(value) => Some(value),
        Err(e) => {
            debug!("Best-effort step '{}' skipped: {}", step, e);
            None
        }
    }
}
