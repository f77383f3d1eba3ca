use tracing::{debug, instrument, warn};

use crate::driver::AutomationDriver;
use crate::element::UIElement;
use crate::errors::AutomationError;
use crate::profile::{AppProfile, ElementRole};
use crate::selector::Selector;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};

// Default timeout if none is specified on the locator itself
const DEFAULT_LOCATOR_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Which element to keep when a strategy matches several
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchPick {
    #[default]
    First,
    /// Last in traversal order, i.e. the most recently rendered
    Last,
}

/// Resolves an ordered chain of selector strategies to a single element.
///
/// Strategies are tried in order on every pass and the first one that
/// resolves wins; later strategies are not queried. Passes repeat until the
/// timeout elapses.
#[derive(Clone)]
pub struct Locator {
    driver: Arc<dyn AutomationDriver>,
    strategies: Vec<Selector>,
    timeout: Duration, // Default timeout for this locator instance
    poll_interval: Duration,
    pick: MatchPick,
}

impl Locator {
    pub fn new<S: Into<Selector>>(
        driver: Arc<dyn AutomationDriver>,
        strategies: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            driver,
            strategies: strategies.into_iter().map(Into::into).collect(),
            timeout: DEFAULT_LOCATOR_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            pick: MatchPick::First,
        }
    }

    /// Set a default timeout for waiting operations on this locator instance.
    pub fn set_default_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn poll_every(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(MIN_POLL_INTERVAL);
        self
    }

    pub fn pick(mut self, pick: MatchPick) -> Self {
        self.pick = pick;
        self
    }

    pub fn strategies(&self) -> &[Selector] {
        &self.strategies
    }

    /// One pass over the strategies without waiting.
    ///
    /// Recoverable driver errors count as "no match" for that strategy; a lost
    /// session is returned as an error.
    pub async fn try_once(&self) -> Result<Option<UIElement>, AutomationError> {
        for selector in &self.strategies {
            if let Selector::Invalid(reason) = selector {
                warn!("Skipping invalid selector: {}", reason);
                continue;
            }

            match self.driver.find_elements(selector).await {
                Ok(found) => {
                    let picked = match self.pick {
                        MatchPick::First => found.into_iter().next(),
                        MatchPick::Last => found.into_iter().last(),
                    };
                    match picked {
                        Some(element) => {
                            debug!(strategy = %selector, element = %element.id(), "Strategy matched");
                            return Ok(Some(element.with_selector(selector.clone())));
                        }
                        None => debug!(strategy = %selector, "No match"),
                    }
                }
                Err(e) if e.is_recoverable() => {
                    debug!(strategy = %selector, error = %e, "Strategy failed")
                }
                Err(e) => return Err(e),
            }
        }
        Ok(None)
    }

    /// Wait for any strategy to resolve, up to the specified timeout.
    /// If no timeout is provided, uses the locator's default timeout.
    #[instrument(level = "debug", skip(self, timeout))]
    pub async fn wait(&self, timeout: Option<Duration>) -> Result<UIElement, AutomationError> {
        let effective_timeout = timeout.unwrap_or(self.timeout);
        let deadline = Instant::now() + effective_timeout;
        debug!("Waiting for element matching: {}", self.selector_string());

        loop {
            if let Some(element) = self.try_once().await? {
                return Ok(element);
            }
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            sleep(self.poll_interval.min(deadline - now)).await;
        }

        Err(AutomationError::ElementNotFound(format!(
            "no strategy matched within {effective_timeout:?}: {}",
            self.selector_string()
        )))
    }

    pub fn selector_string(&self) -> String {
        self.strategies
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

/// Maps logical roles to strategy chains for one app
#[derive(Clone)]
pub struct ElementLocator {
    driver: Arc<dyn AutomationDriver>,
    profile: AppProfile,
    timeout: Duration,
    poll_interval: Duration,
}

impl ElementLocator {
    pub fn new(
        driver: Arc<dyn AutomationDriver>,
        profile: AppProfile,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Self {
        Self {
            driver,
            profile,
            timeout,
            poll_interval,
        }
    }

    /// The configured locator for a role
    pub fn locator(&self, role: ElementRole) -> Locator {
        let pick = if role.prefers_last_match() {
            MatchPick::Last
        } else {
            MatchPick::First
        };
        Locator::new(self.driver.clone(), self.profile.strategies_for(role))
            .set_default_timeout(self.timeout)
            .poll_every(self.poll_interval)
            .pick(pick)
    }

    /// Resolve a role, waiting up to the configured timeout
    #[instrument(level = "debug", skip(self), fields(app = %self.profile.name))]
    pub async fn locate(&self, role: ElementRole) -> Result<UIElement, AutomationError> {
        self.locator(role).wait(None).await.map_err(|e| match e {
            AutomationError::ElementNotFound(detail) => {
                AutomationError::ElementNotFound(format!("{role}: {detail}"))
            }
            other => other,
        })
    }

    /// Resolve a role with a single pass and no waiting
    pub async fn locate_now(&self, role: ElementRole) -> Result<Option<UIElement>, AutomationError> {
        self.locator(role).try_once().await
    }

    pub fn profile(&self) -> &AppProfile {
        &self.profile
    }
}
