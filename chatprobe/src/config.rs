use crate::errors::AutomationError;
use crate::profile::AppProfile;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:4723";

/// Connection settings for the Appium server and the device it fronts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    pub server_url: String,
    pub platform_name: String,
    pub automation_name: String,
    pub device_name: String,
    /// Keep app data between launches
    pub no_reset: bool,
    pub full_reset: bool,
    /// Seconds the server waits for a command before ending the session
    pub new_command_timeout_secs: u64,
    /// Per-request HTTP timeout
    #[serde(with = "duration_ms")]
    pub request_timeout: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            platform_name: "Android".to_string(),
            automation_name: "UiAutomator2".to_string(),
            device_name: "emulator-5554".to_string(),
            no_reset: false,
            full_reset: false,
            new_command_timeout_secs: 300,
            request_timeout: Duration::from_secs(60),
        }
    }
}

/// Fixed settle delays and bounded waits.
///
/// The target apps expose no readiness signal, so these are calibrated by
/// hand rather than computed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Timings {
    /// Pause after typing into a field
    #[serde(with = "duration_ms")]
    pub focus_settle: Duration,
    /// Pause after tapping an onboarding control
    #[serde(with = "duration_ms")]
    pub tap_settle: Duration,
    /// Pause after tapping send, before reading the reply
    #[serde(with = "duration_ms")]
    pub send_settle: Duration,
    /// Pause between consecutive prompts
    #[serde(with = "duration_ms")]
    pub inter_prompt: Duration,
    /// Upper bound for the locator's wait-until-present polling
    #[serde(with = "duration_ms")]
    pub locate_timeout: Duration,
    #[serde(with = "duration_ms")]
    pub poll_interval: Duration,
    /// Upper bound for waiting on fresh bot content (await-change capture only)
    #[serde(with = "duration_ms")]
    pub response_timeout: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            focus_settle: Duration::from_millis(500),
            tap_settle: Duration::from_secs(1),
            send_settle: Duration::from_secs(6),
            inter_prompt: Duration::from_secs(2),
            locate_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(500),
            response_timeout: Duration::from_secs(30),
        }
    }
}

/// How a bot reply is recognised after sending a prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapturePolicy {
    /// Read whatever the latest message is once the send settle has elapsed
    #[default]
    FixedDelay,
    /// Wait until the latest message differs from what was on screen before sending
    AwaitChange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub driver: DriverConfig,
    pub timings: Timings,
    pub capture: CapturePolicy,
    pub output_dir: PathBuf,
    /// Apps to test, in order
    pub apps: Vec<AppProfile>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            driver: DriverConfig::default(),
            timings: Timings::default(),
            capture: CapturePolicy::default(),
            output_dir: PathBuf::from("transcripts"),
            apps: AppProfile::builtin(),
        }
    }
}

impl HarnessConfig {
    /// Load a YAML (or JSON) configuration file. Missing keys fall back to defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AutomationError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AutomationError::InvalidConfig(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_yaml(&raw)
            .map_err(|e| AutomationError::InvalidConfig(format!("{}: {e}", path.display())))
    }

    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(raw)
    }

    /// Keep only the named apps (case-insensitive), in the order given.
    pub fn select_apps(&mut self, names: &[String]) -> Result<(), AutomationError> {
        if names.is_empty() {
            return Ok(());
        }
        let mut selected = Vec::with_capacity(names.len());
        for name in names {
            let profile = self
                .apps
                .iter()
                .find(|p| p.name.eq_ignore_ascii_case(name))
                .cloned()
                .ok_or_else(|| {
                    AutomationError::InvalidConfig(format!(
                        "unknown app '{name}', configured apps: {}",
                        self.apps
                            .iter()
                            .map(|p| p.name.as_str())
                            .collect::<Vec<_>>()
                            .join(", ")
                    ))
                })?;
            selected.push(profile);
        }
        self.apps = selected;
        Ok(())
    }
}

/// Serialize a `Duration` as whole milliseconds
pub(crate) mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
