//! Per-app knobs: which package to launch, how long it takes to come up,
//! whether it greets new users with onboarding screens, and where its chat
//! widgets live when the generic selectors miss them.

use crate::config::duration_ms;
use crate::selector::Selector;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Logical UI roles the harness needs to find in any chat app
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementRole {
    ChatInput,
    SendControl,
    LatestBotMessage,
    OnboardingDismiss,
}

impl ElementRole {
    /// Most chat logs append downwards, so the newest message is the last match.
    pub fn prefers_last_match(&self) -> bool {
        matches!(self, ElementRole::LatestBotMessage)
    }

    /// Generic strategies, most specific first.
    pub fn default_strategies(&self) -> Vec<Selector> {
        let raw: &[&str] = match self {
            ElementRole::ChatInput => &[
                "id:message_input",
                "id:chat_input",
                "id:edittext",
                "classname:android.widget.EditText",
                "//android.widget.EditText",
            ],
            ElementRole::SendControl => &[
                "id:send_button",
                "id:btn_send",
                "//*[@content-desc='Send' or @text='Send']",
                "//android.widget.ImageButton",
            ],
            ElementRole::LatestBotMessage => &[
                "//android.widget.TextView",
                "classname:android.widget.TextView",
            ],
            ElementRole::OnboardingDismiss => {
                return DISMISS_LABELS
                    .iter()
                    .flat_map(|label| label_variants(label))
                    .map(Selector::Label)
                    .collect();
            }
        };
        raw.iter().map(|s| Selector::from(*s)).collect()
    }
}

impl std::fmt::Display for ElementRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ElementRole::ChatInput => "chat-input",
            ElementRole::SendControl => "send-control",
            ElementRole::LatestBotMessage => "latest-bot-message",
            ElementRole::OnboardingDismiss => "onboarding-dismiss-control",
        };
        f.write_str(name)
    }
}

const DISMISS_LABELS: &[&str] = &["skip", "continue", "get started", "next"];

/// lower, Title and UPPER case spellings of a label
fn label_variants(label: &str) -> [String; 3] {
    let title = label
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ");
    [label.to_lowercase(), title, label.to_uppercase()]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingPolicy {
    /// Go straight to the chat screen
    #[default]
    Skip,
    /// Try the known dismiss controls once, ignoring any that are absent
    Dismiss,
}

/// Everything that differs between target apps
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppProfile {
    /// Display name used in transcripts
    pub name: String,
    /// Android package identifier
    pub package: String,
    /// Launch activity; when set the app is started through it instead of
    /// the package's default launcher entry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity: Option<String>,
    /// Time the app needs after launch before it accepts input
    #[serde(with = "duration_ms", default = "default_warmup")]
    pub warmup: Duration,
    #[serde(default)]
    pub onboarding: OnboardingPolicy,
    /// Strategies that replace the generic ones for a role
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub selectors: HashMap<ElementRole, Vec<Selector>>,
}

fn default_warmup() -> Duration {
    Duration::from_secs(5)
}

impl AppProfile {
    pub fn new(name: impl Into<String>, package: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            package: package.into(),
            activity: None,
            warmup: default_warmup(),
            onboarding: OnboardingPolicy::Skip,
            selectors: HashMap::new(),
        }
    }

    pub fn with_activity(mut self, activity: impl Into<String>) -> Self {
        self.activity = Some(activity.into());
        self
    }

    pub fn with_warmup(mut self, warmup: Duration) -> Self {
        self.warmup = warmup;
        self
    }

    pub fn with_onboarding(mut self, policy: OnboardingPolicy) -> Self {
        self.onboarding = policy;
        self
    }

    pub fn with_selectors(mut self, role: ElementRole, selectors: Vec<Selector>) -> Self {
        self.selectors.insert(role, selectors);
        self
    }

    /// Strategy chain for a role: the override if present, else the generic list.
    pub fn strategies_for(&self, role: ElementRole) -> Vec<Selector> {
        match self.selectors.get(&role) {
            Some(custom) if !custom.is_empty() => custom.clone(),
            _ => role.default_strategies(),
        }
    }

    pub fn ash() -> Self {
        Self::new("Ash", "xyz.slingshot.ashley.app")
            .with_warmup(Duration::from_secs(3))
            .with_onboarding(OnboardingPolicy::Dismiss)
    }

    pub fn doro() -> Self {
        Self::new("Doro", "ca.razroze.doro.app")
    }

    pub fn wysa() -> Self {
        Self::new("Wysa", "bot.touchkin")
    }

    /// The three apps the harness ships with, in test order
    pub fn builtin() -> Vec<Self> {
        vec![Self::ash(), Self::doro(), Self::wysa()]
    }
}
