//! Conversation records and their persisted forms.

use crate::errors::AutomationError;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

const RULE_WIDTH: usize = 80;

/// UTC ISO-8601 timestamp with millisecond precision.
///
/// Fixed width and free of DST jumps, so string order matches
/// chronological order.
pub fn timestamp_now() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Bot,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Bot => "bot",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub timestamp: String,
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.into(),
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self::new(Role::User, content, timestamp)
    }

    pub fn bot(content: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self::new(Role::Bot, content, timestamp)
    }
}

/// Everything captured from one app in one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub app_name: String,
    pub session_id: String,
    pub start_time: String,
    pub end_time: String,
    pub messages: Vec<Message>,
}

impl Conversation {
    pub fn count(&self, role: Role) -> usize {
        self.messages.iter().filter(|m| m.role == role).count()
    }
}

/// Hands out session ids that stay unique even for back-to-back runs
/// within the same microsecond.
#[derive(Debug, Default)]
pub struct SessionIdGenerator {
    last_micros: i64,
}

impl SessionIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&mut self, app_name: &str) -> String {
        let now = Utc::now().timestamp_micros();
        let micros = if now > self.last_micros {
            now
        } else {
            self.last_micros + 1
        };
        self.last_micros = micros;

        let slug: String = app_name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_lowercase()
                } else {
                    '_'
                }
            })
            .collect();
        format!("session_{slug}_{micros}")
    }
}

/// Top-level record of one harness invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSession {
    pub test_date: String,
    pub conversations: Vec<Conversation>,
}

/// Paths of the files written for a session
#[derive(Debug, Clone)]
pub struct TranscriptFiles {
    pub json: PathBuf,
    pub text: PathBuf,
}

impl TestSession {
    /// Collect finished conversations, keeping their order
    pub fn aggregate(conversations: Vec<Conversation>) -> Self {
        Self {
            test_date: timestamp_now(),
            conversations,
        }
    }

    pub fn to_json(&self) -> Result<String, AutomationError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(raw: &str) -> Result<Self, AutomationError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Plain-text report meant for people rather than tools
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        // Writing into a String never fails
        if self.render_text(&mut out).is_err() {
            out.clear();
        }
        out
    }

    fn render_text(&self, out: &mut impl std::fmt::Write) -> std::fmt::Result {
        let heavy = "=".repeat(RULE_WIDTH);
        let light = "-".repeat(RULE_WIDTH);

        writeln!(out, "Test Session: {}", self.test_date)?;
        writeln!(out, "{heavy}")?;
        writeln!(out)?;

        for conversation in &self.conversations {
            writeln!(out, "App: {}", conversation.app_name)?;
            writeln!(out, "Session ID: {}", conversation.session_id)?;
            writeln!(out, "Start: {}", conversation.start_time)?;
            writeln!(out, "End: {}", conversation.end_time)?;
            writeln!(out, "{light}")?;

            for message in &conversation.messages {
                writeln!(
                    out,
                    "[{}] {}:",
                    message.timestamp,
                    message.role.as_str().to_uppercase()
                )?;
                writeln!(out, "{}", message.content)?;
                writeln!(out)?;
            }

            writeln!(out, "{heavy}")?;
            writeln!(out)?;
        }
        Ok(())
    }

    /// Write both renderings into `dir`, creating it if needed
    pub fn write_to(&self, dir: impl AsRef<Path>) -> Result<TranscriptFiles, AutomationError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        let stamp = Utc::now().timestamp_millis();
        let files = TranscriptFiles {
            json: dir.join(format!("transcripts_{stamp}.json")),
            text: dir.join(format!("transcripts_{stamp}.txt")),
        };

        std::fs::write(&files.json, self.to_json()?)?;
        info!("Transcripts saved to: {}", files.json.display());
        std::fs::write(&files.text, self.to_text())?;
        info!("Transcripts saved to: {}", files.text.display());

        Ok(files)
    }
}
