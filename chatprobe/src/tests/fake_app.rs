//! In-memory stand-in for a chat app behind a driver session.

use crate::driver::AutomationDriver;
use crate::element::UIElement;
use crate::errors::AutomationError;
use crate::selector::Selector;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

pub const GREETING: &str = "Hi! How are you feeling today?";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Find(Selector),
    Text(String),
    Clear(String),
    SendKeys(String, String),
    Click(String),
    Activate(String),
    StartActivity(String, String),
    Terminate(String),
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Input,
    Send,
    Messages,
    Dismiss(String),
}

#[derive(Debug, Default)]
struct FakeState {
    targets: HashMap<Selector, Target>,
    greeting: Option<String>,
    replies: Vec<String>,
    typed: String,
    typings: usize,
    sends: usize,
    silent_sends: HashSet<usize>,
    failing_reads: HashSet<usize>,
    fatal_on_typing: Option<usize>,
    launch_fails: bool,
    disconnected: bool,
    calls: Vec<Call>,
}

/// Replies to every sent prompt with `Bot reply to: <prompt>`, appended to the
/// on-screen message list after a greeting.
#[derive(Debug)]
pub struct FakeChatApp {
    state: Mutex<FakeState>,
}

impl FakeChatApp {
    /// Input reachable only through the class-name fallback, send through the
    /// first id, messages through the structural query.
    pub fn new() -> Self {
        let mut targets = HashMap::new();
        targets.insert(
            Selector::from("classname:android.widget.EditText"),
            Target::Input,
        );
        targets.insert(Selector::from("id:send_button"), Target::Send);
        targets.insert(Selector::from("//android.widget.TextView"), Target::Messages);
        Self {
            state: Mutex::new(FakeState {
                targets,
                greeting: Some(GREETING.to_string()),
                ..Default::default()
            }),
        }
    }

    /// Nothing on screen at all
    pub fn empty() -> Self {
        Self {
            state: Mutex::new(FakeState::default()),
        }
    }

    pub fn with_target(self, selector: impl Into<Selector>, target: Target) -> Self {
        self.lock().targets.insert(selector.into(), target);
        self
    }

    pub fn without_target(self, selector: impl Into<Selector>) -> Self {
        self.lock().targets.remove(&selector.into());
        self
    }

    /// Messages already on screen after the greeting
    pub fn with_history(self, history: &[&str]) -> Self {
        self.lock()
            .replies
            .extend(history.iter().map(|s| s.to_string()));
        self
    }

    /// The nth send (1-based) gets no reply
    pub fn silent_on_send(self, n: usize) -> Self {
        self.lock().silent_sends.insert(n);
        self
    }

    /// Reading the nth reply (1-based) fails as a stale element
    pub fn fail_read_of_reply(self, n: usize) -> Self {
        self.lock().failing_reads.insert(n);
        self
    }

    /// The driver session dies on the nth typing attempt (1-based)
    pub fn disconnect_on_typing(self, n: usize) -> Self {
        self.lock().fatal_on_typing = Some(n);
        self
    }

    pub fn failing_launch(self) -> Self {
        self.lock().launch_fails = true;
        self
    }

    pub fn disconnected(self) -> Self {
        self.lock().disconnected = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn finds(&self) -> Vec<Selector> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Find(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.lock().calls.iter().filter(|c| pred(c)).count()
    }

    pub fn terminations(&self) -> usize {
        self.count(|c| matches!(c, Call::Terminate(_)))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    fn record(&self, call: Call) -> Result<std::sync::MutexGuard<'_, FakeState>, AutomationError> {
        let mut state = self.lock();
        state.calls.push(call);
        if state.disconnected {
            return Err(AutomationError::DriverDisconnected(
                "invalid session id".to_string(),
            ));
        }
        Ok(state)
    }
}

fn message_ids(state: &FakeState) -> Vec<UIElement> {
    let mut ids = Vec::new();
    if state.greeting.is_some() {
        ids.push(UIElement::new("msg-0"));
    }
    ids.extend((1..=state.replies.len()).map(|k| UIElement::new(format!("msg-{k}"))));
    ids
}

#[async_trait::async_trait]
impl AutomationDriver for FakeChatApp {
    async fn find_elements(&self, selector: &Selector) -> Result<Vec<UIElement>, AutomationError> {
        let state = self.record(Call::Find(selector.clone()))?;
        let found = match state.targets.get(selector) {
            Some(Target::Input) => vec![UIElement::new("input")],
            Some(Target::Send) => vec![UIElement::new("send")],
            Some(Target::Messages) => message_ids(&state),
            Some(Target::Dismiss(label)) => vec![UIElement::new(format!("dismiss-{label}"))],
            None => Vec::new(),
        };
        Ok(found)
    }

    async fn element_text(&self, element: &UIElement) -> Result<String, AutomationError> {
        let state = self.record(Call::Text(element.id().to_string()))?;
        let index = element
            .id()
            .strip_prefix("msg-")
            .and_then(|n| n.parse::<usize>().ok())
            .ok_or_else(|| AutomationError::InteractionFailed("no text".to_string()))?;
        if index == 0 {
            return Ok(state.greeting.clone().unwrap_or_default());
        }
        if state.failing_reads.contains(&index) {
            return Err(AutomationError::InteractionFailed(
                "stale element reference".to_string(),
            ));
        }
        state
            .replies
            .get(index - 1)
            .cloned()
            .ok_or_else(|| AutomationError::InteractionFailed("element detached".to_string()))
    }

    async fn clear(&self, element: &UIElement) -> Result<(), AutomationError> {
        let mut state = self.record(Call::Clear(element.id().to_string()))?;
        state.typed.clear();
        Ok(())
    }

    async fn send_keys(&self, element: &UIElement, text: &str) -> Result<(), AutomationError> {
        let mut state = self.record(Call::SendKeys(element.id().to_string(), text.to_string()))?;
        state.typings += 1;
        if state.fatal_on_typing == Some(state.typings) {
            state.disconnected = true;
            return Err(AutomationError::DriverDisconnected(
                "socket hang up".to_string(),
            ));
        }
        state.typed.push_str(text);
        Ok(())
    }

    async fn click(&self, element: &UIElement) -> Result<(), AutomationError> {
        let mut state = self.record(Call::Click(element.id().to_string()))?;
        if element.id() == "send" {
            state.sends += 1;
            let n = state.sends;
            let typed = std::mem::take(&mut state.typed);
            if !state.silent_sends.contains(&n) {
                state.replies.push(format!("Bot reply to: {typed}"));
            }
        } else if let Some(label) = element.id().strip_prefix("dismiss-") {
            let label = label.to_string();
            state
                .targets
                .retain(|_, target| *target != Target::Dismiss(label.clone()));
        }
        Ok(())
    }

    async fn activate_app(&self, app_id: &str) -> Result<(), AutomationError> {
        let state = self.record(Call::Activate(app_id.to_string()))?;
        if state.launch_fails {
            return Err(AutomationError::AppLaunchFailed(format!(
                "{app_id} is not installed"
            )));
        }
        Ok(())
    }

    async fn start_activity(&self, app_id: &str, activity: &str) -> Result<(), AutomationError> {
        let state = self.record(Call::StartActivity(app_id.to_string(), activity.to_string()))?;
        if state.launch_fails {
            return Err(AutomationError::AppLaunchFailed(format!(
                "{app_id}/{activity} cannot be started"
            )));
        }
        Ok(())
    }

    async fn terminate_app(&self, app_id: &str) -> Result<bool, AutomationError> {
        let state = self.record(Call::Terminate(app_id.to_string()))?;
        Ok(!state.launch_fails)
    }

    async fn quit(&self) -> Result<(), AutomationError> {
        self.record(Call::Quit)?;
        Ok(())
    }
}
