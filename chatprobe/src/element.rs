use crate::selector::Selector;
use serde::{Deserialize, Serialize};

/// A resolved on-screen element, as handed back by the driver.
///
/// The handle is only an opaque reference into the driver session; it can go
/// stale as soon as the app re-renders, so callers resolve it right before
/// acting on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UIElement {
    /// Driver-assigned element reference
    pub element_id: String,
    /// The selector strategy that produced this element
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_by: Option<Selector>,
}

impl UIElement {
    pub fn new(element_id: impl Into<String>) -> Self {
        Self {
            element_id: element_id.into(),
            matched_by: None,
        }
    }

    pub fn with_selector(mut self, selector: Selector) -> Self {
        self.matched_by = Some(selector);
        self
    }

    pub fn id(&self) -> &str {
        &self.element_id
    }
}
