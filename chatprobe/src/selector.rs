use serde::{Deserialize, Serialize};

/// Represents ways to locate a UI element in an Android accessibility tree
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Selector {
    /// Select by resource id (e.g. `message_input` or `com.app:id/message_input`)
    Id(String),
    /// Select by widget class name (e.g. `android.widget.EditText`)
    ClassName(String),
    /// Select by content description / accessibility label
    AccessibilityId(String),
    /// Select using an XPath query over the view hierarchy
    XPath(String),
    /// Select elements whose text contains the value
    Text(String),
    /// Select elements whose text or content description contains the value
    Label(String),
    /// Represents an invalid selector string, with a reason.
    Invalid(String),
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Selector::Id(v) => write!(f, "id:{v}"),
            Selector::ClassName(v) => write!(f, "classname:{v}"),
            Selector::AccessibilityId(v) => write!(f, "desc:{v}"),
            Selector::XPath(v) => write!(f, "xpath:{v}"),
            Selector::Text(v) => write!(f, "text:{v}"),
            Selector::Label(v) => write!(f, "label:{v}"),
            Selector::Invalid(reason) => write!(f, "invalid:{reason}"),
        }
    }
}

impl From<&str> for Selector {
    fn from(s: &str) -> Self {
        let s = s.trim();
        let lower = s.to_lowercase();
        match s {
            _ if s.is_empty() => Selector::Invalid("Empty selector".to_string()),
            _ if lower.starts_with("id:") => Selector::Id(s[3..].trim().to_string()),
            _ if lower.starts_with("classname:") => {
                Selector::ClassName(s["classname:".len()..].trim().to_string())
            }
            _ if lower.starts_with("desc:") => {
                Selector::AccessibilityId(s["desc:".len()..].to_string())
            }
            _ if lower.starts_with("xpath:") => Selector::XPath(s["xpath:".len()..].to_string()),
            _ if lower.starts_with("text:") => Selector::Text(s["text:".len()..].to_string()),
            _ if lower.starts_with("label:") => Selector::Label(s["label:".len()..].to_string()),
            _ if s.starts_with('/') || s.starts_with("(/") => Selector::XPath(s.to_string()),
            _ if s.starts_with('#') => Selector::Id(s[1..].to_string()),
            _ => Selector::Invalid(format!(
                "Unknown selector format: \"{s}\". Use prefixes like 'id:', 'classname:', 'desc:', 'xpath:', 'text:' or 'label:' to specify the selector type."
            )),
        }
    }
}

impl TryFrom<String> for Selector {
    type Error = String;

    // serde goes through this impl so a bad selector in a config file is
    // rejected at load time instead of silently skipped at run time.
    fn try_from(s: String) -> Result<Self, Self::Error> {
        match Selector::from(s.as_str()) {
            Selector::Invalid(reason) => Err(reason),
            selector => Ok(selector),
        }
    }
}

impl From<Selector> for String {
    fn from(selector: Selector) -> Self {
        selector.to_string()
    }
}

impl Selector {
    /// Translate into a W3C WebDriver `(using, value)` locator pair.
    pub fn to_strategy(&self) -> Option<(&'static str, String)> {
        match self {
            Selector::Id(id) => Some(("id", id.clone())),
            Selector::ClassName(class) => Some(("class name", class.clone())),
            Selector::AccessibilityId(desc) => Some(("accessibility id", desc.clone())),
            Selector::XPath(path) => Some(("xpath", path.clone())),
            Selector::Text(text) => Some((
                "xpath",
                format!("//*[contains(@text, {})]", xpath_literal(text)),
            )),
            Selector::Label(label) => {
                let literal = xpath_literal(label);
                Some((
                    "xpath",
                    format!("//*[contains(@text, {literal}) or contains(@content-desc, {literal})]"),
                ))
            }
            Selector::Invalid(_) => None,
        }
    }
}

/// Quote a string for use as an XPath 1.0 literal.
///
/// XPath has no escape sequences, so a value holding both quote kinds has to
/// be stitched together with `concat()`.
pub fn xpath_literal(value: &str) -> String {
    if !value.contains('\'') {
        return format!("'{value}'");
    }
    if !value.contains('"') {
        return format!("\"{value}\"");
    }
    let parts: Vec<String> = value
        .split('\'')
        .map(|part| format!("'{part}'"))
        .collect();
    format!("concat({})", parts.join(", \"'\", "))
}
