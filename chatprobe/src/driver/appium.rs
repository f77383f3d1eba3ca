//! W3C WebDriver client for an Appium server running the UiAutomator2 driver.

use super::AutomationDriver;
use crate::config::DriverConfig;
use crate::element::UIElement;
use crate::errors::AutomationError;
use crate::selector::Selector;
use reqwest::{Client, Method};
use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};

/// Key under which W3C servers return element references
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f405c4a4dfe";
/// Pre-W3C (JSONWP) element key, still returned by older Appium builds
const LEGACY_ELEMENT_KEY: &str = "ELEMENT";

pub struct AppiumDriver {
    client: Client,
    base_url: String,
    session_id: String,
}

impl std::fmt::Debug for AppiumDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppiumDriver")
            .field("base_url", &self.base_url)
            .field("session_id", &self.session_id)
            .finish()
    }
}

impl AppiumDriver {
    /// Create a new automation session on the server.
    #[instrument(level = "debug", skip(config), fields(server = %config.server_url))]
    pub async fn connect(config: &DriverConfig) -> Result<Self, AutomationError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AutomationError::DriverInitFailed(format!("HTTP client: {e}")))?;
        let base_url = config.server_url.trim_end_matches('/').to_string();

        let capabilities = json!({
            "capabilities": {
                "alwaysMatch": {
                    "platformName": config.platform_name,
                    "appium:automationName": config.automation_name,
                    "appium:deviceName": config.device_name,
                    "appium:noReset": config.no_reset,
                    "appium:fullReset": config.full_reset,
                    "appium:newCommandTimeout": config.new_command_timeout_secs,
                },
                "firstMatch": [{}],
            }
        });

        let response = client
            .post(format!("{base_url}/session"))
            .json(&capabilities)
            .send()
            .await
            .map_err(|e| {
                AutomationError::DriverInitFailed(format!("cannot reach {base_url}: {e}"))
            })?;
        let body: Value = response.json().await.map_err(|e| {
            AutomationError::DriverInitFailed(format!("malformed session response: {e}"))
        })?;
        let value = &body["value"];

        if let Some(error) = value["error"].as_str() {
            return Err(AutomationError::DriverInitFailed(format!(
                "{error}: {}",
                value["message"].as_str().unwrap_or_default()
            )));
        }

        // W3C puts the id under value, JSONWP at the top level
        let session_id = value["sessionId"]
            .as_str()
            .or_else(|| body["sessionId"].as_str())
            .ok_or_else(|| {
                AutomationError::DriverInitFailed("session response has no sessionId".to_string())
            })?
            .to_string();

        info!(session_id = %session_id, "Connected to Appium server at {}", base_url);
        Ok(Self {
            client,
            base_url,
            session_id,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    fn session_url(&self, path: &str) -> String {
        format!("{}/session/{}{}", self.base_url, self.session_id, path)
    }

    /// Issue one command and unwrap the `value` field of the reply.
    async fn command(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, AutomationError> {
        let url = self.session_url(path);
        debug!("{} {}", method, url);

        let mut request = self.client.request(method, &url);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        let body: Value = response.json().await.map_err(|e| {
            AutomationError::InteractionFailed(format!("unreadable reply from {path} ({status}): {e}"))
        })?;

        let value = body.get("value").cloned().unwrap_or(Value::Null);
        if let Some(error) = value.get("error").and_then(Value::as_str) {
            let message = value
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default();
            return Err(wire_error(error, message));
        }
        Ok(value)
    }

    fn element_path(element: &UIElement, action: &str) -> String {
        format!("/element/{}/{}", element.id(), action)
    }
}

fn transport_error(e: reqwest::Error) -> AutomationError {
    if e.is_timeout() {
        AutomationError::Timeout(format!("driver request timed out: {e}"))
    } else {
        AutomationError::DriverDisconnected(e.to_string())
    }
}

/// Map a W3C error code onto the harness taxonomy
fn wire_error(code: &str, message: &str) -> AutomationError {
    let detail = format!("{code}: {message}");
    match code {
        "no such element" => AutomationError::ElementNotFound(detail),
        "invalid selector" => AutomationError::InvalidSelector(detail),
        "timeout" | "script timeout" => AutomationError::Timeout(detail),
        "invalid session id" | "session not created" => AutomationError::DriverDisconnected(detail),
        _ => AutomationError::InteractionFailed(detail),
    }
}

fn element_from_value(value: &Value) -> Option<UIElement> {
    value
        .get(ELEMENT_KEY)
        .or_else(|| value.get(LEGACY_ELEMENT_KEY))
        .and_then(Value::as_str)
        .map(UIElement::new)
}

#[async_trait::async_trait]
impl AutomationDriver for AppiumDriver {
    async fn find_elements(&self, selector: &Selector) -> Result<Vec<UIElement>, AutomationError> {
        let (using, value) = selector
            .to_strategy()
            .ok_or_else(|| AutomationError::InvalidSelector(selector.to_string()))?;

        let found = match self
            .command(
                Method::POST,
                "/elements",
                Some(json!({ "using": using, "value": value })),
            )
            .await
        {
            Ok(found) => found,
            Err(AutomationError::ElementNotFound(_)) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        Ok(found
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(element_from_value)
                    .map(|el| el.with_selector(selector.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn element_text(&self, element: &UIElement) -> Result<String, AutomationError> {
        let value = self
            .command(Method::GET, &Self::element_path(element, "text"), None)
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn clear(&self, element: &UIElement) -> Result<(), AutomationError> {
        self.command(
            Method::POST,
            &Self::element_path(element, "clear"),
            Some(json!({})),
        )
        .await?;
        Ok(())
    }

    async fn send_keys(&self, element: &UIElement, text: &str) -> Result<(), AutomationError> {
        self.command(
            Method::POST,
            &Self::element_path(element, "value"),
            Some(json!({ "text": text, "value": [text] })),
        )
        .await?;
        Ok(())
    }

    async fn click(&self, element: &UIElement) -> Result<(), AutomationError> {
        self.command(
            Method::POST,
            &Self::element_path(element, "click"),
            Some(json!({})),
        )
        .await?;
        Ok(())
    }

    async fn activate_app(&self, app_id: &str) -> Result<(), AutomationError> {
        self.command(
            Method::POST,
            "/appium/device/activate_app",
            Some(json!({ "appId": app_id })),
        )
        .await
        .map_err(|e| match e {
            AutomationError::DriverDisconnected(_) => e,
            other => AutomationError::AppLaunchFailed(format!("{app_id}: {other}")),
        })?;
        Ok(())
    }

    async fn start_activity(&self, app_id: &str, activity: &str) -> Result<(), AutomationError> {
        let component = format!("{app_id}/{activity}");
        self.command(
            Method::POST,
            "/execute/sync",
            Some(json!({
                "script": "mobile: startActivity",
                "args": [{ "component": component }],
            })),
        )
        .await
        .map_err(|e| match e {
            AutomationError::DriverDisconnected(_) => e,
            other => AutomationError::AppLaunchFailed(format!("{component}: {other}")),
        })?;
        Ok(())
    }

    async fn terminate_app(&self, app_id: &str) -> Result<bool, AutomationError> {
        let value = self
            .command(
                Method::POST,
                "/appium/device/terminate_app",
                Some(json!({ "appId": app_id })),
            )
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn quit(&self) -> Result<(), AutomationError> {
        let url = format!("{}/session/{}", self.base_url, self.session_id);
        match self.client.delete(&url).send().await {
            Ok(_) => {
                info!(session_id = %self.session_id, "Driver session closed");
                Ok(())
            }
            Err(e) => {
                warn!("Failed to close driver session: {}", e);
                Err(transport_error(e))
            }
        }
    }
}
