use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use crate::app::automation::capabilities::SessionOptions;
use crate::app::automation::driver::{AutomationDriver, ElementId, Locator, SessionId};
use crate::app::config::AppiumSettings;
use crate::app::error::{AppError, ErrorCode};

const W3C_ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";
const LEGACY_ELEMENT_KEY: &str = "ELEMENT";
const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);
const CREATE_SESSION_TIMEOUT: Duration = Duration::from_secs(120);

/// Appium (UiAutomator2) client speaking the W3C WebDriver wire protocol.
pub struct WebDriverClient {
    base_url: String,
    status_timeout: Duration,
    lookup_timeout: Duration,
    http: Client,
}

impl WebDriverClient {
    pub fn new(settings: &AppiumSettings) -> Result<Self, AppError> {
        let http = Client::builder()
            .build()
            .map_err(|err| AppError::system(format!("Failed to build HTTP client: {err}"), ""))?;
        Ok(Self {
            base_url: settings.base_url(),
            status_timeout: Duration::from_millis(settings.status_timeout_ms),
            lookup_timeout: Duration::from_millis(settings.lookup_timeout_ms),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        timeout: Duration,
    ) -> Result<Value, AppError> {
        let trace_id = Uuid::new_v4().to_string();
        let url = format!("{}{}", self.base_url, path);
        debug!(trace_id = %trace_id, %method, %url, "webdriver request");

        let mut builder = self.http.request(method, &url).timeout(timeout);
        if let Some(body) = body {
            builder = builder.json(&body);
        }
        let response = builder.send().map_err(|err| {
            let code = if err.is_timeout() {
                ErrorCode::Timeout
            } else {
                ErrorCode::Dependency
            };
            AppError::new(code, format!("Appium request failed: {err}"), &trace_id)
        })?;

        let status = response.status();
        let payload: Value = response.json().unwrap_or(Value::Null);
        if !status.is_success() {
            return Err(error_from_payload(status.as_u16(), &payload, &trace_id));
        }
        Ok(payload)
    }

    fn session_path(session: &SessionId, tail: &str) -> String {
        format!("/session/{}{}", session.0, tail)
    }
}

/// Maps a W3C error payload to an error code the callers can branch on.
pub fn error_from_payload(status: u16, payload: &Value, trace_id: &str) -> AppError {
    let value = &payload["value"];
    let kind = value["error"].as_str().unwrap_or_default();
    let message = value["message"]
        .as_str()
        .filter(|m| !m.is_empty())
        .unwrap_or(kind);
    let code = match kind {
        "no such element" | "stale element reference" => ErrorCode::NotFound,
        "timeout" | "script timeout" => ErrorCode::Timeout,
        "invalid session id" => ErrorCode::NoSession,
        "invalid argument" => ErrorCode::Validation,
        _ => ErrorCode::Dependency,
    };
    AppError::new(
        code,
        format!("Appium error (HTTP {status}) {kind}: {message}"),
        trace_id,
    )
}

pub fn session_id_from(payload: &Value) -> Option<SessionId> {
    payload["value"]["sessionId"]
        .as_str()
        .or_else(|| payload["sessionId"].as_str())
        .map(|id| SessionId(id.to_string()))
}

pub fn element_ids_from(payload: &Value) -> Vec<ElementId> {
    payload["value"]
        .as_array()
        .map(|items| items.iter().filter_map(element_id_of).collect())
        .unwrap_or_default()
}

fn element_id_of(item: &Value) -> Option<ElementId> {
    item[W3C_ELEMENT_KEY]
        .as_str()
        .or_else(|| item[LEGACY_ELEMENT_KEY].as_str())
        .map(|id| ElementId(id.to_string()))
}

/// Attribute values come back as strings, booleans or null depending on the driver.
pub fn attribute_value(payload: &Value) -> Option<String> {
    match &payload["value"] {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

impl AutomationDriver for WebDriverClient {
    fn server_reachable(&self) -> bool {
        match self.request(Method::GET, "/status", None, self.status_timeout) {
            Ok(_) => true,
            Err(err) => {
                debug!(error = %err, "appium status probe failed");
                false
            }
        }
    }

    fn create_session(&self, options: &SessionOptions) -> Result<SessionId, AppError> {
        let payload = self.request(
            Method::POST,
            "/session",
            Some(options.to_request_body()),
            CREATE_SESSION_TIMEOUT,
        )?;
        session_id_from(&payload)
            .ok_or_else(|| AppError::dependency("Appium did not return a session id", ""))
    }

    fn delete_session(&self, session: &SessionId) -> Result<(), AppError> {
        self.request(
            Method::DELETE,
            &Self::session_path(session, ""),
            None,
            COMMAND_TIMEOUT,
        )
        .map(|_| ())
    }

    fn current_package(&self, session: &SessionId) -> Result<String, AppError> {
        let payload = self.request(
            Method::GET,
            &Self::session_path(session, "/appium/device/current_package"),
            None,
            COMMAND_TIMEOUT,
        )?;
        Ok(attribute_value(&payload).unwrap_or_default())
    }

    fn find_elements(
        &self,
        session: &SessionId,
        locator: &Locator,
    ) -> Result<Vec<ElementId>, AppError> {
        let (using, value) = locator.strategy();
        let payload = self.request(
            Method::POST,
            &Self::session_path(session, "/elements"),
            Some(json!({ "using": using, "value": value })),
            self.lookup_timeout,
        )?;
        Ok(element_ids_from(&payload))
    }

    fn element_attribute(
        &self,
        session: &SessionId,
        element: &ElementId,
        name: &str,
    ) -> Result<Option<String>, AppError> {
        let path = Self::session_path(session, &format!("/element/{}/attribute/{name}", element.0));
        let payload = self.request(Method::GET, &path, None, self.lookup_timeout)?;
        Ok(attribute_value(&payload))
    }

    fn element_clickable(&self, session: &SessionId, element: &ElementId) -> Result<bool, AppError> {
        for state in ["displayed", "enabled"] {
            let path = Self::session_path(session, &format!("/element/{}/{state}", element.0));
            let payload = self.request(Method::GET, &path, None, self.lookup_timeout)?;
            if !payload["value"].as_bool().unwrap_or(false) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn click(&self, session: &SessionId, element: &ElementId) -> Result<(), AppError> {
        let path = Self::session_path(session, &format!("/element/{}/click", element.0));
        self.request(Method::POST, &path, Some(json!({})), COMMAND_TIMEOUT)
            .map(|_| ())
    }

    fn press_keycode(&self, session: &SessionId, keycode: i32) -> Result<(), AppError> {
        self.request(
            Method::POST,
            &Self::session_path(session, "/appium/device/press_keycode"),
            Some(json!({ "keycode": keycode })),
            COMMAND_TIMEOUT,
        )
        .map(|_| ())
    }
}
