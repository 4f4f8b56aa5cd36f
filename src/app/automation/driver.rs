use std::fmt;

use crate::app::automation::capabilities::SessionOptions;
use crate::app::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(pub String);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementId(pub String);

/// How an on-screen element is looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// Resource id, e.g. `tv.freetv.androidtv:id/keypadButtonSeven`.
    Id(String),
    /// Exact visible text.
    Text(String),
    /// Whatever element currently holds input focus.
    Focused,
}

impl Locator {
    /// WebDriver `using`/`value` pair for the UiAutomator2 driver.
    pub fn strategy(&self) -> (&'static str, String) {
        match self {
            Locator::Id(id) => ("id", id.clone()),
            Locator::Text(text) => (
                "-android uiautomator",
                format!("new UiSelector().text(\"{}\")", escape_selector_string(text)),
            ),
            Locator::Focused => (
                "-android uiautomator",
                "new UiSelector().focused(true)".to_string(),
            ),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Id(id) => write!(f, "id={id}"),
            Locator::Text(text) => write!(f, "text=\"{text}\""),
            Locator::Focused => f.write_str("focused"),
        }
    }
}

fn escape_selector_string(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Operations the session manager needs from a UI-automation server.
pub trait AutomationDriver {
    /// Lightweight reachability probe; never fails, only answers.
    fn server_reachable(&self) -> bool;
    fn create_session(&self, options: &SessionOptions) -> Result<SessionId, AppError>;
    fn delete_session(&self, session: &SessionId) -> Result<(), AppError>;
    fn current_package(&self, session: &SessionId) -> Result<String, AppError>;
    fn find_elements(
        &self,
        session: &SessionId,
        locator: &Locator,
    ) -> Result<Vec<ElementId>, AppError>;
    fn element_attribute(
        &self,
        session: &SessionId,
        element: &ElementId,
        name: &str,
    ) -> Result<Option<String>, AppError>;
    /// Displayed and enabled.
    fn element_clickable(&self, session: &SessionId, element: &ElementId) -> Result<bool, AppError>;
    fn click(&self, session: &SessionId, element: &ElementId) -> Result<(), AppError>;
    fn press_keycode(&self, session: &SessionId, keycode: i32) -> Result<(), AppError>;

    fn find_element(&self, session: &SessionId, locator: &Locator) -> Result<ElementId, AppError> {
        self.find_elements(session, locator)?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::not_found(format!("No element matches {locator}"), ""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_locator_builds_escaped_uiselector() {
        let (using, value) = Locator::Text("say \"hi\"".to_string()).strategy();
        assert_eq!(using, "-android uiautomator");
        assert_eq!(value, r#"new UiSelector().text("say \"hi\"")"#);
    }

    #[test]
    fn id_and_focused_locators() {
        assert_eq!(
            Locator::Id("pkg:id/keypadButtonOne".to_string()).strategy(),
            ("id", "pkg:id/keypadButtonOne".to_string())
        );
        assert_eq!(
            Locator::Focused.strategy().1,
            "new UiSelector().focused(true)"
        );
    }
}
