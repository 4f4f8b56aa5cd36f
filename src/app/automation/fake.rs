use std::cell::RefCell;

use crate::app::automation::capabilities::SessionOptions;
use crate::app::automation::driver::{AutomationDriver, ElementId, Locator, SessionId};
use crate::app::error::AppError;
use crate::app::keys::{digit_name, KEYCODE_DPAD_LEFT};

const FOCUSED_DESCRIPTION_ELEMENT: &str = "focused:desc";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverEvent {
    Create(String),
    Delete(String),
}

#[derive(Default)]
struct FakeState {
    unreachable: bool,
    created: usize,
    events: Vec<DriverEvent>,
    last_options: Option<SessionOptions>,
    fail_create: bool,
    fail_delete: bool,
    fail_current_package: bool,
    fail_lookups: bool,
    foreground: String,
    texts: Vec<String>,
    ids: Vec<String>,
    focused: Option<String>,
    focused_description: Option<String>,
    left_target: Option<String>,
    hidden_text_lookups: usize,
    failing_clicks: Vec<String>,
    clicks: Vec<String>,
    keys: Vec<i32>,
}

/// In-memory screen with text buttons, id-addressed keypad keys and a focus cursor.
#[derive(Default)]
pub struct FakeDriver {
    state: RefCell<FakeState>,
}

impl FakeDriver {
    pub fn set_reachable(&self, reachable: bool) {
        self.state.borrow_mut().unreachable = !reachable;
    }

    pub fn fail_create(&self, fail: bool) {
        self.state.borrow_mut().fail_create = fail;
    }

    pub fn fail_delete(&self, fail: bool) {
        self.state.borrow_mut().fail_delete = fail;
    }

    pub fn fail_current_package(&self, fail: bool) {
        self.state.borrow_mut().fail_current_package = fail;
    }

    pub fn fail_lookups(&self, fail: bool) {
        self.state.borrow_mut().fail_lookups = fail;
    }

    pub fn set_foreground(&self, package: &str) {
        self.state.borrow_mut().foreground = package.to_string();
    }

    pub fn add_text(&self, text: &str) {
        self.state.borrow_mut().texts.push(text.to_string());
    }

    pub fn add_id(&self, id: &str) {
        self.state.borrow_mut().ids.push(id.to_string());
    }

    pub fn add_keypad(&self, prefix: &str) {
        for digit in '0'..='9' {
            if let Some(name) = digit_name(digit) {
                self.add_id(&format!("{prefix}{name}"));
            }
        }
    }

    pub fn focus(&self, text: &str) {
        self.state.borrow_mut().focused = Some(text.to_string());
    }

    pub fn set_focused_description_only(&self, description: &str) {
        self.state.borrow_mut().focused_description = Some(description.to_string());
    }

    pub fn left_moves_focus_to(&self, text: &str) {
        self.state.borrow_mut().left_target = Some(text.to_string());
    }

    /// The next `count` text lookups report nothing on screen.
    pub fn hide_texts_for_lookups(&self, count: usize) {
        self.state.borrow_mut().hidden_text_lookups = count;
    }

    pub fn fail_click(&self, id: &str) {
        self.state.borrow_mut().failing_clicks.push(id.to_string());
    }

    pub fn events(&self) -> Vec<DriverEvent> {
        self.state.borrow().events.clone()
    }

    pub fn clear_events(&self) {
        self.state.borrow_mut().events.clear();
    }

    pub fn last_options(&self) -> Option<SessionOptions> {
        self.state.borrow().last_options.clone()
    }

    pub fn click_attempts(&self) -> Vec<String> {
        self.state.borrow().clicks.clone()
    }

    pub fn keys(&self) -> Vec<i32> {
        self.state.borrow().keys.clone()
    }
}

fn text_element(text: &str) -> ElementId {
    ElementId(format!("text:{text}"))
}

impl AutomationDriver for FakeDriver {
    fn server_reachable(&self) -> bool {
        !self.state.borrow().unreachable
    }

    fn create_session(&self, options: &SessionOptions) -> Result<SessionId, AppError> {
        let mut state = self.state.borrow_mut();
        if state.fail_create {
            return Err(AppError::dependency("session not created", ""));
        }
        state.created += 1;
        let id = format!("session-{}", state.created);
        state.events.push(DriverEvent::Create(id.clone()));
        state.last_options = Some(options.clone());
        Ok(SessionId(id))
    }

    fn delete_session(&self, session: &SessionId) -> Result<(), AppError> {
        let mut state = self.state.borrow_mut();
        state.events.push(DriverEvent::Delete(session.0.clone()));
        if state.fail_delete {
            return Err(AppError::dependency("session already gone", ""));
        }
        Ok(())
    }

    fn current_package(&self, _session: &SessionId) -> Result<String, AppError> {
        let state = self.state.borrow();
        if state.fail_current_package {
            return Err(AppError::dependency("device went away", ""));
        }
        Ok(state.foreground.clone())
    }

    fn find_elements(
        &self,
        _session: &SessionId,
        locator: &Locator,
    ) -> Result<Vec<ElementId>, AppError> {
        let mut state = self.state.borrow_mut();
        if state.fail_lookups {
            return Err(AppError::dependency("lookup failed", ""));
        }
        let found = match locator {
            Locator::Text(text) => {
                if state.hidden_text_lookups > 0 {
                    state.hidden_text_lookups -= 1;
                    None
                } else {
                    state.texts.contains(text).then(|| text_element(text))
                }
            }
            Locator::Id(id) => state
                .ids
                .contains(id)
                .then(|| ElementId(format!("id:{id}"))),
            Locator::Focused => {
                if state.focused_description.is_some() {
                    Some(ElementId(FOCUSED_DESCRIPTION_ELEMENT.to_string()))
                } else {
                    state.focused.as_deref().map(text_element)
                }
            }
        };
        Ok(found.into_iter().collect())
    }

    fn element_attribute(
        &self,
        _session: &SessionId,
        element: &ElementId,
        name: &str,
    ) -> Result<Option<String>, AppError> {
        let state = self.state.borrow();
        if element.0 == FOCUSED_DESCRIPTION_ELEMENT {
            return Ok(match name {
                "text" => Some(String::new()),
                "content-desc" => state.focused_description.clone(),
                _ => None,
            });
        }
        let Some(text) = element.0.strip_prefix("text:") else {
            return Ok(None);
        };
        Ok(match name {
            "text" => Some(text.to_string()),
            "focused" => Some((state.focused.as_deref() == Some(text)).to_string()),
            _ => None,
        })
    }

    fn element_clickable(&self, _session: &SessionId, element: &ElementId) -> Result<bool, AppError> {
        let state = self.state.borrow();
        Ok(element
            .0
            .strip_prefix("id:")
            .is_some_and(|id| state.ids.iter().any(|known| known == id)))
    }

    fn click(&self, _session: &SessionId, element: &ElementId) -> Result<(), AppError> {
        let mut state = self.state.borrow_mut();
        let id = element.0.strip_prefix("id:").unwrap_or(&element.0).to_string();
        state.clicks.push(id.clone());
        if state.failing_clicks.contains(&id) {
            return Err(AppError::dependency(format!("click on {id} rejected"), ""));
        }
        Ok(())
    }

    fn press_keycode(&self, _session: &SessionId, keycode: i32) -> Result<(), AppError> {
        let mut state = self.state.borrow_mut();
        state.keys.push(keycode);
        if keycode == KEYCODE_DPAD_LEFT {
            if let Some(target) = state.left_target.clone() {
                state.focused = Some(target);
            }
        }
        Ok(())
    }
}
