use std::time::Duration;

use tracing::{error, info, warn};

use crate::app::automation::capabilities::SessionOptions;
use crate::app::automation::driver::{AutomationDriver, ElementId, Locator, SessionId};
use crate::app::config::PanelConfig;
use crate::app::error::AppError;
use crate::app::keys::{digit_name, KEYCODE_DPAD_DOWN, KEYCODE_DPAD_LEFT, KEYCODE_DPAD_RIGHT, KEYCODE_OK};
use crate::app::polling::{poll_until, Clock, SystemClock};

const CLICKABLE_POLL_INTERVAL: Duration = Duration::from_millis(100);
const CONFIRM_DOWN_PRESSES: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    NoSession,
    Active(SessionId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    pub server_address: String,
    pub device_name: String,
    pub new_command_timeout_secs: u64,
    pub poll_interval: Duration,
    pub digit_wait: Duration,
    pub keypad_id_prefix: String,
}

impl SessionSettings {
    pub fn from_config(config: &PanelConfig) -> Self {
        Self {
            server_address: config.appium.address(),
            device_name: "Android TV".to_string(),
            new_command_timeout_secs: config.appium.new_command_timeout_secs,
            poll_interval: Duration::from_millis(config.login.poll_interval_ms),
            digit_wait: Duration::from_millis(config.login.digit_wait_ms),
            keypad_id_prefix: config.login.keypad_id_prefix.clone(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from_config(&PanelConfig::default())
    }
}

/// Outcome of the keypad entry; per-digit failures do not stop the loop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DigitEntryReport {
    pub attempted: Vec<char>,
    pub failed: Vec<char>,
    pub confirmed: bool,
}

/// Owns at most one automation session at a time.
pub struct SessionManager<D, C = SystemClock> {
    driver: D,
    clock: C,
    settings: SessionSettings,
    state: SessionState,
}

impl<D: AutomationDriver> SessionManager<D, SystemClock> {
    pub fn new(driver: D, settings: SessionSettings) -> Self {
        Self::with_clock(driver, SystemClock, settings)
    }
}

impl<D: AutomationDriver, C: Clock> SessionManager<D, C> {
    pub fn with_clock(driver: D, clock: C, settings: SessionSettings) -> Self {
        Self {
            driver,
            clock,
            settings,
            state: SessionState::NoSession,
        }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, SessionState::Active(_))
    }

    pub fn server_reachable(&self) -> bool {
        self.driver.server_reachable()
    }

    fn session(&self) -> Option<&SessionId> {
        match &self.state {
            SessionState::Active(id) => Some(id),
            SessionState::NoSession => None,
        }
    }

    fn require_session(&self) -> Result<&SessionId, AppError> {
        self.session().ok_or_else(|| AppError::no_session(""))
    }

    /// Opens a new session, replacing any live one. With `auto_launch == false` the
    /// session attaches to the foreground app without launching or resetting it.
    pub fn start(
        &mut self,
        package: Option<&str>,
        activity: Option<&str>,
        auto_launch: bool,
    ) -> Result<(), AppError> {
        if !self.driver.server_reachable() {
            let message = format!(
                "Appium server is not running on {}.",
                self.settings.server_address
            );
            error!("{message}");
            return Err(AppError::dependency(message, ""));
        }

        if let SessionState::Active(previous) = std::mem::replace(&mut self.state, SessionState::NoSession) {
            match self.driver.delete_session(&previous) {
                Ok(()) => info!("Previous Appium session closed."),
                Err(err) => error!("Error closing old Appium driver: {err}"),
            }
        }

        let options = SessionOptions {
            device_name: self.settings.device_name.clone(),
            app_package: package.map(str::to_string),
            app_activity: activity.map(str::to_string),
            new_command_timeout_secs: self.settings.new_command_timeout_secs,
            auto_launch,
            ..SessionOptions::default()
        };
        match self.driver.create_session(&options) {
            Ok(id) => {
                info!(session_id = %id, "Appium driver initialized");
                self.state = SessionState::Active(id);
                Ok(())
            }
            Err(err) => {
                error!("Failed to initialize Appium driver: {err}");
                Err(err)
            }
        }
    }

    /// Ends the live session, if any. Always leaves the manager without a session.
    pub fn stop(&mut self) {
        if let SessionState::Active(id) = std::mem::replace(&mut self.state, SessionState::NoSession) {
            match self.driver.delete_session(&id) {
                Ok(()) => info!("Appium driver closed manually."),
                Err(err) => warn!("Error closing Appium driver: {err}"),
            }
        }
    }

    /// Package owning the screen, or `None` without a session or on query failure.
    pub fn foreground_package(&self) -> Option<String> {
        let session = self.session()?;
        match self.driver.current_package(session) {
            Ok(current) => Some(current),
            Err(err) => {
                warn!("Could not read current_package: {err}");
                None
            }
        }
    }

    pub fn is_package_in_foreground(&self, expected_package: &str) -> bool {
        self.foreground_package()
            .is_some_and(|current| current == expected_package)
    }

    fn text_present(&self, session: &SessionId, text: &str) -> Result<bool, AppError> {
        let found = self
            .driver
            .find_elements(session, &Locator::Text(text.to_string()))?;
        Ok(!found.is_empty())
    }

    /// Polls until every text is on screen or `max_wait` runs out.
    pub fn verify_screen_texts_present(&self, texts: &[String], max_wait: Duration) -> bool {
        let Some(session) = self.session() else {
            return false;
        };
        let found = poll_until(&self.clock, self.settings.poll_interval, max_wait, || {
            let mut all_present = true;
            for text in texts {
                match self.text_present(session, text) {
                    Ok(true) => {}
                    Ok(false) => {
                        all_present = false;
                        break;
                    }
                    Err(err) => {
                        warn!("Quick login check error: {err}");
                        all_present = false;
                        break;
                    }
                }
            }
            all_present
        });
        if found {
            info!("Login screen verified quickly.");
        } else {
            info!("Login screen not detected within short timeout.");
        }
        found
    }

    fn read_text(&self, session: &SessionId, element: &ElementId, name: &str) -> Result<String, AppError> {
        Ok(self
            .driver
            .element_attribute(session, element, name)?
            .unwrap_or_default()
            .trim()
            .to_string())
    }

    /// Text of the focused element, falling back to its content description; empty when
    /// nothing is focused or the lookup fails.
    pub fn focused_element_text(&self) -> String {
        let Some(session) = self.session() else {
            return String::new();
        };
        let lookup = || -> Result<String, AppError> {
            let Some(element) = self
                .driver
                .find_elements(session, &Locator::Focused)?
                .into_iter()
                .next()
            else {
                return Ok(String::new());
            };
            let text = self.read_text(session, &element, "text")?;
            if !text.is_empty() {
                return Ok(text);
            }
            self.read_text(session, &element, "content-desc")
        };
        lookup().unwrap_or_else(|err| {
            warn!("Error while reading focused element: {err}");
            String::new()
        })
    }

    pub fn is_element_with_text_focused(&self, text: &str) -> Result<bool, AppError> {
        let session = self.require_session()?;
        let element = self
            .driver
            .find_element(session, &Locator::Text(text.to_string()))?;
        let focused = self
            .driver
            .element_attribute(session, &element, "focused")?
            .unwrap_or_default();
        Ok(focused.trim().eq_ignore_ascii_case("true"))
    }

    /// Injects `code` `times` times; silently does nothing without a session.
    pub fn press_key(&self, code: i32, times: u32) -> Result<(), AppError> {
        let Some(session) = self.session() else {
            return Ok(());
        };
        for _ in 0..times {
            self.driver.press_keycode(session, code)?;
        }
        Ok(())
    }

    /// Two-button horizontal menu: make sure `second_text` holds focus and confirm it.
    pub fn focus_second_and_enter(&self, first_text: &str, second_text: &str) -> bool {
        let Some(session) = self.session() else {
            warn!("Driver not initialized; cannot move focus.");
            return false;
        };

        for text in [first_text, second_text] {
            if let Err(err) = self
                .driver
                .find_element(session, &Locator::Text(text.to_string()))
            {
                warn!("Focus pre-check failed: {err}");
                return false;
            }
        }

        if self.is_element_with_text_focused(second_text).unwrap_or(false) {
            info!("Second button already focused. Pressing OK.");
            return self.confirm_focused();
        }

        if self.is_element_with_text_focused(first_text).unwrap_or(false) {
            info!("First button focused. Moving focus to the second one.");
            if let Err(err) = self.press_key(KEYCODE_DPAD_LEFT, 1) {
                warn!("Could not move focus: {err}");
                return false;
            }
            if self.is_element_with_text_focused(second_text).unwrap_or(false) {
                return self.confirm_focused();
            }
        }

        warn!("Could not focus on second button.");
        false
    }

    fn confirm_focused(&self) -> bool {
        match self.press_key(KEYCODE_OK, 1) {
            Ok(()) => true,
            Err(err) => {
                warn!("Could not press OK: {err}");
                false
            }
        }
    }

    fn keypad_locator(&self, digit: char) -> Option<Locator> {
        digit_name(digit).map(|name| Locator::Id(format!("{}{name}", self.settings.keypad_id_prefix)))
    }

    fn click_when_clickable(&self, session: &SessionId, locator: &Locator) -> Result<(), AppError> {
        let mut target: Option<ElementId> = None;
        let mut last_error: Option<AppError> = None;
        let ready = poll_until(
            &self.clock,
            CLICKABLE_POLL_INTERVAL,
            self.settings.digit_wait,
            || {
                let attempt = self.driver.find_element(session, locator).and_then(|element| {
                    let clickable = self.driver.element_clickable(session, &element)?;
                    Ok((element, clickable))
                });
                match attempt {
                    Ok((element, true)) => {
                        target = Some(element);
                        true
                    }
                    Ok((_, false)) => false,
                    Err(err) => {
                        last_error = Some(err);
                        false
                    }
                }
            },
        );
        match (ready, target) {
            (true, Some(element)) => self.driver.click(session, &element),
            _ => Err(AppError::timeout(
                format!(
                    "{locator} not clickable within {}ms{}",
                    self.settings.digit_wait.as_millis(),
                    last_error
                        .map(|err| format!(" (last error: {})", err.error))
                        .unwrap_or_default()
                ),
                "",
            )),
        }
    }

    /// Clicks each digit on the on-screen keypad, then confirms with DOWN×5, RIGHT, OK.
    /// The session stays open afterwards.
    pub fn type_phone_and_confirm(&self, number: &str) -> Result<DigitEntryReport, AppError> {
        let session = self.require_session().inspect_err(|_| {
            error!("Driver is not initialized.");
        })?;
        let mut report = DigitEntryReport::default();

        for digit in number.chars() {
            report.attempted.push(digit);
            let Some(locator) = self.keypad_locator(digit) else {
                error!("Failed to press digit {digit}: not a keypad digit");
                report.failed.push(digit);
                continue;
            };
            info!("Clicking keypad digit '{digit}' ({locator})");
            if let Err(err) = self.click_when_clickable(session, &locator) {
                error!("Failed to press digit {digit}: {err}");
                report.failed.push(digit);
            }
        }

        info!("Navigating down to confirm phone number entry...");
        let tail = self
            .press_key(KEYCODE_DPAD_DOWN, CONFIRM_DOWN_PRESSES)
            .and_then(|_| self.press_key(KEYCODE_DPAD_RIGHT, 1))
            .and_then(|_| self.press_key(KEYCODE_OK, 1));
        match tail {
            Ok(()) => {
                info!("Confirmation complete.");
                report.confirmed = true;
            }
            Err(err) => warn!("Error during navigation: {err}"),
        }
        info!("Keeping Appium session open for further actions.");
        Ok(report)
    }
}
