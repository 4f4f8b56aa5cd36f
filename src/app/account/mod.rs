use std::fmt;
use std::time::Duration;

use tracing::{error, info, warn};
use uuid::Uuid;

use crate::app::adb::gateway::DeviceGateway;
use crate::app::adb::parse::has_connected_device;
use crate::app::adb::runner::CommandRunner;
use crate::app::automation::driver::AutomationDriver;
use crate::app::automation::session::{DigitEntryReport, SessionManager};
use crate::app::config::LoginSettings;
use crate::app::error::AppError;
use crate::app::polling::Clock;

#[cfg(test)]
mod tests;

const PHONE_PREFIX: &str = "05";
const PHONE_LENGTHS: [usize; 2] = [10, 11];

/// Domestic mobile number: `05` prefix, digits only, 10 or 11 long.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let phone = raw.trim();
        let valid = phone.starts_with(PHONE_PREFIX)
            && PHONE_LENGTHS.contains(&phone.len())
            && phone.chars().all(|c| c.is_ascii_digit());
        if valid {
            Ok(Self(phone.to_string()))
        } else {
            Err(AppError::validation("Incorrect phone number.", ""))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Blocking, user-facing error channel (message box in a GUI, stderr in the terminal).
pub trait Notifier {
    fn error(&self, title: &str, message: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureTier {
    UserInput,
    Environment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectStep {
    ValidatePhone,
    RequireDevice,
    RequireAppium,
    AttachSession,
    VerifyForeground,
    VerifyLoginScreen,
    ReportFocus,
    FocusExistingSubscriber,
    TypePhone,
}

impl ConnectStep {
    pub const ALL: [ConnectStep; 9] = [
        ConnectStep::ValidatePhone,
        ConnectStep::RequireDevice,
        ConnectStep::RequireAppium,
        ConnectStep::AttachSession,
        ConnectStep::VerifyForeground,
        ConnectStep::VerifyLoginScreen,
        ConnectStep::ReportFocus,
        ConnectStep::FocusExistingSubscriber,
        ConnectStep::TypePhone,
    ];

    pub fn number(self) -> usize {
        Self::ALL
            .iter()
            .position(|step| *step == self)
            .map(|index| index + 1)
            .unwrap_or_default()
    }

    /// Dialog title used when this step aborts the flow.
    pub fn title(self) -> &'static str {
        match self {
            ConnectStep::ValidatePhone => "Invalid Phone Number",
            ConnectStep::RequireDevice => "No Device",
            ConnectStep::RequireAppium => "Appium Not Running",
            ConnectStep::AttachSession => "Appium Error",
            ConnectStep::VerifyForeground => "Open FreeTV",
            ConnectStep::VerifyLoginScreen => "Login Screen Missing",
            ConnectStep::ReportFocus => "Focus",
            ConnectStep::FocusExistingSubscriber => "Cannot Focus Button",
            ConnectStep::TypePhone => "Appium Driver Not Initialized",
        }
    }

    pub fn tier(self) -> FailureTier {
        match self {
            ConnectStep::ValidatePhone => FailureTier::UserInput,
            _ => FailureTier::Environment,
        }
    }

    fn after_attach(self) -> bool {
        self.number() > ConnectStep::AttachSession.number()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowFailure {
    pub step: ConnectStep,
    pub error: AppError,
}

impl fmt::Display for FlowFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "step {} ({}): {}", self.step.number(), self.step.title(), self.error)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectReport {
    pub trace_id: String,
    pub phone: PhoneNumber,
    pub focused_text: String,
    pub digits: DigitEntryReport,
}

/// Scripted "connect to account" flow: preconditions, attach, verify, navigate, type.
/// Any failing step aborts the run after notifying the user.
pub struct AccountConnector<'a, R, D, C> {
    gateway: &'a DeviceGateway<R>,
    sessions: &'a mut SessionManager<D, C>,
    login: &'a LoginSettings,
    notifier: &'a dyn Notifier,
}

impl<'a, R, D, C> AccountConnector<'a, R, D, C>
where
    R: CommandRunner,
    D: AutomationDriver,
    C: Clock,
{
    pub fn new(
        gateway: &'a DeviceGateway<R>,
        sessions: &'a mut SessionManager<D, C>,
        login: &'a LoginSettings,
        notifier: &'a dyn Notifier,
    ) -> Self {
        Self {
            gateway,
            sessions,
            login,
            notifier,
        }
    }

    pub fn run(&mut self, raw_phone: &str) -> Result<ConnectReport, FlowFailure> {
        let trace_id = Uuid::new_v4().to_string();
        let outcome = self.run_steps(raw_phone, &trace_id);
        if let Err(failure) = &outcome {
            self.report_failure(failure);
            if failure.step.after_attach() && self.login.close_session_on_failure {
                info!(trace_id = %trace_id, "Closing Appium session after failed account flow.");
                self.sessions.stop();
            }
        }
        outcome
    }

    fn run_steps(&mut self, raw_phone: &str, trace_id: &str) -> Result<ConnectReport, FlowFailure> {
        let fail = |step: ConnectStep, mut error: AppError| {
            error.trace_id = trace_id.to_string();
            FlowFailure { step, error }
        };

        let phone = PhoneNumber::parse(raw_phone)
            .map_err(|err| fail(ConnectStep::ValidatePhone, err))?;

        let devices = self.gateway.list_devices();
        if !has_connected_device(&devices) {
            return Err(fail(
                ConnectStep::RequireDevice,
                AppError::dependency("No device connected. Please connect a device first.", ""),
            ));
        }

        if !self.sessions.server_reachable() {
            return Err(fail(
                ConnectStep::RequireAppium,
                AppError::dependency("Appium server is not running.", ""),
            ));
        }

        // Attach to whatever is on screen; launching would reset the login screen.
        self.sessions
            .start(
                Some(&self.login.prod_package),
                Some(&self.login.main_activity),
                false,
            )
            .map_err(|err| fail(ConnectStep::AttachSession, err))?;

        if !self.sessions.is_package_in_foreground(&self.login.prod_package) {
            return Err(fail(
                ConnectStep::VerifyForeground,
                AppError::validation(
                    "FreeTV is not open on the device.\n\nPlease open the FreeTV app on the Android TV, then press 'Connect to Account' again.",
                    "",
                ),
            ));
        }

        let screen_wait = Duration::from_millis(self.login.screen_wait_ms);
        if !self
            .sessions
            .verify_screen_texts_present(&self.login.screen_texts(), screen_wait)
        {
            return Err(fail(
                ConnectStep::VerifyLoginScreen,
                AppError::not_found("Could not detect the login screen.", ""),
            ));
        }

        let focused_text = self.sessions.focused_element_text();
        if focused_text.is_empty() {
            warn!(trace_id = %trace_id, "No focused element detected.");
        } else {
            info!(trace_id = %trace_id, "Currently focused: {focused_text}");
        }

        if !self
            .sessions
            .focus_second_and_enter(&self.login.first_button_text, &self.login.second_button_text)
        {
            return Err(fail(
                ConnectStep::FocusExistingSubscriber,
                AppError::not_found(
                    format!(
                        "Could not highlight the '{}' button. Check the login screen and try again.",
                        self.login.second_button_text
                    ),
                    "",
                ),
            ));
        }

        info!(trace_id = %trace_id, "Connecting to account with phone: {phone}");
        let digits = self
            .sessions
            .type_phone_and_confirm(phone.as_str())
            .map_err(|err| fail(ConnectStep::TypePhone, err))?;

        Ok(ConnectReport {
            trace_id: trace_id.to_string(),
            phone,
            focused_text,
            digits,
        })
    }

    fn report_failure(&self, failure: &FlowFailure) {
        let step = failure.step;
        match step {
            ConnectStep::VerifyForeground => warn!(
                trace_id = %failure.error.trace_id,
                "FreeTV not in foreground when connecting to account."
            ),
            _ => error!(
                trace_id = %failure.error.trace_id,
                code = %failure.error.code,
                "Account flow aborted at step {}: {}",
                step.number(),
                failure.error.error
            ),
        }
        self.notifier.error(step.title(), &failure.error.error);
    }
}
