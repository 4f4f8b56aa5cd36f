use super::*;

use std::cell::RefCell;

use crate::app::adb::gateway::fake::ScriptedRunner;
use crate::app::automation::fake::FakeDriver;
use crate::app::automation::session::SessionSettings;
use crate::app::config::AdbSettings;
use crate::app::error::ErrorCode;
use crate::app::keys::{KEYCODE_DPAD_DOWN, KEYCODE_DPAD_LEFT, KEYCODE_DPAD_RIGHT, KEYCODE_OK};
use crate::app::polling::fake::ManualClock;

const READY_LISTING: &str = "List of devices attached\n10.0.0.5:5555\tdevice\n";

#[derive(Default)]
struct RecordingNotifier {
    shown: RefCell<Vec<(String, String)>>,
}

impl Notifier for RecordingNotifier {
    fn error(&self, title: &str, message: &str) {
        self.shown
            .borrow_mut()
            .push((title.to_string(), message.to_string()));
    }
}

impl RecordingNotifier {
    fn titles(&self) -> Vec<String> {
        self.shown.borrow().iter().map(|(t, _)| t.clone()).collect()
    }
}

struct Harness {
    gateway: DeviceGateway<ScriptedRunner>,
    sessions: SessionManager<FakeDriver, ManualClock>,
    login: LoginSettings,
    notifier: RecordingNotifier,
}

impl Harness {
    fn new() -> Self {
        Self {
            gateway: DeviceGateway::with_runner(ScriptedRunner::default(), &AdbSettings::default()),
            sessions: SessionManager::with_clock(
                FakeDriver::default(),
                ManualClock::new(),
                SessionSettings::default(),
            ),
            login: LoginSettings::default(),
            notifier: RecordingNotifier::default(),
        }
    }

    /// Device online, Appium up, FreeTV showing the login screen with focus on the
    /// first button.
    fn ready() -> Self {
        let harness = Self::new();
        harness.gateway.runner().respond_stdout(READY_LISTING);
        let driver = harness.sessions.driver();
        driver.set_foreground(&harness.login.prod_package);
        driver.add_text(&harness.login.first_button_text);
        driver.add_text(&harness.login.second_button_text);
        driver.focus(&harness.login.first_button_text);
        driver.left_moves_focus_to(&harness.login.second_button_text);
        driver.add_keypad(&harness.login.keypad_id_prefix);
        harness
    }

    fn run(&mut self, phone: &str) -> Result<ConnectReport, FlowFailure> {
        AccountConnector::new(&self.gateway, &mut self.sessions, &self.login, &self.notifier)
            .run(phone)
    }
}

#[test]
fn phone_shape_boundaries() {
    assert!(PhoneNumber::parse("0501234567").is_ok());
    assert!(PhoneNumber::parse("05012345678").is_ok());
    assert!(PhoneNumber::parse("  0501234567 ").is_ok());

    for bad in [
        "050123456",
        "050123456789",
        "0601234567",
        "5501234567",
        "05012a4567",
        "",
        "05-1234567",
    ] {
        let err = PhoneNumber::parse(bad).unwrap_err();
        assert_eq!(err.code, ErrorCode::Validation, "accepted {bad:?}");
    }
}

#[test]
fn steps_are_numbered_in_pipeline_order() {
    assert_eq!(ConnectStep::ValidatePhone.number(), 1);
    assert_eq!(ConnectStep::TypePhone.number(), 9);
    assert_eq!(ConnectStep::ValidatePhone.tier(), FailureTier::UserInput);
    assert_eq!(ConnectStep::RequireAppium.tier(), FailureTier::Environment);
}

#[test]
fn bad_phone_aborts_before_any_external_call() {
    let mut harness = Harness::ready();
    let failure = harness.run("12345").unwrap_err();

    assert_eq!(failure.step, ConnectStep::ValidatePhone);
    assert!(!failure.error.trace_id.is_empty());
    assert!(harness.gateway.runner().calls().is_empty());
    assert!(harness.sessions.driver().events().is_empty());
    assert_eq!(harness.notifier.titles(), vec!["Invalid Phone Number"]);
}

#[test]
fn listed_but_offline_device_is_rejected() {
    let mut harness = Harness::new();
    harness
        .gateway
        .runner()
        .respond_stdout("List of devices attached\n10.0.0.5:5555\toffline\nZX1\tunauthorized\n");

    let failure = harness.run("0501234567").unwrap_err();
    assert_eq!(failure.step, ConnectStep::RequireDevice);
    assert_eq!(harness.gateway.runner().calls(), vec![vec!["devices".to_string()]]);
    assert!(harness.sessions.driver().events().is_empty());
    assert_eq!(harness.notifier.titles(), vec!["No Device"]);
}

#[test]
fn unreachable_appium_stops_before_session() {
    let mut harness = Harness::ready();
    harness.sessions.driver().set_reachable(false);

    let failure = harness.run("0501234567").unwrap_err();
    assert_eq!(failure.step, ConnectStep::RequireAppium);
    assert!(!harness.sessions.is_active());
    assert!(harness.sessions.driver().events().is_empty());
}

#[test]
fn session_creation_error_is_reported_once() {
    let mut harness = Harness::ready();
    harness.sessions.driver().fail_create(true);

    let failure = harness.run("0501234567").unwrap_err();
    assert_eq!(failure.step, ConnectStep::AttachSession);
    assert!(!harness.sessions.is_active());
    assert_eq!(harness.notifier.titles(), vec!["Appium Error"]);
}

#[test]
fn session_attaches_without_launching() {
    let mut harness = Harness::ready();
    harness.run("0501234567").expect("flow");

    let options = harness.sessions.driver().last_options().expect("options");
    assert!(!options.auto_launch);
    assert_eq!(options.app_package.as_deref(), Some("tv.freetv.androidtv"));
}

#[test]
fn app_not_in_foreground_keeps_session_by_default() {
    let mut harness = Harness::ready();
    harness.sessions.driver().set_foreground("com.google.android.tvlauncher");

    let failure = harness.run("0501234567").unwrap_err();
    assert_eq!(failure.step, ConnectStep::VerifyForeground);
    assert!(harness.sessions.is_active());
    let shown = harness.notifier.shown.borrow();
    assert_eq!(shown[0].0, "Open FreeTV");
    assert!(shown[0].1.contains("Please open the FreeTV app"));
}

#[test]
fn failure_after_attach_closes_session_when_configured() {
    let mut harness = Harness::ready();
    harness.login.close_session_on_failure = true;
    harness.sessions.driver().set_foreground("com.google.android.tvlauncher");

    harness.run("0501234567").unwrap_err();
    assert!(!harness.sessions.is_active());
}

#[test]
fn failure_before_attach_ignores_close_setting() {
    let mut harness = Harness::ready();
    harness.login.close_session_on_failure = true;
    harness.sessions.driver().set_reachable(false);

    harness.run("0501234567").unwrap_err();
    assert!(harness.sessions.driver().events().is_empty());
}

#[test]
fn missing_login_screen_gives_up_after_screen_wait() {
    let mut harness = Harness::new();
    harness.gateway.runner().respond_stdout(READY_LISTING);
    harness
        .sessions
        .driver()
        .set_foreground(&harness.login.prod_package);

    let failure = harness.run("0501234567").unwrap_err();
    assert_eq!(failure.step, ConnectStep::VerifyLoginScreen);
    assert_eq!(
        harness.sessions.clock().elapsed(),
        Duration::from_millis(harness.login.screen_wait_ms)
    );
    assert!(harness.sessions.driver().keys().is_empty());
}

#[test]
fn focus_that_cannot_move_aborts_before_typing() {
    let mut harness = Harness::new();
    harness.gateway.runner().respond_stdout(READY_LISTING);
    let driver = harness.sessions.driver();
    driver.set_foreground(&harness.login.prod_package);
    driver.add_text(&harness.login.first_button_text);
    driver.add_text(&harness.login.second_button_text);
    driver.focus(&harness.login.first_button_text);

    let failure = harness.run("0501234567").unwrap_err();
    assert_eq!(failure.step, ConnectStep::FocusExistingSubscriber);
    assert!(failure.error.error.contains("כניסה למנויים קיימים"));
    assert_eq!(harness.sessions.driver().keys(), vec![KEYCODE_DPAD_LEFT]);
    assert!(harness.sessions.driver().click_attempts().is_empty());
}

#[test]
fn full_flow_navigates_and_types_number() {
    let mut harness = Harness::ready();
    let report = harness.run("0501234567").expect("flow");

    assert_eq!(report.phone.as_str(), "0501234567");
    assert_eq!(report.focused_text, harness.login.first_button_text);
    assert_eq!(report.digits.attempted.len(), 10);
    assert!(report.digits.failed.is_empty());
    assert!(report.digits.confirmed);
    assert_eq!(harness.sessions.driver().click_attempts().len(), 10);
    assert_eq!(
        harness.sessions.driver().keys(),
        vec![
            KEYCODE_DPAD_LEFT,
            KEYCODE_OK,
            KEYCODE_DPAD_DOWN,
            KEYCODE_DPAD_DOWN,
            KEYCODE_DPAD_DOWN,
            KEYCODE_DPAD_DOWN,
            KEYCODE_DPAD_DOWN,
            KEYCODE_DPAD_RIGHT,
            KEYCODE_OK,
        ]
    );
    assert!(harness.sessions.is_active());
    assert!(harness.notifier.shown.borrow().is_empty());
}

#[test]
fn rerun_replaces_previous_session() {
    let mut harness = Harness::ready();
    harness.run("0501234567").expect("first");
    harness.gateway.runner().respond_stdout(READY_LISTING);
    harness.sessions.driver().focus(&harness.login.second_button_text);
    harness.run("0501234567").expect("second");

    let events = harness.sessions.driver().events();
    assert_eq!(events.len(), 3);
}
