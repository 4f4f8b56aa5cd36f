pub mod command;


use std::io::{self, Write};
use std::path::PathBuf;

use tracing::{error, info, warn};

use crate::app::account::{AccountConnector, Notifier};
use crate::app::adb::apk::{has_apk_extension, normalize_apk_path};
use crate::app::adb::gateway::{DeviceGateway, IP_NOT_FOUND};
use crate::app::adb::runner::CommandRunner;
use crate::app::appium_server::AppiumServer;
use crate::app::automation::driver::AutomationDriver;
use crate::app::automation::session::SessionManager;
use crate::app::config::PanelConfig;
use crate::app::keys::KeyInput;
use crate::app::logging::{active_log_path, clear_log_file, LogSink};
use crate::app::models::{AppVariant, DeviceTarget};
use crate::app::polling::{Clock, SystemClock};
use crate::app::rcu::RcuRemote;

pub use command::{PanelCommand, HELP};

const CONFIRM_UNINSTALL: &str =
    "Uninstalling this app will remove it completely from the device.\n\nDo you want to continue?";
const CONFIRM_CLEAR_DATA: &str = "This action will clear all app data.\nYou will be disconnected from your account and all stored data will be removed.\n\nDo you want to continue?";
const CONFIRM_KILL: &str =
    "This will immediately stop the app from running.\n\nDo you want to continue?";

/// Yes/no question asked before destructive actions.
pub trait ConfirmPrompt {
    fn confirm(&self, title: &str, message: &str) -> bool;
}

/// Values typed into the panel's input fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PanelState {
    pub ip: String,
    pub phone: String,
    pub apk_path: Option<PathBuf>,
}

impl PanelState {
    pub fn target(&self) -> DeviceTarget {
        DeviceTarget::from_ip(&self.ip)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Done,
    Lines(Vec<String>),
    Quit,
}

pub struct ControlPanel<R, D, C = SystemClock> {
    config: PanelConfig,
    gateway: DeviceGateway<R>,
    sessions: SessionManager<D, C>,
    appium: AppiumServer,
    notifier: Box<dyn Notifier>,
    confirm: Box<dyn ConfirmPrompt>,
    log_sink: Option<LogSink>,
    state: PanelState,
}

impl<R, D, C> ControlPanel<R, D, C>
where
    R: CommandRunner,
    D: AutomationDriver,
    C: Clock,
{
    pub fn new(
        config: PanelConfig,
        gateway: DeviceGateway<R>,
        sessions: SessionManager<D, C>,
        notifier: Box<dyn Notifier>,
        confirm: Box<dyn ConfirmPrompt>,
    ) -> Self {
        let appium = AppiumServer::from_settings(&config.appium);
        Self {
            config,
            gateway,
            sessions,
            appium,
            notifier,
            confirm,
            log_sink: None,
            state: PanelState::default(),
        }
    }

    pub fn with_log_sink(mut self, sink: LogSink) -> Self {
        self.log_sink = Some(sink);
        self
    }

    pub fn state(&self) -> &PanelState {
        &self.state
    }

    pub fn gateway(&self) -> &DeviceGateway<R> {
        &self.gateway
    }

    pub fn sessions(&self) -> &SessionManager<D, C> {
        &self.sessions
    }

    /// Reads commands until `quit` or end of input, printing replies and parse errors.
    pub fn run_lines<I, W>(&mut self, lines: I, out: &mut W) -> io::Result<()>
    where
        I: IntoIterator<Item = String>,
        W: Write,
    {
        for line in lines {
            if line.trim().is_empty() {
                continue;
            }
            let command = match PanelCommand::parse(&line) {
                Ok(command) => command,
                Err(err) => {
                    writeln!(out, "{}", err.error)?;
                    continue;
                }
            };
            match self.handle(command) {
                Reply::Done => {}
                Reply::Lines(lines) => {
                    for line in lines {
                        writeln!(out, "{line}")?;
                    }
                }
                Reply::Quit => break,
            }
        }
        out.flush()
    }

    /// Closes any live automation session before the panel goes away.
    pub fn shutdown(&mut self) {
        self.sessions.stop();
    }

    pub fn handle(&mut self, command: PanelCommand) -> Reply {
        match command {
            PanelCommand::SetIp(ip) => self.state.ip = ip.trim().to_string(),
            PanelCommand::SetPhone(phone) => self.state.phone = phone.trim().to_string(),
            PanelCommand::SelectApk(path) => self.select_apk(&path),
            PanelCommand::Status => return Reply::Lines(self.status_lines()),
            PanelCommand::Connect => self.connect_device(),
            PanelCommand::Disconnect => {
                let out = self.gateway.disconnect();
                info!("{out}");
            }
            PanelCommand::ListDevices => {
                let out = self.gateway.list_devices();
                info!("{out}");
            }
            PanelCommand::InstallApk => self.install_apk(),
            PanelCommand::Reboot => {
                let out = self.gateway.reboot(&self.state.target());
                info!("{out}");
            }
            PanelCommand::DetectIp => self.detect_ip(),
            PanelCommand::GoHome => self.go_home(),
            PanelCommand::Key { key, times } => self.press_key(&key, times),
            PanelCommand::Keys(keys) => self.press_keys(&keys),
            PanelCommand::Launch(variant) => self.launch(variant),
            PanelCommand::Uninstall(variant) => self.uninstall(variant),
            PanelCommand::ClearData(variant) => self.clear_data(variant),
            PanelCommand::KillProd => self.kill_prod(),
            PanelCommand::StartAppium => {
                if let Err(err) = self.appium.start() {
                    self.notifier.error("Appium Error", &err.error);
                }
            }
            PanelCommand::StopAppium => {
                if let Err(err) = self.appium.stop() {
                    self.notifier.error("Appium Error", &err.error);
                }
            }
            PanelCommand::StartSession => self.start_session(),
            PanelCommand::StopSession => self.sessions.stop(),
            PanelCommand::ConnectAccount(phone) => {
                if let Some(phone) = phone {
                    self.state.phone = phone.trim().to_string();
                }
                self.connect_account();
            }
            PanelCommand::ShowLog => return Reply::Lines(self.log_lines()),
            PanelCommand::ClearLog => self.clear_log(),
            PanelCommand::Help => return Reply::Lines(HELP.lines().map(str::to_string).collect()),
            PanelCommand::Quit => return Reply::Quit,
        }
        Reply::Done
    }

    fn variant_package(&self, variant: AppVariant) -> &str {
        match variant {
            AppVariant::Prod => &self.config.login.prod_package,
            AppVariant::Uat => &self.config.login.uat_package,
        }
    }

    fn status_lines(&self) -> Vec<String> {
        let or_dash = |value: &str| {
            if value.is_empty() {
                "-".to_string()
            } else {
                value.to_string()
            }
        };
        vec![
            format!("IP:      {}", or_dash(&self.state.ip)),
            format!("Phone:   {}", or_dash(&self.state.phone)),
            format!(
                "APK:     {}",
                self.state
                    .apk_path
                    .as_ref()
                    .map(|path| path.display().to_string())
                    .unwrap_or_else(|| "-".to_string())
            ),
            format!(
                "Session: {}",
                if self.sessions.is_active() { "active" } else { "none" }
            ),
        ]
    }

    fn connect_device(&self) {
        let ip = self.state.ip.trim();
        if ip.is_empty() {
            error!("No IP provided.");
            self.notifier.error("Error", "Please enter IP.");
            return;
        }
        let out = self.gateway.connect(ip);
        info!("{out}");
    }

    fn select_apk(&mut self, raw: &str) {
        if raw.trim().is_empty() {
            return;
        }
        let path = normalize_apk_path(raw);
        if !has_apk_extension(&path) {
            error!("Not an APK file: {}", path.display());
            self.notifier.error("Error", "Not an APK file.");
            return;
        }
        info!("APK selected: {}", path.display());
        self.state.apk_path = Some(path);
    }

    fn install_apk(&self) {
        let Some(path) = &self.state.apk_path else {
            error!("No APK selected.");
            self.notifier.error("Error", "No APK selected.");
            return;
        };
        let out = self.gateway.install_apk(path, &self.state.target());
        info!("{out}");
    }

    fn detect_ip(&mut self) {
        let ip = self.gateway.device_ip(&DeviceTarget::Default);
        if !ip.is_empty() && ip != IP_NOT_FOUND {
            self.state.ip = ip.clone();
        }
        info!("Detected IP: {ip}");
    }

    fn go_home(&self) {
        let target = self.state.target();
        info!("Sending HOME to {}", target.label());
        let result = self.gateway.go_home(&target);
        info!("HOME result: {result}");
    }

    fn press_key(&self, key: &KeyInput, times: u32) {
        let remote = RcuRemote::new(&self.gateway, self.state.target());
        if let Err(err) = remote.press(key, times) {
            error!(code = %err.code, "{}", err.error);
            self.notifier.error("Unknown Key", &err.error);
        }
    }

    fn press_keys(&self, keys: &[KeyInput]) {
        let remote = RcuRemote::new(&self.gateway, self.state.target());
        if let Err(err) = remote.press_sequence(keys) {
            error!(code = %err.code, "{}", err.error);
            self.notifier.error("Unknown Key", &err.error);
        }
    }

    fn launch(&self, variant: AppVariant) {
        let component = format!(
            "{}/{}",
            self.variant_package(variant),
            self.config.login.main_activity
        );
        let result = self.gateway.launch(&component, &self.state.target());
        info!("Launch result: {result}");
    }

    fn uninstall(&self, variant: AppVariant) {
        if !self.confirm.confirm("Confirm Uninstall", CONFIRM_UNINSTALL) {
            info!("Uninstall of FreeTV {} cancelled.", variant.label());
            return;
        }
        let package = self.variant_package(variant);
        let result = self.gateway.uninstall(package, &self.state.target());
        info!("Uninstalled {package}: {result}");
    }

    fn clear_data(&self, variant: AppVariant) {
        if !self.confirm.confirm("Confirm Clear Data", CONFIRM_CLEAR_DATA) {
            info!("Clear data for FreeTV {} cancelled.", variant.label());
            return;
        }
        let package = self.variant_package(variant);
        let out = self.gateway.clear_data(package, &self.state.target());
        info!("{out}");
    }

    fn kill_prod(&self) {
        if !self.confirm.confirm("Confirm Kill App", CONFIRM_KILL) {
            info!("Kill app cancelled.");
            return;
        }
        let package = &self.config.login.prod_package;
        let result = self.gateway.force_stop(package, &self.state.target());
        info!("Killed {package}: {result}");
    }

    fn start_session(&mut self) {
        let login = &self.config.login;
        if let Err(err) = self.sessions.start(
            Some(&login.prod_package),
            Some(&login.main_activity),
            true,
        ) {
            self.notifier.error("Appium Error", &err.error);
        }
    }

    fn connect_account(&mut self) {
        if self.state.phone.is_empty() {
            error!("No phone number provided.");
            self.notifier
                .error("Error", "Please enter phone number (e.g., 05XXXXXXXX).");
            return;
        }
        let mut connector = AccountConnector::new(
            &self.gateway,
            &mut self.sessions,
            &self.config.login,
            self.notifier.as_ref(),
        );
        match connector.run(&self.state.phone) {
            Ok(report) => {
                if !report.digits.failed.is_empty() {
                    warn!(
                        trace_id = %report.trace_id,
                        "Digits not pressed: {}",
                        report.digits.failed.iter().collect::<String>()
                    );
                }
                info!(trace_id = %report.trace_id, "Account flow finished for {}", report.phone);
            }
            Err(failure) => info!("Account flow stopped: {failure}"),
        }
    }

    fn log_lines(&self) -> Vec<String> {
        match &self.log_sink {
            Some(sink) => sink.lines(),
            None => vec!["Log view is not attached.".to_string()],
        }
    }

    fn clear_log(&self) {
        let logging = &self.config.logging;
        let path = active_log_path(&PathBuf::from(&logging.log_dir), &logging.file_prefix);
        if let Err(err) = clear_log_file(&path) {
            error!("{}", err.error);
            self.notifier.error("Error", &err.error);
            return;
        }
        if let Some(sink) = &self.log_sink {
            sink.clear();
        }
        info!("Logs cleared.");
    }
}
