use std::path::Path;
use std::time::Duration;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::app::adb::apk::{inspect_apk, validate_apk_path};
use crate::app::adb::locator::resolve_adb_program;
use crate::app::adb::parse::{is_pm_clear_success, parse_inet_address};
use crate::app::adb::runner::{CommandOutput, CommandRunner, ProcessRunner};
use crate::app::config::AdbSettings;
use crate::app::error::AppError;
use crate::app::keys::KEYCODE_HOME;
use crate::app::models::DeviceTarget;

pub const IP_NOT_FOUND: &str = "IP address not found.";

/// Thin wrapper over the adb CLI. Every operation yields a display string; failures are
/// logged and turned into text instead of being raised.
pub struct DeviceGateway<R = ProcessRunner> {
    runner: R,
    program: String,
    connect_port: u16,
    timeout: Duration,
}

impl DeviceGateway<ProcessRunner> {
    pub fn from_settings(settings: &AdbSettings) -> Self {
        Self::with_runner(ProcessRunner, settings)
    }
}

impl<R: CommandRunner> DeviceGateway<R> {
    pub fn with_runner(runner: R, settings: &AdbSettings) -> Self {
        Self {
            runner,
            program: resolve_adb_program(&settings.command_path),
            connect_port: settings.connect_port,
            timeout: settings.command_timeout(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    fn build_args(&self, args: &[&str], target: &DeviceTarget) -> Vec<String> {
        let mut full = Vec::with_capacity(args.len() + 2);
        if let Some(serial) = target.serial(self.connect_port) {
            full.push("-s".to_string());
            full.push(serial);
        }
        full.extend(args.iter().map(|arg| arg.to_string()));
        full
    }

    pub fn try_execute(
        &self,
        args: &[&str],
        target: &DeviceTarget,
    ) -> Result<CommandOutput, AppError> {
        let trace_id = Uuid::new_v4().to_string();
        let full = self.build_args(args, target);
        debug!(trace_id = %trace_id, program = %self.program, args = ?full, "adb call");
        let output = self.runner.run(&self.program, &full, self.timeout, &trace_id)?;
        if !output.stderr.trim().is_empty() {
            warn!(trace_id = %trace_id, "ADB stderr: {}", output.stderr.trim());
        }
        Ok(output)
    }

    pub fn execute(&self, args: &[&str], target: &DeviceTarget) -> String {
        match self.try_execute(args, target) {
            Ok(output) => output.stdout.trim().to_string(),
            Err(err) => {
                warn!(trace_id = %err.trace_id, code = %err.code, "ADB command failed: {}", err.error);
                err.error
            }
        }
    }

    pub fn connect(&self, ip: &str) -> String {
        info!("Connecting to device at IP: {ip}");
        let target = DeviceTarget::from_ip(ip);
        let address = target
            .serial(self.connect_port)
            .unwrap_or_else(|| ip.trim().to_string());
        self.execute(&["connect", &address], &DeviceTarget::Default)
    }

    pub fn disconnect(&self) -> String {
        info!("Disconnecting all ADB devices");
        self.execute(&["disconnect"], &DeviceTarget::Default)
    }

    pub fn list_devices(&self) -> String {
        self.execute(&["devices"], &DeviceTarget::Default)
    }

    pub fn reboot(&self, target: &DeviceTarget) -> String {
        info!("Rebooting device: {}", target.label());
        self.execute(&["reboot"], target)
    }

    pub fn install_apk(&self, apk_path: &Path, target: &DeviceTarget) -> String {
        info!(
            "Installing APK on device {}: {}",
            target.label(),
            apk_path.display()
        );
        if let Err(message) = validate_apk_path(apk_path) {
            warn!("{message}");
            return message.to_string();
        }
        let info = inspect_apk(apk_path);
        if let Some(problem) = info.error {
            warn!("{problem}; handing it to adb anyway");
        }
        let path = apk_path.to_string_lossy();
        self.execute(&["install", &path], target)
    }

    pub fn uninstall(&self, package: &str, target: &DeviceTarget) -> String {
        info!("Uninstalling package '{package}' on device {}", target.label());
        self.execute(&["uninstall", package], target)
    }

    pub fn launch(&self, component: &str, target: &DeviceTarget) -> String {
        info!("Launching app '{component}' on device {}", target.label());
        self.execute(&["shell", "am", "start", "-n", component], target)
    }

    pub fn force_stop(&self, package: &str, target: &DeviceTarget) -> String {
        info!("Killing app '{package}' on device {}", target.label());
        self.execute(&["shell", "am", "force-stop", package], target)
    }

    pub fn clear_data(&self, package: &str, target: &DeviceTarget) -> String {
        info!("Clearing data for package '{package}' on device {}", target.label());
        let output = self.execute(&["shell", "pm", "clear", package], target);
        if is_pm_clear_success(&output) {
            format!("Data cleared for {package}.")
        } else {
            format!("Clear data result for {package}: {output}")
        }
    }

    pub fn keyevent(&self, code: i32, target: &DeviceTarget) -> String {
        info!("Sending keyevent {code} to device {}", target.label());
        let code = code.to_string();
        self.execute(&["shell", "input", "keyevent", &code], target)
    }

    pub fn go_home(&self, target: &DeviceTarget) -> String {
        self.keyevent(KEYCODE_HOME, target)
    }

    pub fn device_ip(&self, target: &DeviceTarget) -> String {
        let output = self.execute(&["shell", "ip", "-f", "inet", "addr", "show", "wlan0"], target);
        match parse_inet_address(&output) {
            Some(address) => address,
            None => {
                warn!("{IP_NOT_FOUND}");
                IP_NOT_FOUND.to_string()
            }
        }
    }
}
