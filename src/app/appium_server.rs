use std::net::{TcpStream, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

use tracing::{error, info};
use uuid::Uuid;

use crate::app::adb::runner::run_command_with_timeout;
use crate::app::config::AppiumSettings;
use crate::app::error::AppError;

const KILL_TIMEOUT: Duration = Duration::from_secs(15);

/// Cheap TCP connect probe; any resolution or connect failure reads as closed.
pub fn port_open(host: &str, port: u16, timeout: Duration) -> bool {
    let Ok(mut addrs) = (host, port).to_socket_addrs() else {
        return false;
    };
    addrs.any(|addr| TcpStream::connect_timeout(&addr, timeout).is_ok())
}

/// Local Appium server process control.
pub struct AppiumServer {
    host: String,
    port: u16,
    probe_timeout: Duration,
    start_script: PathBuf,
    kill_script: PathBuf,
}

impl AppiumServer {
    pub fn from_settings(settings: &AppiumSettings) -> Self {
        Self {
            host: settings.host.clone(),
            port: settings.port,
            probe_timeout: Duration::from_millis(settings.probe_timeout_ms),
            start_script: PathBuf::from(&settings.start_script),
            kill_script: PathBuf::from(&settings.kill_script),
        }
    }

    pub fn is_running(&self) -> bool {
        port_open(&self.host, self.port, self.probe_timeout)
    }

    fn script_or(script: &Path, program: &str, args: &[&str]) -> (String, Vec<String>) {
        if script.is_file() {
            ("bash".to_string(), vec![script.to_string_lossy().to_string()])
        } else {
            (
                program.to_string(),
                args.iter().map(|arg| arg.to_string()).collect(),
            )
        }
    }

    pub fn launch_command(&self) -> (String, Vec<String>) {
        Self::script_or(&self.start_script, "appium", &[])
    }

    pub fn kill_command(&self) -> (String, Vec<String>) {
        Self::script_or(&self.kill_script, "pkill", &["-f", "appium"])
    }

    /// Starts the server detached unless something already listens on its port.
    pub fn start(&self) -> Result<String, AppError> {
        if self.is_running() {
            let message = format!("Appium already running on {}:{}", self.host, self.port);
            info!("{message}");
            return Ok(message);
        }
        let (program, args) = self.launch_command();
        Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|err| {
                error!("Failed to start Appium server: {err}");
                AppError::dependency(format!("Failed to start Appium server:\n{err}"), "")
            })?;
        let message = if program == "bash" {
            format!("Attempted to start Appium via {}", self.start_script.display())
        } else {
            "Appium server start requested (direct).".to_string()
        };
        info!("{message}");
        Ok(message)
    }

    pub fn stop(&self) -> Result<String, AppError> {
        let trace_id = Uuid::new_v4().to_string();
        let (program, args) = self.kill_command();
        run_command_with_timeout(&program, &args, KILL_TIMEOUT, &trace_id).map_err(|err| {
            error!(trace_id = %trace_id, "Failed to kill Appium server: {}", err.error);
            AppError::new(
                err.code,
                format!("Failed to kill Appium server:\n{}", err.error),
                trace_id.as_str(),
            )
        })?;
        let message = if program == "bash" {
            format!("Requested Appium stop via {}", self.kill_script.display())
        } else {
            "Appium server kill requested (pkill).".to_string()
        };
        info!("{message}");
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    fn server_for(port: u16, scripts: &Path) -> AppiumServer {
        AppiumServer::from_settings(&AppiumSettings {
            port,
            probe_timeout_ms: 200,
            start_script: scripts.join("start_appium.sh").to_string_lossy().to_string(),
            kill_script: scripts.join("kill_appium.sh").to_string_lossy().to_string(),
            ..AppiumSettings::default()
        })
    }

    #[test]
    fn probe_sees_listener_and_closed_port() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().expect("addr").port();
        assert!(port_open("127.0.0.1", port, Duration::from_millis(200)));
        drop(listener);
        assert!(!port_open("127.0.0.1", port, Duration::from_millis(200)));
        assert!(!port_open("host.invalid", port, Duration::from_millis(200)));
    }

    #[test]
    fn start_is_noop_when_port_already_open() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().expect("addr").port();
        let dir = tempfile::tempdir().expect("tempdir");
        let message = server_for(port, dir.path()).start().expect("start");
        assert!(message.starts_with("Appium already running"));
    }

    #[test]
    fn scripts_take_precedence_when_present() {
        let dir = tempfile::tempdir().expect("tempdir");
        let server = server_for(4723, dir.path());
        assert_eq!(server.launch_command(), ("appium".to_string(), vec![]));
        assert_eq!(
            server.kill_command(),
            ("pkill".to_string(), vec!["-f".to_string(), "appium".to_string()])
        );

        let script = dir.path().join("kill_appium.sh");
        std::fs::write(&script, "#!/bin/sh\nexit 0\n").expect("write");
        let (program, args) = server.kill_command();
        assert_eq!(program, "bash");
        assert_eq!(args, vec![script.to_string_lossy().to_string()]);
    }
}
