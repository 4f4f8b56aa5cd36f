use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::app::error::AppError;

pub const CONFIG_PATH_ENV: &str = "TV_QA_PANEL_CONFIG_PATH";
/// Upper bound for every configured wait or per-request timeout, in milliseconds.
pub const MAX_WAIT_MS: u64 = 60_000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdbSettings {
    pub command_path: String,
    pub connect_port: u16,
    pub command_timeout_secs: u64,
}

impl Default for AdbSettings {
    fn default() -> Self {
        Self {
            command_path: String::new(),
            connect_port: 5555,
            command_timeout_secs: 30,
        }
    }
}

impl AdbSettings {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppiumSettings {
    pub host: String,
    pub port: u16,
    pub status_timeout_ms: u64,
    pub probe_timeout_ms: u64,
    #[serde(default = "default_lookup_timeout_ms")]
    pub lookup_timeout_ms: u64,
    pub new_command_timeout_secs: u64,
    pub start_script: String,
    pub kill_script: String,
}

impl Default for AppiumSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 4723,
            status_timeout_ms: 2000,
            probe_timeout_ms: 350,
            lookup_timeout_ms: default_lookup_timeout_ms(),
            new_command_timeout_secs: 120,
            start_script: "scripts/start_appium.sh".to_string(),
            kill_script: "scripts/kill_appium.sh".to_string(),
        }
    }
}

fn default_lookup_timeout_ms() -> u64 {
    1000
}

impl AppiumSettings {
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingSettings {
    pub log_dir: String,
    pub file_prefix: String,
    pub max_log_files: usize,
    pub log_level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            log_dir: "logs".to_string(),
            file_prefix: "android_manager".to_string(),
            max_log_files: 7,
            log_level: "debug".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoginSettings {
    pub prod_package: String,
    pub uat_package: String,
    pub main_activity: String,
    pub first_button_text: String,
    pub second_button_text: String,
    pub screen_wait_ms: u64,
    pub poll_interval_ms: u64,
    pub keypad_id_prefix: String,
    pub digit_wait_ms: u64,
    pub close_session_on_failure: bool,
}

impl Default for LoginSettings {
    fn default() -> Self {
        Self {
            prod_package: "tv.freetv.androidtv".to_string(),
            uat_package: "tv.freetv.androidtv.uat".to_string(),
            main_activity: "pl.atende.mobile.tv.ui.gui.main.activity.MainActivity".to_string(),
            first_button_text: "להצטרפות וקבלת חודש ניסיון בחינם".to_string(),
            second_button_text: "כניסה למנויים קיימים".to_string(),
            screen_wait_ms: 1200,
            poll_interval_ms: 300,
            keypad_id_prefix: "tv.freetv.androidtv:id/keypadButton".to_string(),
            digit_wait_ms: 1000,
            close_session_on_failure: false,
        }
    }
}

impl LoginSettings {
    pub fn screen_texts(&self) -> Vec<String> {
        vec![
            self.first_button_text.clone(),
            self.second_button_text.clone(),
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PanelConfig {
    #[serde(default)]
    pub adb: AdbSettings,
    #[serde(default)]
    pub appium: AppiumSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default)]
    pub login: LoginSettings,
}

pub fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }
    home_dir().join(".tv_qa_panel_config.json")
}

pub fn backup_config_path(path: &Path) -> PathBuf {
    path.with_extension("backup.json")
}

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

pub fn load_config() -> Result<PanelConfig, AppError> {
    load_config_from_path(&config_path())
}

pub fn save_config(config: &PanelConfig) -> Result<(), AppError> {
    let path = config_path();
    save_config_to_path(config, &path, &backup_config_path(&path))
}

pub fn load_config_from_path(path: &Path) -> Result<PanelConfig, AppError> {
    if !path.exists() {
        return Ok(PanelConfig::default());
    }
    let raw = fs::read_to_string(path)
        .map_err(|err| AppError::system(format!("Failed to read config: {err}"), ""))?;
    let config: PanelConfig = serde_json::from_str(&raw)
        .map_err(|err| AppError::validation(format!("Failed to parse config: {err}"), ""))?;
    Ok(validate_config(config))
}

pub fn save_config_to_path(
    config: &PanelConfig,
    path: &Path,
    backup_path: &Path,
) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    if path.exists() {
        let _ = fs::copy(path, backup_path);
    }
    let payload = serde_json::to_string_pretty(config)
        .map_err(|err| AppError::system(format!("Failed to serialize config: {err}"), ""))?;
    fs::write(path, payload)
        .map_err(|err| AppError::system(format!("Failed to write config: {err}"), ""))?;
    Ok(())
}

fn validate_config(mut config: PanelConfig) -> PanelConfig {
    let adb_defaults = AdbSettings::default();
    let appium_defaults = AppiumSettings::default();
    let logging_defaults = LoggingSettings::default();
    let login_defaults = LoginSettings::default();

    if config.adb.connect_port == 0 {
        config.adb.connect_port = adb_defaults.connect_port;
    }
    if config.adb.command_timeout_secs == 0 {
        config.adb.command_timeout_secs = adb_defaults.command_timeout_secs;
    }
    if config.appium.host.trim().is_empty() {
        config.appium.host = appium_defaults.host;
    }
    if config.appium.port == 0 {
        config.appium.port = appium_defaults.port;
    }
    if config.appium.status_timeout_ms == 0 {
        config.appium.status_timeout_ms = appium_defaults.status_timeout_ms;
    }
    if config.appium.probe_timeout_ms == 0 {
        config.appium.probe_timeout_ms = appium_defaults.probe_timeout_ms;
    }
    if config.appium.lookup_timeout_ms == 0 {
        config.appium.lookup_timeout_ms = appium_defaults.lookup_timeout_ms;
    }
    config.appium.status_timeout_ms = config.appium.status_timeout_ms.min(MAX_WAIT_MS);
    config.appium.probe_timeout_ms = config.appium.probe_timeout_ms.min(MAX_WAIT_MS);
    config.appium.lookup_timeout_ms = config.appium.lookup_timeout_ms.min(MAX_WAIT_MS);
    if config.logging.log_dir.trim().is_empty() {
        config.logging.log_dir = logging_defaults.log_dir;
    }
    if config.logging.file_prefix.trim().is_empty() {
        config.logging.file_prefix = logging_defaults.file_prefix;
    }
    if config.logging.max_log_files == 0 {
        config.logging.max_log_files = logging_defaults.max_log_files;
    }
    if config.login.poll_interval_ms < 50 {
        config.login.poll_interval_ms = login_defaults.poll_interval_ms;
    }
    if config.login.screen_wait_ms == 0 {
        config.login.screen_wait_ms = login_defaults.screen_wait_ms;
    }
    if config.login.digit_wait_ms == 0 {
        config.login.digit_wait_ms = login_defaults.digit_wait_ms;
    }
    config.login.screen_wait_ms = config.login.screen_wait_ms.min(MAX_WAIT_MS);
    config.login.digit_wait_ms = config.login.digit_wait_ms.min(MAX_WAIT_MS);
    config.login.poll_interval_ms = config.login.poll_interval_ms.min(MAX_WAIT_MS);
    config
}
