use crate::app::error::AppError;
use crate::app::keys::KeyInput;
use crate::app::models::AppVariant;

pub const HELP: &str = "\
Fields:      ip <address> | phone <number> | apk <path> | status
Device:      connect | disconnect | devices | install | reboot | detect-ip | home
Remote:      key <NAME|code> [times] | keys <NAME|code>...
App:         launch <prod|uat> | uninstall <prod|uat> | clear-data <prod|uat> | kill
Appium:      appium <start|stop> | session <start|stop>
Account:     account [phone]
Log:         log | clear-log
             help | quit";

/// One line typed into the terminal panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelCommand {
    SetIp(String),
    SetPhone(String),
    SelectApk(String),
    Status,
    Connect,
    Disconnect,
    ListDevices,
    InstallApk,
    Reboot,
    DetectIp,
    GoHome,
    Key { key: KeyInput, times: u32 },
    Keys(Vec<KeyInput>),
    Launch(AppVariant),
    Uninstall(AppVariant),
    ClearData(AppVariant),
    KillProd,
    StartAppium,
    StopAppium,
    StartSession,
    StopSession,
    ConnectAccount(Option<String>),
    ShowLog,
    ClearLog,
    Help,
    Quit,
}

fn invalid(message: impl Into<String>) -> AppError {
    AppError::validation(message, "")
}

fn variant_arg(command: &str, value: Option<&str>) -> Result<AppVariant, AppError> {
    value
        .and_then(AppVariant::parse)
        .ok_or_else(|| invalid(format!("Usage: {command} <prod|uat>")))
}

fn rest_of<'a>(line: &'a str, command: &str) -> &'a str {
    line[command.len()..].trim()
}

impl PanelCommand {
    pub fn parse(line: &str) -> Result<Self, AppError> {
        let line = line.trim();
        let mut parts = line.split_whitespace();
        let Some(head) = parts.next() else {
            return Err(invalid("Empty command"));
        };
        let command = head.to_lowercase();
        let arg = parts.next();

        let parsed = match command.as_str() {
            "ip" => PanelCommand::SetIp(arg.unwrap_or_default().to_string()),
            "phone" => PanelCommand::SetPhone(arg.unwrap_or_default().to_string()),
            // Paths may contain spaces.
            "apk" => PanelCommand::SelectApk(rest_of(line, head).to_string()),
            "status" => PanelCommand::Status,
            "connect" => PanelCommand::Connect,
            "disconnect" => PanelCommand::Disconnect,
            "devices" => PanelCommand::ListDevices,
            "install" => PanelCommand::InstallApk,
            "reboot" => PanelCommand::Reboot,
            "detect-ip" => PanelCommand::DetectIp,
            "home" => PanelCommand::GoHome,
            "key" => {
                let key = arg.ok_or_else(|| invalid("Usage: key <NAME|code> [times]"))?;
                let times = match parts.next() {
                    Some(raw) => raw
                        .parse::<u32>()
                        .map_err(|_| invalid(format!("Invalid repeat count: {raw}")))?,
                    None => 1,
                };
                PanelCommand::Key {
                    key: KeyInput::parse(key),
                    times,
                }
            }
            "keys" => {
                let keys: Vec<KeyInput> = arg
                    .into_iter()
                    .chain(parts.by_ref())
                    .map(KeyInput::parse)
                    .collect();
                if keys.is_empty() {
                    return Err(invalid("Usage: keys <NAME|code>..."));
                }
                PanelCommand::Keys(keys)
            }
            "launch" => PanelCommand::Launch(variant_arg("launch", arg)?),
            "uninstall" => PanelCommand::Uninstall(variant_arg("uninstall", arg)?),
            "clear-data" => PanelCommand::ClearData(variant_arg("clear-data", arg)?),
            "kill" => PanelCommand::KillProd,
            "appium" => match arg.map(str::to_lowercase).as_deref() {
                Some("start") => PanelCommand::StartAppium,
                Some("stop") | Some("kill") => PanelCommand::StopAppium,
                _ => return Err(invalid("Usage: appium <start|stop>")),
            },
            "session" => match arg.map(str::to_lowercase).as_deref() {
                Some("start") => PanelCommand::StartSession,
                Some("stop") => PanelCommand::StopSession,
                _ => return Err(invalid("Usage: session <start|stop>")),
            },
            "account" => PanelCommand::ConnectAccount(arg.map(str::to_string)),
            "log" => PanelCommand::ShowLog,
            "clear-log" => PanelCommand::ClearLog,
            "help" | "?" => PanelCommand::Help,
            "quit" | "exit" => PanelCommand::Quit,
            other => return Err(invalid(format!("Unknown command: {other} (try 'help')"))),
        };
        Ok(parsed)
    }
}
