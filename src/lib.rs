pub mod app;

use std::io::{self, Write};

use tracing::{info, warn};

use app::adb::gateway::DeviceGateway;
use app::automation::{SessionManager, SessionSettings, WebDriverClient};
use app::config::{load_config, PanelConfig};
use app::console::{StdinConfirm, TerminalNotifier};
use app::error::AppError;
use app::logging::init_logging;
use app::panel::ControlPanel;

fn prompt_lines() -> impl Iterator<Item = String> {
    std::iter::from_fn(|| {
        let mut stdout = io::stdout();
        let _ = write!(stdout, "> ");
        let _ = stdout.flush();
        let mut line = String::new();
        match io::stdin().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line),
        }
    })
}

/// Terminal control panel: one command per line until `quit` or end of input.
pub fn run() -> Result<(), AppError> {
    let (config, config_error) = match load_config() {
        Ok(config) => (config, None),
        Err(err) => (PanelConfig::default(), Some(err)),
    };
    let logging = init_logging(&config.logging)?;
    if let Some(err) = config_error {
        warn!(code = %err.code, "Config not loaded, using defaults: {}", err.error);
    }
    info!(
        "Android TV QA panel started. Log file: {}",
        logging.active_log_path().display()
    );

    let driver = WebDriverClient::new(&config.appium)?;
    let sessions = SessionManager::new(driver, SessionSettings::from_config(&config));
    let gateway = DeviceGateway::from_settings(&config.adb);
    let mut panel = ControlPanel::new(
        config,
        gateway,
        sessions,
        Box::new(TerminalNotifier),
        Box::new(StdinConfirm),
    )
    .with_log_sink(logging.sink().clone());

    let mut stdout = io::stdout();
    let _ = writeln!(stdout, "Type 'help' for commands.");
    let result = panel
        .run_lines(prompt_lines(), &mut stdout)
        .map_err(|err| AppError::system(format!("Terminal I/O failed: {err}"), ""));
    panel.shutdown();
    info!("Android TV QA panel closed.");
    result
}
