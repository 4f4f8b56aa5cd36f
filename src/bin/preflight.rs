use std::time::{Duration, Instant};

use serde::Serialize;
use uuid::Uuid;

use tv_qa_panel_lib::app::adb::locator::{resolve_adb_program, validate_adb_program};
use tv_qa_panel_lib::app::adb::parse::parse_adb_devices;
use tv_qa_panel_lib::app::adb::runner::run_command_with_timeout;
use tv_qa_panel_lib::app::appium_server::port_open;
use tv_qa_panel_lib::app::automation::{AutomationDriver, SessionManager, SessionSettings, WebDriverClient};
use tv_qa_panel_lib::app::config::{load_config, PanelConfig};
use tv_qa_panel_lib::app::models::PreflightCheck;

#[derive(Debug, Clone, Default)]
struct Args {
    json: bool,
    attach: bool,
}

#[derive(Serialize)]
struct PreflightSummary {
    tool: &'static str,
    status: &'static str,
    trace_id: String,
    adb_program: String,
    appium_url: String,
    checks: Vec<PreflightCheck>,
}

const USAGE: &str = "Usage: cargo run --bin preflight -- [--json] [--attach]\n\
  --json     print the report as JSON\n\
  --attach   attach an Appium session (no launch) and report the foreground package\n";

fn parse_args() -> Result<Args, String> {
    let mut args = Args::default();
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--json" => args.json = true,
            "--attach" => args.attach = true,
            "-h" | "--help" => return Err(USAGE.to_string()),
            other => return Err(format!("Unknown arg: {other}\n{USAGE}")),
        }
    }
    Ok(args)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Pass,
    Warn,
    Fail,
    Skip,
}

impl Outcome {
    fn as_str(self) -> &'static str {
        match self {
            Outcome::Pass => "pass",
            Outcome::Warn => "warn",
            Outcome::Fail => "fail",
            Outcome::Skip => "skip",
        }
    }
}

fn run_check<F>(checks: &mut Vec<PreflightCheck>, name: &str, f: F) -> Outcome
where
    F: FnOnce() -> (Outcome, Option<String>),
{
    let start = Instant::now();
    let (outcome, detail) = f();
    checks.push(PreflightCheck {
        name: name.to_string(),
        status: outcome.as_str().to_string(),
        duration_ms: start.elapsed().as_millis(),
        detail,
    });
    outcome
}

fn print_text(summary: &PreflightSummary) {
    println!("{} [{}] trace_id={}", summary.tool, summary.status, summary.trace_id);
    println!("adb: {}  appium: {}", summary.adb_program, summary.appium_url);
    for check in &summary.checks {
        let detail = check.detail.as_deref().unwrap_or_default();
        println!(
            "  {:<4} {:<20} {:>6} ms  {}",
            check.status, check.name, check.duration_ms, detail
        );
    }
}

fn main() {
    let args = match parse_args() {
        Ok(v) => v,
        Err(msg) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
    };

    let trace_id = Uuid::new_v4().to_string();
    let mut checks: Vec<PreflightCheck> = Vec::new();
    let mut failed = false;

    let mut config = PanelConfig::default();
    let outcome = run_check(&mut checks, "load_config", || match load_config() {
        Ok(loaded) => {
            config = loaded;
            (Outcome::Pass, None)
        }
        Err(err) => (Outcome::Warn, Some(format!("{}; using defaults", err.error))),
    });
    failed |= outcome == Outcome::Fail;

    let adb_program = resolve_adb_program(&config.adb.command_path);
    let timeout = config.adb.command_timeout();

    let adb_ok = run_check(&mut checks, "adb_version", || {
        if let Err(err) = validate_adb_program(&adb_program) {
            return (Outcome::Fail, Some(err));
        }
        match run_command_with_timeout(&adb_program, &["version".to_string()], timeout, &trace_id) {
            Ok(output) => (
                Outcome::Pass,
                output.stdout.lines().next().map(|line| line.trim().to_string()),
            ),
            Err(err) => (Outcome::Fail, Some(format!("{}: {}", err.code, err.error))),
        }
    });
    failed |= adb_ok == Outcome::Fail;

    let devices = run_check(&mut checks, "online_devices", || {
        if adb_ok != Outcome::Pass {
            return (Outcome::Skip, Some("adb unavailable".to_string()));
        }
        match run_command_with_timeout(&adb_program, &["devices".to_string()], timeout, &trace_id) {
            Ok(output) => {
                let listed = parse_adb_devices(&output.stdout);
                let online = listed.iter().filter(|device| device.is_online()).count();
                let detail = format!("{online} online of {} listed", listed.len());
                if online == 0 {
                    (Outcome::Fail, Some(detail))
                } else {
                    (Outcome::Pass, Some(detail))
                }
            }
            Err(err) => (Outcome::Fail, Some(format!("{}: {}", err.code, err.error))),
        }
    });
    failed |= devices == Outcome::Fail;

    let probe_timeout = Duration::from_millis(config.appium.probe_timeout_ms);
    run_check(&mut checks, "appium_port", || {
        if port_open(&config.appium.host, config.appium.port, probe_timeout) {
            (Outcome::Pass, Some(config.appium.address()))
        } else {
            (
                Outcome::Fail,
                Some(format!("nothing listening on {}", config.appium.address())),
            )
        }
    });

    let driver = match WebDriverClient::new(&config.appium) {
        Ok(driver) => Some(driver),
        Err(err) => {
            checks.push(PreflightCheck {
                name: "appium_client".to_string(),
                status: Outcome::Fail.as_str().to_string(),
                duration_ms: 0,
                detail: Some(err.error),
            });
            failed = true;
            None
        }
    };

    let status = run_check(&mut checks, "appium_status", || match &driver {
        Some(driver) if driver.server_reachable() => (Outcome::Pass, None),
        Some(_) => (Outcome::Fail, Some("GET /status failed".to_string())),
        None => (Outcome::Skip, None),
    });
    failed |= status == Outcome::Fail;

    let attach = run_check(&mut checks, "foreground_package", || {
        if !args.attach {
            return (Outcome::Skip, Some("pass --attach to check".to_string()));
        }
        let Some(driver) = driver else {
            return (Outcome::Skip, None);
        };
        if status != Outcome::Pass || devices != Outcome::Pass {
            return (Outcome::Skip, Some("device or Appium not ready".to_string()));
        }
        let mut sessions = SessionManager::new(driver, SessionSettings::from_config(&config));
        if let Err(err) = sessions.start(None, None, false) {
            return (Outcome::Fail, Some(err.error));
        }
        let foreground = sessions.foreground_package();
        sessions.stop();
        match foreground {
            Some(package) if package == config.login.prod_package => (Outcome::Pass, Some(package)),
            Some(package) => (Outcome::Warn, Some(format!("{package} (FreeTV not in front)"))),
            None => (Outcome::Warn, Some("foreground package unknown".to_string())),
        }
    });
    failed |= attach == Outcome::Fail;

    let summary = PreflightSummary {
        tool: "tv_qa_panel_preflight",
        status: if failed { "fail" } else { "pass" },
        trace_id,
        adb_program,
        appium_url: config.appium.base_url(),
        checks,
    };

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).unwrap_or_default()
        );
    } else {
        print_text(&summary);
    }

    if failed {
        std::process::exit(1);
    }
}
