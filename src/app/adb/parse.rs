use std::sync::OnceLock;

use regex::Regex;

use crate::app::models::DeviceSummary;

pub fn parse_adb_devices(output: &str) -> Vec<DeviceSummary> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !line.starts_with('*'))
        .filter(|line| !line.to_lowercase().starts_with("list of devices"))
        .filter_map(|line| {
            let mut tokens = line.split_whitespace();
            let serial = tokens.next()?.to_string();
            let state = tokens.next()?.to_string();
            let mut summary = DeviceSummary {
                serial,
                state,
                model: None,
                product: None,
                device: None,
                transport_id: None,
            };
            for token in tokens {
                if let Some((key, value)) = token.split_once(':') {
                    let value = Some(value.to_string());
                    match key {
                        "model" => summary.model = value,
                        "product" => summary.product = value,
                        "device" => summary.device = value,
                        "transport_id" => summary.transport_id = value,
                        _ => {}
                    }
                }
            }
            Some(summary)
        })
        .collect()
}

/// True when at least one listed device reports the ready `device` state; `offline`,
/// `unauthorized` and the listing header do not count.
pub fn has_connected_device(output: &str) -> bool {
    parse_adb_devices(output)
        .iter()
        .any(DeviceSummary::is_online)
}

fn inet_regex() -> &'static Regex {
    static INET: OnceLock<Regex> = OnceLock::new();
    INET.get_or_init(|| {
        Regex::new(r"^inet\s+(\d{1,3}(?:\.\d{1,3}){3})(?:/\d+)?").expect("valid inet regex")
    })
}

/// Extracts the IPv4 address from `ip -f inet addr show <iface>` output.
pub fn parse_inet_address(output: &str) -> Option<String> {
    output.lines().find_map(|line| {
        inet_regex()
            .captures(line.trim())
            .map(|caps| caps[1].to_string())
    })
}

pub fn is_pm_clear_success(output: &str) -> bool {
    output.trim().to_lowercase().starts_with("success")
}
