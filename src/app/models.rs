use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceSummary {
    pub serial: String,
    pub state: String,
    pub model: Option<String>,
    pub product: Option<String>,
    pub device: Option<String>,
    pub transport_id: Option<String>,
}

impl DeviceSummary {
    pub fn is_online(&self) -> bool {
        self.state == "device"
    }
}

/// Device addressed by a gateway call. `Default` means whatever single device adb
/// selects implicitly.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DeviceTarget {
    #[default]
    Default,
    Address(String),
}

impl DeviceTarget {
    /// Builds a target from a panel IP field; blank input maps to the implicit device.
    pub fn from_ip(ip: &str) -> Self {
        let trimmed = ip.trim();
        if trimmed.is_empty() {
            DeviceTarget::Default
        } else {
            DeviceTarget::Address(trimmed.to_string())
        }
    }

    /// Serial passed to `adb -s`; a bare host gets the adb-over-tcp port appended.
    pub fn serial(&self, connect_port: u16) -> Option<String> {
        match self {
            DeviceTarget::Default => None,
            DeviceTarget::Address(address) if address.contains(':') => Some(address.clone()),
            DeviceTarget::Address(address) => Some(format!("{address}:{connect_port}")),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            DeviceTarget::Default => "default",
            DeviceTarget::Address(address) => address,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApkInfo {
    pub path: String,
    pub file_size_bytes: u64,
    pub is_archive: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppVariant {
    Prod,
    Uat,
}

impl AppVariant {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "prod" => Some(AppVariant::Prod),
            "uat" => Some(AppVariant::Uat),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AppVariant::Prod => "Prod",
            AppVariant::Uat => "UAT",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PreflightCheck {
    pub name: String,
    pub status: String,
    pub duration_ms: u128,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}
