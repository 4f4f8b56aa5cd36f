use serde_json::{json, Map, Value};

/// Session creation settings. Stability flags default to the attach-friendly values:
/// no reset, long idle timeout, permissions granted, app left running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    pub platform_name: String,
    pub device_name: String,
    pub app_package: Option<String>,
    pub app_activity: Option<String>,
    pub no_reset: bool,
    pub new_command_timeout_secs: u64,
    pub auto_grant_permissions: bool,
    pub dont_stop_app_on_reset: bool,
    pub app_wait_activity: String,
    /// `false` attaches to whatever is on screen without starting or resetting the app.
    pub auto_launch: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            platform_name: "Android".to_string(),
            device_name: "Android TV".to_string(),
            app_package: None,
            app_activity: None,
            no_reset: true,
            new_command_timeout_secs: 120,
            auto_grant_permissions: true,
            dont_stop_app_on_reset: true,
            app_wait_activity: "*".to_string(),
            auto_launch: true,
        }
    }
}

impl SessionOptions {
    pub fn always_match(&self) -> Map<String, Value> {
        let mut caps = Map::new();
        caps.insert("platformName".into(), json!(self.platform_name));
        caps.insert("appium:automationName".into(), json!("UiAutomator2"));
        caps.insert("appium:deviceName".into(), json!(self.device_name));
        if let Some(package) = self.app_package.as_deref().filter(|p| !p.is_empty()) {
            caps.insert("appium:appPackage".into(), json!(package));
        }
        if let Some(activity) = self.app_activity.as_deref().filter(|a| !a.is_empty()) {
            caps.insert("appium:appActivity".into(), json!(activity));
        }
        caps.insert("appium:noReset".into(), json!(self.no_reset));
        caps.insert(
            "appium:newCommandTimeout".into(),
            json!(self.new_command_timeout_secs),
        );
        caps.insert(
            "appium:autoGrantPermissions".into(),
            json!(self.auto_grant_permissions),
        );
        caps.insert(
            "appium:dontStopAppOnReset".into(),
            json!(self.dont_stop_app_on_reset),
        );
        caps.insert(
            "appium:appWaitActivity".into(),
            json!(self.app_wait_activity),
        );
        if !self.auto_launch {
            caps.insert("appium:autoLaunch".into(), json!(false));
            caps.insert("appium:skipDeviceInitialization".into(), json!(true));
        }
        caps
    }

    /// W3C `POST /session` payload.
    pub fn to_request_body(&self) -> Value {
        json!({
            "capabilities": {
                "alwaysMatch": Value::Object(self.always_match()),
                "firstMatch": [{}],
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attach_mode_disables_launch() {
        let options = SessionOptions {
            app_package: Some("tv.freetv.androidtv".to_string()),
            auto_launch: false,
            ..SessionOptions::default()
        };
        let body = options.to_request_body();
        let caps = &body["capabilities"]["alwaysMatch"];
        assert_eq!(caps["appium:autoLaunch"], json!(false));
        assert_eq!(caps["appium:noReset"], json!(true));
        assert_eq!(caps["appium:dontStopAppOnReset"], json!(true));
        assert_eq!(caps["appium:appPackage"], json!("tv.freetv.androidtv"));
        assert_eq!(caps["appium:appWaitActivity"], json!("*"));
        assert!(caps.get("appium:appActivity").is_none());
    }

    #[test]
    fn launch_mode_omits_auto_launch_flag() {
        let caps = SessionOptions::default().always_match();
        assert!(!caps.contains_key("appium:autoLaunch"));
        assert_eq!(caps["appium:newCommandTimeout"], json!(120));
    }
}
