use tracing::info;

use crate::app::adb::gateway::DeviceGateway;
use crate::app::adb::runner::CommandRunner;
use crate::app::error::AppError;
use crate::app::keys::{KeyInput, KEYCODE_APP_SWITCH};
use crate::app::models::DeviceTarget;

/// Remote-control presses sent as adb key events.
pub struct RcuRemote<'a, R> {
    gateway: &'a DeviceGateway<R>,
    target: DeviceTarget,
}

impl<'a, R: CommandRunner> RcuRemote<'a, R> {
    pub fn new(gateway: &'a DeviceGateway<R>, target: DeviceTarget) -> Self {
        Self { gateway, target }
    }

    /// Presses `key` `times` times (at least once) and returns each adb result.
    pub fn press(&self, key: &KeyInput, times: u32) -> Result<Vec<String>, AppError> {
        let code = key.resolve()?;
        let mut results = Vec::new();
        for _ in 0..times.max(1) {
            let out = self.gateway.keyevent(code, &self.target);
            info!("RCU press {key} ({code}) -> {out}");
            results.push(out);
        }
        Ok(results)
    }

    /// Resolves every key up front so an unknown name sends nothing.
    pub fn press_sequence(&self, keys: &[KeyInput]) -> Result<(), AppError> {
        let codes = keys
            .iter()
            .map(KeyInput::resolve)
            .collect::<Result<Vec<_>, _>>()?;
        for code in codes {
            self.press(&KeyInput::Raw(code), 1)?;
        }
        Ok(())
    }

    fn named(&self, name: &str, times: u32) -> Result<(), AppError> {
        self.press(&KeyInput::from(name), times).map(|_| ())
    }

    pub fn up(&self, times: u32) -> Result<(), AppError> {
        self.named("UP", times)
    }

    pub fn down(&self, times: u32) -> Result<(), AppError> {
        self.named("DOWN", times)
    }

    pub fn left(&self, times: u32) -> Result<(), AppError> {
        self.named("LEFT", times)
    }

    pub fn right(&self, times: u32) -> Result<(), AppError> {
        self.named("RIGHT", times)
    }

    pub fn ok(&self, times: u32) -> Result<(), AppError> {
        self.named("OK", times)
    }

    pub fn back(&self, times: u32) -> Result<(), AppError> {
        self.named("BACK", times)
    }

    pub fn home(&self, times: u32) -> Result<(), AppError> {
        self.named("HOME", times)
    }

    pub fn recents(&self, times: u32) -> Result<(), AppError> {
        self.press(&KeyInput::Raw(KEYCODE_APP_SWITCH), times).map(|_| ())
    }

    pub fn focus_and_confirm_left_option(&self) -> Result<(), AppError> {
        self.left(1)?;
        self.ok(1)
    }

    pub fn confirm_with_down_then_ok(&self, downs: u32) -> Result<(), AppError> {
        self.down(downs)?;
        self.ok(1)
    }
}
