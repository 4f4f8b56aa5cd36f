//! Android key codes used by the remote control and the login flow.

use crate::app::error::AppError;

pub const KEYCODE_HOME: i32 = 3;
pub const KEYCODE_BACK: i32 = 4;
pub const KEYCODE_DPAD_UP: i32 = 19;
pub const KEYCODE_DPAD_DOWN: i32 = 20;
pub const KEYCODE_DPAD_LEFT: i32 = 21;
pub const KEYCODE_DPAD_RIGHT: i32 = 22;
pub const KEYCODE_VOLUME_UP: i32 = 24;
pub const KEYCODE_VOLUME_DOWN: i32 = 25;
/// ENTER; some remotes map OK to DPAD_CENTER (23) instead.
pub const KEYCODE_OK: i32 = 66;
pub const KEYCODE_MUTE: i32 = 164;
pub const KEYCODE_CHANNEL_UP: i32 = 166;
pub const KEYCODE_CHANNEL_DOWN: i32 = 167;
pub const KEYCODE_APP_SWITCH: i32 = 187;

pub const RCU_KEYS: &[(&str, i32)] = &[
    ("UP", KEYCODE_DPAD_UP),
    ("DOWN", KEYCODE_DPAD_DOWN),
    ("LEFT", KEYCODE_DPAD_LEFT),
    ("RIGHT", KEYCODE_DPAD_RIGHT),
    ("OK", KEYCODE_OK),
    ("BACK", KEYCODE_BACK),
    ("HOME", KEYCODE_HOME),
    ("VOLUME_UP", KEYCODE_VOLUME_UP),
    ("VOLUME_DOWN", KEYCODE_VOLUME_DOWN),
    ("MUTE", KEYCODE_MUTE),
    ("CHANNEL_UP", KEYCODE_CHANNEL_UP),
    ("CHANNEL_DOWN", KEYCODE_CHANNEL_DOWN),
    ("RECENTS", KEYCODE_APP_SWITCH),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyInput {
    Named(String),
    Raw(i32),
}

impl KeyInput {
    /// Numeric text becomes a raw code, anything else a key name.
    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim();
        match trimmed.parse::<i32>() {
            Ok(code) => KeyInput::Raw(code),
            Err(_) => KeyInput::Named(trimmed.to_string()),
        }
    }

    pub fn resolve(&self) -> Result<i32, AppError> {
        match self {
            KeyInput::Raw(code) => Ok(*code),
            KeyInput::Named(name) => lookup_key(name).ok_or_else(|| AppError::unknown_key(name, "")),
        }
    }
}

impl From<i32> for KeyInput {
    fn from(code: i32) -> Self {
        KeyInput::Raw(code)
    }
}

impl From<&str> for KeyInput {
    fn from(name: &str) -> Self {
        KeyInput::Named(name.to_string())
    }
}

impl std::fmt::Display for KeyInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyInput::Named(name) => f.write_str(name),
            KeyInput::Raw(code) => write!(f, "{code}"),
        }
    }
}

pub fn lookup_key(name: &str) -> Option<i32> {
    let normalized = name.trim().to_uppercase();
    RCU_KEYS
        .iter()
        .find(|(key, _)| *key == normalized)
        .map(|(_, code)| *code)
}

/// Spelled-out digit used in keypad element ids (`'7'` → `"Seven"`).
pub fn digit_name(digit: char) -> Option<&'static str> {
    Some(match digit {
        '0' => "Zero",
        '1' => "One",
        '2' => "Two",
        '3' => "Three",
        '4' => "Four",
        '5' => "Five",
        '6' => "Six",
        '7' => "Seven",
        '8' => "Eight",
        '9' => "Nine",
        _ => return None,
    })
}
