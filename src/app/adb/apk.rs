use std::fs::{self, File};
use std::path::{Path, PathBuf};

use zip::ZipArchive;

use crate::app::models::ApkInfo;

pub const APK_PATH_INVALID: &str = "APK path is invalid or file not found.";
pub const APK_EXTENSION_INVALID: &str = "Invalid APK path.";

pub fn normalize_apk_path(path: &str) -> PathBuf {
    let trimmed = path.trim();
    if let Some(rest) = trimmed.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(trimmed)
}

pub fn has_apk_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("apk"))
        .unwrap_or(false)
}

/// Checks that the file can be handed to `adb install`; the error string is user-facing.
pub fn validate_apk_path(path: &Path) -> Result<(), &'static str> {
    if path.as_os_str().is_empty() || !path.is_file() {
        return Err(APK_PATH_INVALID);
    }
    if !has_apk_extension(path) {
        return Err(APK_EXTENSION_INVALID);
    }
    Ok(())
}

pub fn inspect_apk(path: &Path) -> ApkInfo {
    let mut info = ApkInfo {
        path: path.to_string_lossy().to_string(),
        file_size_bytes: 0,
        is_archive: false,
        error: None,
    };

    if !path.is_file() {
        info.error = Some(format!("File not found: {}", path.display()));
        return info;
    }
    if let Ok(metadata) = fs::metadata(path) {
        info.file_size_bytes = metadata.len();
    }
    match File::open(path) {
        Ok(file) => match ZipArchive::new(file) {
            Ok(_) => info.is_archive = true,
            Err(err) => info.error = Some(format!("Invalid APK: {err}")),
        },
        Err(err) => info.error = Some(format!("Failed to open APK: {err}")),
    }
    info
}
