use std::path::{Path, PathBuf};

pub const DEFAULT_ADB: &str = "adb";

fn strip_quotes(value: &str) -> &str {
    let trimmed = value.trim();
    for quote in ['"', '\''] {
        if let Some(inner) = trimmed
            .strip_prefix(quote)
            .and_then(|candidate| candidate.strip_suffix(quote))
        {
            return inner.trim();
        }
    }
    trimmed
}

fn sdk_adb(sdk_root: &Path) -> PathBuf {
    let name = if cfg!(windows) { "adb.exe" } else { "adb" };
    sdk_root.join("platform-tools").join(name)
}

/// Picks the adb executable: explicit config path first, then an SDK install named by
/// `ANDROID_HOME`/`ANDROID_SDK_ROOT`, then `adb` from `PATH`.
pub fn resolve_adb_program(configured: &str) -> String {
    let configured = strip_quotes(configured);
    if !configured.is_empty() {
        return configured.to_string();
    }
    for var in ["ANDROID_HOME", "ANDROID_SDK_ROOT"] {
        if let Some(root) = std::env::var_os(var).filter(|value| !value.is_empty()) {
            let candidate = sdk_adb(Path::new(&root));
            if candidate.is_file() {
                return candidate.to_string_lossy().to_string();
            }
        }
    }
    DEFAULT_ADB.to_string()
}

pub fn validate_adb_program(program: &str) -> Result<(), String> {
    if program.trim().is_empty() {
        return Err("ADB command is empty".to_string());
    }
    if program == DEFAULT_ADB {
        return Ok(());
    }
    let path = Path::new(program);
    if path.is_dir() {
        return Err(format!("ADB path {program} is a directory"));
    }
    if !path.exists() {
        return Err(format!("ADB executable not found at {program}"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_path_wins_and_loses_quotes() {
        assert_eq!(
            resolve_adb_program("  \"/opt/android/platform-tools/adb\"  "),
            "/opt/android/platform-tools/adb"
        );
        assert_eq!(
            resolve_adb_program("'/opt/android/platform-tools/adb'"),
            "/opt/android/platform-tools/adb"
        );
    }

    #[test]
    fn rejects_missing_and_directory_paths() {
        let err = validate_adb_program("/this/path/should/not/exist/adb").unwrap_err();
        assert!(err.contains("not found"));
        let dir = std::env::temp_dir();
        let err = validate_adb_program(&dir.to_string_lossy()).unwrap_err();
        assert!(err.contains("directory"));
        assert!(validate_adb_program("adb").is_ok());
    }
}
