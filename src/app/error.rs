use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorCode {
    #[serde(rename = "ERR_VALIDATION")]
    Validation,
    #[serde(rename = "ERR_DEPENDENCY")]
    Dependency,
    #[serde(rename = "ERR_SYSTEM")]
    System,
    #[serde(rename = "ERR_NOT_FOUND")]
    NotFound,
    #[serde(rename = "ERR_TIMEOUT")]
    Timeout,
    #[serde(rename = "ERR_NO_SESSION")]
    NoSession,
    #[serde(rename = "ERR_UNKNOWN_KEY")]
    UnknownKey,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Validation => "ERR_VALIDATION",
            ErrorCode::Dependency => "ERR_DEPENDENCY",
            ErrorCode::System => "ERR_SYSTEM",
            ErrorCode::NotFound => "ERR_NOT_FOUND",
            ErrorCode::Timeout => "ERR_TIMEOUT",
            ErrorCode::NoSession => "ERR_NO_SESSION",
            ErrorCode::UnknownKey => "ERR_UNKNOWN_KEY",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppError {
    pub error: String,
    pub code: ErrorCode,
    pub trace_id: String,
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            code,
            trace_id: trace_id.into(),
        }
    }

    pub fn validation(message: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self::new(ErrorCode::Validation, message, trace_id)
    }

    pub fn dependency(message: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self::new(ErrorCode::Dependency, message, trace_id)
    }

    pub fn system(message: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self::new(ErrorCode::System, message, trace_id)
    }

    pub fn not_found(message: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message, trace_id)
    }

    pub fn timeout(message: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self::new(ErrorCode::Timeout, message, trace_id)
    }

    pub fn no_session(trace_id: impl Into<String>) -> Self {
        Self::new(ErrorCode::NoSession, "Automation session is not active", trace_id)
    }

    pub fn unknown_key(name: &str, trace_id: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::UnknownKey,
            format!("Unknown RCU key name: {name}"),
            trace_id,
        )
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.error, self.code)
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_code_as_err_string() {
        let err = AppError::unknown_key("JUMP", "trace-1");
        let value = serde_json::to_value(&err).expect("serialize");
        assert_eq!(value["code"], "ERR_UNKNOWN_KEY");
        assert_eq!(value["trace_id"], "trace-1");
        assert!(err.to_string().contains("JUMP"));
    }
}
