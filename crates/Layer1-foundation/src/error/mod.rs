//! Error types for Trellis
//!
//! 런타임 전체 에러를 중앙에서 관리

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Trellis 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // 설정 관련
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    // ========================================================================
    // 저장소 관련
    // ========================================================================
    #[error("Storage error: {0}")]
    Storage(String),

    // ========================================================================
    // 플러그인 로드 / 라이프사이클
    // ========================================================================
    #[error("Failed to load plugin {plugin}: {message}")]
    Load { plugin: String, message: String },

    #[error("Plugin {plugin} failed during {transition}: {message}")]
    Lifecycle {
        plugin: String,
        transition: String,
        message: String,
    },

    #[error("Plugin {plugin} cannot transition from {from} to {to}")]
    InvalidTransition {
        plugin: String,
        from: String,
        to: String,
    },

    #[error("Registration conflict on {key}: {previous} replaced by {replacement}")]
    RegistrationConflict {
        key: String,
        previous: String,
        replacement: String,
    },

    // ========================================================================
    // 이벤트 디스패치
    // ========================================================================
    #[error("Handler {handler} timed out after {timeout_ms}ms")]
    DispatchTimeout { handler: String, timeout_ms: u64 },

    #[error("Handler {handler} failed: {message}")]
    Handler { handler: String, message: String },

    #[error("Cancelled")]
    Cancelled,

    // ========================================================================
    // 일반
    // ========================================================================
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // ========================================================================
    // 외부 에러 변환
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ========================================================================
    // 기타
    // ========================================================================
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// 재시도 가능한 에러인지 확인
    ///
    /// 로드/라이프사이클 에러는 자동 재시도하지 않는다.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::DispatchTimeout { .. } | Error::Io(_))
    }

    /// 운영자/사용자에게 그대로 보여줄 수 있는 에러인지 확인
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Error::Load { .. }
                | Error::Lifecycle { .. }
                | Error::InvalidTransition { .. }
                | Error::NotFound(_)
                | Error::InvalidInput(_)
                | Error::Cancelled
        )
    }

    /// 타임아웃 에러인지 확인
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::DispatchTimeout { .. })
    }

    /// 로드 에러 생성 헬퍼
    pub fn load(plugin: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Load {
            plugin: plugin.into(),
            message: message.into(),
        }
    }

    /// 라이프사이클 에러 생성 헬퍼
    pub fn lifecycle(
        plugin: impl Into<String>,
        transition: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Error::Lifecycle {
            plugin: plugin.into(),
            transition: transition.into(),
            message: message.into(),
        }
    }

    /// 상태 전이 에러 생성 헬퍼
    pub fn invalid_transition(
        plugin: impl Into<String>,
        from: impl ToString,
        to: impl ToString,
    ) -> Self {
        Error::InvalidTransition {
            plugin: plugin.into(),
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// 등록 충돌 생성 헬퍼
    pub fn registration_conflict(
        key: impl Into<String>,
        previous: impl Into<String>,
        replacement: impl Into<String>,
    ) -> Self {
        Error::RegistrationConflict {
            key: key.into(),
            previous: previous.into(),
            replacement: replacement.into(),
        }
    }

    /// 핸들러 에러 생성 헬퍼
    pub fn handler(handler: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Handler {
            handler: handler.into(),
            message: message.into(),
        }
    }
}

// ============================================================================
// From 구현 (추가 변환)
// ============================================================================

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Internal(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Internal(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_error_display() {
        let err = Error::load("p1", "entry point 'p1::main' not found");
        assert_eq!(
            err.to_string(),
            "Failed to load plugin p1: entry point 'p1::main' not found"
        );
        assert!(!err.is_retryable());
        assert!(err.is_user_facing());
    }

    #[test]
    fn test_timeout_classification() {
        let err = Error::DispatchTimeout {
            handler: "nav:onClick".into(),
            timeout_ms: 2000,
        };
        assert!(err.is_timeout());
        assert!(err.to_string().contains("2000ms"));
        assert!(!Error::Cancelled.is_timeout());
    }

    #[test]
    fn test_invalid_transition() {
        let err = Error::invalid_transition("p1", "active", "uninstalled");
        assert_eq!(
            err.to_string(),
            "Plugin p1 cannot transition from active to uninstalled"
        );
    }
}
