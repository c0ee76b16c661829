//! Errors - エラー型と分類

use thiserror::Error;

/// ErrorKind は実行エラーの分類
///
/// - Transient: 次の tick で再試行すれば回復が見込める
/// - Permanent: 入力や設定の誤り（再試行しても直らない）
/// - Infrastructure: ストアやファイルシステムの障害
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transient,
    Permanent,
    Infrastructure,
}

#[derive(Debug, Error)]
pub enum StewardError {
    #[error("store operation `{operation}` failed for user {user_id}: {message}")]
    Store {
        operation: &'static str,
        user_id: String,
        message: String,
    },

    #[error("delivery to user {user_id} failed: {message}")]
    Delivery { user_id: String, message: String },

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("insight {0} is already resolved")]
    AlreadyResolved(String),

    #[error("insight {0} does not accept a resolution")]
    NotActionable(String),

    #[error("unknown timezone `{0}`")]
    InvalidTimezone(String),

    #[error("unknown resolution action `{0}` (expected delete, complete or keep)")]
    InvalidAction(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("missing component: {0}")]
    MissingComponent(&'static str),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl StewardError {
    pub fn store(operation: &'static str, user_id: impl ToString, message: impl ToString) -> Self {
        StewardError::Store {
            operation,
            user_id: user_id.to_string(),
            message: message.to_string(),
        }
    }

    pub fn not_found<T: crate::domain::ids::IdMarker>(id: &crate::domain::ids::Id<T>) -> Self {
        StewardError::NotFound {
            kind: T::kind(),
            id: id.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            StewardError::Store { .. } | StewardError::Io(_) => ErrorKind::Infrastructure,
            StewardError::Json(_) | StewardError::Delivery { .. } => ErrorKind::Transient,
            StewardError::NotFound { .. }
            | StewardError::AlreadyResolved(_)
            | StewardError::NotActionable(_)
            | StewardError::InvalidTimezone(_)
            | StewardError::InvalidAction(_)
            | StewardError::Config(_)
            | StewardError::MissingComponent(_)
            | StewardError::Toml(_) => ErrorKind::Permanent,
        }
    }
}

pub type Result<T> = std::result::Result<T, StewardError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskId;

    #[test]
    fn store_errors_are_infrastructure() {
        let err = StewardError::store("delete_task", "u1", "connection reset");
        assert_eq!(err.kind(), ErrorKind::Infrastructure);
        assert!(err.to_string().contains("delete_task"));
        assert!(err.to_string().contains("u1"));
    }

    #[test]
    fn not_found_names_the_id_kind() {
        let err = StewardError::not_found(&TaskId::new("t-9"));
        assert_eq!(err.to_string(), "task t-9 not found");
        assert_eq!(err.kind(), ErrorKind::Permanent);
    }
}
