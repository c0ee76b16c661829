//! ProfileStore port - ユーザー設定（現状はタイムゾーンのみ）

use async_trait::async_trait;

use crate::domain::{Result, UserId};

#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// IANA タイムゾーン名（未設定なら `None`）
    async fn timezone(&self, user_id: &UserId) -> Result<Option<String>>;

    async fn set_timezone(&self, user_id: &UserId, timezone: &str) -> Result<()>;
}
