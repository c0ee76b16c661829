//! NotificationStateStore port - ユーザーごとに 1 つの state 文書
//!
//! 文書は丸ごと読み書きする。ユーザー単位の直列化は呼び出し側
//! （[`crate::admission::AdmissionController`]）の責務で、ストアはロックしない。

use async_trait::async_trait;

use crate::domain::{NotificationState, Result, UserId};

#[async_trait]
pub trait NotificationStateStore: Send + Sync {
    /// 文書がまだなければ `Ok(None)`、読めない文書は `Err`
    async fn load_notification_state(&self, user_id: &UserId)
    -> Result<Option<NotificationState>>;

    async fn save_notification_state(
        &self,
        user_id: &UserId,
        state: &NotificationState,
    ) -> Result<()>;
}
