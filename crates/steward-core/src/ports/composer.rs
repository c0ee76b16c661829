//! NotificationComposer port - 送信可の insight を push 文面にする
//!
//! 本番では言語モデルが実装する。admission が送信可と判定した後にしか
//! 呼ばれず、拒否された insight で文面生成は走らない。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{Insight, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationText {
    pub title: String,
    pub body: String,
}

impl NotificationText {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }

    /// compose に失敗したときの文面
    pub fn fallback() -> Self {
        Self::new("New insight", "New insight available")
    }
}

#[async_trait]
pub trait NotificationComposer: Send + Sync {
    async fn compose(&self, insight: &Insight) -> Result<NotificationText>;
}
