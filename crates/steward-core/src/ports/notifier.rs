//! Notifier port - ユーザーの端末・セッションへの push 配送

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{InsightId, InsightKind, Priority, Result, TaskId, UserId};

/// title / body と一緒に送る付加情報
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationMetadata {
    #[serde(rename = "type")]
    pub kind: InsightKind,
    pub priority: Priority,
    pub timestamp: DateTime<Utc>,
    pub insight_id: Option<InsightId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_name: Option<String>,
    /// 回答が必要な insight で提示する選択肢
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<String>,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// admission の「送信可」判定の後にだけ呼ばれる。`Err` は未配送を意味し、
    /// その通知は記録してはならない。
    async fn deliver(
        &self,
        user_id: &UserId,
        title: &str,
        body: &str,
        metadata: &NotificationMetadata,
    ) -> Result<()>;
}
