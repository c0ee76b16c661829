//! Notifier の実装
//!
//! - **LogNotifier**: 配送内容を tracing ログに出す（開発用）
//! - **ChannelNotifier**: `tokio::sync::mpsc` チャネルへ転送
//!   （外部トランスポートやテスト用）

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::domain::{Result, StewardError, UserId};
use crate::ports::{NotificationMetadata, Notifier};

#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn deliver(
        &self,
        user_id: &UserId,
        title: &str,
        body: &str,
        metadata: &NotificationMetadata,
    ) -> Result<()> {
        tracing::info!(
            user_id = %user_id,
            insight_type = %metadata.kind,
            priority = %metadata.priority,
            title,
            body,
            "notification delivered"
        );
        Ok(())
    }
}

/// チャネルに渡す通知 1 件
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveredNotification {
    pub user_id: UserId,
    pub title: String,
    pub body: String,
    pub metadata: NotificationMetadata,
}

#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::Sender<DeliveredNotification>,
}

impl ChannelNotifier {
    pub fn new(tx: mpsc::Sender<DeliveredNotification>) -> Self {
        Self { tx }
    }

    /// Notifier と受信側のペアを作る
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<DeliveredNotification>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn deliver(
        &self,
        user_id: &UserId,
        title: &str,
        body: &str,
        metadata: &NotificationMetadata,
    ) -> Result<()> {
        let notification = DeliveredNotification {
            user_id: user_id.clone(),
            title: title.to_string(),
            body: body.to_string(),
            metadata: metadata.clone(),
        };
        // receiver が drop 済みなら誰も受け取らない（未配送）
        self.tx
            .send(notification)
            .await
            .map_err(|_| StewardError::Delivery {
                user_id: user_id.to_string(),
                message: "notification channel closed".into(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{InsightKind, Priority};
    use chrono::{TimeZone, Utc};

    fn metadata() -> NotificationMetadata {
        NotificationMetadata {
            kind: InsightKind::ProductivityTip,
            priority: Priority::Low,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
            insight_id: None,
            task_id: None,
            task_name: None,
            actions: vec![],
        }
    }

    #[tokio::test]
    async fn channel_forwards_delivery() {
        let (notifier, mut rx) = ChannelNotifier::channel(4);
        notifier
            .deliver(&UserId::new("u1"), "hi", "there", &metadata())
            .await
            .unwrap();

        let got = rx.recv().await.unwrap();
        assert_eq!(got.user_id, UserId::new("u1"));
        assert_eq!(got.title, "hi");
    }

    #[tokio::test]
    async fn closed_channel_is_a_delivery_error() {
        let (notifier, rx) = ChannelNotifier::channel(1);
        drop(rx);
        let err = notifier
            .deliver(&UserId::new("u1"), "hi", "there", &metadata())
            .await
            .unwrap_err();
        assert!(matches!(err, StewardError::Delivery { .. }));
    }
}
