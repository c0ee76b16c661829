//! Publisher - insight の保存と配送
//!
//! # フロー
//! 1. InsightStore::save_insight() で保存（常に、in-app 表示用）
//! 2. AdmissionSession::should_send_now() で push の可否を判定
//! 3. 可なら NotificationComposer::compose() → Notifier::deliver()
//! 4. deliver が成功した場合のみ AdmissionSession::record_sent()
//!
//! compose は「送信可」の判定後にだけ行い、拒否された insight は
//! composer に届かない。

use std::sync::Arc;

use crate::admission::AdmissionSession;
use crate::domain::{Insight, InsightData, InsightId, UserId};
use crate::ports::{
    InsightStore, NotificationComposer, NotificationMetadata, NotificationText, Notifier,
};

/// エスカレーションで提示する選択肢
pub const ESCALATION_ACTIONS: [&str; 3] = ["complete", "delete", "keep"];

/// PublishSummary は 1 バッチの集計
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishSummary {
    pub saved: usize,
    pub sent: usize,
    pub queued: usize,
    /// 送信可だったが配送できなかった（または保存できなかった）件数
    pub failed: usize,
}

pub struct InsightPublisher {
    insights: Arc<dyn InsightStore>,
    composer: Arc<dyn NotificationComposer>,
    notifier: Arc<dyn Notifier>,
}

impl InsightPublisher {
    pub fn new(
        insights: Arc<dyn InsightStore>,
        composer: Arc<dyn NotificationComposer>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            insights,
            composer,
            notifier,
        }
    }

    /// `batch` を順に保存し、可能なら push する。保存済み insight を
    /// id 付きで返す。個別の失敗はログに残して飛ばす。
    pub async fn publish(
        &self,
        session: &mut AdmissionSession<'_>,
        batch: Vec<Insight>,
    ) -> (Vec<Insight>, PublishSummary) {
        let user_id = session.user_id().clone();
        let mut summary = PublishSummary::default();
        let mut saved = Vec::with_capacity(batch.len());

        for mut insight in batch {
            match self.insights.save_insight(&user_id, &insight).await {
                Ok(id) => insight.id = Some(id),
                Err(err) => {
                    tracing::error!(
                        user_id = %user_id,
                        insight_type = %insight.kind,
                        error = %err,
                        "failed to save insight"
                    );
                    summary.failed += 1;
                    continue;
                }
            }
            summary.saved += 1;

            let decision = session.should_send_now(&insight).await;
            if !decision.should_send() {
                tracing::info!(
                    user_id = %user_id,
                    insight_type = %insight.kind,
                    reason = %decision.reason,
                    "notification queued"
                );
                summary.queued += 1;
                saved.push(insight);
                continue;
            }

            if self.deliver(&user_id, &insight).await {
                if let Err(err) = session.record_sent(&insight).await {
                    tracing::error!(user_id = %user_id, error = %err, "failed to record sent notification");
                }
                summary.sent += 1;
            } else {
                summary.failed += 1;
            }
            saved.push(insight);
        }

        tracing::info!(
            user_id = %user_id,
            saved = summary.saved,
            sent = summary.sent,
            queued = summary.queued,
            failed = summary.failed,
            budget_remaining = session.budget_remaining(),
            "insight batch published"
        );
        (saved, summary)
    }

    /// compose して配送。notifier が受理したときだけ `true`
    async fn deliver(&self, user_id: &UserId, insight: &Insight) -> bool {
        let text = match self.composer.compose(insight).await {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(user_id = %user_id, error = %err, "composer failed, using fallback text");
                NotificationText::fallback()
            }
        };
        let metadata = metadata_for(insight, insight.id.clone());

        match self
            .notifier
            .deliver(user_id, &text.title, &text.body, &metadata)
            .await
        {
            Ok(()) => {
                tracing::info!(
                    user_id = %user_id,
                    insight_type = %insight.kind,
                    title = %text.title,
                    "notification sent"
                );
                true
            }
            Err(err) => {
                tracing::warn!(user_id = %user_id, insight_type = %insight.kind, error = %err, "delivery failed");
                false
            }
        }
    }
}

fn metadata_for(insight: &Insight, insight_id: Option<InsightId>) -> NotificationMetadata {
    let mut metadata = NotificationMetadata {
        kind: insight.kind,
        priority: insight.priority,
        timestamp: insight.created_at,
        insight_id,
        task_id: None,
        task_name: None,
        actions: Vec::new(),
    };
    if let InsightData::HighPriorityStale {
        task_id, task_name, ..
    } = &insight.data
    {
        metadata.task_id = Some(task_id.clone());
        metadata.task_name = Some(task_name.clone());
        metadata.actions = ESCALATION_ACTIONS.iter().map(ToString::to_string).collect();
    }
    metadata
}
