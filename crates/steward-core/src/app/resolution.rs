//! Resolution - エスカレーションへのユーザーの回答
//! （`high_priority_stale_warning` に対する delete / complete / keep）

use super::builder::App;
use crate::domain::{
    Insight, InsightId, Resolution, ResolutionAction, Result, StewardError, UserId,
};
use crate::ports::Clock;

impl App {
    /// `action` をタスクに適用し、insight を解決済みにする
    ///
    /// # エラー
    /// - 存在しない insight: `NotFound`
    /// - 回答を受け付けない insight: `NotActionable`
    /// - 解決済み: `AlreadyResolved`
    pub async fn resolve_escalation(
        &self,
        user_id: &UserId,
        insight_id: &InsightId,
        action: ResolutionAction,
    ) -> Result<Insight> {
        let mut insight = self
            .insights
            .get_insight(user_id, insight_id)
            .await?
            .ok_or_else(|| StewardError::not_found(insight_id))?;

        let task_id = match (&insight.resolution, insight.escalated_task()) {
            (Some(resolution), Some(task_id)) => {
                if resolution.resolved {
                    return Err(StewardError::AlreadyResolved(insight_id.to_string()));
                }
                task_id.clone()
            }
            _ => return Err(StewardError::NotActionable(insight_id.to_string())),
        };

        match action {
            ResolutionAction::Delete => self.tasks.delete_task(user_id, &task_id).await?,
            ResolutionAction::Complete => self.tasks.complete_task(user_id, &task_id).await?,
            ResolutionAction::Keep => {}
        }

        let resolution = Resolution {
            resolved: true,
            resolved_at: Some(self.clock.now()),
            resolution_action: Some(action),
        };
        self.insights
            .update_resolution(user_id, insight_id, resolution.clone())
            .await?;
        insight.resolution = Some(resolution);

        tracing::info!(
            user_id = %user_id,
            insight_id = %insight_id,
            task_id = %task_id,
            action = %action,
            "escalation resolved"
        );
        Ok(insight)
    }

    /// 回答待ちのエスカレーション（古い順）
    pub async fn list_pending_escalations(&self, user_id: &UserId) -> Result<Vec<Insight>> {
        let insights = self.insights.list_insights(user_id).await?;
        Ok(insights
            .into_iter()
            .filter(Insight::is_pending_resolution)
            .collect())
    }
}
