//! Monitor cycle - 1 ユーザー分の insight 生成と配送

use super::builder::App;
use crate::domain::{Insight, Result, UserId};
use crate::insights::{Snapshot, run_generators};
use crate::ports::Clock;
use crate::time::UserTimezone;

impl App {
    /// 現在のタスクに全 generator を適用し、結果を保存して
    /// admission を通ったものを push する
    ///
    /// 保存した insight を返す。タスク取得に失敗したら cycle ごと中断。
    pub async fn run_monitor_cycle(
        &self,
        user_id: &UserId,
        timezone: UserTimezone,
    ) -> Result<Vec<Insight>> {
        tracing::info!(user_id = %user_id, timezone = %timezone, "monitor cycle started");

        let tasks = self.tasks.fetch_tasks(user_id).await?;
        if tasks.is_empty() {
            tracing::info!(user_id = %user_id, "no tasks, nothing to analyze");
            return Ok(Vec::new());
        }

        let now = self.clock.now();
        let generated = run_generators(&self.generators, &Snapshot::new(&tasks, now, timezone));
        if generated.is_empty() {
            tracing::info!(user_id = %user_id, tasks = tasks.len(), "monitor cycle finished, no insights");
            return Ok(Vec::new());
        }

        let mut session = self.admission.session(user_id, timezone).await;
        let (saved, summary) = self.publisher.publish(&mut session, generated).await;

        tracing::info!(
            user_id = %user_id,
            tasks = tasks.len(),
            insights = saved.len(),
            sent = summary.sent,
            "monitor cycle finished"
        );
        Ok(saved)
    }
}
