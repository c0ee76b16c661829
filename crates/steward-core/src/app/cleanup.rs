//! Cleanup cycle - 1 ユーザー分のタスク整理と空フォルダの回収
//!
//! ベストエフォート: 削除に失敗したものはログに残して飛ばし、
//! 残りのタスクとフォルダは処理を続ける。

use serde::{Deserialize, Serialize};

use super::builder::App;
use crate::domain::{Result, Task, UserId};
use crate::lifecycle::{CleanupAction, escalation_insight};
use crate::ports::Clock;
use crate::time::UserTimezone;

/// CleanupReport は 1 回の cleanup の結果（成功した操作のみ数える）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupReport {
    pub deleted_tasks: usize,
    pub escalated: usize,
    pub deleted_folders: usize,
}

impl App {
    pub async fn run_cleanup_cycle(
        &self,
        user_id: &UserId,
        timezone: UserTimezone,
    ) -> Result<CleanupReport> {
        tracing::info!(user_id = %user_id, timezone = %timezone, "cleanup cycle started");

        let tasks = self.tasks.fetch_tasks(user_id).await?;
        let now = self.clock.now();

        let mut to_delete: Vec<(&Task, String)> = Vec::new();
        let mut to_escalate: Vec<(&Task, String)> = Vec::new();
        for task in &tasks {
            match self.lifecycle.classify(task, now) {
                CleanupAction::Delete { reason } => to_delete.push((task, reason)),
                CleanupAction::Escalate { reason } => to_escalate.push((task, reason)),
                CleanupAction::Keep => {}
            }
        }

        let mut report = CleanupReport::default();

        for (task, reason) in &to_delete {
            match self.tasks.delete_task(user_id, &task.id).await {
                Ok(()) => {
                    report.deleted_tasks += 1;
                    tracing::info!(user_id = %user_id, task_id = %task.id, task_name = %task.name, reason = %reason, "task deleted");
                }
                Err(err) => {
                    tracing::warn!(user_id = %user_id, task_id = %task.id, error = %err, "failed to delete task");
                }
            }
        }

        if !to_escalate.is_empty() {
            let escalations = to_escalate
                .iter()
                .map(|(task, reason)| {
                    tracing::info!(user_id = %user_id, task_id = %task.id, reason = %reason, "task escalated");
                    escalation_insight(task, reason, now)
                })
                .collect();
            let mut session = self.admission.session(user_id, timezone).await;
            let (saved, _) = self.publisher.publish(&mut session, escalations).await;
            report.escalated = saved.len();
        }

        report.deleted_folders = self.reclaim_folders(user_id).await;

        tracing::info!(
            user_id = %user_id,
            deleted_tasks = report.deleted_tasks,
            escalated = report.escalated,
            deleted_folders = report.deleted_folders,
            "cleanup cycle finished"
        );
        Ok(report)
    }

    /// 猶予期間を過ぎた空フォルダを削除し、削除数を返す
    async fn reclaim_folders(&self, user_id: &UserId) -> usize {
        let folders = match self.tasks.list_folders(user_id).await {
            Ok(folders) => folders,
            Err(err) => {
                tracing::warn!(user_id = %user_id, error = %err, "failed to list folders, skipping reclamation");
                return 0;
            }
        };

        let now = self.clock.now();
        let mut deleted = 0;
        for folder in &folders {
            let count = match self.tasks.count_tasks_in_folder(user_id, &folder.id).await {
                Ok(count) => count,
                Err(err) => {
                    tracing::warn!(user_id = %user_id, folder_id = %folder.id, error = %err, "failed to count folder tasks");
                    continue;
                }
            };
            if !self.lifecycle.folder_reclaimable(folder, count, now) {
                continue;
            }
            match self.tasks.delete_folder(user_id, &folder.id).await {
                Ok(()) => {
                    deleted += 1;
                    tracing::info!(user_id = %user_id, folder_id = %folder.id, folder_name = %folder.name, "empty folder deleted");
                }
                Err(err) => {
                    tracing::warn!(user_id = %user_id, folder_id = %folder.id, error = %err, "failed to delete folder");
                }
            }
        }
        deleted
    }
}
