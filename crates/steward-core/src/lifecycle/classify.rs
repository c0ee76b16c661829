use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Folder, Insight, InsightData, Priority, Result, StewardError, Task};
use crate::time::{MAX_WINDOW_DAYS, whole_days_between};

/// CleanupAction は週次の整理でタスク 1 件に行う処理
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupAction {
    /// ストアから削除
    Delete { reason: String },
    /// `high_priority_stale_warning` でユーザーに確認
    Escalate { reason: String },
    Keep,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecyclePolicy {
    /// これより長く放置された未完了タスクは削除またはエスカレーション
    pub stale_after_days: i64,
    /// これより新しい空フォルダは残す
    pub folder_grace_days: i64,
}

impl Default for LifecyclePolicy {
    fn default() -> Self {
        Self {
            stale_after_days: 10,
            folder_grace_days: 10,
        }
    }
}

impl LifecyclePolicy {
    pub fn validate(&self) -> Result<()> {
        let range = 0..=MAX_WINDOW_DAYS;
        if !range.contains(&self.stale_after_days) || !range.contains(&self.folder_grace_days) {
            return Err(StewardError::Config(format!(
                "lifecycle day thresholds must be within 0..={MAX_WINDOW_DAYS}"
            )));
        }
        Ok(())
    }

    /// タスク 1 件を分類する。ルールは上から順に:
    ///
    /// 1. 期限切れ（`due_date` が UTC の今日より前）: 高優先度ならエスカレーション、
    ///    それ以外は削除。他のルールは見ない。
    /// 2. 作成から `stale_after_days` 日を超えている: 同じ振り分け
    /// 3. それ以外は残す
    ///
    /// 完了済みと `created_at` のないタスクは常に残す。
    pub fn classify(&self, task: &Task, now: DateTime<Utc>) -> CleanupAction {
        if task.completed {
            return CleanupAction::Keep;
        }
        let Some(created_at) = task.created_at else {
            return CleanupAction::Keep;
        };

        if let Some(due) = task.due_date {
            let today = now.date_naive();
            if due < today {
                let days = (today - due).num_days();
                return split(task, format!("Overdue by {days} days"));
            }
        }

        if created_at < now - Duration::days(self.stale_after_days) {
            let days = whole_days_between(created_at, now);
            return split(task, format!("Untouched for {days} days"));
        }

        CleanupAction::Keep
    }

    /// 猶予期間を過ぎた空フォルダか。作成時刻のないフォルダは
    /// 回収しない。
    pub fn folder_reclaimable(&self, folder: &Folder, task_count: usize, now: DateTime<Utc>) -> bool {
        if task_count > 0 {
            return false;
        }
        folder
            .created_at
            .is_some_and(|created| created < now - Duration::days(self.folder_grace_days))
    }
}

fn split(task: &Task, reason: String) -> CleanupAction {
    if task.is_high_priority {
        CleanupAction::Escalate {
            reason: format!("{reason} (high priority)"),
        }
    } else {
        CleanupAction::Delete { reason }
    }
}

/// エスカレーション時に作る insight
pub fn escalation_insight(task: &Task, reason: &str, now: DateTime<Utc>) -> Insight {
    Insight::new(
        Priority::High,
        now,
        InsightData::HighPriorityStale {
            task_id: task.id.clone(),
            task_name: task.name.clone(),
            reason: reason.to_string(),
            folder: task.folder.clone(),
            action_required: true,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use rstest::rstest;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 20, 15, 0, 0).unwrap()
    }

    fn yesterday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, 19).unwrap()
    }

    fn recent(name: &str) -> Task {
        Task::new(name, name).created(now() - Duration::days(1))
    }

    #[test]
    fn overdue_regular_task_is_deleted() {
        let task = recent("pay bill").due(yesterday());
        assert_eq!(
            LifecyclePolicy::default().classify(&task, now()),
            CleanupAction::Delete {
                reason: "Overdue by 1 days".into()
            }
        );
    }

    #[test]
    fn overdue_priority_task_is_escalated() {
        let task = recent("pay bill").due(yesterday()).high_priority();
        let action = LifecyclePolicy::default().classify(&task, now());
        assert_eq!(
            action,
            CleanupAction::Escalate {
                reason: "Overdue by 1 days (high priority)".into()
            }
        );

        let CleanupAction::Escalate { reason } = action else {
            unreachable!()
        };
        let insight = escalation_insight(&task, &reason, now());
        assert_eq!(insight.priority, Priority::High);
        assert!(insight.is_pending_resolution());
        assert_eq!(insight.escalated_task(), Some(&task.id));
    }

    #[test]
    fn untouched_regular_task_is_deleted() {
        let task = Task::new("t", "old idea").created(now() - Duration::days(11));
        assert_eq!(
            LifecyclePolicy::default().classify(&task, now()),
            CleanupAction::Delete {
                reason: "Untouched for 11 days".into()
            }
        );
    }

    #[test]
    fn future_due_date_falls_through_to_staleness() {
        let task = Task::new("t", "someday")
            .created(now() - Duration::days(15))
            .due(NaiveDate::from_ymd_opt(2024, 8, 1).unwrap())
            .high_priority();
        assert_eq!(
            LifecyclePolicy::default().classify(&task, now()),
            CleanupAction::Escalate {
                reason: "Untouched for 15 days (high priority)".into()
            }
        );
    }

    #[test]
    fn due_today_is_not_overdue() {
        let task = recent("today").due(now().date_naive());
        assert_eq!(LifecyclePolicy::default().classify(&task, now()), CleanupAction::Keep);
    }

    #[rstest]
    #[case::fresh(Task::new("t", "fresh").created(now() - Duration::days(2)))]
    #[case::completed_overdue(
        Task::new("t", "done").created(now() - Duration::days(40)).due(yesterday()).completed_at(now())
    )]
    #[case::completed_priority_stale(
        Task::new("t", "done").created(now() - Duration::days(40)).high_priority().completed_at(now())
    )]
    #[case::no_creation_time(Task::new("t", "legacy").due(yesterday()))]
    fn kept(#[case] task: Task) {
        assert_eq!(LifecyclePolicy::default().classify(&task, now()), CleanupAction::Keep);
    }

    #[rstest]
    #[case::old_and_empty(11, 0, true)]
    #[case::young_and_empty(3, 0, false)]
    #[case::old_with_tasks(30, 2, false)]
    fn folder_reclamation(#[case] age_days: i64, #[case] tasks: usize, #[case] reclaim: bool) {
        let folder = Folder::new("f", "errands").created(now() - Duration::days(age_days));
        assert_eq!(
            LifecyclePolicy::default().folder_reclaimable(&folder, tasks, now()),
            reclaim
        );
    }

    #[test]
    fn folder_without_creation_time_is_kept() {
        let folder = Folder::new("f", "imported");
        assert!(!LifecyclePolicy::default().folder_reclaimable(&folder, 0, now()));
    }
}
