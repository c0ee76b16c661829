//! Stale task warning - 数日放置された未完了タスク

use chrono::Duration;

use super::{InsightGenerator, InsightThresholds, Snapshot};
use crate::domain::{Insight, InsightData, Priority, Result, StaleTaskRef};
use crate::time::whole_days_between;

pub struct StaleTaskGenerator {
    stale_after: Duration,
    max_examples: usize,
}

impl StaleTaskGenerator {
    pub fn new(thresholds: &InsightThresholds) -> Self {
        Self {
            stale_after: Duration::days(thresholds.stale_after_days),
            max_examples: thresholds.stale_max_examples,
        }
    }
}

impl InsightGenerator for StaleTaskGenerator {
    fn name(&self) -> &'static str {
        "stale_tasks"
    }

    fn generate(&self, snapshot: &Snapshot<'_>) -> Result<Vec<Insight>> {
        let cutoff = snapshot.now - self.stale_after;

        let stale: Vec<StaleTaskRef> = snapshot
            .tasks
            .iter()
            .filter(|t| t.is_open())
            .filter_map(|t| {
                // 作成時刻がなければ経過日数を測れない
                let created_at = t.created_at?;
                (created_at < cutoff).then(|| StaleTaskRef {
                    task_id: t.id.clone(),
                    task_name: t.name.clone(),
                    days_old: whole_days_between(created_at, snapshot.now),
                })
            })
            .collect();

        if stale.is_empty() {
            return Ok(vec![]);
        }

        let count = stale.len();
        let tasks = stale.into_iter().take(self.max_examples).collect();

        tracing::info!(count, "generated stale task warning");
        Ok(vec![Insight::new(
            Priority::Medium,
            snapshot.now,
            InsightData::StaleTasks { count, tasks },
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Task;
    use crate::time::UserTimezone;
    use chrono::{TimeZone, Utc};

    #[test]
    fn one_warning_for_all_stale_tasks() {
        let now = Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap();
        let tasks = vec![
            Task::new("1", "a").created(now - Duration::days(4)),
            Task::new("2", "b").created(now - Duration::days(5)),
            Task::new("3", "c").created(now - Duration::days(6)),
            Task::new("4", "d").created(now - Duration::days(9)),
            Task::new("5", "fresh").created(now - Duration::days(1)),
            Task::new("6", "done").created(now - Duration::days(30)).completed_at(now),
            Task::new("7", "no timestamp"),
        ];

        let insights = StaleTaskGenerator::new(&InsightThresholds::default())
            .generate(&Snapshot::new(&tasks, now, UserTimezone::UTC))
            .unwrap();

        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].priority, Priority::Medium);
        let InsightData::StaleTasks { count, tasks } = &insights[0].data else {
            panic!("expected stale tasks");
        };
        assert_eq!(*count, 4);
        assert_eq!(tasks.len(), 3);
        assert_eq!(tasks[0].task_name, "a");
        assert_eq!(tasks[0].days_old, 4);
    }

    #[test]
    fn exactly_three_days_is_not_stale() {
        let now = Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap();
        let tasks = vec![Task::new("1", "a").created(now - Duration::days(3))];
        let insights = StaleTaskGenerator::new(&InsightThresholds::default())
            .generate(&Snapshot::new(&tasks, now, UserTimezone::UTC))
            .unwrap();
        assert!(insights.is_empty());
    }
}
