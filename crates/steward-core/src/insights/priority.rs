//! Priority alert - 未完了の高優先度タスクが多すぎる

use super::{InsightGenerator, InsightThresholds, Snapshot};
use crate::domain::{Insight, InsightData, Priority, Result};

pub struct PriorityAlertGenerator {
    threshold: usize,
    max_names: usize,
}

impl PriorityAlertGenerator {
    pub fn new(thresholds: &InsightThresholds) -> Self {
        Self {
            threshold: thresholds.priority_alert_threshold,
            max_names: thresholds.priority_alert_max_names,
        }
    }
}

impl InsightGenerator for PriorityAlertGenerator {
    fn name(&self) -> &'static str {
        "priority_alert"
    }

    fn generate(&self, snapshot: &Snapshot<'_>) -> Result<Vec<Insight>> {
        let open_priority: Vec<_> = snapshot
            .tasks
            .iter()
            .filter(|t| t.is_high_priority && t.is_open())
            .collect();

        if open_priority.len() < self.threshold {
            return Ok(vec![]);
        }

        // ソートせずスナップショット順
        let task_names = open_priority
            .iter()
            .take(self.max_names)
            .map(|t| t.name.clone())
            .collect();

        tracing::info!(count = open_priority.len(), "generated priority alert");
        Ok(vec![Insight::new(
            Priority::High,
            snapshot.now,
            InsightData::PriorityAlert {
                count: open_priority.len(),
                task_names,
            },
        )])
    }
}
