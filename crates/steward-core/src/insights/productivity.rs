//! Productivity pattern - タスクを最も多く完了するローカルの時間帯

use std::collections::HashMap;

use super::{InsightGenerator, InsightThresholds, Snapshot};
use crate::domain::{Insight, InsightData, Priority, Result};
use crate::time::hour_12_label;

pub struct ProductivityPatternGenerator {
    min_completed: usize,
}

impl ProductivityPatternGenerator {
    pub fn new(thresholds: &InsightThresholds) -> Self {
        Self {
            min_completed: thresholds.productivity_min_completed,
        }
    }
}

impl InsightGenerator for ProductivityPatternGenerator {
    fn name(&self) -> &'static str {
        "productivity_pattern"
    }

    fn generate(&self, snapshot: &Snapshot<'_>) -> Result<Vec<Insight>> {
        let completion_times: Vec<_> = snapshot
            .tasks
            .iter()
            .filter(|t| t.completed)
            .filter_map(|t| t.completed_at)
            .collect();

        if completion_times.len() < self.min_completed {
            tracing::debug!(
                completed = completion_times.len(),
                "not enough completed tasks for pattern analysis"
            );
            return Ok(vec![]);
        }

        let mut first_seen: Vec<u32> = Vec::new();
        let mut counts: HashMap<u32, usize> = HashMap::new();
        for at in &completion_times {
            let hour = snapshot.timezone.local_hour(*at);
            let count = counts.entry(hour).or_insert_with(|| {
                first_seen.push(hour);
                0
            });
            *count += 1;
        }

        let mut peak: Option<(u32, usize)> = None;
        for hour in first_seen {
            let count = counts.get(&hour).copied().unwrap_or_default();
            if peak.is_none_or(|(_, best)| count > best) {
                peak = Some((hour, count));
            }
        }
        let Some((peak_hour, _)) = peak else {
            return Ok(vec![]);
        };

        let label = hour_12_label(peak_hour);
        tracing::info!(peak = %label, timezone = %snapshot.timezone, "generated productivity tip");
        Ok(vec![Insight::new(
            Priority::Low,
            snapshot.now,
            InsightData::ProductivityTip {
                peak_hour,
                peak_hour_12: label,
                completed_count: completion_times.len(),
                timezone: snapshot.timezone.name().to_string(),
            },
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Task;
    use crate::time::UserTimezone;
    use chrono::{DateTime, TimeZone, Utc};

    fn utc(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, h, m, 0).unwrap()
    }

    #[test]
    fn peak_hour_is_in_user_timezone() {
        let tz = UserTimezone::parse("Asia/Kolkata").unwrap();
        // 01:40 UTC -> 07:10 IST, 01:50 UTC -> 07:20 IST, 06:00 UTC -> 11:30 IST
        let tasks = vec![
            Task::new("1", "a").completed_at(utc(1, 40)),
            Task::new("2", "b").completed_at(utc(1, 50)),
            Task::new("3", "c").completed_at(utc(6, 0)),
        ];

        let insights = ProductivityPatternGenerator::new(&InsightThresholds::default())
            .generate(&Snapshot::new(&tasks, utc(12, 0), tz))
            .unwrap();

        assert_eq!(insights.len(), 1);
        let InsightData::ProductivityTip {
            peak_hour,
            peak_hour_12,
            completed_count,
            timezone,
        } = &insights[0].data
        else {
            panic!("expected productivity tip");
        };
        assert_eq!(*peak_hour, 7);
        assert_eq!(peak_hour_12, "7:00 AM");
        assert_eq!(*completed_count, 3);
        assert_eq!(timezone, "Asia/Kolkata");
    }

    #[test]
    fn needs_three_timestamped_completions() {
        let mut missing_time = Task::new("3", "c");
        missing_time.completed = true;
        let tasks = vec![
            Task::new("1", "a").completed_at(utc(9, 0)),
            Task::new("2", "b").completed_at(utc(9, 30)),
            missing_time,
        ];

        let insights = ProductivityPatternGenerator::new(&InsightThresholds::default())
            .generate(&Snapshot::new(&tasks, utc(12, 0), UserTimezone::UTC))
            .unwrap();
        assert!(insights.is_empty());
    }

    #[test]
    fn evening_peak_uses_pm_label() {
        let tasks = vec![
            Task::new("1", "a").completed_at(utc(19, 5)),
            Task::new("2", "b").completed_at(utc(19, 45)),
            Task::new("3", "c").completed_at(utc(8, 0)),
        ];
        let insights = ProductivityPatternGenerator::new(&InsightThresholds::default())
            .generate(&Snapshot::new(&tasks, utc(21, 0), UserTimezone::UTC))
            .unwrap();
        let InsightData::ProductivityTip { peak_hour_12, .. } = &insights[0].data else {
            panic!("expected productivity tip");
        };
        assert_eq!(peak_hour_12, "7:00 PM");
    }
}
