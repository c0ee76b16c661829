//! Insight generators - タスクスナップショットの純粋な分析
//!
//! 各 generator は同じ不変の [`Snapshot`] を見て、互いに独立している。
//! [`run_generators`] は失敗を generator 単位で隔離し、
//! 1 つが壊れても残りの結果は失われない。

mod folder_focus;
mod priority;
mod productivity;
mod stale;

pub use self::folder_focus::FolderFocusGenerator;
pub use self::priority::PriorityAlertGenerator;
pub use self::productivity::ProductivityPatternGenerator;
pub use self::stale::StaleTaskGenerator;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Insight, Result, StewardError, Task};
use crate::time::{MAX_WINDOW_DAYS, UserTimezone};

/// Snapshot は generator に渡す入力
#[derive(Debug, Clone, Copy)]
pub struct Snapshot<'a> {
    pub tasks: &'a [Task],
    pub now: DateTime<Utc>,
    pub timezone: UserTimezone,
}

impl<'a> Snapshot<'a> {
    pub fn new(tasks: &'a [Task], now: DateTime<Utc>, timezone: UserTimezone) -> Self {
        Self {
            tasks,
            now,
            timezone,
        }
    }
}

pub trait InsightGenerator: Send + Sync {
    fn name(&self) -> &'static str;

    /// 0 件以上の insight。データ不足はエラーではなく `Ok(vec![])`
    fn generate(&self, snapshot: &Snapshot<'_>) -> Result<Vec<Insight>>;
}

/// InsightThresholds は組み込み generator の閾値
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightThresholds {
    /// priority alert を出す未完了の高優先度タスク数の下限
    pub priority_alert_threshold: usize,
    pub priority_alert_max_names: usize,
    /// この日数より古い未完了タスクを stale とみなす
    pub stale_after_days: i64,
    pub stale_max_examples: usize,
    /// productivity tip に必要な完了タスク数（完了時刻付き）
    pub productivity_min_completed: usize,
}

impl Default for InsightThresholds {
    fn default() -> Self {
        Self {
            priority_alert_threshold: 3,
            priority_alert_max_names: 5,
            stale_after_days: 3,
            stale_max_examples: 3,
            productivity_min_completed: 3,
        }
    }
}

impl InsightThresholds {
    pub fn validate(&self) -> Result<()> {
        if self.priority_alert_threshold == 0 || self.productivity_min_completed == 0 {
            return Err(StewardError::Config(
                "insight count thresholds must be > 0".into(),
            ));
        }
        if !(0..=MAX_WINDOW_DAYS).contains(&self.stale_after_days) {
            return Err(StewardError::Config(format!(
                "insights.stale_after_days must be within 0..={MAX_WINDOW_DAYS}"
            )));
        }
        Ok(())
    }
}

/// 組み込みの 4 generator（決まった順序）
pub fn default_generators(thresholds: &InsightThresholds) -> Vec<Box<dyn InsightGenerator>> {
    vec![
        Box::new(PriorityAlertGenerator::new(thresholds)),
        Box::new(FolderFocusGenerator),
        Box::new(ProductivityPatternGenerator::new(thresholds)),
        Box::new(StaleTaskGenerator::new(thresholds)),
    ]
}

/// 全 generator を `snapshot` に適用し、generator 順に結果を連結する。
/// 失敗した generator はログに残して飛ばす。
pub fn run_generators(
    generators: &[Box<dyn InsightGenerator>],
    snapshot: &Snapshot<'_>,
) -> Vec<Insight> {
    let mut insights = Vec::new();
    for generator in generators {
        match generator.generate(snapshot) {
            Ok(found) => {
                tracing::debug!(generator = generator.name(), count = found.len(), "generator finished");
                insights.extend(found);
            }
            Err(err) => {
                tracing::warn!(generator = generator.name(), error = %err, "generator failed, skipping");
            }
        }
    }
    insights
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{InsightKind, StewardError};
    use chrono::{Duration, TimeZone};

    struct Broken;

    impl InsightGenerator for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn generate(&self, _snapshot: &Snapshot<'_>) -> Result<Vec<Insight>> {
            Err(StewardError::Config("boom".into()))
        }
    }

    #[test]
    fn failing_generator_does_not_hide_others() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let tasks = vec![Task::new("t1", "old chore").created(now - Duration::days(5))];
        let snapshot = Snapshot::new(&tasks, now, UserTimezone::UTC);

        let generators: Vec<Box<dyn InsightGenerator>> = vec![
            Box::new(Broken),
            Box::new(StaleTaskGenerator::new(&InsightThresholds::default())),
        ];
        let insights = run_generators(&generators, &snapshot);

        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].kind, InsightKind::StaleTaskWarning);
    }

    #[test]
    fn empty_snapshot_yields_nothing() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let snapshot = Snapshot::new(&[], now, UserTimezone::UTC);
        let generators = default_generators(&InsightThresholds::default());
        assert!(run_generators(&generators, &snapshot).is_empty());
    }
}
