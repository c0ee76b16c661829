//! AdmissionPolicy - 通知 controller の純粋な部分
//!
//! [`AdmissionPolicy::evaluate`] の副作用は渡された state への
//! 日付切り替えだけで、その保存は controller の責務。

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Insight, NotificationState, Priority, Result, StewardError};
use crate::time::{MAX_WINDOW_DAYS, UserTimezone, hour_in_window};

/// AdmissionRule は判定を決めたルール
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionRule {
    CriticalOverride,
    QuietHours,
    DailyBudget,
    MinimumGap,
    Duplicate,
    Passed,
}

impl AdmissionRule {
    pub fn allows(self) -> bool {
        matches!(self, AdmissionRule::CriticalOverride | AdmissionRule::Passed)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdmissionDecision {
    pub rule: AdmissionRule,
    pub reason: String,
    /// 判定中に日次カウンタをリセットしたか
    pub rolled_over: bool,
}

impl AdmissionDecision {
    pub fn should_send(&self) -> bool {
        self.rule.allows()
    }
}

/// AdmissionPolicy はグローバルな通知ポリシー（ユーザー単位ではない）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdmissionPolicy {
    pub daily_budget: u32,
    pub min_gap_minutes: i64,
    /// ローカル時刻の quiet window `[quiet_start_hour, quiet_end_hour)`
    /// （start > end なら日付をまたぐ）
    pub quiet_start_hour: u32,
    pub quiet_end_hour: u32,
    pub duplicate_window_hours: i64,
    pub history_limit: usize,
}

impl Default for AdmissionPolicy {
    fn default() -> Self {
        Self {
            daily_budget: 6,
            min_gap_minutes: 120,
            quiet_start_hour: 22,
            quiet_end_hour: 7,
            duplicate_window_hours: 24,
            history_limit: 50,
        }
    }
}

impl AdmissionPolicy {
    pub fn validate(&self) -> Result<()> {
        if self.daily_budget == 0 {
            return Err(StewardError::Config("admission.daily_budget must be > 0".into()));
        }
        let gap_ok = (0..=MAX_WINDOW_DAYS * 24 * 60).contains(&self.min_gap_minutes);
        let duplicate_ok = (0..=MAX_WINDOW_DAYS * 24).contains(&self.duplicate_window_hours);
        if !gap_ok || !duplicate_ok {
            return Err(StewardError::Config(format!(
                "admission windows must be non-negative and at most {MAX_WINDOW_DAYS} days"
            )));
        }
        if self.quiet_start_hour > 23 || self.quiet_end_hour > 23 {
            return Err(StewardError::Config(
                "admission quiet hours must be within 0..=23".into(),
            ));
        }
        if self.history_limit == 0 {
            return Err(StewardError::Config("admission.history_limit must be > 0".into()));
        }
        Ok(())
    }

    pub fn quiet_hours_label(&self) -> String {
        format!("{}:00-{}:00", self.quiet_start_hour, self.quiet_end_hour)
    }

    /// `insight` を今 push してよいか判定する
    ///
    /// ルールは決まった順に評価し、最初に当たったものが勝つ。
    /// 日付切り替えは結果が「否」でも最初に `state` へ適用する。
    pub fn evaluate(
        &self,
        state: &mut NotificationState,
        insight: &Insight,
        now: DateTime<Utc>,
        timezone: UserTimezone,
    ) -> AdmissionDecision {
        let rolled_over = state.roll_over(timezone.local_date(now));
        let decide = |rule: AdmissionRule, reason: String| AdmissionDecision {
            rule,
            reason,
            rolled_over,
        };

        if insight.priority == Priority::Critical {
            return decide(AdmissionRule::CriticalOverride, "Critical priority".into());
        }

        // critical は処理済みなので >= High は High のみ
        let high = insight.priority >= Priority::High;

        let hour = timezone.local_hour(now);
        if hour_in_window(hour, self.quiet_start_hour, self.quiet_end_hour) && !high {
            return decide(
                AdmissionRule::QuietHours,
                format!("Quiet hours ({})", self.quiet_hours_label()),
            );
        }

        if state.sent_today >= self.daily_budget && !high {
            return decide(
                AdmissionRule::DailyBudget,
                format!(
                    "Daily budget exhausted ({}/{})",
                    state.sent_today, self.daily_budget
                ),
            );
        }

        if let Some(last) = state.last_notification_time {
            let min_gap = Duration::minutes(self.min_gap_minutes);
            let gap = now - last;
            if gap < min_gap && !high {
                let wait_minutes = (min_gap - gap).num_seconds().div_euclid(60);
                return decide(
                    AdmissionRule::MinimumGap,
                    format!("Too soon (wait {wait_minutes} more minutes)"),
                );
            }
        }

        let cutoff = now - Duration::hours(self.duplicate_window_hours);
        if state.sent_since(insight.kind, cutoff) {
            return decide(
                AdmissionRule::Duplicate,
                "Similar notification sent recently".into(),
            );
        }

        decide(AdmissionRule::Passed, "All checks passed".into())
    }

    /// 配送済みを `state` に反映
    pub fn record(&self, state: &mut NotificationState, insight: &Insight, now: DateTime<Utc>) {
        state.push_sent(insight, now, self.history_limit);
    }

    pub fn budget_remaining(&self, state: &NotificationState) -> u32 {
        self.daily_budget.saturating_sub(state.sent_today)
    }
}
