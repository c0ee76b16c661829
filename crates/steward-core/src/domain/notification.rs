//! NotificationState - admission controller が cycle をまたいで持つ
//! 唯一の可変状態（ユーザーごと）

use std::collections::VecDeque;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::insight::{Insight, InsightKind, Priority};

/// 配送済み通知 1 件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(rename = "type")]
    pub kind: InsightKind,
    pub priority: Priority,
    pub timestamp: DateTime<Utc>,
}

/// ユーザーごとに保存される state 文書
///
/// # 不変条件
/// - `sent_today` は直近のローカル日付切り替え以降の送信数
/// - `notification_history` は新しいものが末尾、長さは設定上限以下
///   （古いものから捨てる）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationState {
    pub sent_today: u32,
    pub last_reset: NaiveDate,
    #[serde(default)]
    pub last_notification_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notification_history: VecDeque<HistoryEntry>,
}

impl NotificationState {
    /// 初めて見るユーザーのゼロ状態
    pub fn fresh(today: NaiveDate) -> Self {
        Self {
            sent_today: 0,
            last_reset: today,
            last_notification_time: None,
            notification_history: VecDeque::new(),
        }
    }

    /// `today` が `last_reset` と違えば日次カウンタをリセット
    ///
    /// リセットしたかどうかを返す（保存は呼び出し側）
    pub fn roll_over(&mut self, today: NaiveDate) -> bool {
        if self.last_reset == today {
            return false;
        }
        self.sent_today = 0;
        self.last_reset = today;
        true
    }

    /// 配送済み通知を記録し、`history_limit` を超えた古い履歴を捨てる
    pub fn push_sent(&mut self, insight: &Insight, now: DateTime<Utc>, history_limit: usize) {
        self.sent_today += 1;
        self.last_notification_time = Some(now);
        self.notification_history.push_back(HistoryEntry {
            kind: insight.kind,
            priority: insight.priority,
            timestamp: now,
        });
        while self.notification_history.len() > history_limit {
            self.notification_history.pop_front();
        }
    }

    /// `cutoff` 以降に `kind` の通知を送ったか
    pub fn sent_since(&self, kind: InsightKind, cutoff: DateTime<Utc>) -> bool {
        self.notification_history
            .iter()
            .any(|entry| entry.kind == kind && entry.timestamp > cutoff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::InsightData;
    use chrono::{Duration, TimeZone};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, d).unwrap()
    }

    fn tip(now: DateTime<Utc>) -> Insight {
        Insight::new(
            Priority::Low,
            now,
            InsightData::ProductivityTip {
                peak_hour: 9,
                peak_hour_12: "9:00 AM".into(),
                completed_count: 3,
                timezone: "UTC".into(),
            },
        )
    }

    #[test]
    fn roll_over_only_on_new_date() {
        let mut state = NotificationState::fresh(day(1));
        state.sent_today = 4;

        assert!(!state.roll_over(day(1)));
        assert_eq!(state.sent_today, 4);

        assert!(state.roll_over(day(2)));
        assert_eq!(state.sent_today, 0);
        assert_eq!(state.last_reset, day(2));

        assert!(!state.roll_over(day(2)));
    }

    #[test]
    fn history_is_bounded_oldest_first() {
        let start = Utc.with_ymd_and_hms(2024, 4, 1, 8, 0, 0).unwrap();
        let mut state = NotificationState::fresh(day(1));

        for i in 0..60 {
            let now = start + Duration::minutes(i);
            state.push_sent(&tip(now), now, 50);
        }

        assert_eq!(state.sent_today, 60);
        assert_eq!(state.notification_history.len(), 50);
        // 0..10 番目は捨てられている
        assert_eq!(
            state.notification_history.front().map(|e| e.timestamp),
            Some(start + Duration::minutes(10))
        );
        assert_eq!(
            state.notification_history.back().map(|e| e.timestamp),
            Some(start + Duration::minutes(59))
        );
    }

    #[test]
    fn state_round_trips_through_json() {
        let now = Utc.with_ymd_and_hms(2024, 4, 1, 8, 0, 0).unwrap();
        let mut state = NotificationState::fresh(day(1));
        state.push_sent(&tip(now), now, 50);

        let json = serde_json::to_string(&state).unwrap();
        let back: NotificationState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }
}
