//! Time - 全コンポーネント共通の時刻ユーティリティ
//!
//! 保存される時刻は常に UTC。ユーザーの壁時計に依存する判定
//! （quiet hours、日付切り替え、生産的な時間帯）は [`UserTimezone`] を通す。

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::domain::errors::StewardError;

/// 設定で受け付ける日数・時間窓の上限（約 100 年）
///
/// これを超えると `chrono` の期間演算がオーバーフローする。
pub const MAX_WINDOW_DAYS: i64 = 36_500;

/// UserTimezone はユーザーの IANA タイムゾーン
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserTimezone(Tz);

impl UserTimezone {
    pub const UTC: UserTimezone = UserTimezone(Tz::UTC);

    /// IANA 名（"Asia/Kolkata"）をパース
    pub fn parse(name: &str) -> Result<Self, StewardError> {
        Tz::from_str(name.trim())
            .map(Self)
            .map_err(|_| StewardError::InvalidTimezone(name.to_string()))
    }

    /// IANA 名をパースし、不明な名前なら `default` にフォールバック
    pub fn parse_or(name: &str, default: UserTimezone) -> Self {
        match Self::parse(name) {
            Ok(tz) => tz,
            Err(_) => {
                tracing::warn!(timezone = name, fallback = %default, "unknown timezone, using fallback");
                default
            }
        }
    }

    pub fn name(&self) -> &'static str {
        self.0.name()
    }

    pub fn local(&self, instant: DateTime<Utc>) -> DateTime<Tz> {
        self.0.from_utc_datetime(&instant.naive_utc())
    }

    /// このタイムゾーンでの `instant` の時（0..=23）
    pub fn local_hour(&self, instant: DateTime<Utc>) -> u32 {
        self.local(instant).hour()
    }

    /// このタイムゾーンでの `instant` の日付
    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        self.local(instant).date_naive()
    }
}

impl Default for UserTimezone {
    fn default() -> Self {
        Self::UTC
    }
}

impl fmt::Display for UserTimezone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// `earlier` から `later` までの経過日数（切り捨て、負にならない）
pub fn whole_days_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> i64 {
    (later - earlier).num_days().max(0)
}

/// 24 時間表記の時を "7:00 AM" 形式にする
pub fn hour_12_label(hour: u32) -> String {
    let hour_12 = match hour % 12 {
        0 => 12,
        h => h,
    };
    let am_pm = if hour < 12 { "AM" } else { "PM" };
    format!("{hour_12}:00 {am_pm}")
}

/// `hour` が半開区間 `[start, end)` に入るか
///
/// `start > end` なら日付をまたぐ（22..7 は 22, 23, 0..=6）
pub fn hour_in_window(hour: u32, start: u32, end: u32) -> bool {
    if start <= end {
        hour >= start && hour < end
    } else {
        hour >= start || hour < end
    }
}

/// StoredTimestamp はストア文書に書かれたままの時刻
///
/// クライアントごとに RFC3339 文字列、epoch ミリ秒（整数または小数）、
/// `{seconds, nanos}`（Firestore 形式の `{_seconds, _nanoseconds}` も可）が
/// 混在する。[`StoredTimestamp::to_utc`] で一度だけ変換し、コアは
/// `DateTime<Utc>` だけを見る。
///
/// どの形にも当てはまらない値は `Other` に落ちて `None` になる。
/// 壊れた値が 1 件あっても文書全体は読み込める。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredTimestamp {
    Millis(i64),
    FractionalMillis(f64),
    Wrapped {
        #[serde(alias = "_seconds")]
        seconds: i64,
        #[serde(default, alias = "_nanoseconds")]
        nanos: u32,
    },
    Text(String),
    Other(serde_json::Value),
}

impl StoredTimestamp {
    /// 解釈できない値は `None`
    pub fn to_utc(&self) -> Option<DateTime<Utc>> {
        match self {
            StoredTimestamp::Millis(ms) => DateTime::from_timestamp_millis(*ms),
            StoredTimestamp::FractionalMillis(ms) => {
                // NaN / 範囲外は None
                if ms.is_finite() && ms.abs() < i64::MAX as f64 {
                    DateTime::from_timestamp_millis(ms.trunc() as i64)
                } else {
                    None
                }
            }
            StoredTimestamp::Wrapped { seconds, nanos } => {
                DateTime::from_timestamp(*seconds, *nanos)
            }
            StoredTimestamp::Text(text) => parse_text_timestamp(text),
            StoredTimestamp::Other(_) => None,
        }
    }
}

impl From<DateTime<Utc>> for StoredTimestamp {
    fn from(value: DateTime<Utc>) -> Self {
        StoredTimestamp::Text(value.to_rfc3339())
    }
}

fn parse_text_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    // オフセットなしの "2024-05-01T10:00:00" は UTC とみなす
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    // 日付のみ: UTC の 0 時
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, "12:00 AM")]
    #[case(7, "7:00 AM")]
    #[case(12, "12:00 PM")]
    #[case(19, "7:00 PM")]
    #[case(23, "11:00 PM")]
    fn twelve_hour_labels(#[case] hour: u32, #[case] expected: &str) {
        assert_eq!(hour_12_label(hour), expected);
    }

    #[rstest]
    #[case(22, true)]
    #[case(23, true)]
    #[case(0, true)]
    #[case(6, true)]
    #[case(7, false)]
    #[case(12, false)]
    #[case(21, false)]
    fn wrapping_window(#[case] hour: u32, #[case] inside: bool) {
        assert_eq!(hour_in_window(hour, 22, 7), inside);
    }

    #[test]
    fn non_wrapping_window() {
        assert!(hour_in_window(9, 9, 17));
        assert!(!hour_in_window(17, 9, 17));
        assert!(!hour_in_window(3, 9, 17));
    }

    #[test]
    fn local_hour_and_date_follow_timezone() {
        let tz = UserTimezone::parse("Asia/Kolkata").unwrap();
        // 20:00 UTC = IST の翌日 01:30
        let instant = Utc.with_ymd_and_hms(2024, 3, 10, 20, 0, 0).unwrap();
        assert_eq!(tz.local_hour(instant), 1);
        assert_eq!(tz.local_date(instant), NaiveDate::from_ymd_opt(2024, 3, 11).unwrap());
    }

    #[test]
    fn unknown_timezone_is_rejected_or_defaulted() {
        assert!(UserTimezone::parse("Mars/Olympus").is_err());
        let tz = UserTimezone::parse_or("Mars/Olympus", UserTimezone::UTC);
        assert_eq!(tz, UserTimezone::UTC);
    }

    #[test]
    fn whole_days_floor() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 1, 12, 11, 59, 0).unwrap();
        assert_eq!(whole_days_between(start, later), 10);
        assert_eq!(whole_days_between(later, start), 0);
    }

    #[test]
    fn stored_timestamps_convert_once() {
        let expected = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();

        let text: StoredTimestamp = serde_json::from_str("\"2024-05-01T10:00:00Z\"").unwrap();
        assert_eq!(text.to_utc(), Some(expected));

        let offset: StoredTimestamp =
            serde_json::from_str("\"2024-05-01T15:30:00+05:30\"").unwrap();
        assert_eq!(offset.to_utc(), Some(expected));

        let millis: StoredTimestamp =
            serde_json::from_value(serde_json::json!(expected.timestamp_millis())).unwrap();
        assert_eq!(millis.to_utc(), Some(expected));

        let wrapped: StoredTimestamp = serde_json::from_value(
            serde_json::json!({ "seconds": expected.timestamp(), "nanos": 0 }),
        )
        .unwrap();
        assert_eq!(wrapped.to_utc(), Some(expected));

        let garbage = StoredTimestamp::Text("yesterday-ish".to_string());
        assert_eq!(garbage.to_utc(), None);
    }

    #[test]
    fn foreign_shapes_never_fail_to_deserialize() {
        let expected = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();

        let fractional: StoredTimestamp =
            serde_json::from_value(serde_json::json!(expected.timestamp_millis() as f64 + 0.5))
                .unwrap();
        assert_eq!(fractional.to_utc(), Some(expected));

        let firestore: StoredTimestamp = serde_json::from_value(
            serde_json::json!({ "_seconds": expected.timestamp(), "_nanoseconds": 0 }),
        )
        .unwrap();
        assert_eq!(firestore.to_utc(), Some(expected));

        for raw in [
            serde_json::json!(true),
            serde_json::json!(null),
            serde_json::json!(["2024-05-01"]),
            serde_json::json!({ "when": "soon" }),
            serde_json::json!(1e300),
        ] {
            let value: StoredTimestamp = serde_json::from_value(raw.clone()).unwrap();
            assert_eq!(value.to_utc(), None, "{raw}");
        }
    }
}
