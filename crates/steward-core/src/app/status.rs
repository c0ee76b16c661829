//! Status - ドライバの状態
//!
//! 運用向けスナップショット（監視対象と最後の cleanup 日）

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::UserId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DriverStatus {
    pub running: bool,
    pub check_interval_secs: u64,
    pub monitored_user_count: usize,
    pub monitored_users: Vec<UserId>,
    pub last_cleanup_date: Option<NaiveDate>,
    pub ticks_completed: u64,
}
