//! SchedulingDriver - 定期実行ループ
//!
//! # フロー（1 tick）
//! 1. monitored users を順番に monitor cycle（ユーザー間で yield）
//! 2. cleanup window（既定: 日曜 20:00-22:00）なら全ユーザーの cleanup cycle
//! 3. check_interval だけ sleep（shutdown で中断）
//!
//! 失敗したユーザーはログに残して次へ進み、次の tick で再試行する。
//! 手動の [`SchedulingDriver::trigger_user`] と定期ループの競合は
//! ユーザー単位の admission lock で直列化される。

use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::builder::App;
use super::status::DriverStatus;
use crate::domain::{Insight, Result, StewardError, UserId};
use crate::ports::Clock;
use crate::time::{UserTimezone, hour_in_window};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub check_interval_secs: u64,
    /// 監視ユーザーがいない間の sleep
    pub idle_poll_secs: u64,
    /// tick 内のユーザー間の待ち
    pub user_yield_millis: u64,
    pub cleanup_weekday: String,
    pub cleanup_start_hour: u32,
    pub cleanup_end_hour: u32,
    /// cleanup window を判定するタイムゾーン
    pub timezone: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: 1800,
            idle_poll_secs: 10,
            user_yield_millis: 100,
            cleanup_weekday: "Sun".to_string(),
            cleanup_start_hour: 20,
            cleanup_end_hour: 22,
            timezone: "UTC".to_string(),
        }
    }
}

impl SchedulerConfig {
    pub fn validate(&self) -> Result<()> {
        self.weekday()?;
        UserTimezone::parse(&self.timezone)?;
        if self.cleanup_start_hour > 23 || self.cleanup_end_hour > 23 {
            return Err(StewardError::Config(
                "scheduler cleanup hours must be within 0..=23".into(),
            ));
        }
        if self.check_interval_secs == 0 {
            return Err(StewardError::Config(
                "scheduler.check_interval_secs must be > 0".into(),
            ));
        }
        Ok(())
    }

    pub fn weekday(&self) -> Result<Weekday> {
        Weekday::from_str(&self.cleanup_weekday).map_err(|_| {
            StewardError::Config(format!("unknown cleanup weekday `{}`", self.cleanup_weekday))
        })
    }
}

/// TickSummary は 1 tick の結果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub users: usize,
    pub failed: usize,
    pub cleanup_ran: bool,
}

#[derive(Default)]
struct DriverState {
    users: Vec<UserId>,
    last_cleanup_date: Option<NaiveDate>,
    ticks: u64,
    running: bool,
}

pub struct SchedulingDriver {
    app: Arc<App>,
    config: SchedulerConfig,
    cleanup_weekday: Weekday,
    timezone: UserTimezone,
    state: Mutex<DriverState>,
}

impl SchedulingDriver {
    pub fn new(app: Arc<App>, config: SchedulerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            app,
            cleanup_weekday: config.weekday()?,
            timezone: UserTimezone::parse(&config.timezone)?,
            config,
            state: Mutex::new(DriverState::default()),
        })
    }

    pub fn app(&self) -> &Arc<App> {
        &self.app
    }

    fn state(&self) -> std::sync::MutexGuard<'_, DriverState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 監視対象に追加（既に登録済みなら `false`）
    pub fn add_user(&self, user_id: UserId) -> bool {
        let mut state = self.state();
        if state.users.contains(&user_id) {
            return false;
        }
        tracing::info!(user_id = %user_id, "user added to monitoring");
        state.users.push(user_id);
        true
    }

    pub fn remove_user(&self, user_id: &UserId) -> bool {
        let mut state = self.state();
        let before = state.users.len();
        state.users.retain(|u| u != user_id);
        let removed = state.users.len() != before;
        if removed {
            tracing::info!(user_id = %user_id, "user removed from monitoring");
        }
        removed
    }

    /// 監視ユーザー（登録順）
    pub fn monitored_users(&self) -> Vec<UserId> {
        self.state().users.clone()
    }

    pub fn status(&self) -> DriverStatus {
        let state = self.state();
        DriverStatus {
            running: state.running,
            check_interval_secs: self.config.check_interval_secs,
            monitored_user_count: state.users.len(),
            monitored_users: state.users.clone(),
            last_cleanup_date: state.last_cleanup_date,
            ticks_completed: state.ticks,
        }
    }

    /// `user_id` の monitor cycle を即時実行
    pub async fn trigger_user(&self, user_id: &UserId) -> Result<Vec<Insight>> {
        let timezone = self.app.admission().timezone_for(user_id).await;
        self.app.run_monitor_cycle(user_id, timezone).await
    }

    /// cleanup window 内で、そのローカル日付にまだ実行していないか
    pub fn cleanup_due(&self, now: DateTime<Utc>) -> bool {
        let local = self.timezone.local(now);
        if local.weekday() != self.cleanup_weekday {
            return false;
        }
        if !hour_in_window(local.hour(), self.config.cleanup_start_hour, self.config.cleanup_end_hour) {
            return false;
        }
        self.state().last_cleanup_date != Some(local.date_naive())
    }

    /// 全監視ユーザーを 1 巡し、必要なら cleanup も行う
    pub async fn tick(&self) -> TickSummary {
        let users = self.monitored_users();
        let mut summary = TickSummary {
            users: users.len(),
            ..TickSummary::default()
        };

        for (i, user_id) in users.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.user_yield_millis)).await;
            }
            if let Err(err) = self.trigger_user(user_id).await {
                summary.failed += 1;
                tracing::error!(user_id = %user_id, error = %err, kind = ?err.kind(), "monitor cycle failed");
            }
        }

        let now = self.app.clock().now();
        if self.cleanup_due(now) {
            self.run_cleanup_for_all(&users).await;
            self.state().last_cleanup_date = Some(self.timezone.local_date(now));
            summary.cleanup_ran = true;
        }

        self.state().ticks += 1;
        summary
    }

    async fn run_cleanup_for_all(&self, users: &[UserId]) {
        tracing::info!(users = users.len(), "weekly cleanup started");
        for user_id in users {
            let timezone = self.app.admission().timezone_for(user_id).await;
            match self.app.run_cleanup_cycle(user_id, timezone).await {
                Ok(report) => {
                    tracing::info!(
                        user_id = %user_id,
                        deleted_tasks = report.deleted_tasks,
                        escalated = report.escalated,
                        deleted_folders = report.deleted_folders,
                        "cleanup finished for user"
                    );
                }
                Err(err) => {
                    tracing::error!(user_id = %user_id, error = %err, kind = ?err.kind(), "cleanup cycle failed");
                }
            }
            tokio::task::yield_now().await;
        }
    }

    /// ループを runtime 上に spawn
    pub fn spawn(self: Arc<Self>) -> DriverHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let join = tokio::spawn(async move {
            self.run(shutdown_rx).await;
        });
        DriverHandle { shutdown_tx, join }
    }

    /// `shutdown_rx` が `true` になる（または sender が drop される）までループ
    pub async fn run(&self, mut shutdown_rx: watch::Receiver<bool>) {
        self.state().running = true;
        tracing::info!(
            check_interval_secs = self.config.check_interval_secs,
            users = self.monitored_users().len(),
            cleanup_weekday = %self.cleanup_weekday,
            "scheduling driver started"
        );

        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            let pause = if self.monitored_users().is_empty() {
                Duration::from_secs(self.config.idle_poll_secs)
            } else {
                let summary = self.tick().await;
                tracing::info!(users = summary.users, failed = summary.failed, cleanup = summary.cleanup_ran, "tick finished");
                Duration::from_secs(self.config.check_interval_secs)
            };

            // sleep 中も shutdown で起きる
            tokio::select! {
                changed = shutdown_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = tokio::time::sleep(pause) => {}
            }
        }

        self.state().running = false;
        tracing::info!("scheduling driver stopped");
    }
}

/// DriverHandle はループの制御ハンドル
/// - `request_shutdown()`: 現在の tick の後でループを止める
/// - `shutdown_and_join()` で終了を待てる
pub struct DriverHandle {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl DriverHandle {
    pub fn request_shutdown(&self) {
        // ループが既に終わっていれば送信エラーは無視
        let _ = self.shutdown_tx.send(true);
    }

    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        let _ = self.join.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::AppBuilder;
    use crate::domain::Task;
    use crate::impls::{InMemoryStore, LogNotifier};
    use crate::ports::{FixedClock, InsightStore, TaskStore};
    use chrono::TimeZone;
    use rstest::rstest;

    fn driver(now: DateTime<Utc>) -> (Arc<InMemoryStore>, Arc<FixedClock>, SchedulingDriver) {
        let clock = Arc::new(FixedClock::new(now));
        let store = Arc::new(InMemoryStore::with_clock(clock.clone()));
        let app = AppBuilder::new()
            .with_memory_store(store.clone())
            .notifier(Arc::new(LogNotifier))
            .clock(clock.clone())
            .build()
            .unwrap();
        let config = SchedulerConfig {
            user_yield_millis: 0,
            ..SchedulerConfig::default()
        };
        (store, clock, SchedulingDriver::new(Arc::new(app), config).unwrap())
    }

    // 2024-06-02 は日曜日
    fn sunday(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 2, hour, 30, 0).unwrap()
    }

    #[test]
    fn users_are_unique_and_ordered() {
        let (_, _, driver) = driver(sunday(9));
        assert!(driver.add_user(UserId::new("b")));
        assert!(driver.add_user(UserId::new("a")));
        assert!(!driver.add_user(UserId::new("b")));
        assert_eq!(
            driver.monitored_users(),
            vec![UserId::new("b"), UserId::new("a")]
        );
        assert!(driver.remove_user(&UserId::new("b")));
        assert!(!driver.remove_user(&UserId::new("b")));
        assert_eq!(driver.status().monitored_user_count, 1);
    }

    #[rstest]
    #[case::sunday_evening(sunday(20), true)]
    #[case::sunday_late(sunday(21), true)]
    #[case::window_end(sunday(22), false)]
    #[case::sunday_morning(sunday(9), false)]
    #[case::monday_evening(Utc.with_ymd_and_hms(2024, 6, 3, 20, 30, 0).unwrap(), false)]
    fn cleanup_window(#[case] now: DateTime<Utc>, #[case] due: bool) {
        let (_, _, driver) = driver(now);
        assert_eq!(driver.cleanup_due(now), due);
    }

    #[tokio::test]
    async fn cleanup_runs_once_per_date() {
        let (store, clock, driver) = driver(sunday(20));
        let user = UserId::new("u1");
        store
            .add_task(&user, Task::new("t1", "ancient").created(sunday(20) - chrono::Duration::days(30)))
            .await;
        driver.add_user(user.clone());

        let first = driver.tick().await;
        assert!(first.cleanup_ran);
        assert!(store.fetch_tasks(&user).await.unwrap().is_empty());

        clock.advance(chrono::Duration::minutes(30));
        let second = driver.tick().await;
        assert!(!second.cleanup_ran);

        let status = driver.status();
        assert_eq!(status.ticks_completed, 2);
        assert_eq!(status.last_cleanup_date, NaiveDate::from_ymd_opt(2024, 6, 2));
    }

    #[tokio::test]
    async fn failing_user_does_not_stop_others() {
        let (store, _, driver) = driver(sunday(9));
        let bad = UserId::new("bad");
        let good = UserId::new("good");
        store.fail_task_fetches(&bad).await;
        for i in 0..3 {
            store
                .add_task(&good, Task::new(format!("t{i}"), format!("task {i}")).high_priority())
                .await;
        }
        driver.add_user(bad);
        driver.add_user(good.clone());

        let summary = driver.tick().await;
        assert_eq!(summary.users, 2);
        assert_eq!(summary.failed, 1);
        assert!(!store.list_insights(&good).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn spawned_driver_shuts_down() {
        let (_, _, driver) = driver(sunday(9));
        let driver = Arc::new(driver);
        let handle = Arc::clone(&driver).spawn();
        tokio::task::yield_now().await;
        handle.shutdown_and_join().await;
        assert!(!driver.status().running);
    }
}
