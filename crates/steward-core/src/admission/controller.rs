//! AdmissionController - 状態を持つ admission controller
//!
//! [`AdmissionPolicy`] に state の永続化とユーザー単位の直列化を加える。
//! 判定と記録はそのユーザーのロック下で行うので、手動 trigger と
//! 定期 cycle が競合しても送信が二重に数えられることはない。

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use super::policy::{AdmissionDecision, AdmissionPolicy};
use crate::domain::{Insight, NotificationState, Result, UserId};
use crate::ports::{Clock, NotificationStateStore, ProfileStore};
use crate::time::UserTimezone;

/// ユーザーごとに遅延生成する async lock
#[derive(Default)]
struct UserLocks {
    locks: Mutex<HashMap<UserId, Arc<AsyncMutex<()>>>>,
}

impl UserLocks {
    async fn acquire(&self, user_id: &UserId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(user_id.clone()).or_default())
        };
        lock.lock_owned().await
    }
}

/// [`AdmissionController::stats`] の戻り値
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationStats {
    pub sent_today: u32,
    pub daily_budget: u32,
    pub budget_remaining: u32,
    pub last_notification_time: Option<DateTime<Utc>>,
    pub last_reset: NaiveDate,
    pub history_len: usize,
    pub policy: AdmissionPolicy,
}

pub struct AdmissionController {
    policy: AdmissionPolicy,
    states: Arc<dyn NotificationStateStore>,
    profiles: Arc<dyn ProfileStore>,
    clock: Arc<dyn Clock>,
    default_timezone: UserTimezone,
    locks: UserLocks,
}

impl AdmissionController {
    pub fn new(
        policy: AdmissionPolicy,
        states: Arc<dyn NotificationStateStore>,
        profiles: Arc<dyn ProfileStore>,
        clock: Arc<dyn Clock>,
        default_timezone: UserTimezone,
    ) -> Self {
        Self {
            policy,
            states,
            profiles,
            clock,
            default_timezone,
            locks: UserLocks::default(),
        }
    }

    pub fn policy(&self) -> &AdmissionPolicy {
        &self.policy
    }

    pub fn default_timezone(&self) -> UserTimezone {
        self.default_timezone
    }

    /// ユーザーのタイムゾーン。未設定・不明・読み込み失敗なら設定の既定値
    pub async fn timezone_for(&self, user_id: &UserId) -> UserTimezone {
        match self.profiles.timezone(user_id).await {
            Ok(Some(name)) => UserTimezone::parse_or(&name, self.default_timezone),
            Ok(None) => self.default_timezone,
            Err(err) => {
                tracing::warn!(user_id = %user_id, error = %err, "failed to read profile timezone");
                self.default_timezone
            }
        }
    }

    /// 一連の判定のためにユーザーの state をロックする
    ///
    /// ロックは session が drop されるまで保持される。
    pub async fn session(&self, user_id: &UserId, timezone: UserTimezone) -> AdmissionSession<'_> {
        let guard = self.locks.acquire(user_id).await;
        let state = self.load_state(user_id, timezone).await;
        AdmissionSession {
            controller: self,
            user_id: user_id.clone(),
            timezone,
            state,
            _guard: guard,
        }
    }

    /// insight 1 件の単発判定（ユーザー自身のタイムゾーンで）
    pub async fn should_send_now(&self, user_id: &UserId, insight: &Insight) -> AdmissionDecision {
        let timezone = self.timezone_for(user_id).await;
        let mut session = self.session(user_id, timezone).await;
        session.should_send_now(insight).await
    }

    /// 配送済み通知を記録する。配送に成功した後にだけ呼ぶ。
    pub async fn record_sent(&self, user_id: &UserId, insight: &Insight) -> Result<()> {
        let timezone = self.timezone_for(user_id).await;
        let mut session = self.session(user_id, timezone).await;
        session.record_sent(insight).await
    }

    pub async fn stats(&self, user_id: &UserId) -> Result<NotificationStats> {
        let timezone = self.timezone_for(user_id).await;
        let mut session = self.session(user_id, timezone).await;
        session.roll_over().await;
        let state = session.state();
        Ok(NotificationStats {
            sent_today: state.sent_today,
            daily_budget: self.policy.daily_budget,
            budget_remaining: self.policy.budget_remaining(state),
            last_notification_time: state.last_notification_time,
            last_reset: state.last_reset,
            history_len: state.notification_history.len(),
            policy: self.policy.clone(),
        })
    }

    /// 管理用: ゼロ状態に戻す
    pub async fn reset(&self, user_id: &UserId) -> Result<()> {
        let timezone = self.timezone_for(user_id).await;
        let _guard = self.locks.acquire(user_id).await;
        let fresh = NotificationState::fresh(timezone.local_date(self.clock.now()));
        self.states.save_notification_state(user_id, &fresh).await?;
        tracing::info!(user_id = %user_id, "notification state reset");
        Ok(())
    }

    async fn load_state(&self, user_id: &UserId, timezone: UserTimezone) -> NotificationState {
        let today = timezone.local_date(self.clock.now());
        match self.states.load_notification_state(user_id).await {
            Ok(Some(state)) => state,
            Ok(None) => {
                let fresh = NotificationState::fresh(today);
                if let Err(err) = self.states.save_notification_state(user_id, &fresh).await {
                    tracing::warn!(user_id = %user_id, error = %err, "failed to persist initial notification state");
                }
                fresh
            }
            Err(err) => {
                tracing::warn!(user_id = %user_id, error = %err, "notification state unreadable, starting fresh");
                NotificationState::fresh(today)
            }
        }
    }
}

/// AdmissionSession は 1 ユーザーの state への排他アクセス
///
/// session 内の判定は互いの結果を反映する。先の `record_sent` で
/// 後の insight が budget 超過や gap 内になることがある。
pub struct AdmissionSession<'a> {
    controller: &'a AdmissionController,
    user_id: UserId,
    timezone: UserTimezone,
    state: NotificationState,
    _guard: OwnedMutexGuard<()>,
}

impl AdmissionSession<'_> {
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn timezone(&self) -> UserTimezone {
        self.timezone
    }

    pub fn state(&self) -> &NotificationState {
        &self.state
    }

    pub fn budget_remaining(&self) -> u32 {
        self.controller.policy.budget_remaining(&self.state)
    }

    /// `insight` を判定する。日付切り替えはすぐ保存し、
    /// 保存に失敗してもログのみで判定はそのまま。
    pub async fn should_send_now(&mut self, insight: &Insight) -> AdmissionDecision {
        let now = self.controller.clock.now();
        let decision = self
            .controller
            .policy
            .evaluate(&mut self.state, insight, now, self.timezone);

        if decision.rolled_over {
            self.persist_rollover().await;
        }

        tracing::debug!(
            user_id = %self.user_id,
            insight_type = %insight.kind,
            priority = %insight.priority,
            send = decision.should_send(),
            reason = %decision.reason,
            "admission decision"
        );
        decision
    }

    /// 判定を伴わない日付切り替え（stats など）
    ///
    /// 切り替えが起きたら保存する。保存失敗はログのみ。
    pub async fn roll_over(&mut self) -> bool {
        let today = self.timezone.local_date(self.controller.clock.now());
        let rolled = self.state.roll_over(today);
        if rolled {
            self.persist_rollover().await;
        }
        rolled
    }

    async fn persist_rollover(&self) {
        tracing::info!(user_id = %self.user_id, date = %self.state.last_reset, "daily notification counter reset");
        if let Err(err) = self
            .controller
            .states
            .save_notification_state(&self.user_id, &self.state)
            .await
        {
            tracing::warn!(user_id = %self.user_id, error = %err, "failed to persist daily rollover");
        }
    }

    /// 配送済みを反映して保存（日付が変わっていれば先にリセット）
    pub async fn record_sent(&mut self, insight: &Insight) -> Result<()> {
        let now = self.controller.clock.now();
        if self.state.roll_over(self.timezone.local_date(now)) {
            tracing::info!(user_id = %self.user_id, date = %self.state.last_reset, "daily notification counter reset");
        }
        self.controller.policy.record(&mut self.state, insight, now);
        self.controller
            .states
            .save_notification_state(&self.user_id, &self.state)
            .await?;
        tracing::info!(
            user_id = %self.user_id,
            insight_type = %insight.kind,
            sent_today = self.state.sent_today,
            daily_budget = self.controller.policy.daily_budget,
            "notification recorded"
        );
        Ok(())
    }
}
