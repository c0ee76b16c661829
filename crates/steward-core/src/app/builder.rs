//! AppBuilder - アプリケーションの構築とワイヤリング
//!
//! # Fail-fast 設計
//! - 必須コンポーネント（stores, notifier）が欠けていれば build() がエラー
//! - 任意コンポーネント（composer, clock, generators）はデフォルトで補完
//! - Config から組み立てる場合も同じ検証を通る

use std::sync::Arc;

use crate::admission::{AdmissionController, AdmissionPolicy};
use crate::config::{StewardConfig, StorageBackend};
use crate::domain::{Result, StewardError};
use crate::impls::{InMemoryStore, JsonFileStore, TemplateComposer};
use crate::insights::{InsightGenerator, InsightThresholds, default_generators};
use crate::lifecycle::LifecyclePolicy;
use crate::ports::{
    Clock, InsightStore, NotificationComposer, NotificationStateStore, Notifier, ProfileStore,
    SystemClock, TaskStore,
};
use crate::time::UserTimezone;

use super::publisher::InsightPublisher;

/// AppBuilder は App を構築
///
/// # 使用例
/// ```ignore
/// let store = Arc::new(InMemoryStore::new());
/// let app = AppBuilder::new()
///     .with_memory_store(store)
///     .notifier(Arc::new(LogNotifier))
///     .build()?;
/// ```
pub struct AppBuilder {
    tasks: Option<Arc<dyn TaskStore>>,
    insights: Option<Arc<dyn InsightStore>>,
    states: Option<Arc<dyn NotificationStateStore>>,
    profiles: Option<Arc<dyn ProfileStore>>,
    notifier: Option<Arc<dyn Notifier>>,
    composer: Option<Arc<dyn NotificationComposer>>,
    clock: Option<Arc<dyn Clock>>,
    generators: Option<Vec<Box<dyn InsightGenerator>>>,
    admission_policy: AdmissionPolicy,
    thresholds: InsightThresholds,
    lifecycle: LifecyclePolicy,
    default_timezone: UserTimezone,
}

impl AppBuilder {
    pub fn new() -> Self {
        Self {
            tasks: None,
            insights: None,
            states: None,
            profiles: None,
            notifier: None,
            composer: None,
            clock: None,
            generators: None,
            admission_policy: AdmissionPolicy::default(),
            thresholds: InsightThresholds::default(),
            lifecycle: LifecyclePolicy::default(),
            default_timezone: UserTimezone::UTC,
        }
    }

    /// `config` からポリシー・既定タイムゾーン・ストレージを設定
    ///
    /// notifier は別途指定が必要
    pub fn from_config(config: &StewardConfig) -> Result<Self> {
        config.validate()?;
        let builder = Self::new()
            .admission_policy(config.admission.clone())
            .insight_thresholds(config.insights.clone())
            .lifecycle_policy(config.lifecycle.clone())
            .default_timezone(config.default_timezone()?);

        Ok(match config.storage.backend {
            StorageBackend::Memory => builder.with_memory_store(Arc::new(InMemoryStore::new())),
            StorageBackend::Json => {
                let root = config.storage.path.clone().ok_or_else(|| {
                    StewardError::Config("storage.path is required for the json backend".into())
                })?;
                builder.with_json_store(Arc::new(JsonFileStore::new(root)))
            }
        })
    }

    pub fn task_store(mut self, store: Arc<dyn TaskStore>) -> Self {
        self.tasks = Some(store);
        self
    }

    pub fn insight_store(mut self, store: Arc<dyn InsightStore>) -> Self {
        self.insights = Some(store);
        self
    }

    pub fn notification_state_store(mut self, store: Arc<dyn NotificationStateStore>) -> Self {
        self.states = Some(store);
        self
    }

    pub fn profile_store(mut self, store: Arc<dyn ProfileStore>) -> Self {
        self.profiles = Some(store);
        self
    }

    /// 全ストア port に同じ in-memory store を使う
    pub fn with_memory_store(self, store: Arc<InMemoryStore>) -> Self {
        self.task_store(store.clone())
            .insight_store(store.clone())
            .notification_state_store(store.clone())
            .profile_store(store)
    }

    pub fn with_json_store(self, store: Arc<JsonFileStore>) -> Self {
        self.task_store(store.clone())
            .insight_store(store.clone())
            .notification_state_store(store.clone())
            .profile_store(store)
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn composer(mut self, composer: Arc<dyn NotificationComposer>) -> Self {
        self.composer = Some(composer);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// 組み込み generator を差し替える
    pub fn generators(mut self, generators: Vec<Box<dyn InsightGenerator>>) -> Self {
        self.generators = Some(generators);
        self
    }

    pub fn admission_policy(mut self, policy: AdmissionPolicy) -> Self {
        self.admission_policy = policy;
        self
    }

    pub fn insight_thresholds(mut self, thresholds: InsightThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn lifecycle_policy(mut self, policy: LifecyclePolicy) -> Self {
        self.lifecycle = policy;
        self
    }

    pub fn default_timezone(mut self, timezone: UserTimezone) -> Self {
        self.default_timezone = timezone;
        self
    }

    /// # 検証
    /// - 4 つの store と notifier が揃っているか
    /// - policy の値が妥当か
    pub fn build(self) -> Result<App> {
        let tasks = self.tasks.ok_or(StewardError::MissingComponent("task store"))?;
        let insights = self
            .insights
            .ok_or(StewardError::MissingComponent("insight store"))?;
        let states = self
            .states
            .ok_or(StewardError::MissingComponent("notification state store"))?;
        let profiles = self
            .profiles
            .ok_or(StewardError::MissingComponent("profile store"))?;
        let notifier = self
            .notifier
            .ok_or(StewardError::MissingComponent("notifier"))?;

        self.admission_policy.validate()?;
        self.thresholds.validate()?;
        self.lifecycle.validate()?;

        let composer = self
            .composer
            .unwrap_or_else(|| Arc::new(TemplateComposer));
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let generators = self
            .generators
            .unwrap_or_else(|| default_generators(&self.thresholds));

        let admission = Arc::new(AdmissionController::new(
            self.admission_policy,
            states,
            profiles,
            Arc::clone(&clock),
            self.default_timezone,
        ));

        Ok(App {
            tasks,
            insights: Arc::clone(&insights),
            admission,
            publisher: InsightPublisher::new(insights, composer, notifier),
            generators,
            lifecycle: self.lifecycle,
            clock,
        })
    }
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// App はポリシーエンジン本体
///
/// monitor / cleanup cycle とエスカレーション解決は兄弟モジュールで実装。
/// scheduling driver は `Arc` 越しに保持する。
pub struct App {
    pub(super) tasks: Arc<dyn TaskStore>,
    pub(super) insights: Arc<dyn InsightStore>,
    pub(super) admission: Arc<AdmissionController>,
    pub(super) publisher: InsightPublisher,
    pub(super) generators: Vec<Box<dyn InsightGenerator>>,
    pub(super) lifecycle: LifecyclePolicy,
    pub(super) clock: Arc<dyn Clock>,
}

impl App {
    pub fn admission(&self) -> &AdmissionController {
        &self.admission
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::LogNotifier;

    #[test]
    fn build_with_memory_store() {
        let app = AppBuilder::new()
            .with_memory_store(Arc::new(InMemoryStore::new()))
            .notifier(Arc::new(LogNotifier))
            .build();
        assert!(app.is_ok());
    }

    #[test]
    fn missing_notifier_fails_fast() {
        let result = AppBuilder::new()
            .with_memory_store(Arc::new(InMemoryStore::new()))
            .build();
        assert!(matches!(
            result,
            Err(StewardError::MissingComponent("notifier"))
        ));
    }

    #[test]
    fn missing_store_fails_fast() {
        let result = AppBuilder::new().notifier(Arc::new(LogNotifier)).build();
        assert!(matches!(
            result,
            Err(StewardError::MissingComponent("task store"))
        ));
    }

    #[test]
    fn invalid_policy_is_rejected() {
        let result = AppBuilder::new()
            .with_memory_store(Arc::new(InMemoryStore::new()))
            .notifier(Arc::new(LogNotifier))
            .admission_policy(AdmissionPolicy {
                daily_budget: 0,
                ..AdmissionPolicy::default()
            })
            .build();
        assert!(matches!(result, Err(StewardError::Config(_))));
    }

    #[test]
    fn from_config_json_backend() {
        let dir = tempfile::tempdir().unwrap();
        let config = StewardConfig::from_toml_str(&format!(
            "[storage]\nbackend = \"json\"\npath = {:?}\n",
            dir.path().display().to_string()
        ))
        .unwrap();
        let app = AppBuilder::from_config(&config)
            .unwrap()
            .notifier(Arc::new(LogNotifier))
            .build();
        assert!(app.is_ok());
    }
}
