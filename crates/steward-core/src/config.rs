//! StewardConfig - TOML 設定
//!
//! すべての項目に既定値があり、空ファイル（またはファイルなし）も
//! 有効な設定になる。

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::admission::AdmissionPolicy;
use crate::app::SchedulerConfig;
use crate::domain::{Result, StewardError};
use crate::insights::InsightThresholds;
use crate::lifecycle::LifecyclePolicy;
use crate::time::UserTimezone;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Json,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// JSON backend のルートディレクトリ
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StewardConfig {
    /// 有効なタイムゾーンを持たないユーザーに使う
    pub default_timezone: String,
    pub admission: AdmissionPolicy,
    pub insights: InsightThresholds,
    pub lifecycle: LifecyclePolicy,
    pub scheduler: SchedulerConfig,
    pub storage: StorageConfig,
}

impl Default for StewardConfig {
    fn default() -> Self {
        Self {
            default_timezone: "UTC".to_string(),
            admission: AdmissionPolicy::default(),
            insights: InsightThresholds::default(),
            lifecycle: LifecyclePolicy::default(),
            scheduler: SchedulerConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl StewardConfig {
    /// TOML ファイルを読み込んで検証
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            StewardError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: StewardConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.default_timezone()?;
        self.admission.validate()?;
        self.insights.validate()?;
        self.lifecycle.validate()?;
        self.scheduler.validate()?;
        if self.storage.backend == StorageBackend::Json && self.storage.path.is_none() {
            return Err(StewardError::Config(
                "storage.path is required for the json backend".into(),
            ));
        }
        Ok(())
    }

    pub fn default_timezone(&self) -> Result<UserTimezone> {
        UserTimezone::parse(&self.default_timezone)
    }
}
