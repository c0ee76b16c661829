//! JsonFileStore - ユーザーごとのディレクトリに置くファイルストア
//!
//! ```text
//! <root>/<user_id>/tasks.json
//!                  folders.json
//!                  insights.json
//!                  notification_state.json
//!                  profile.json
//! ```
//!
//! 文書は丸ごと読み書きする。タスクとフォルダの時刻は [`StoredTimestamp`]
//! を通すので、他クライアントが書いた形式（epoch ミリ秒、
//! `{seconds, nanos}`、RFC3339）も読める。読めない値は `None`、
//! 読めないレコードは飛ばす。更新は生のレコードを直接編集するので、
//! そうした値も書き戻しでそのまま残る。

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::domain::{
    Folder, FolderId, Insight, InsightId, NotificationState, Resolution, Result, StewardError,
    Task, TaskId, UserId,
};
use crate::ports::{
    Clock, IdGenerator, InsightStore, NotificationStateStore, ProfileStore, SystemClock, TaskStore,
    UlidGenerator,
};
use crate::time::StoredTimestamp;

const TASKS: &str = "tasks.json";
const FOLDERS: &str = "folders.json";
const INSIGHTS: &str = "insights.json";
const NOTIFICATION_STATE: &str = "notification_state.json";
const PROFILE: &str = "profile.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TaskRecord {
    id: String,
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    folder: Option<String>,
    #[serde(default)]
    completed: bool,
    #[serde(default)]
    is_high_priority: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created_at: Option<StoredTimestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    due_date: Option<StoredTimestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    completed_at: Option<StoredTimestamp>,
}

impl TaskRecord {
    fn to_task(&self) -> Task {
        let folder = self
            .folder
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty() && !f.eq_ignore_ascii_case("none"))
            .map(FolderId::from);
        Task {
            id: TaskId::new(&self.id),
            name: self.name.clone(),
            folder,
            completed: self.completed,
            is_high_priority: self.is_high_priority,
            created_at: self.created_at.as_ref().and_then(StoredTimestamp::to_utc),
            due_date: self
                .due_date
                .as_ref()
                .and_then(StoredTimestamp::to_utc)
                .map(|at| at.date_naive()),
            completed_at: self.completed_at.as_ref().and_then(StoredTimestamp::to_utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FolderRecord {
    id: String,
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created_at: Option<StoredTimestamp>,
}

impl FolderRecord {
    fn to_folder(&self) -> Folder {
        Folder {
            id: FolderId::new(&self.id),
            name: self.name.clone(),
            created_at: self.created_at.as_ref().and_then(StoredTimestamp::to_utc),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ProfileRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timezone: Option<String>,
}

pub struct JsonFileStore {
    root: PathBuf,
    clock: Arc<dyn Clock>,
    ids: Box<dyn IdGenerator>,
    /// 文書の read-modify-write を直列化
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_clock(root, Arc::new(SystemClock))
    }

    pub fn with_clock(root: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self {
            root: root.into(),
            ids: Box::new(UlidGenerator::new(Arc::clone(&clock))),
            clock,
            write_lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn user_dir(&self, user_id: &UserId) -> Result<PathBuf> {
        let id = user_id.as_str();
        if id.is_empty() || id.contains(['/', '\\']) || id == "." || id == ".." {
            return Err(StewardError::store("user_dir", user_id, "invalid user id for file store"));
        }
        Ok(self.root.join(id))
    }

    fn document(&self, user_id: &UserId, name: &str) -> Result<PathBuf> {
        Ok(self.user_dir(user_id)?.join(name))
    }

    async fn read_optional<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn read_list<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
        Ok(Self::read_optional(path).await?.unwrap_or_default())
    }

    /// 隣の一時ファイルに書いてから rename で置き換える
    async fn write_doc<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec_pretty(value)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    pub async fn add_task(&self, user_id: &UserId, task: &Task) -> Result<()> {
        let record = TaskRecord {
            id: task.id.to_string(),
            name: task.name.clone(),
            folder: task.folder.as_ref().map(ToString::to_string),
            completed: task.completed,
            is_high_priority: task.is_high_priority,
            created_at: task.created_at.map(StoredTimestamp::from),
            due_date: task
                .due_date
                .map(|d| StoredTimestamp::Text(d.format("%Y-%m-%d").to_string())),
            completed_at: task.completed_at.map(StoredTimestamp::from),
        };
        let path = self.document(user_id, TASKS)?;
        let _guard = self.write_lock.lock().await;
        let mut records: Vec<Value> = Self::read_list(&path).await?;
        records.push(serde_json::to_value(record)?);
        Self::write_doc(&path, &records).await
    }

    pub async fn add_folder(&self, user_id: &UserId, folder: &Folder) -> Result<()> {
        let record = FolderRecord {
            id: folder.id.to_string(),
            name: folder.name.clone(),
            created_at: folder.created_at.map(StoredTimestamp::from),
        };
        let path = self.document(user_id, FOLDERS)?;
        let _guard = self.write_lock.lock().await;
        let mut records: Vec<Value> = Self::read_list(&path).await?;
        records.push(serde_json::to_value(record)?);
        Self::write_doc(&path, &records).await
    }

    /// 1 件ずつデコードし、読めないレコードは警告を出して飛ばす
    fn decode_records<T: DeserializeOwned>(
        user_id: &UserId,
        document: &'static str,
        raw: Vec<Value>,
    ) -> Vec<T> {
        raw.into_iter()
            .filter_map(|value| match serde_json::from_value(value) {
                Ok(record) => Some(record),
                Err(err) => {
                    tracing::warn!(user_id = %user_id, document, error = %err, "skipping unreadable record");
                    None
                }
            })
            .collect()
    }

    /// 指定 id のレコードを取り除き、変化があれば書き戻す
    async fn remove_record(path: &Path, id: &str) -> Result<()> {
        let mut records: Vec<Value> = Self::read_list(path).await?;
        let before = records.len();
        records.retain(|r| record_id(r) != Some(id));
        if records.len() != before {
            Self::write_doc(path, &records).await?;
        }
        Ok(())
    }
}

fn record_id(value: &Value) -> Option<&str> {
    value.get("id").and_then(Value::as_str)
}

#[async_trait]
impl TaskStore for JsonFileStore {
    async fn fetch_tasks(&self, user_id: &UserId) -> Result<Vec<Task>> {
        let path = self.document(user_id, TASKS)?;
        let raw: Vec<Value> = Self::read_list(&path).await?;
        let records: Vec<TaskRecord> = Self::decode_records(user_id, TASKS, raw);
        Ok(records.iter().map(TaskRecord::to_task).collect())
    }

    async fn delete_task(&self, user_id: &UserId, task_id: &TaskId) -> Result<()> {
        let path = self.document(user_id, TASKS)?;
        let _guard = self.write_lock.lock().await;
        Self::remove_record(&path, task_id.as_str()).await
    }

    async fn complete_task(&self, user_id: &UserId, task_id: &TaskId) -> Result<()> {
        let path = self.document(user_id, TASKS)?;
        let now = self.clock.now();
        let _guard = self.write_lock.lock().await;
        let mut records: Vec<Value> = Self::read_list(&path).await?;
        let record = records
            .iter_mut()
            .find(|r| record_id(r) == Some(task_id.as_str()))
            .and_then(Value::as_object_mut)
            .ok_or_else(|| StewardError::not_found(task_id))?;
        record.insert("completed".into(), Value::Bool(true));
        record.insert(
            "completed_at".into(),
            serde_json::to_value(StoredTimestamp::from(now))?,
        );
        Self::write_doc(&path, &records).await
    }

    async fn list_folders(&self, user_id: &UserId) -> Result<Vec<Folder>> {
        let path = self.document(user_id, FOLDERS)?;
        let raw: Vec<Value> = Self::read_list(&path).await?;
        let records: Vec<FolderRecord> = Self::decode_records(user_id, FOLDERS, raw);
        Ok(records.iter().map(FolderRecord::to_folder).collect())
    }

    async fn count_tasks_in_folder(
        &self,
        user_id: &UserId,
        folder_id: &FolderId,
    ) -> Result<usize> {
        let tasks = self.fetch_tasks(user_id).await?;
        Ok(tasks
            .iter()
            .filter(|t| t.folder.as_ref() == Some(folder_id))
            .count())
    }

    async fn delete_folder(&self, user_id: &UserId, folder_id: &FolderId) -> Result<()> {
        let path = self.document(user_id, FOLDERS)?;
        let _guard = self.write_lock.lock().await;
        Self::remove_record(&path, folder_id.as_str()).await
    }
}

#[async_trait]
impl InsightStore for JsonFileStore {
    async fn save_insight(&self, user_id: &UserId, insight: &Insight) -> Result<InsightId> {
        let path = self.document(user_id, INSIGHTS)?;
        let id = self.ids.generate_insight_id();
        let mut stored = insight.clone();
        stored.id = Some(id.clone());

        let _guard = self.write_lock.lock().await;
        let mut insights: Vec<Insight> = Self::read_list(&path).await?;
        insights.push(stored);
        Self::write_doc(&path, &insights).await?;
        Ok(id)
    }

    async fn get_insight(
        &self,
        user_id: &UserId,
        insight_id: &InsightId,
    ) -> Result<Option<Insight>> {
        let insights = self.list_insights(user_id).await?;
        Ok(insights
            .into_iter()
            .find(|i| i.id.as_ref() == Some(insight_id)))
    }

    async fn update_resolution(
        &self,
        user_id: &UserId,
        insight_id: &InsightId,
        resolution: Resolution,
    ) -> Result<()> {
        let path = self.document(user_id, INSIGHTS)?;
        let _guard = self.write_lock.lock().await;
        let mut insights: Vec<Insight> = Self::read_list(&path).await?;
        let insight = insights
            .iter_mut()
            .find(|i| i.id.as_ref() == Some(insight_id))
            .ok_or_else(|| StewardError::not_found(insight_id))?;
        insight.resolution = Some(resolution);
        Self::write_doc(&path, &insights).await
    }

    async fn list_insights(&self, user_id: &UserId) -> Result<Vec<Insight>> {
        let path = self.document(user_id, INSIGHTS)?;
        Self::read_list(&path).await
    }
}

#[async_trait]
impl NotificationStateStore for JsonFileStore {
    async fn load_notification_state(
        &self,
        user_id: &UserId,
    ) -> Result<Option<NotificationState>> {
        let path = self.document(user_id, NOTIFICATION_STATE)?;
        Self::read_optional(&path).await
    }

    async fn save_notification_state(
        &self,
        user_id: &UserId,
        state: &NotificationState,
    ) -> Result<()> {
        let path = self.document(user_id, NOTIFICATION_STATE)?;
        let _guard = self.write_lock.lock().await;
        Self::write_doc(&path, state).await
    }
}

#[async_trait]
impl ProfileStore for JsonFileStore {
    async fn timezone(&self, user_id: &UserId) -> Result<Option<String>> {
        let path = self.document(user_id, PROFILE)?;
        let profile: Option<ProfileRecord> = Self::read_optional(&path).await?;
        Ok(profile.and_then(|p| p.timezone))
    }

    async fn set_timezone(&self, user_id: &UserId, timezone: &str) -> Result<()> {
        let path = self.document(user_id, PROFILE)?;
        let _guard = self.write_lock.lock().await;
        let mut profile: ProfileRecord = Self::read_optional(&path).await?.unwrap_or_default();
        profile.timezone = Some(timezone.to_string());
        Self::write_doc(&path, &profile).await
    }
}
