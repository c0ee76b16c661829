//! InMemoryStore - 開発用・テスト用のストア
//!
//! 全ストア port を 1 つの `tokio::sync::Mutex` で実装する。
//! 初期データ投入と障害注入で、cleanup cycle のベストエフォート経路を
//! テストから通せる。

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{
    Folder, FolderId, Insight, InsightId, NotificationState, Resolution, Result, StewardError,
    Task, TaskId, UserId,
};
use crate::ports::{
    Clock, IdGenerator, InsightStore, NotificationStateStore, ProfileStore, SystemClock, TaskStore,
    UlidGenerator,
};

#[derive(Default)]
struct UserData {
    tasks: Vec<Task>,
    folders: Vec<Folder>,
    insights: Vec<Insight>,
    notification_state: Option<NotificationState>,
    timezone: Option<String>,
}

#[derive(Default)]
struct Faults {
    task_deletes: HashSet<TaskId>,
    folder_deletes: HashSet<FolderId>,
    task_fetches: HashSet<UserId>,
    state_loads: HashSet<UserId>,
}

#[derive(Default)]
struct InMemoryState {
    users: HashMap<UserId, UserData>,
    faults: Faults,
}

pub struct InMemoryStore {
    state: Mutex<InMemoryState>,
    clock: Arc<dyn Clock>,
    ids: Box<dyn IdGenerator>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// 完了時刻と insight id は `clock` に従う
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(InMemoryState::default()),
            ids: Box::new(UlidGenerator::new(Arc::clone(&clock))),
            clock,
        }
    }

    pub async fn add_task(&self, user_id: &UserId, task: Task) {
        let mut state = self.state.lock().await;
        state.users.entry(user_id.clone()).or_default().tasks.push(task);
    }

    pub async fn add_folder(&self, user_id: &UserId, folder: Folder) {
        let mut state = self.state.lock().await;
        state.users.entry(user_id.clone()).or_default().folders.push(folder);
    }

    /// `task_id` の `delete_task` を常に失敗させる
    pub async fn fail_task_delete(&self, task_id: &TaskId) {
        self.state.lock().await.faults.task_deletes.insert(task_id.clone());
    }

    pub async fn fail_folder_delete(&self, folder_id: &FolderId) {
        self.state.lock().await.faults.folder_deletes.insert(folder_id.clone());
    }

    pub async fn fail_task_fetches(&self, user_id: &UserId) {
        self.state.lock().await.faults.task_fetches.insert(user_id.clone());
    }

    /// ユーザーの notification state を読めなくする
    pub async fn fail_state_loads(&self, user_id: &UserId) {
        self.state.lock().await.faults.state_loads.insert(user_id.clone());
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskStore for InMemoryStore {
    async fn fetch_tasks(&self, user_id: &UserId) -> Result<Vec<Task>> {
        let state = self.state.lock().await;
        if state.faults.task_fetches.contains(user_id) {
            return Err(StewardError::store("fetch_tasks", user_id, "injected failure"));
        }
        Ok(state
            .users
            .get(user_id)
            .map(|u| u.tasks.clone())
            .unwrap_or_default())
    }

    async fn delete_task(&self, user_id: &UserId, task_id: &TaskId) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.faults.task_deletes.contains(task_id) {
            return Err(StewardError::store("delete_task", user_id, "injected failure"));
        }
        // 存在しないタスクの削除は何もしない
        if let Some(user) = state.users.get_mut(user_id) {
            user.tasks.retain(|t| &t.id != task_id);
        }
        Ok(())
    }

    async fn complete_task(&self, user_id: &UserId, task_id: &TaskId) -> Result<()> {
        let now = self.clock.now();
        let mut state = self.state.lock().await;
        let task = state
            .users
            .get_mut(user_id)
            .and_then(|u| u.tasks.iter_mut().find(|t| &t.id == task_id))
            .ok_or_else(|| StewardError::not_found(task_id))?;
        task.completed = true;
        task.completed_at = Some(now);
        Ok(())
    }

    async fn list_folders(&self, user_id: &UserId) -> Result<Vec<Folder>> {
        let state = self.state.lock().await;
        Ok(state
            .users
            .get(user_id)
            .map(|u| u.folders.clone())
            .unwrap_or_default())
    }

    async fn count_tasks_in_folder(
        &self,
        user_id: &UserId,
        folder_id: &FolderId,
    ) -> Result<usize> {
        let state = self.state.lock().await;
        Ok(state.users.get(user_id).map_or(0, |u| {
            u.tasks
                .iter()
                .filter(|t| t.folder.as_ref() == Some(folder_id))
                .count()
        }))
    }

    async fn delete_folder(&self, user_id: &UserId, folder_id: &FolderId) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.faults.folder_deletes.contains(folder_id) {
            return Err(StewardError::store("delete_folder", user_id, "injected failure"));
        }
        if let Some(user) = state.users.get_mut(user_id) {
            user.folders.retain(|f| &f.id != folder_id);
        }
        Ok(())
    }
}

#[async_trait]
impl InsightStore for InMemoryStore {
    async fn save_insight(&self, user_id: &UserId, insight: &Insight) -> Result<InsightId> {
        let id = self.ids.generate_insight_id();
        let mut stored = insight.clone();
        stored.id = Some(id.clone());
        let mut state = self.state.lock().await;
        state.users.entry(user_id.clone()).or_default().insights.push(stored);
        Ok(id)
    }

    async fn get_insight(
        &self,
        user_id: &UserId,
        insight_id: &InsightId,
    ) -> Result<Option<Insight>> {
        let state = self.state.lock().await;
        Ok(state.users.get(user_id).and_then(|u| {
            u.insights
                .iter()
                .find(|i| i.id.as_ref() == Some(insight_id))
                .cloned()
        }))
    }

    async fn update_resolution(
        &self,
        user_id: &UserId,
        insight_id: &InsightId,
        resolution: Resolution,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        let insight = state
            .users
            .get_mut(user_id)
            .and_then(|u| {
                u.insights
                    .iter_mut()
                    .find(|i| i.id.as_ref() == Some(insight_id))
            })
            .ok_or_else(|| StewardError::not_found(insight_id))?;
        insight.resolution = Some(resolution);
        Ok(())
    }

    async fn list_insights(&self, user_id: &UserId) -> Result<Vec<Insight>> {
        let state = self.state.lock().await;
        Ok(state
            .users
            .get(user_id)
            .map(|u| u.insights.clone())
            .unwrap_or_default())
    }
}

#[async_trait]
impl NotificationStateStore for InMemoryStore {
    async fn load_notification_state(
        &self,
        user_id: &UserId,
    ) -> Result<Option<NotificationState>> {
        let state = self.state.lock().await;
        if state.faults.state_loads.contains(user_id) {
            return Err(StewardError::store(
                "load_notification_state",
                user_id,
                "injected failure",
            ));
        }
        Ok(state
            .users
            .get(user_id)
            .and_then(|u| u.notification_state.clone()))
    }

    async fn save_notification_state(
        &self,
        user_id: &UserId,
        notification_state: &NotificationState,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        state
            .users
            .entry(user_id.clone())
            .or_default()
            .notification_state = Some(notification_state.clone());
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for InMemoryStore {
    async fn timezone(&self, user_id: &UserId) -> Result<Option<String>> {
        let state = self.state.lock().await;
        Ok(state.users.get(user_id).and_then(|u| u.timezone.clone()))
    }

    async fn set_timezone(&self, user_id: &UserId, timezone: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        state.users.entry(user_id.clone()).or_default().timezone = Some(timezone.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{InsightData, Priority};
    use crate::ports::FixedClock;
    use chrono::{TimeZone, Utc};

    #[tokio::test]
    async fn users_are_isolated() {
        let store = InMemoryStore::new();
        let alice = UserId::new("alice");
        let bob = UserId::new("bob");
        store.add_task(&alice, Task::new("t1", "a")).await;

        assert_eq!(store.fetch_tasks(&alice).await.unwrap().len(), 1);
        assert!(store.fetch_tasks(&bob).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn folder_counts_follow_tasks() {
        let store = InMemoryStore::new();
        let user = UserId::new("u");
        store.add_folder(&user, Folder::new("work", "Work")).await;
        store.add_task(&user, Task::new("t1", "a").in_folder("work")).await;
        store.add_task(&user, Task::new("t2", "b")).await;

        let work = FolderId::new("work");
        assert_eq!(store.count_tasks_in_folder(&user, &work).await.unwrap(), 1);
        store.delete_task(&user, &TaskId::new("t1")).await.unwrap();
        assert_eq!(store.count_tasks_in_folder(&user, &work).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn injected_delete_failure() {
        let store = InMemoryStore::new();
        let user = UserId::new("u");
        store.add_task(&user, Task::new("t1", "a")).await;
        store.fail_task_delete(&TaskId::new("t1")).await;

        assert!(store.delete_task(&user, &TaskId::new("t1")).await.is_err());
        assert_eq!(store.fetch_tasks(&user).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn saved_insights_get_ids_and_resolutions_update() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let store = InMemoryStore::with_clock(Arc::new(FixedClock::new(now)));
        let user = UserId::new("u");
        let insight = Insight::new(
            Priority::High,
            now,
            InsightData::HighPriorityStale {
                task_id: TaskId::new("t1"),
                task_name: "a".into(),
                reason: "Untouched for 12 days (high priority)".into(),
                folder: None,
                action_required: true,
            },
        );

        let id = store.save_insight(&user, &insight).await.unwrap();
        assert!(id.as_str().starts_with("insight-"));

        let resolution = Resolution {
            resolved: true,
            resolved_at: Some(now),
            resolution_action: None,
        };
        store
            .update_resolution(&user, &id, resolution.clone())
            .await
            .unwrap();
        let stored = store.get_insight(&user, &id).await.unwrap().unwrap();
        assert_eq!(stored.resolution, Some(resolution));
    }

    #[tokio::test]
    async fn complete_task_stamps_clock_time() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let store = InMemoryStore::with_clock(Arc::new(FixedClock::new(now)));
        let user = UserId::new("u");
        store.add_task(&user, Task::new("t1", "a")).await;

        store.complete_task(&user, &TaskId::new("t1")).await.unwrap();
        let task = &store.fetch_tasks(&user).await.unwrap()[0];
        assert!(task.completed);
        assert_eq!(task.completed_at, Some(now));

        let missing = store.complete_task(&user, &TaskId::new("nope")).await;
        assert!(matches!(missing, Err(StewardError::NotFound { .. })));
    }
}
