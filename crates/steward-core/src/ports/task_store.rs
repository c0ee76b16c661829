//! TaskStore port - ユーザーのタスクとフォルダ
//!
//! 正はストア側。コアはスナップショットを読み、1 件単位の更新を発行する。
//! 実装はエラーを握りつぶさずに返し、どの失敗を致命的とするかは
//! cleanup cycle が決める。

use async_trait::async_trait;

use crate::domain::{Folder, FolderId, Result, Task, TaskId, UserId};

#[async_trait]
pub trait TaskStore: Send + Sync {
    /// ユーザーの全タスクのスナップショット
    async fn fetch_tasks(&self, user_id: &UserId) -> Result<Vec<Task>>;

    async fn delete_task(&self, user_id: &UserId, task_id: &TaskId) -> Result<()>;

    /// タスクを完了にする（エスカレーションへの回答で使う）
    async fn complete_task(&self, user_id: &UserId, task_id: &TaskId) -> Result<()>;

    async fn list_folders(&self, user_id: &UserId) -> Result<Vec<Folder>>;

    /// `folder_id` に属するタスク数
    async fn count_tasks_in_folder(&self, user_id: &UserId, folder_id: &FolderId)
    -> Result<usize>;

    async fn delete_folder(&self, user_id: &UserId, folder_id: &FolderId) -> Result<()>;
}
