//! Task / Folder - コアから見たスナップショット
//!
//! レコードの所有者はストアで、コアは不変のコピーを受け取る。時刻は
//! ストア境界で UTC に変換済みで、読めなかった時刻は `None` で届く。

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{FolderId, TaskId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub name: String,

    /// フォルダ未所属なら `None`
    #[serde(default)]
    pub folder: Option<FolderId>,

    #[serde(default)]
    pub completed: bool,

    #[serde(default)]
    pub is_high_priority: bool,

    /// 作成時刻がないタスクは経過日数を測れないため、
    /// 経過日数に基づくルールはすべて対象外
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    /// 日付のみ（UTC の日付で比較）
    #[serde(default)]
    pub due_date: Option<NaiveDate>,

    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn new(id: impl Into<TaskId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            folder: None,
            completed: false,
            is_high_priority: false,
            created_at: None,
            due_date: None,
            completed_at: None,
        }
    }

    pub fn in_folder(mut self, folder: impl Into<FolderId>) -> Self {
        self.folder = Some(folder.into());
        self
    }

    pub fn high_priority(mut self) -> Self {
        self.is_high_priority = true;
        self
    }

    pub fn created(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = Some(at);
        self
    }

    pub fn due(mut self, date: NaiveDate) -> Self {
        self.due_date = Some(date);
        self
    }

    pub fn completed_at(mut self, at: DateTime<Utc>) -> Self {
        self.completed = true;
        self.completed_at = Some(at);
        self
    }

    /// lifecycle と stale のルールが見るのは未完了タスクだけ
    pub fn is_open(&self) -> bool {
        !self.completed
    }

    /// フォルダの表示名（未所属なら "No Folder"）
    pub fn folder_label(&self) -> &str {
        self.folder
            .as_ref()
            .map(FolderId::as_str)
            .unwrap_or(NO_FOLDER)
    }
}

pub const NO_FOLDER: &str = "No Folder";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Folder {
    pub id: FolderId,
    pub name: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Folder {
    pub fn new(id: impl Into<FolderId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            created_at: None,
        }
    }

    pub fn created(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = Some(at);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn builder_sets_completion() {
        let at = Utc.with_ymd_and_hms(2024, 2, 1, 9, 0, 0).unwrap();
        let task = Task::new("t1", "workout").completed_at(at);
        assert!(!task.is_open());
        assert_eq!(task.completed_at, Some(at));
    }

    #[test]
    fn unfiled_tasks_use_placeholder_label() {
        let task = Task::new("t1", "groceries");
        assert_eq!(task.folder_label(), NO_FOLDER);
        let task = task.in_folder("shopping");
        assert_eq!(task.folder_label(), "shopping");
    }
}
