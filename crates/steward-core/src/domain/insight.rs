//! Insight - ユーザーのタスクについての型付きの気付き
//!
//! insight は追記のみ。generator と cleanup cycle が作り、ストアが保存し、
//! push 通知にするかは admission controller が決める。

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::StewardError;
use super::ids::{FolderId, InsightId, TaskId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    PriorityAlert,
    FolderFocusInsight,
    ProductivityTip,
    StaleTaskWarning,
    HighPriorityStaleWarning,
}

impl InsightKind {
    pub fn as_str(self) -> &'static str {
        match self {
            InsightKind::PriorityAlert => "priority_alert",
            InsightKind::FolderFocusInsight => "folder_focus_insight",
            InsightKind::ProductivityTip => "productivity_tip",
            InsightKind::StaleTaskWarning => "stale_task_warning",
            InsightKind::HighPriorityStaleWarning => "high_priority_stale_warning",
        }
    }

    /// ユーザーの明示的な回答を待つのはエスカレーションだけ
    pub fn is_actionable(self) -> bool {
        matches!(self, InsightKind::HighPriorityStaleWarning)
    }
}

impl fmt::Display for InsightKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// insight の緊急度（low < medium < high < critical）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Critical => "critical",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// stale task warning が参照するタスク
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaleTaskRef {
    pub task_id: TaskId,
    pub task_name: String,
    pub days_old: i64,
}

/// 種別ごとのペイロード
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InsightData {
    PriorityAlert {
        count: usize,
        task_names: Vec<String>,
    },
    FolderFocus {
        folder: String,
        total_tasks: usize,
        completed_tasks: usize,
        completion_rate: f64,
    },
    ProductivityTip {
        peak_hour: u32,
        peak_hour_12: String,
        completed_count: usize,
        timezone: String,
    },
    StaleTasks {
        count: usize,
        tasks: Vec<StaleTaskRef>,
    },
    HighPriorityStale {
        task_id: TaskId,
        task_name: String,
        reason: String,
        folder: Option<FolderId>,
        action_required: bool,
    },
}

impl InsightData {
    pub fn kind(&self) -> InsightKind {
        match self {
            InsightData::PriorityAlert { .. } => InsightKind::PriorityAlert,
            InsightData::FolderFocus { .. } => InsightKind::FolderFocusInsight,
            InsightData::ProductivityTip { .. } => InsightKind::ProductivityTip,
            InsightData::StaleTasks { .. } => InsightKind::StaleTaskWarning,
            InsightData::HighPriorityStale { .. } => InsightKind::HighPriorityStaleWarning,
        }
    }
}

/// エスカレーションされたタスクへのユーザーの回答
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionAction {
    Delete,
    Complete,
    Keep,
}

impl ResolutionAction {
    pub fn as_str(self) -> &'static str {
        match self {
            ResolutionAction::Delete => "delete",
            ResolutionAction::Complete => "complete",
            ResolutionAction::Keep => "keep",
        }
    }
}

impl FromStr for ResolutionAction {
    type Err = StewardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "delete" | "remove" => Ok(ResolutionAction::Delete),
            "complete" | "done" | "finish" => Ok(ResolutionAction::Complete),
            "keep" | "save" | "ignore" | "leave" => Ok(ResolutionAction::Keep),
            _ => Err(StewardError::InvalidAction(s.to_string())),
        }
    }
}

impl fmt::Display for ResolutionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 回答が必要な insight だけが持つ resolution
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub resolved: bool,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolution_action: Option<ResolutionAction>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    /// 保存時にストアが割り当てる
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<InsightId>,

    #[serde(rename = "type")]
    pub kind: InsightKind,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
    pub data: InsightData,

    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub dismissed: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<Resolution>,
}

impl Insight {
    pub fn new(priority: Priority, created_at: DateTime<Utc>, data: InsightData) -> Self {
        let kind = data.kind();
        Self {
            id: None,
            kind,
            priority,
            created_at,
            data,
            read: false,
            dismissed: false,
            resolution: kind.is_actionable().then(Resolution::default),
        }
    }

    pub fn is_pending_resolution(&self) -> bool {
        self.resolution.as_ref().is_some_and(|r| !r.resolved)
    }

    /// エスカレーションが参照するタスク
    pub fn escalated_task(&self) -> Option<&TaskId> {
        match &self.data {
            InsightData::HighPriorityStale { task_id, .. } => Some(task_id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn kind_follows_payload() {
        let insight = Insight::new(
            Priority::High,
            at(),
            InsightData::PriorityAlert {
                count: 3,
                task_names: vec!["a".into(), "b".into(), "c".into()],
            },
        );
        assert_eq!(insight.kind, InsightKind::PriorityAlert);
        assert!(insight.resolution.is_none());
    }

    #[test]
    fn escalations_start_unresolved() {
        let insight = Insight::new(
            Priority::High,
            at(),
            InsightData::HighPriorityStale {
                task_id: TaskId::new("t1"),
                task_name: "tax return".into(),
                reason: "Overdue by 2 days (high priority)".into(),
                folder: None,
                action_required: true,
            },
        );
        assert!(insight.is_pending_resolution());
        assert_eq!(insight.escalated_task(), Some(&TaskId::new("t1")));
    }

    #[test]
    fn serialized_type_uses_snake_case() {
        let insight = Insight::new(
            Priority::Medium,
            at(),
            InsightData::StaleTasks {
                count: 1,
                tasks: vec![],
            },
        );
        let json = serde_json::to_value(&insight).unwrap();
        assert_eq!(json["type"], "stale_task_warning");
        assert_eq!(json["priority"], "medium");

        let back: Insight = serde_json::from_value(json).unwrap();
        assert_eq!(back, insight);
    }

    #[rstest]
    #[case("delete", ResolutionAction::Delete)]
    #[case("Remove", ResolutionAction::Delete)]
    #[case("done", ResolutionAction::Complete)]
    #[case(" finish ", ResolutionAction::Complete)]
    #[case("leave", ResolutionAction::Keep)]
    fn resolution_vocabulary(#[case] word: &str, #[case] expected: ResolutionAction) {
        assert_eq!(word.parse::<ResolutionAction>().unwrap(), expected);
    }

    #[test]
    fn unknown_resolution_is_rejected() {
        assert!("snooze".parse::<ResolutionAction>().is_err());
    }

    #[test]
    fn priorities_are_ordered() {
        assert!(Priority::Low < Priority::Medium);
        assert!(Priority::High < Priority::Critical);
    }
}
