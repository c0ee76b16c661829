//! TemplateComposer - insight 種別ごとのテンプレートによる決定的な通知文

use async_trait::async_trait;

use crate::domain::{Insight, InsightData, Result};
use crate::ports::{NotificationComposer, NotificationText};

#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateComposer;

impl TemplateComposer {
    pub fn render(insight: &Insight) -> NotificationText {
        match &insight.data {
            InsightData::PriorityAlert { count, task_names } => {
                let body = match task_names.as_slice() {
                    [] => "Time to tackle your priority list".to_string(),
                    [first] => format!("Start with {first}"),
                    [first, second, ..] => format!("Start with {first} or {second}"),
                };
                NotificationText::new(format!("{count} priority tasks waiting"), body)
            }
            InsightData::FolderFocus {
                folder,
                total_tasks,
                completed_tasks,
                completion_rate,
            } => NotificationText::new(
                format!("Most of your work is in {folder}"),
                format!(
                    "{completed_tasks} of {total_tasks} done ({:.0}%)",
                    completion_rate
                ),
            ),
            InsightData::ProductivityTip { peak_hour_12, .. } => NotificationText::new(
                format!("You're at your best around {peak_hour_12}"),
                "Plan your hardest task for that hour".to_string(),
            ),
            InsightData::StaleTasks { count, tasks } => {
                let body = match tasks.first() {
                    Some(oldest) => format!(
                        "{} has been waiting {} days",
                        oldest.task_name, oldest.days_old
                    ),
                    None => "Some tasks have been waiting a while".to_string(),
                };
                NotificationText::new(format!("{count} tasks need attention"), body)
            }
            InsightData::HighPriorityStale {
                task_name, reason, ..
            } => NotificationText::new(
                "High priority task needs attention",
                format!("'{task_name}': {reason}. Complete it or delete it?"),
            ),
        }
    }
}

#[async_trait]
impl NotificationComposer for TemplateComposer {
    async fn compose(&self, insight: &Insight) -> Result<NotificationText> {
        Ok(Self::render(insight))
    }
}
