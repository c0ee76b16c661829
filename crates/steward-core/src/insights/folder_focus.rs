//! Folder focus - タスクが最も多いフォルダとその進み具合

use std::collections::HashMap;

use super::{InsightGenerator, Snapshot};
use crate::domain::{Insight, InsightData, Priority, Result};

pub struct FolderFocusGenerator;

#[derive(Default)]
struct FolderTally {
    total: usize,
    completed: usize,
}

impl InsightGenerator for FolderFocusGenerator {
    fn name(&self) -> &'static str {
        "folder_focus"
    }

    fn generate(&self, snapshot: &Snapshot<'_>) -> Result<Vec<Insight>> {
        // 同数なら最初に現れたフォルダ
        let mut order: Vec<&str> = Vec::new();
        let mut tallies: HashMap<&str, FolderTally> = HashMap::new();

        for task in snapshot.tasks {
            let label = task.folder_label();
            let tally = tallies.entry(label).or_insert_with(|| {
                order.push(label);
                FolderTally::default()
            });
            tally.total += 1;
            if task.completed {
                tally.completed += 1;
            }
        }

        let mut best: Option<(&str, &FolderTally)> = None;
        for label in &order {
            let Some(tally) = tallies.get(label) else {
                continue;
            };
            if best.is_none_or(|(_, current)| tally.total > current.total) {
                best = Some((label, tally));
            }
        }

        let Some((folder, tally)) = best else {
            return Ok(vec![]);
        };

        let completion_rate = if tally.total > 0 {
            tally.completed as f64 / tally.total as f64 * 100.0
        } else {
            0.0
        };

        tracing::info!(folder, total = tally.total, "generated folder focus insight");
        Ok(vec![Insight::new(
            Priority::Low,
            snapshot.now,
            InsightData::FolderFocus {
                folder: folder.to_string(),
                total_tasks: tally.total,
                completed_tasks: tally.completed,
                completion_rate,
            },
        )])
    }
}
