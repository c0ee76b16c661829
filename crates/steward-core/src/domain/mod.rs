//! Domain - ドメインモデル（ids, tasks, insights, notification state, errors）

pub mod errors;
pub mod ids;
pub mod insight;
pub mod notification;
pub mod task;

pub use self::errors::{ErrorKind, Result, StewardError};
pub use self::ids::{FolderId, Id, IdMarker, InsightId, TaskId, UserId};
pub use self::insight::{
    Insight, InsightData, InsightKind, Priority, Resolution, ResolutionAction, StaleTaskRef,
};
pub use self::notification::{HistoryEntry, NotificationState};
pub use self::task::{Folder, NO_FOLDER, Task};
