//! Ports - 抽象化レイヤー
//!
//! Hexagonal Architecture の「ポート」。各 trait は外部の協調者
//! （文書ストア、push 配送、文面生成、時計）との境界。
//! コンポーネントはコンストラクタ引数で受け取り、
//! グローバルなクライアントは持たない。

pub mod clock;
pub mod composer;
pub mod id_generator;
pub mod insight_store;
pub mod notification_store;
pub mod notifier;
pub mod profile_store;
pub mod task_store;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::composer::{NotificationComposer, NotificationText};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::insight_store::InsightStore;
pub use self::notification_store::NotificationStateStore;
pub use self::notifier::{NotificationMetadata, Notifier};
pub use self::profile_store::ProfileStore;
pub use self::task_store::TaskStore;
