//! App - アプリケーション層
//!
//! ports を組み合わせてアプリケーションロジックを実装します。
//!
//! # 主要コンポーネント
//! - **AppBuilder**: アプリケーションの構築とワイヤリング
//! - **App**: monitor cycle / cleanup cycle / エスカレーション解決
//! - **InsightPublisher**: 保存 → admission → compose → deliver → record
//! - **SchedulingDriver**: 定期実行ループ
//! - **DriverStatus**: ドライバの状態

pub mod builder;
pub mod cleanup;
pub mod driver;
pub mod monitor;
pub mod publisher;
pub mod resolution;
pub mod status;

pub use self::builder::{App, AppBuilder};
pub use self::cleanup::CleanupReport;
pub use self::driver::{DriverHandle, SchedulerConfig, SchedulingDriver, TickSummary};
pub use self::publisher::{ESCALATION_ACTIONS, InsightPublisher, PublishSummary};
pub use self::status::DriverStatus;
