//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **InMemoryStore**: 全ストア port のメモリ実装（開発用・テスト用）
//! - **JsonFileStore**: ユーザー単位の JSON 文書による全ストア port
//! - **TemplateComposer**: テンプレートによる通知文
//! - **LogNotifier** / **ChannelNotifier**: 配送先

pub mod composer;
pub mod json_store;
pub mod memory;
pub mod notifier;

pub use self::composer::TemplateComposer;
pub use self::json_store::JsonFileStore;
pub use self::memory::InMemoryStore;
pub use self::notifier::{ChannelNotifier, DeliveredNotification, LogNotifier};
