//! steward-core
//!
//! タスクアシスタントのポリシーエンジン。ユーザーのタスクを分析し、
//! どの気付きを push 通知にするかを決め、週次の cleanup でタスク一覧を
//! 整理する。
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, task, insight, notification state, errors）
//! - **time**: タイムゾーン補助とストア境界の時刻型
//! - **ports**: 抽象化レイヤー（TaskStore, InsightStore, Notifier, Clock, など）
//! - **insights**: insight generator（純粋関数）
//! - **admission**: 通知の admission policy とユーザー単位の controller
//! - **lifecycle**: タスク分類とフォルダ回収（純粋関数）
//! - **app**: アプリケーションロジック（builder, monitor/cleanup cycles, driver）
//! - **impls**: 実装（InMemoryStore, JsonFileStore, notifiers, composer）
//! - **config**: TOML 設定

pub mod admission;
pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod insights;
pub mod lifecycle;
pub mod ports;
pub mod time;

pub use self::config::StewardConfig;
pub use self::domain::{Result, StewardError};
