//! Lifecycle - 未完了タスクの週次分類と空フォルダの回収
//!
//! ここはすべて純粋関数。結果をストアに反映するのは
//! [`crate::app`] の cleanup cycle。

mod classify;

pub use self::classify::{CleanupAction, LifecyclePolicy, escalation_insight};
