//! Domain identifiers - 型安全な ID
//!
//! ユーザー・タスク・フォルダの id は外部ストアが決める不透明な文字列。
//! insight の id は [`crate::ports::IdGenerator`] が発行する ULID。
//!
//! ## Phantom Type パターン
//! `Id<T>` は実装を共有しつつ、実行時には存在しないマーカー `T` によって
//! `TaskId` と `FolderId` の取り違えをコンパイル時に防ぐ。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use ulid::Ulid;

/// IdMarker は各 ID 型のマーカー trait
pub trait IdMarker: Send + Sync + 'static {
    /// エラーやログに出す種別名（"task", "folder", ...）
    fn kind() -> &'static str;

    /// ULID から発行するときの接頭辞（"insight-"）
    fn prefix() -> &'static str {
        ""
    }
}

/// Id は汎用の不透明な識別子
///
/// 文字列そのものとしてシリアライズされる
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id<T: IdMarker> {
    value: String,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            _marker: PhantomData,
        }
    }

    /// ULID からマーカーの接頭辞付きで id を作る
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self::new(format!("{}{}", T::prefix(), ulid))
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn kind(&self) -> &'static str {
        T::kind()
    }
}

impl<T: IdMarker> From<&str> for Id<T> {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl<T: IdMarker> From<String> for Id<T> {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

// ========================================
// マーカー型の定義
// ========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum User {}

impl IdMarker for User {
    fn kind() -> &'static str {
        "user"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Task {}

impl IdMarker for Task {
    fn kind() -> &'static str {
        "task"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Folder {}

impl IdMarker for Folder {
    fn kind() -> &'static str {
        "folder"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Insight {}

impl IdMarker for Insight {
    fn kind() -> &'static str {
        "insight"
    }

    fn prefix() -> &'static str {
        "insight-"
    }
}

/// ユーザー ID（他のすべてのレコードの所有者）
pub type UserId = Id<User>;

/// ユーザーのコレクション内のタスク ID
pub type TaskId = Id<Task>;

/// ユーザーのコレクション内のフォルダ ID
pub type FolderId = Id<Folder>;

/// 保存済み insight の ID
pub type InsightId = Id<Insight>;
