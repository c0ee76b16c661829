//! Admission - insight を今 push 通知にするかを決め、
//! 配送したものを記録する

mod controller;
mod policy;

pub use self::controller::{AdmissionController, AdmissionSession, NotificationStats};
pub use self::policy::{AdmissionDecision, AdmissionPolicy, AdmissionRule};
