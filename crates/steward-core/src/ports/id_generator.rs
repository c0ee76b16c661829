//! IdGenerator port - ID 生成の抽象化
//!
//! ストアはこの trait で insight id を発行する。時刻部分は
//! [`FixedClock`](crate::ports::FixedClock) で固定できる。

use crate::domain::InsightId;
use crate::ports::Clock;
use ulid::Ulid;

/// IdGenerator は分散システムで使える ID を生成
///
/// ULID は生成時刻順に並ぶので、insight id も生成順になる
pub trait IdGenerator: Send + Sync {
    fn generate_insight_id(&self) -> InsightId;
}

/// UlidGenerator は ULID ベースの ID 生成器
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_insight_id(&self) -> InsightId {
        let timestamp_ms = self.clock.now().timestamp_millis() as u64;
        let ulid = Ulid::from_parts(timestamp_ms, rand::random());
        InsightId::from_ulid(ulid)
    }
}
