//! InsightStore port - ユーザーごとの追記専用 insight コレクション

use async_trait::async_trait;

use crate::domain::{Insight, InsightId, Resolution, Result, UserId};

#[async_trait]
pub trait InsightStore: Send + Sync {
    /// insight を保存し、ストアが割り当てた id を返す
    async fn save_insight(&self, user_id: &UserId, insight: &Insight) -> Result<InsightId>;

    async fn get_insight(&self, user_id: &UserId, insight_id: &InsightId)
    -> Result<Option<Insight>>;

    /// 回答が必要な insight の resolution を置き換える
    async fn update_resolution(
        &self,
        user_id: &UserId,
        insight_id: &InsightId,
        resolution: Resolution,
    ) -> Result<()>;

    /// ユーザーの全 insight（古い順）
    async fn list_insights(&self, user_id: &UserId) -> Result<Vec<Insight>>;
}
