use core::cmp::Ordering;

use relay_core::ModelDescriptor;

use super::RankingStrategy;

/// Ranks higher quality tiers first.
#[derive(Debug, Clone, Copy, Default)]
pub struct QualityStrategy;

impl RankingStrategy for QualityStrategy {
    fn name(&self) -> &'static str {
        "quality"
    }

    fn compare(&self, left: &ModelDescriptor, right: &ModelDescriptor) -> Ordering {
        left.quality.rank().cmp(&right.quality.rank())
    }
}
