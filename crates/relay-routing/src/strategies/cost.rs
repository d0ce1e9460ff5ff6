use core::cmp::Ordering;

use relay_core::ModelDescriptor;

use super::RankingStrategy;

/// Ranks cheaper models first.
#[derive(Debug, Clone, Copy, Default)]
pub struct CostStrategy;

impl RankingStrategy for CostStrategy {
    fn name(&self) -> &'static str {
        "cost"
    }

    fn compare(&self, left: &ModelDescriptor, right: &ModelDescriptor) -> Ordering {
        left.cost.total_cmp(&right.cost)
    }
}
