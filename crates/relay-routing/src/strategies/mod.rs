//! Ranking strategies that order eligible candidates.

use core::cmp::Ordering;

use relay_core::{ModelDescriptor, Strategy};

/// Cheapest first.
pub mod cost;
/// Fastest known average latency first.
pub mod latency;
/// Highest quality tier first.
pub mod quality;

pub use cost::CostStrategy;
pub use latency::LatencyStrategy;
pub use quality::QualityStrategy;

/// Orders two eligible models; `Ordering::Less` ranks `left` first.
///
/// Candidates are sorted stably, so returning `Ordering::Equal` keeps catalog order.
pub trait RankingStrategy: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &'static str;

    /// Compares two models under this strategy.
    fn compare(&self, left: &ModelDescriptor, right: &ModelDescriptor) -> Ordering;
}

/// Returns the ranking rule for a request strategy.
pub fn strategy_for(strategy: Strategy) -> &'static dyn RankingStrategy {
    match strategy {
        Strategy::Cost => &CostStrategy,
        Strategy::Latency => &LatencyStrategy,
        Strategy::Quality => &QualityStrategy,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_lookup() {
        assert_eq!(strategy_for(Strategy::Cost).name(), "cost");
        assert_eq!(strategy_for(Strategy::Latency).name(), "latency");
        assert_eq!(strategy_for(Strategy::Quality).name(), "quality");
    }
}
