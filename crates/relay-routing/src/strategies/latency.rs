use core::cmp::Ordering;

use relay_core::ModelDescriptor;

use super::RankingStrategy;

/// Ranks models with lower average latency first; unknown latency ranks last.
#[derive(Debug, Clone, Copy, Default)]
pub struct LatencyStrategy;

impl RankingStrategy for LatencyStrategy {
    fn name(&self) -> &'static str {
        "latency"
    }

    fn compare(&self, left: &ModelDescriptor, right: &ModelDescriptor) -> Ordering {
        match (left.avg_latency_ms, right.avg_latency_ms) {
            (Some(left_ms), Some(right_ms)) => left_ms.total_cmp(&right_ms),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::{ContentType, QualityTier};

    fn model(latency: Option<f64>) -> ModelDescriptor {
        let model = ModelDescriptor::new("m", ContentType::Text, 0.0, QualityTier::Medium);
        match latency {
            Some(ms) => model.with_latency(ms),
            None => model,
        }
    }

    #[test]
    fn test_unknown_latency_sorts_last() {
        assert_eq!(LatencyStrategy.compare(&model(Some(900.0)), &model(None)), Ordering::Less);
        assert_eq!(LatencyStrategy.compare(&model(None), &model(Some(1.0))), Ordering::Greater);
        assert_eq!(LatencyStrategy.compare(&model(None), &model(None)), Ordering::Equal);
        assert_eq!(
            LatencyStrategy.compare(&model(Some(100.0)), &model(Some(200.0))),
            Ordering::Less
        );
    }
}
