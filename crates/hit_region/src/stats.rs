//! Pass counters and progress reports.

use crate::sampler::Sample;
use core::time::Duration;

/// Counters for one sampling pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SamplingStats {
    pub resolution: u32,
    /// Grid points in the pass.
    pub total: usize,
    /// Grid points sampled so far.
    pub sampled: usize,
    /// Samples that resolved to an interactive element.
    pub hits: usize,
    /// Samples that hit an element with no interactive ancestor.
    pub misses: usize,
    /// Samples where nothing was rendered.
    pub empty: usize,
    /// Samples whose hit element was already detached.
    pub detached: usize,
    /// Samples where the hit test itself failed.
    pub failures: usize,
    /// Hits dropped because their element reached the coordinate cap.
    pub dropped_by_cap: usize,
    /// Distinct elements in the finished index.
    pub elements: usize,
    pub duration: Duration,
}

impl SamplingStats {
    pub(crate) fn record(&mut self, sample: Sample) {
        self.sampled += 1;
        match sample {
            Sample::Hit(_) => self.hits += 1,
            Sample::Miss(_) => self.misses += 1,
            Sample::Empty => self.empty += 1,
            Sample::Detached(_) => self.detached += 1,
            Sample::Failed => self.failures += 1,
        }
    }

    /// Fraction of sampled points that reached an interactive element.
    pub fn hit_ratio(&self) -> f64 {
        if self.sampled == 0 {
            0.0
        } else {
            self.hits as f64 / self.sampled as f64
        }
    }
}

/// Progress of a running pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Whole percent, `0..=100`.
    pub percentage: u8,
    pub current: usize,
    pub total: usize,
}

impl Progress {
    pub fn new(current: usize, total: usize) -> Self {
        let percentage = if total == 0 {
            100
        } else {
            (current.min(total) * 100 / total) as u8
        };
        Self {
            percentage,
            current,
            total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dom::NodeKey;

    #[test]
    fn record_counts_each_outcome() {
        let mut stats = SamplingStats::default();
        for sample in [
            Sample::Hit(NodeKey(1)),
            Sample::Hit(NodeKey(1)),
            Sample::Miss(NodeKey(2)),
            Sample::Empty,
            Sample::Detached(NodeKey(3)),
            Sample::Failed,
        ] {
            stats.record(sample);
        }
        assert_eq!(stats.sampled, 6);
        assert_eq!(
            (stats.hits, stats.misses, stats.empty, stats.detached, stats.failures),
            (2, 1, 1, 1, 1)
        );
        assert!((stats.hit_ratio() - 2.0 / 6.0).abs() < f64::EPSILON);
    }

    #[test]
    fn progress_percentage_is_floored() {
        assert_eq!(Progress::new(1, 3).percentage, 33);
        assert_eq!(Progress::new(3, 3).percentage, 100);
        assert_eq!(Progress::new(0, 0).percentage, 100);
    }
}
