//! Bounded metric history backing the trend plot.

/// Default number of samples kept per series.
pub const HISTORY_LEN: usize = 400;

/// A rolling window of the most recent `capacity` samples.
#[derive(Debug, Clone)]
pub struct RollingHistory {
    data: Vec<f64>,
    capacity: usize,
}

impl RollingHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            data: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, value: f64) {
        if self.data.len() >= self.capacity {
            self.data.remove(0);
        }
        self.data.push(value);
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn last(&self) -> Option<f64> {
        self.data.last().copied()
    }

    /// Largest sample in the window, floored at 1 so flat-zero series still plot.
    pub fn plot_max(&self) -> f64 {
        self.data
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(1.0, f64::max)
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }
}

/// Paired drift/entropy series. Both are pushed and evicted together, so their
/// lengths never diverge.
#[derive(Debug, Clone)]
pub struct MetricHistory {
    drift: RollingHistory,
    entropy: RollingHistory,
}

impl MetricHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            drift: RollingHistory::new(capacity),
            entropy: RollingHistory::new(capacity),
        }
    }

    pub fn push(&mut self, drift: f64, entropy: f64) {
        self.drift.push(drift);
        self.entropy.push(entropy);
        debug_assert_eq!(self.drift.len(), self.entropy.len());
    }

    pub fn drift(&self) -> &RollingHistory {
        &self.drift
    }

    pub fn entropy(&self) -> &RollingHistory {
        &self.entropy
    }

    pub fn len(&self) -> usize {
        self.drift.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drift.is_empty()
    }

    pub fn clear(&mut self) {
        self.drift.clear();
        self.entropy.clear();
    }
}

impl Default for MetricHistory {
    fn default() -> Self {
        Self::new(HISTORY_LEN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overflow_evicts_oldest_first() {
        let mut h = MetricHistory::default();
        for i in 0..401 {
            h.push(i as f64, -(i as f64));
        }
        assert_eq!(h.len(), 400);
        assert_eq!(h.drift().len(), h.entropy().len());
        // Sample 0 was evicted; 1 is now the oldest.
        assert_eq!(h.drift().data()[0], 1.0);
        assert_eq!(h.entropy().data()[0], -1.0);
        assert_eq!(h.drift().last(), Some(400.0));
    }

    #[test]
    fn series_lengths_never_diverge() {
        let mut h = MetricHistory::new(16);
        for i in 0..100 {
            h.push(i as f64 * 0.5, (i % 7) as f64);
            assert_eq!(h.drift().len(), h.entropy().len());
            assert!(h.len() <= 16);
        }
    }

    #[test]
    fn plot_max_is_per_series_and_floored() {
        let mut h = MetricHistory::default();
        h.push(0.2, 50.0);
        h.push(0.4, 10.0);
        assert_eq!(h.drift().plot_max(), 1.0);
        assert_eq!(h.entropy().plot_max(), 50.0);
    }

    #[test]
    fn clear_empties_both_series() {
        let mut h = MetricHistory::default();
        h.push(1.0, 2.0);
        h.clear();
        assert!(h.is_empty());
        assert!(h.entropy().is_empty());
    }
}
