use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Rate limiter for detection cycles. The background model updates every
/// frame, but the scan pass only runs when enough time has passed since the
/// last one.
pub struct CycleThrottle {
    interval: Duration,
    last_run: Option<Instant>,
}

impl CycleThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_run: None,
        }
    }

    /// Returns true (and arms the timer) if the interval has elapsed since
    /// the last permitted run. The first call always passes.
    pub fn should_run(&mut self) -> bool {
        let now = Instant::now();
        match self.last_run {
            Some(last) if now.duration_since(last) < self.interval => false,
            _ => {
                self.last_run = Some(now);
                true
            }
        }
    }
}

/// Simple stopwatch for timing pipeline stages.
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

/// Rolling frames-per-second estimate over a short window of frame arrival
/// times.
pub struct FpsCounter {
    window: Duration,
    arrivals: VecDeque<Instant>,
}

impl FpsCounter {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            arrivals: VecDeque::new(),
        }
    }

    pub fn tick(&mut self) {
        let now = Instant::now();
        self.arrivals.push_back(now);
        while let Some(&front) = self.arrivals.front() {
            if now.duration_since(front) > self.window {
                self.arrivals.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn sample_count(&self) -> usize {
        self.arrivals.len()
    }

    /// Current estimate, or None until at least two samples span the window.
    pub fn fps(&self) -> Option<f64> {
        if self.arrivals.len() < 2 {
            return None;
        }
        let first = *self.arrivals.front()?;
        let last = *self.arrivals.back()?;
        let span = last.duration_since(first).as_secs_f64();
        if span <= 0.0 {
            return None;
        }
        Some((self.arrivals.len() - 1) as f64 / span)
    }
}

/// Per-stage latency aggregation for benchmark runs.
pub struct LatencyStats {
    samples_ms: Vec<f64>,
}

impl LatencyStats {
    pub fn new() -> Self {
        Self {
            samples_ms: Vec::new(),
        }
    }

    pub fn record(&mut self, ms: f64) {
        self.samples_ms.push(ms);
    }

    pub fn count(&self) -> usize {
        self.samples_ms.len()
    }

    pub fn mean(&self) -> f64 {
        if self.samples_ms.is_empty() {
            return 0.0;
        }
        self.samples_ms.iter().sum::<f64>() / self.samples_ms.len() as f64
    }

    pub fn percentile(&self, p: f64) -> f64 {
        if self.samples_ms.is_empty() {
            return 0.0;
        }
        let mut sorted = self.samples_ms.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let rank = (p / 100.0 * (sorted.len() - 1) as f64).round() as usize;
        sorted[rank.min(sorted.len() - 1)]
    }

    pub fn report(&self, label: &str) -> String {
        format!(
            "{}: n={} mean={:.2}ms p50={:.2}ms p95={:.2}ms p99={:.2}ms",
            label,
            self.count(),
            self.mean(),
            self.percentile(50.0),
            self.percentile(95.0),
            self.percentile(99.0)
        )
    }
}

impl Default for LatencyStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_throttle_first_call_passes() {
        let mut throttle = CycleThrottle::new(Duration::from_secs(60));
        assert!(throttle.should_run());
        assert!(!throttle.should_run());
    }

    #[test]
    fn test_throttle_zero_interval_always_passes() {
        let mut throttle = CycleThrottle::new(Duration::ZERO);
        assert!(throttle.should_run());
        assert!(throttle.should_run());
        assert!(throttle.should_run());
    }

    #[test]
    fn test_throttle_passes_after_interval() {
        let mut throttle = CycleThrottle::new(Duration::from_millis(10));
        assert!(throttle.should_run());
        assert!(!throttle.should_run());
        thread::sleep(Duration::from_millis(15));
        assert!(throttle.should_run());
    }

    #[test]
    fn test_fps_counter_needs_two_samples() {
        let mut fps = FpsCounter::new(Duration::from_secs(2));
        assert!(fps.fps().is_none());
        fps.tick();
        assert!(fps.fps().is_none());
    }

    #[test]
    fn test_fps_counter_estimates_rate() {
        let mut fps = FpsCounter::new(Duration::from_secs(2));
        for _ in 0..5 {
            fps.tick();
            thread::sleep(Duration::from_millis(10));
        }
        let estimate = fps.fps().unwrap();
        assert!(estimate > 20.0 && estimate < 500.0, "estimate {}", estimate);
    }

    #[test]
    fn test_latency_stats_percentiles() {
        let mut stats = LatencyStats::new();
        for i in 1..=100 {
            stats.record(i as f64);
        }
        assert_eq!(stats.count(), 100);
        assert!((stats.mean() - 50.5).abs() < 1e-9);
        assert!((stats.percentile(50.0) - 51.0).abs() <= 1.0);
        assert!(stats.percentile(99.0) >= 99.0);
    }

    #[test]
    fn test_timer_elapsed_is_monotonic() {
        let timer = Timer::start();
        thread::sleep(Duration::from_millis(5));
        assert!(timer.elapsed_ms() >= 4.0);
    }
}
