// -------------------------------------------------------------------------------------------------

/// Smoothed RMS level detector.
#[derive(Debug, Clone)]
pub struct LevelMeter {
    smoothing: f32,
    level: f32,
}

impl LevelMeter {
    /// Create a new meter with the given smoothing factor in range `0.0..1.0`.
    /// Higher values respond slower.
    pub fn new(smoothing: f32) -> Self {
        debug_assert!((0.0..1.0).contains(&smoothing), "Invalid smoothing factor");
        Self {
            smoothing: smoothing.clamp(0.0, 0.999),
            level: 0.0,
        }
    }

    /// Feed a block of samples.
    pub fn process(&mut self, block: &[f32]) {
        if block.is_empty() {
            return;
        }
        let sum = block.iter().map(|s| s * s).sum::<f32>();
        let rms = (sum / block.len() as f32).sqrt();
        self.level = self.smoothing * self.level + (1.0 - self.smoothing) * rms;
    }

    /// Current level in range `0.0..=1.0`.
    pub fn level(&self) -> f32 {
        self.level.clamp(0.0, 1.0)
    }

    pub fn reset(&mut self) {
        self.level = 0.0;
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn follows_input() {
        let mut meter = LevelMeter::new(0.7);
        assert_eq!(meter.level(), 0.0);
        let block = [0.5; 64];
        meter.process(&block);
        assert!((meter.level() - 0.15).abs() < 1e-6);
        for _ in 0..100 {
            meter.process(&block);
        }
        assert!((meter.level() - 0.5).abs() < 1e-3);
        for _ in 0..100 {
            meter.process(&[0.0; 64]);
        }
        assert!(meter.level() < 1e-3);
    }

    #[test]
    fn clamps_loud_input() {
        let mut meter = LevelMeter::new(0.0);
        meter.process(&[4.0; 16]);
        assert_eq!(meter.level(), 1.0);
    }
}
