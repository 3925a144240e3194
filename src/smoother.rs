//! Intensity smoothing
//!
//! Exponential moving-average filter applied once per classification tick.

/// Weight given to the previous filter value on each step
pub const DEFAULT_SMOOTHING_FACTOR: f64 = 0.85;

/// Exponential moving-average filter producing rounded samples
#[derive(Debug, Clone, PartialEq)]
pub struct IntensitySmoother {
    keep: f64,
    take: f64,
    value: f64,
}

impl IntensitySmoother {
    /// Create a filter with smoothing factor `factor` in (0, 1) and a starting value
    pub fn new(factor: f64, initial_value: f64) -> Self {
        Self {
            keep: factor,
            take: 1.0 - factor,
            value: initial_value,
        }
    }

    /// Feed one input and return the rounded filter value
    pub fn advance(&mut self, input: f64) -> i64 {
        self.value = self.value * self.keep + input * self.take;
        self.value.round() as i64
    }

    /// Unrounded running value
    pub fn value(&self) -> f64 {
        self.value
    }
}
