//! Validation thresholds

use serde::{Deserialize, Serialize};

/// Screen area components are expected to fit in
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    /// Create a viewport
    #[inline]
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1440.0, 900.0)
    }
}

/// Thresholds used by [`StandardValidator`](crate::StandardValidator)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationRules {
    /// Minimum height of interactive components
    pub min_touch_target: f64,

    /// Viewport used for overflow checks
    pub viewport: Viewport,

    /// Horizontal overflow up to this fraction of the viewport width is a
    /// warning; beyond it, an error
    pub overflow_tolerance: f64,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            min_touch_target: 44.0,
            viewport: Viewport::default(),
            overflow_tolerance: 0.1,
        }
    }
}

impl ValidationRules {
    /// With minimum touch target
    #[inline]
    #[must_use]
    pub fn with_min_touch_target(mut self, min: f64) -> Self {
        self.min_touch_target = min;
        self
    }

    /// With viewport
    #[inline]
    #[must_use]
    pub fn with_viewport(mut self, width: f64, height: f64) -> Self {
        self.viewport = Viewport::new(width, height);
        self
    }

    /// With overflow tolerance
    #[inline]
    #[must_use]
    pub fn with_overflow_tolerance(mut self, tolerance: f64) -> Self {
        self.overflow_tolerance = tolerance;
        self
    }

    /// Overflow allowed before it becomes an error, in units
    #[inline]
    #[must_use]
    pub fn horizontal_slack(&self) -> f64 {
        self.viewport.width * self.overflow_tolerance
    }

    /// Check the thresholds are usable
    ///
    /// # Errors
    /// Returns the first out-of-range threshold
    pub fn validate(&self) -> Result<(), RulesError> {
        if !(self.min_touch_target.is_finite() && self.min_touch_target >= 0.0) {
            return Err(RulesError::TouchTarget(self.min_touch_target));
        }
        let Viewport { width, height } = self.viewport;
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(RulesError::Viewport { width, height });
        }
        if !(0.0..=1.0).contains(&self.overflow_tolerance) {
            return Err(RulesError::Tolerance(self.overflow_tolerance));
        }
        Ok(())
    }
}

/// Invalid validation thresholds
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RulesError {
    #[error("min_touch_target must be a non-negative number, got {0}")]
    TouchTarget(f64),

    #[error("viewport must be positive, got {width}x{height}")]
    Viewport { width: f64, height: f64 },

    #[error("overflow_tolerance must be within 0..=1, got {0}")]
    Tolerance(f64),
}
