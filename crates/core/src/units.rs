//! Weight unit inference.
//!
//! Online forms submit weights without a unit. Animal weights are stored in
//! kilograms, and small animals are usually weighed in grams, so the monitor
//! treats any value above a threshold as grams. The heuristic is wrong for a
//! genuinely heavy animal entered in kilograms; the threshold is therefore
//! configurable rather than baked in.

use crate::error::CoreError;

/// Values strictly above this are interpreted as grams.
pub const DEFAULT_GRAM_THRESHOLD: f64 = 10.0;

/// Pounds per kilogram, as used by the host application's weight log view.
pub const LB_PER_KG: f64 = 2.20462;

/// Unit a raw form value was judged to be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectedUnit {
    Grams,
    Kilograms,
}

/// Threshold policy for converting raw form values to kilograms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitPolicy {
    gram_threshold: f64,
}

impl UnitPolicy {
    /// Build a policy with a custom threshold.
    pub fn with_gram_threshold(gram_threshold: f64) -> Result<Self, CoreError> {
        if !gram_threshold.is_finite() || gram_threshold <= 0.0 {
            return Err(CoreError::Validation(format!(
                "gram threshold must be a positive number, got {gram_threshold}"
            )));
        }
        Ok(Self { gram_threshold })
    }

    pub fn gram_threshold(&self) -> f64 {
        self.gram_threshold
    }

    /// Decide which unit `value` was entered in.
    pub fn detect(&self, value: f64) -> DetectedUnit {
        if value > self.gram_threshold {
            DetectedUnit::Grams
        } else {
            DetectedUnit::Kilograms
        }
    }

    /// Convert a raw form value to kilograms.
    pub fn to_kilograms(&self, value: f64) -> f64 {
        match self.detect(value) {
            DetectedUnit::Grams => value / 1000.0,
            DetectedUnit::Kilograms => value,
        }
    }
}

impl Default for UnitPolicy {
    fn default() -> Self {
        Self {
            gram_threshold: DEFAULT_GRAM_THRESHOLD,
        }
    }
}

/// Convert kilograms to pounds for display.
pub fn kg_to_lb(kg: f64) -> f64 {
    kg * LB_PER_KG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn large_values_are_grams() {
        let policy = UnitPolicy::default();
        assert_eq!(policy.detect(250.0), DetectedUnit::Grams);
        assert_eq!(policy.to_kilograms(250.0), 0.25);
        assert_eq!(policy.to_kilograms(1200.0), 1.2);
    }

    #[test]
    fn threshold_itself_is_kilograms() {
        let policy = UnitPolicy::default();
        assert_eq!(policy.detect(10.0), DetectedUnit::Kilograms);
        assert_eq!(policy.to_kilograms(10.0), 10.0);
    }

    #[test]
    fn just_above_threshold_is_grams() {
        let policy = UnitPolicy::default();
        assert_eq!(policy.detect(10.01), DetectedUnit::Grams);
    }

    #[test]
    fn small_values_pass_through() {
        let policy = UnitPolicy::default();
        assert_eq!(policy.to_kilograms(0.0), 0.0);
        assert_eq!(policy.to_kilograms(0.8), 0.8);
    }

    #[test]
    fn custom_threshold() {
        let policy = UnitPolicy::with_gram_threshold(100.0).unwrap();
        assert_eq!(policy.to_kilograms(50.0), 50.0);
        assert_eq!(policy.to_kilograms(500.0), 0.5);
    }

    #[test]
    fn rejects_bad_threshold() {
        assert!(UnitPolicy::with_gram_threshold(-1.0).is_err());
        assert!(UnitPolicy::with_gram_threshold(0.0).is_err());
        assert!(UnitPolicy::with_gram_threshold(f64::NAN).is_err());
        assert!(UnitPolicy::with_gram_threshold(f64::INFINITY).is_err());
    }

    #[test]
    fn pounds() {
        assert!((kg_to_lb(1.0) - 2.20462).abs() < 1e-9);
    }
}
