//! Parameter metadata for the engine configuration
//!
//! This module describes the tunable numeric parameters of [`EngineConfig`], enabling:
//! - Grid search over pivot length and minimum range
//! - Parameter documentation
//! - Building a configuration from a flat key/value map
//!
//! # Example
//!
//! ```rust
//! use std::collections::HashMap;
//! use fibwave::params::Parameterized;
//! use fibwave::EngineConfig;
//!
//! for param in EngineConfig::param_meta() {
//!     println!("{}: {:?} (default: {})", param.name, param.param_type, param.default);
//! }
//!
//! let mut params = HashMap::new();
//! params.insert("pivot_length", 3.0);
//! let config = EngineConfig::with_params(&params).unwrap();
//! assert_eq!(config.pivot_length.get(), 3);
//! ```

use std::collections::HashMap;

use crate::pipeline::{
  is_extension_ratio, DEFAULT_EXTENSION_TARGET, DEFAULT_LABEL_CAP, EXTENSION_RATIOS,
};
use crate::{EngineConfig, EngineError, MinRange, Period, Result};

// ============================================================
// PARAMETER TYPES
// ============================================================

/// Type of parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
  /// Bar count (positive integer)
  Period,
  /// Price distance (positive, finite)
  Price,
  /// Fibonacci ratio from the fixed table
  Ratio,
}

/// Metadata for a single configuration parameter
#[derive(Debug, Clone)]
pub struct ParamMeta {
  /// Parameter name (e.g., "pivot_length")
  pub name: &'static str,
  pub param_type: ParamType,
  pub default: f64,
  /// Range for optimization: (min, max, step)
  pub range: (f64, f64, f64),
  pub description: &'static str,
}

impl ParamMeta {
  pub const fn period(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Period, default, range, description }
  }

  pub const fn price(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Price, default, range, description }
  }

  pub const fn ratio(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Ratio, default, range, description }
  }

  /// Generate all values for grid search
  ///
  /// Ratio parameters enumerate the extension table within range; the step is ignored.
  pub fn generate_grid(&self) -> Vec<f64> {
    let (min, max, step) = self.range;
    if self.param_type == ParamType::Ratio {
      return EXTENSION_RATIOS.into_iter().filter(|r| (min..=max).contains(r)).collect();
    }
    let mut values = Vec::new();
    let mut v = min;
    while v <= max + f64::EPSILON {
      values.push(v);
      v += step;
    }
    values
  }

  /// Validate a value for this parameter
  pub fn validate(&self, value: f64) -> Result<()> {
    let (min, max, _) = self.range;
    if value < min || value > max {
      return Err(EngineError::OutOfRange { field: self.name, value, min, max });
    }
    match self.param_type {
      ParamType::Period => {
        if value < 1.0 || value.fract() != 0.0 {
          return Err(EngineError::InvalidValue("Period must be a positive integer"));
        }
        Ok(())
      },
      ParamType::Price => MinRange::new(value).map(|_| ()),
      ParamType::Ratio => {
        if !is_extension_ratio(value) {
          return Err(EngineError::InvalidValue("ratio is not an extension ratio"));
        }
        Ok(())
      },
    }
  }
}

// ============================================================
// PARAMETERIZED TRAIT
// ============================================================

/// Types that can be built from a flat parameter map
pub trait Parameterized: Sized {
  /// Returns metadata for all configurable numeric parameters
  fn param_meta() -> &'static [ParamMeta];

  /// Creates a value from a HashMap
  ///
  /// Missing parameters use their default values.
  fn with_params(params: &HashMap<&str, f64>) -> Result<Self>;
}

static ENGINE_PARAMS: [ParamMeta; 4] = [
  ParamMeta::period(
    "pivot_length",
    5.0,
    (2.0, 20.0, 1.0),
    "Bars on each side of a swing pivot candidate",
  ),
  ParamMeta::price(
    "min_range",
    1e-8,
    (1e-8, 1e6, 0.5),
    "Anchor range must exceed this to activate a scenario",
  ),
  ParamMeta::period(
    "wave_label_cap",
    DEFAULT_LABEL_CAP as f64,
    (5.0, 50.0, 5.0),
    "Wave labels retained before the oldest is retired",
  ),
  ParamMeta::ratio(
    "extension_target",
    DEFAULT_EXTENSION_TARGET,
    (1.272, 3.618, 0.0),
    "Extension ratio watched by the target alert",
  ),
];

impl Parameterized for EngineConfig {
  fn param_meta() -> &'static [ParamMeta] {
    &ENGINE_PARAMS
  }

  fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
    let defaults = EngineConfig::default();
    let extension_target =
      params.get("extension_target").copied().unwrap_or(defaults.extension_target);
    let config = EngineConfig {
      pivot_length: get_period(params, "pivot_length", defaults.pivot_length.get())?,
      min_range: get_min_range(params, "min_range", defaults.min_range.get())?,
      wave_label_cap: get_period(params, "wave_label_cap", defaults.wave_label_cap.get())?,
      extension_target,
      ..defaults
    };
    config.validate()?;
    Ok(config)
  }
}

// ============================================================
// PARAMETER VALUE HELPERS
// ============================================================

/// Helper to get a Period from params with default fallback
pub fn get_period(params: &HashMap<&str, f64>, key: &str, default: usize) -> Result<Period> {
  let value = params.get(key).copied().unwrap_or(default as f64);
  if value < 1.0 || value.fract() != 0.0 {
    return Err(EngineError::InvalidValue("Period must be a positive integer"));
  }
  Period::new(value as usize)
}

/// Helper to get a MinRange from params with default fallback
pub fn get_min_range(params: &HashMap<&str, f64>, key: &str, default: f64) -> Result<MinRange> {
  let value = params.get(key).copied().unwrap_or(default);
  MinRange::new(value)
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_param_meta_period() {
    let meta = ParamMeta::period("test_period", 5.0, (2.0, 10.0, 1.0), "Test period parameter");

    assert_eq!(meta.name, "test_period");
    assert_eq!(meta.param_type, ParamType::Period);
    assert_eq!(meta.default, 5.0);
  }

  #[test]
  fn test_generate_grid() {
    let meta = ParamMeta::period("pivot_length", 5.0, (2.0, 6.0, 2.0), "Test");

    let grid = meta.generate_grid();
    assert_eq!(grid, vec![2.0, 4.0, 6.0]);

    let targets = EngineConfig::param_meta()[3].generate_grid();
    assert_eq!(targets.len(), EXTENSION_RATIOS.len());
    assert_eq!(targets[2], 1.618);
  }

  #[test]
  fn test_validate_period() {
    let meta = &EngineConfig::param_meta()[0];

    assert!(meta.validate(5.0).is_ok());
    assert!(meta.validate(2.0).is_ok());
    assert!(meta.validate(1.0).is_err());
    assert!(meta.validate(4.5).is_err());
    assert!(meta.validate(21.0).is_err());
  }

  #[test]
  fn test_validate_price_and_ratio() {
    let metas = EngineConfig::param_meta();
    assert!(metas[1].validate(0.5).is_ok());
    assert!(metas[1].validate(0.0).is_err());
    assert!(metas[3].validate(2.618).is_ok());
    assert!(metas[3].validate(2.5).is_err());
  }

  #[test]
  fn test_defaults_match_config() {
    let config = EngineConfig::with_params(&HashMap::new()).unwrap();
    assert_eq!(config, EngineConfig::default());
    for meta in EngineConfig::param_meta() {
      assert!(meta.validate(meta.default).is_ok(), "{} default out of range", meta.name);
    }
  }

  #[test]
  fn test_with_params_overrides() {
    let mut params = HashMap::new();
    params.insert("pivot_length", 3.0);
    params.insert("min_range", 0.25);
    params.insert("extension_target", 2.618);

    let config = EngineConfig::with_params(&params).unwrap();
    assert_eq!(config.pivot_length.get(), 3);
    assert_eq!(config.min_range.get(), 0.25);
    assert_eq!(config.extension_target, 2.618);
    assert_eq!(config.wave_label_cap.get(), DEFAULT_LABEL_CAP);

    params.insert("extension_target", 0.5);
    assert!(EngineConfig::with_params(&params).is_err());
  }

  #[test]
  fn test_get_period_helper() {
    let mut params = HashMap::new();
    params.insert("key1", 8.0);
    params.insert("bad", 0.0);

    assert_eq!(get_period(&params, "key1", 5).unwrap().get(), 8);
    assert_eq!(get_period(&params, "key2", 5).unwrap().get(), 5);
    assert!(get_period(&params, "bad", 5).is_err());
  }
}
