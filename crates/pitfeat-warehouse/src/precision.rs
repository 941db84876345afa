//! Fixed-precision rounding at the feature-store boundary.
//!
//! The core computes in `f64`. Values are rounded here to the scale of their
//! `DECIMAL(p, s)` column, non-finite values become NULL, and values that do not fit
//! the column's integer digits are rejected instead of being silently clamped.

use crate::WarehouseError;

/// `DECIMAL(precision, scale)` column shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecimalSpec {
    pub precision: u32,
    pub scale: u32,
}

/// General ratios and statistics.
pub const GENERAL: DecimalSpec = DecimalSpec {
    precision: 12,
    scale: 6,
};

/// `rsi14`, bounded to `[0, 100]`.
pub const RSI: DecimalSpec = DecimalSpec {
    precision: 8,
    scale: 4,
};

/// `eps`, which is quoted in currency units and can be large.
pub const EPS: DecimalSpec = DecimalSpec {
    precision: 18,
    scale: 6,
};

impl DecimalSpec {
    /// Exclusive upper bound on the magnitude a column of this shape can hold.
    fn limit(self) -> f64 {
        10f64.powi((self.precision - self.scale) as i32)
    }

    /// Round `value` half away from zero to `scale` decimals.
    ///
    /// `Ok(None)` for missing or non-finite input; an error if the rounded value
    /// overflows the column.
    pub fn round(
        self,
        column: &'static str,
        value: Option<f64>,
    ) -> Result<Option<f64>, WarehouseError> {
        let Some(value) = value.filter(|value| value.is_finite()) else {
            return Ok(None);
        };
        let factor = 10f64.powi(self.scale as i32);
        let rounded = (value * factor).round() / factor;
        if rounded.abs() >= self.limit() {
            return Err(WarehouseError::PrecisionOverflow {
                column,
                value,
                precision: self.precision,
                scale: self.scale,
            });
        }
        // Avoid persisting "-0".
        Ok(Some(if rounded == 0.0 { 0.0 } else { rounded }))
    }
}
