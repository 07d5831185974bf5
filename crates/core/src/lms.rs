//! LMS (Box-Cox) transform between raw measurements and Z-scores.
//!
//! `L` is the Box-Cox power, `M` the median and `S` the coefficient of variation. For `|L| > ε`:
//!
//! ```text
//! Z = ((value / M)^L - 1) / (L * S)
//! ```
//!
//! and in the limit `L -> 0`, `Z = ln(value / M) / S`.
//!
//! All functions validate their inputs and never return NaN or infinity: a non-positive
//! measurement, median or coefficient of variation is an [`GrowthError::InvalidInput`].

use crate::constants::LMS_L_EPSILON;
use crate::{GrowthError, GrowthResult};
use serde::{Deserialize, Serialize};

/// Box-Cox parameters for one (gender, chart, age) point.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LmsParams {
    pub l: f64,
    pub m: f64,
    pub s: f64,
}

impl LmsParams {
    /// Creates validated parameters.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if any parameter is non-finite, or if `m` or `s` is not positive.
    pub fn new(l: f64, m: f64, s: f64) -> GrowthResult<Self> {
        let params = Self { l, m, s };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> GrowthResult<()> {
        if !self.l.is_finite() || !self.m.is_finite() || !self.s.is_finite() {
            return Err(GrowthError::InvalidInput(format!(
                "LMS parameters must be finite (L={}, M={}, S={})",
                self.l, self.m, self.s
            )));
        }
        if self.m <= 0.0 {
            return Err(GrowthError::InvalidInput(format!(
                "LMS median must be positive, got {}",
                self.m
            )));
        }
        if self.s <= 0.0 {
            return Err(GrowthError::InvalidInput(format!(
                "LMS coefficient of variation must be positive, got {}",
                self.s
            )));
        }
        Ok(())
    }

    fn is_log_form(&self) -> bool {
        self.l.abs() <= LMS_L_EPSILON
    }
}

/// Computes the Z-score of `value` against `params`.
///
/// # Errors
///
/// Returns `InvalidInput` if `value` is not a positive finite number, if the parameters are
/// invalid, or if the result would not be finite.
pub fn z_score(value: f64, params: &LmsParams) -> GrowthResult<f64> {
    if !value.is_finite() || value <= 0.0 {
        return Err(GrowthError::InvalidInput(format!(
            "measurement must be a positive number, got {value}"
        )));
    }
    params.validate()?;

    let ratio = value / params.m;
    let z = if params.is_log_form() {
        ratio.ln() / params.s
    } else {
        (ratio.powf(params.l) - 1.0) / (params.l * params.s)
    };

    if !z.is_finite() {
        return Err(GrowthError::InvalidInput(format!(
            "Z-score for value {value} is not finite"
        )));
    }
    Ok(z)
}

/// Inverse transform: the measurement that sits exactly `z` standard deviations from the median.
///
/// Used to derive SD lines and reference values. For large negative `z` with positive `L` the
/// base `1 + L*S*z` can reach zero; such points have no measurement and yield `InvalidInput`.
pub fn value_at_z(z: f64, params: &LmsParams) -> GrowthResult<f64> {
    params.validate()?;
    if !z.is_finite() {
        return Err(GrowthError::InvalidInput("Z-score must be finite".into()));
    }

    let value = if params.is_log_form() {
        params.m * (params.s * z).exp()
    } else {
        let base = 1.0 + params.l * params.s * z;
        if base <= 0.0 {
            return Err(GrowthError::InvalidInput(format!(
                "no measurement corresponds to Z={z} for L={}",
                params.l
            )));
        }
        params.m * base.powf(1.0 / params.l)
    };

    if !value.is_finite() {
        return Err(GrowthError::InvalidInput(format!(
            "measurement at Z={z} is not finite"
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn who_boys_birth_weight() -> LmsParams {
        LmsParams::new(0.3487, 3.3464, 0.14602).unwrap()
    }

    #[test]
    fn median_has_zero_z_score() {
        let params = who_boys_birth_weight();
        let z = z_score(params.m, &params).unwrap();
        assert!(z.abs() < 1e-12);
    }

    #[test]
    fn log_form_used_when_l_is_zero() {
        let params = LmsParams::new(0.0, 10.0, 0.1).unwrap();
        let z = z_score(10.0 * (0.1f64).exp(), &params).unwrap();
        assert!((z - 1.0).abs() < 1e-12);
    }

    #[test]
    fn l_of_one_is_a_plain_normal_scale() {
        let params = LmsParams::new(1.0, 50.0, 0.04).unwrap();
        // SD = M * S = 2.0
        let z = z_score(54.0, &params).unwrap();
        assert!((z - 2.0).abs() < 1e-12);
    }

    #[test]
    fn rejects_non_positive_measurement() {
        let params = who_boys_birth_weight();
        assert!(matches!(z_score(0.0, &params), Err(GrowthError::InvalidInput(_))));
        assert!(matches!(z_score(-1.5, &params), Err(GrowthError::InvalidInput(_))));
        assert!(matches!(z_score(f64::NAN, &params), Err(GrowthError::InvalidInput(_))));
    }

    #[test]
    fn rejects_zero_s_instead_of_dividing_by_zero() {
        let params = LmsParams {
            l: 1.0,
            m: 3.3,
            s: 0.0,
        };
        assert!(matches!(z_score(3.3, &params), Err(GrowthError::InvalidInput(_))));
    }

    #[test]
    fn rejects_non_positive_median() {
        assert!(LmsParams::new(1.0, 0.0, 0.1).is_err());
    }

    #[test]
    fn value_at_z_rejects_unreachable_tail() {
        let params = LmsParams::new(1.0, 10.0, 0.5).unwrap();
        // 1 + 1 * 0.5 * -3 < 0
        assert!(value_at_z(-3.0, &params).is_err());
    }

    proptest! {
        #[test]
        fn z_score_round_trips_through_inverse(
            l in prop_oneof![-2.0f64..-0.01, 0.01f64..2.0],
            m in 1.0f64..120.0,
            s in 0.01f64..0.2,
            factor in 0.7f64..1.3,
        ) {
            let params = LmsParams::new(l, m, s).unwrap();
            let value = m * factor;
            let z = z_score(value, &params).unwrap();
            let back = m * (1.0 + l * s * z).powf(1.0 / l);
            prop_assert!(((back - value) / value).abs() < 1e-6);
        }
    }
}
