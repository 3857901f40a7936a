// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Fabgraph Contributors

//! Math utilities

/// Check if two floats are approximately equal.
///
/// Equal infinities compare equal so that unbounded box sides can be compared.
pub fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
    a == b || (a - b).abs() < epsilon
}

/// Convert degrees to radians
pub fn deg_to_rad(deg: f64) -> f64 {
    deg * std::f64::consts::PI / 180.0
}

/// Product that treats an exact zero as absorbing, even against infinity.
///
/// Infinite bounds stand for "unknown but finite", so `0 * inf` is `0`.
pub fn mul_absorbing(a: f64, b: f64) -> f64 {
    if a == 0.0 || b == 0.0 {
        0.0
    } else {
        a * b
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_approx_eq() {
        assert!(approx_eq(1.0, 1.0001, 0.001));
        assert!(!approx_eq(1.0, 1.1, 0.001));
        assert!(approx_eq(f64::INFINITY, f64::INFINITY, 1e-9));
        assert!(!approx_eq(f64::INFINITY, f64::NEG_INFINITY, 1e-9));
    }

    #[test]
    fn test_angle_conversion() {
        assert!(approx_eq(deg_to_rad(180.0), std::f64::consts::PI, 1e-12));
        assert!(approx_eq(deg_to_rad(-90.0), -std::f64::consts::FRAC_PI_2, 1e-12));
    }

    #[test]
    fn test_mul_absorbing() {
        assert_eq!(mul_absorbing(0.0, f64::INFINITY), 0.0);
        assert_eq!(mul_absorbing(2.0, f64::NEG_INFINITY), f64::NEG_INFINITY);
        assert_eq!(mul_absorbing(2.0, 3.0), 6.0);
    }
}
