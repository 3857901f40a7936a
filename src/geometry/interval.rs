// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Fabgraph Contributors

//! Interval arithmetic for conservative bound propagation
//!
//! Evaluating a coordinate formula over intervals yields an enclosure of
//! every value the formula can take inside a box. Infinite endpoints stand for
//! "unknown"; any NaN produced on the way widens the result instead of
//! poisoning it.

use crate::utils::math::mul_absorbing;
use std::f64::consts::{FRAC_PI_2, PI, TAU};
use std::ops::{Add, Div, Mul, Neg, Sub};

/// A closed interval `[lo, hi]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub lo: f64,
    pub hi: f64,
}

impl Interval {
    /// The entire real line
    pub const EVERYTHING: Self = Self {
        lo: f64::NEG_INFINITY,
        hi: f64::INFINITY,
    };

    pub fn new(lo: f64, hi: f64) -> Self {
        Self { lo, hi }.sanitize()
    }

    pub fn point(v: f64) -> Self {
        Self::new(v, v)
    }

    pub fn is_point(&self) -> bool {
        self.lo == self.hi
    }

    pub fn contains(&self, v: f64) -> bool {
        self.lo <= v && v <= self.hi
    }

    pub fn width(&self) -> f64 {
        self.hi - self.lo
    }

    fn sanitize(self) -> Self {
        Self {
            lo: if self.lo.is_nan() { f64::NEG_INFINITY } else { self.lo },
            hi: if self.hi.is_nan() { f64::INFINITY } else { self.hi },
        }
    }

    fn from_candidates(values: &[f64]) -> Self {
        if values.iter().any(|v| v.is_nan()) {
            return Self::EVERYTHING;
        }
        let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Self::new(lo, hi)
    }

    pub fn abs(self) -> Self {
        if self.lo >= 0.0 {
            self
        } else if self.hi <= 0.0 {
            -self
        } else {
            Self::new(0.0, self.hi.max(-self.lo))
        }
    }

    /// Square root, clamped to the non-negative part of the domain
    pub fn sqrt(self) -> Self {
        Self::new(self.lo.max(0.0).sqrt(), self.hi.max(0.0).sqrt())
    }

    pub fn square(self) -> Self {
        let a = self.abs();
        Self::new(a.lo * a.lo, a.hi * a.hi)
    }

    pub fn exp(self) -> Self {
        Self::new(self.lo.exp(), self.hi.exp())
    }

    pub fn ln(self) -> Self {
        let lo = if self.lo <= 0.0 { f64::NEG_INFINITY } else { self.lo.ln() };
        let hi = if self.hi <= 0.0 { f64::NEG_INFINITY } else { self.hi.ln() };
        Self::new(lo, hi)
    }

    pub fn sin(self) -> Self {
        if !self.lo.is_finite() || !self.hi.is_finite() || self.width() >= TAU {
            return Self::new(-1.0, 1.0);
        }
        let mut lo = self.lo.sin().min(self.hi.sin());
        let mut hi = self.lo.sin().max(self.hi.sin());
        if self.reaches(FRAC_PI_2) {
            hi = 1.0;
        }
        if self.reaches(-FRAC_PI_2) {
            lo = -1.0;
        }
        Self::new(lo, hi)
    }

    pub fn cos(self) -> Self {
        (self + Self::point(FRAC_PI_2)).sin()
    }

    pub fn tan(self) -> Self {
        if self.is_point() {
            return Self::point(self.lo.tan());
        }
        // Monotonic between asymptotes at pi/2 + k*pi
        if self.width() < PI && !self.reaches_period(FRAC_PI_2, PI) {
            return Self::new(self.lo.tan(), self.hi.tan());
        }
        Self::EVERYTHING
    }

    pub fn asin(self) -> Self {
        Self::new(self.lo.clamp(-1.0, 1.0).asin(), self.hi.clamp(-1.0, 1.0).asin())
    }

    pub fn acos(self) -> Self {
        Self::new(self.hi.clamp(-1.0, 1.0).acos(), self.lo.clamp(-1.0, 1.0).acos())
    }

    pub fn atan(self) -> Self {
        Self::new(self.lo.atan(), self.hi.atan())
    }

    pub fn atan2(self, x: Interval) -> Self {
        if self.is_point() && x.is_point() {
            return Self::point(self.lo.atan2(x.lo));
        }
        Self::new(-PI, PI)
    }

    pub fn min(self, other: Interval) -> Self {
        Self::new(self.lo.min(other.lo), self.hi.min(other.hi))
    }

    pub fn max(self, other: Interval) -> Self {
        Self::new(self.lo.max(other.lo), self.hi.max(other.hi))
    }

    pub fn pow(self, exponent: Interval) -> Self {
        if exponent.is_point() && exponent.lo.fract() == 0.0 {
            let n = exponent.lo;
            if n == 0.0 {
                return Self::point(1.0);
            }
            if n > 0.0 {
                return if n % 2.0 == 0.0 {
                    let a = self.abs();
                    Self::new(a.lo.powf(n), a.hi.powf(n))
                } else {
                    Self::new(self.lo.powf(n), self.hi.powf(n))
                };
            }
        }
        if self.lo > 0.0 {
            return (exponent * self.ln()).exp();
        }
        Self::EVERYTHING
    }

    /// True if `anchor + k * 2pi` lies inside the interval for some integer k
    fn reaches(&self, anchor: f64) -> bool {
        self.reaches_period(anchor, TAU)
    }

    fn reaches_period(&self, anchor: f64, period: f64) -> bool {
        let k = ((self.lo - anchor) / period).ceil();
        anchor + k * period <= self.hi
    }
}

impl Add for Interval {
    type Output = Interval;

    fn add(self, rhs: Interval) -> Interval {
        Interval::new(self.lo + rhs.lo, self.hi + rhs.hi)
    }
}

impl Sub for Interval {
    type Output = Interval;

    fn sub(self, rhs: Interval) -> Interval {
        Interval::new(self.lo - rhs.hi, self.hi - rhs.lo)
    }
}

impl Mul for Interval {
    type Output = Interval;

    fn mul(self, rhs: Interval) -> Interval {
        Interval::from_candidates(&[
            mul_absorbing(self.lo, rhs.lo),
            mul_absorbing(self.lo, rhs.hi),
            mul_absorbing(self.hi, rhs.lo),
            mul_absorbing(self.hi, rhs.hi),
        ])
    }
}

impl Div for Interval {
    type Output = Interval;

    fn div(self, rhs: Interval) -> Interval {
        if rhs.contains(0.0) {
            return Interval::EVERYTHING;
        }
        self * Interval::new(1.0 / rhs.hi, 1.0 / rhs.lo)
    }
}

impl Neg for Interval {
    type Output = Interval;

    fn neg(self) -> Interval {
        Interval::new(-self.hi, -self.lo)
    }
}
