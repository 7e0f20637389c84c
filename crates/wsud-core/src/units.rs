//! Zero-cost unit newtypes for the quantities the planner reasons about.
//!
//! Every quantity that flows between the mapper, combiner, sizer and
//! composer is wrapped in a `#[repr(transparent)]` newtype instead of a bare
//! `f64`, so a square-metre can never be added to a kilolitre by accident.
//! The arithmetic each type supports is generated by [`impl_unit_ops`] to
//! avoid repeating the same `Add`/`Sub`/`Display` boilerplate five times.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Div, Mul, Neg, Sub};

macro_rules! impl_unit_ops {
    ($name:ident, $unit_suffix:expr) => {
        #[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        #[repr(transparent)]
        pub struct $name(pub f64);

        impl $name {
            pub const ZERO: $name = $name(0.0);

            pub fn new(value: f64) -> Self {
                $name(value)
            }

            pub fn value(self) -> f64 {
                self.0
            }

            pub fn is_finite(self) -> bool {
                self.0.is_finite()
            }

            pub fn is_nan(self) -> bool {
                self.0.is_nan()
            }

            pub fn min(self, other: Self) -> Self {
                $name(self.0.min(other.0))
            }

            pub fn max(self, other: Self) -> Self {
                $name(self.0.max(other.0))
            }

            pub fn clamp(self, lo: Self, hi: Self) -> Self {
                $name(self.0.clamp(lo.0, hi.0))
            }

            pub fn abs(self) -> Self {
                $name(self.0.abs())
            }
        }

        impl Add for $name {
            type Output = $name;
            fn add(self, rhs: Self) -> Self {
                $name(self.0 + rhs.0)
            }
        }

        impl Sub for $name {
            type Output = $name;
            fn sub(self, rhs: Self) -> Self {
                $name(self.0 - rhs.0)
            }
        }

        impl Neg for $name {
            type Output = $name;
            fn neg(self) -> Self {
                $name(-self.0)
            }
        }

        impl Mul<f64> for $name {
            type Output = $name;
            fn mul(self, rhs: f64) -> Self {
                $name(self.0 * rhs)
            }
        }

        impl Mul<$name> for f64 {
            type Output = $name;
            fn mul(self, rhs: $name) -> $name {
                $name(self * rhs.0)
            }
        }

        impl Div<f64> for $name {
            type Output = $name;
            fn div(self, rhs: f64) -> Self {
                $name(self.0 / rhs)
            }
        }

        impl Div<$name> for $name {
            type Output = f64;
            fn div(self, rhs: $name) -> f64 {
                self.0 / rhs.0
            }
        }

        impl Sum for $name {
            fn sum<I: Iterator<Item = $name>>(iter: I) -> Self {
                $name(iter.map(|v| v.0).sum())
            }
        }

        impl<'a> Sum<&'a $name> for $name {
            fn sum<I: Iterator<Item = &'a $name>>(iter: I) -> Self {
                $name(iter.map(|v| v.0).sum())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{:.3}{}", self.0, $unit_suffix)
            }
        }
    };
}

impl_unit_ops!(SquareMetres, "m2");
impl_unit_ops!(Kilolitres, "kL");
impl_unit_ops!(KilolitresPerYear, "kL/yr");
impl_unit_ops!(MillimetresPerHour, "mm/h");

/// A value constrained (by convention, not enforced at construction) to the
/// closed unit interval — service ratios, percent-of-demand-met, scoring
/// weights.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Fraction(pub f64);

impl Fraction {
    pub const ZERO: Fraction = Fraction(0.0);
    pub const ONE: Fraction = Fraction(1.0);

    pub fn new(value: f64) -> Self {
        Fraction(value)
    }

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn clamped(self) -> Self {
        Fraction(self.0.clamp(0.0, 1.0))
    }
}

impl Add for Fraction {
    type Output = Fraction;
    fn add(self, rhs: Self) -> Self {
        Fraction(self.0 + rhs.0)
    }
}

impl Mul<f64> for Fraction {
    type Output = Fraction;
    fn mul(self, rhs: f64) -> Self {
        Fraction(self.0 * rhs)
    }
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}%", self.0 * 100.0)
    }
}
