// SPDX: CC0-1.0

//! Forward-mode dual numbers: `val + eps·ε` with `ε² = 0`.
//!
//! Evaluating a program with `x = Dual::var(x)` yields `f(x)` in `val` and
//! `f'(x)` in `eps`.

use crate::Number;
use core::{
    fmt,
    ops::{Add, Div, Mul, Neg, Sub},
};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Dual {
    pub val: Number,
    pub eps: Number,
}

impl Dual {
    #[inline]
    pub const fn new(val: Number, eps: Number) -> Self {
        Self { val, eps }
    }

    /// The independent variable, `d/dx x = 1`.
    #[inline]
    pub const fn var(val: Number) -> Self {
        Self::new(val, 1.0)
    }

    #[inline]
    pub const fn constant(val: Number) -> Self {
        Self::new(val, 0.0)
    }

    /// Apply `f` with known derivative `df` (chain rule).
    #[inline]
    pub fn chain(self, f: impl Fn(Number) -> Number, df: impl Fn(Number) -> Number) -> Self {
        Self::new(f(self.val), df(self.val) * self.eps)
    }

    pub fn powd(self, exp: Self) -> Self {
        let val = self.val.powf(exp.val);
        let eps = if exp.eps == 0.0 {
            // constant exponent keeps negative bases with integer powers defined
            if exp.val == 0.0 {
                0.0
            } else {
                exp.val * self.val.powf(exp.val - 1.0) * self.eps
            }
        } else {
            val * (exp.eps * self.val.ln() + exp.val * self.eps / self.val)
        };
        Self::new(val, eps)
    }

    pub fn ln(self) -> Self {
        self.chain(Number::ln, |x| 1.0 / x)
    }

    /// `|x|`, taking the derivative at the kink to be 0.
    pub fn abs(self) -> Self {
        self.chain(Number::abs, |v| if v == 0.0 { 0.0 } else { v.signum() })
    }
}

impl fmt::Display for Dual {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} + {}ε", self.val, self.eps)
    }
}

impl Add for Dual {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.val + rhs.val, self.eps + rhs.eps)
    }
}

impl Sub for Dual {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.val - rhs.val, self.eps - rhs.eps)
    }
}

impl Mul for Dual {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        Self::new(self.val * rhs.val, self.val * rhs.eps + self.eps * rhs.val)
    }
}

impl Div for Dual {
    type Output = Self;
    fn div(self, rhs: Self) -> Self {
        let val = self.val / rhs.val;
        let eps = (self.eps * rhs.val - self.val * rhs.eps) / (rhs.val * rhs.val);
        Self::new(val, eps)
    }
}

impl Neg for Dual {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.val, -self.eps)
    }
}
