// SPDX: CC0-1.0

pub mod asymptote;
pub mod cache;
pub mod dual;
pub mod eval;
pub mod function;
pub mod lex;
pub mod parse;
pub mod sample;
pub mod shell;
pub mod stdlib;
pub mod transform;

use core::{fmt, str::FromStr};
use rayon::prelude::*;
use std::sync::Arc;

pub use function::Function;
pub use kurbo::{Point, Rect};
pub use sample::{Curve, SamplerConfig, Strategy};
pub use transform::Transform;

pub type Number = f64;

/// Stroke colour carried on every curve; drawing resources stay with the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 0xff }
    }

    pub const BLUE: Self = Self::rgb(0x1f, 0x4e, 0xb4);
    pub const RED: Self = Self::rgb(0xc0, 0x39, 0x2b);
    pub const GREEN: Self = Self::rgb(0x27, 0x42, 0x2e);
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)?;
        if self.a != 0xff {
            write!(f, "{:02x}", self.a)?;
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParseColorErr;

impl fmt::Display for ParseColorErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected a colour like '#rrggbb' or '#rrggbbaa'")
    }
}

impl FromStr for Color {
    type Err = ParseColorErr;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        if !matches!(hex.len(), 6 | 8) || !hex.is_ascii() {
            return Err(ParseColorErr);
        }
        let byte = |at: usize| u8::from_str_radix(&hex[at..at + 2], 16).map_err(|_| ParseColorErr);
        Ok(Self {
            r: byte(0)?,
            g: byte(2)?,
            b: byte(4)?,
            a: if hex.len() == 8 { byte(6)? } else { 0xff },
        })
    }
}

/// Sample every function for one frame, one task per function.
///
/// Results come back in the order of `functions`, so draw order is stable
/// no matter which task finishes first.
pub fn render_all(
    functions: &[Function],
    rect: Rect,
    transform: &Transform,
    config: &SamplerConfig,
) -> Vec<Arc<[Curve]>> {
    functions
        .par_iter()
        .map(|function| function.curves(rect, transform, config))
        .collect()
}
