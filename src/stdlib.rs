// SPDX: CC0-1.0

use crate::{dual::Dual, eval::*, Number};
use core::f64::consts;
use std::collections::HashMap;

pub const X: &str = "x";

pub fn standard_idents() -> Idents {
    let mut ret = HashMap::new();

    ret.insert(X.into(), Ident::Var);

    // operators
    for op in [
        OperatorTyp::Neg,
        OperatorTyp::Add,
        OperatorTyp::Sub,
        OperatorTyp::Mul,
        OperatorTyp::Div,
        OperatorTyp::Pow,
    ] {
        let (name, fun) = op.fun();
        ret.insert(name.into(), Ident::Fun(fun));
    }

    ret.insert("abs".into(), Ident::Fun(Fun::new(1, abs)));
    ret.insert("sqrt".into(), Ident::Fun(Fun::new(1, sqrt)));
    ret.insert("exp".into(), Ident::Fun(Fun::new(1, exp)));
    ret.insert("ln".into(), Ident::Fun(Fun::new(1, ln)));
    ret.insert("log".into(), Ident::Fun(Fun::new(2, log)));

    // trig
    ret.insert("sin".into(), Ident::Fun(Fun::new(1, sin)));
    ret.insert("cos".into(), Ident::Fun(Fun::new(1, cos)));
    ret.insert("tan".into(), Ident::Fun(Fun::new(1, tan)));
    ret.insert("cot".into(), Ident::Fun(Fun::new(1, cot)));
    ret.insert("sec".into(), Ident::Fun(Fun::new(1, sec)));
    ret.insert("csc".into(), Ident::Fun(Fun::new(1, csc)));
    ret.insert("asin".into(), Ident::Fun(Fun::new(1, arcsin)));
    ret.insert("acos".into(), Ident::Fun(Fun::new(1, arccos)));
    ret.insert("atan".into(), Ident::Fun(Fun::new(1, arctan)));
    ret.insert("arcsin".into(), Ident::Fun(Fun::new(1, arcsin)));
    ret.insert("arccos".into(), Ident::Fun(Fun::new(1, arccos)));
    ret.insert("arctan".into(), Ident::Fun(Fun::new(1, arctan)));

    // hyperbolic
    ret.insert("sinh".into(), Ident::Fun(Fun::new(1, sinh)));
    ret.insert("cosh".into(), Ident::Fun(Fun::new(1, cosh)));
    ret.insert("tanh".into(), Ident::Fun(Fun::new(1, tanh)));
    ret.insert("coth".into(), Ident::Fun(Fun::new(1, coth)));

    ret.insert("pi".into(), Ident::Const(consts::PI));
    ret.insert("tau".into(), Ident::Const(consts::TAU));
    ret.insert("e".into(), Ident::Const(consts::E));
    ret
}

// arity is checked by the evaluator before any of these run
fn expect_n<const N: usize>(args: &[Dual]) -> [Dual; N] {
    core::array::from_fn(|i| args[i])
}

pub fn neg(args: &[Dual]) -> Dual {
    let [x] = expect_n::<1>(args);
    -x
}

pub fn add(args: &[Dual]) -> Dual {
    let [x, y] = expect_n::<2>(args);
    x + y
}

pub fn sub(args: &[Dual]) -> Dual {
    let [x, y] = expect_n::<2>(args);
    x - y
}

pub fn mul(args: &[Dual]) -> Dual {
    let [x, y] = expect_n::<2>(args);
    x * y
}

pub fn div(args: &[Dual]) -> Dual {
    let [x, y] = expect_n::<2>(args);
    x / y
}

pub fn pow(args: &[Dual]) -> Dual {
    let [x, exp] = expect_n::<2>(args);
    x.powd(exp)
}

pub fn abs(args: &[Dual]) -> Dual {
    let [x] = expect_n::<1>(args);
    x.abs()
}

pub fn sqrt(args: &[Dual]) -> Dual {
    let [x] = expect_n::<1>(args);
    x.chain(Number::sqrt, |v| 0.5 / v.sqrt())
}

pub fn exp(args: &[Dual]) -> Dual {
    let [x] = expect_n::<1>(args);
    x.chain(Number::exp, Number::exp)
}

pub fn ln(args: &[Dual]) -> Dual {
    let [x] = expect_n::<1>(args);
    x.ln()
}

pub fn log(args: &[Dual]) -> Dual {
    let [x, base] = expect_n::<2>(args);
    x.ln() / base.ln()
}

pub fn sin(args: &[Dual]) -> Dual {
    let [x] = expect_n::<1>(args);
    x.chain(Number::sin, Number::cos)
}

pub fn cos(args: &[Dual]) -> Dual {
    let [x] = expect_n::<1>(args);
    x.chain(Number::cos, |v| -v.sin())
}

pub fn tan(args: &[Dual]) -> Dual {
    let [x] = expect_n::<1>(args);
    x.chain(Number::tan, |v| 1.0 / (v.cos() * v.cos()))
}

pub fn cot(args: &[Dual]) -> Dual {
    let [x] = expect_n::<1>(args);
    x.chain(|v| 1.0 / v.tan(), |v| -1.0 / (v.sin() * v.sin()))
}

pub fn sec(args: &[Dual]) -> Dual {
    let [x] = expect_n::<1>(args);
    x.chain(|v| 1.0 / v.cos(), |v| v.tan() / v.cos())
}

pub fn csc(args: &[Dual]) -> Dual {
    let [x] = expect_n::<1>(args);
    x.chain(|v| 1.0 / v.sin(), |v| -1.0 / (v.sin() * v.tan()))
}

pub fn arcsin(args: &[Dual]) -> Dual {
    let [x] = expect_n::<1>(args);
    x.chain(Number::asin, |v| 1.0 / (1.0 - v * v).sqrt())
}

pub fn arccos(args: &[Dual]) -> Dual {
    let [x] = expect_n::<1>(args);
    x.chain(Number::acos, |v| -1.0 / (1.0 - v * v).sqrt())
}

pub fn arctan(args: &[Dual]) -> Dual {
    let [x] = expect_n::<1>(args);
    x.chain(Number::atan, |v| 1.0 / (1.0 + v * v))
}

pub fn sinh(args: &[Dual]) -> Dual {
    let [x] = expect_n::<1>(args);
    x.chain(Number::sinh, Number::cosh)
}

pub fn cosh(args: &[Dual]) -> Dual {
    let [x] = expect_n::<1>(args);
    x.chain(Number::cosh, Number::sinh)
}

pub fn tanh(args: &[Dual]) -> Dual {
    let [x] = expect_n::<1>(args);
    x.chain(Number::tanh, |v| 1.0 / (v.cosh() * v.cosh()))
}

pub fn coth(args: &[Dual]) -> Dual {
    let [x] = expect_n::<1>(args);
    x.chain(|v| 1.0 / v.tanh(), |v| -1.0 / (v.sinh() * v.sinh()))
}
