// SPDX: CC0-1.0

use crate::{dual::Dual, lex::SubStr, stdlib, Number};
use core::fmt;
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperatorTyp {
    Neg,
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Associativity {
    Left,
    Right,
}

impl OperatorTyp {
    pub const fn precedence(&self) -> i8 {
        match self {
            Self::Add => 2,
            Self::Sub => 2,
            Self::Mul => 3,
            Self::Div => 3,
            Self::Neg => 4,
            Self::Pow => 5,
        }
    }

    pub const fn associativity(&self) -> Associativity {
        use Associativity::{Left, Right};
        match self {
            Self::Neg => Right,
            Self::Add => Left,
            Self::Sub => Left,
            Self::Mul => Left,
            Self::Div => Left,
            Self::Pow => Right,
        }
    }

    /// Prefix operators have no left operand to reduce.
    pub const fn is_prefix(&self) -> bool {
        matches!(self, Self::Neg)
    }

    pub const fn fun(&self) -> (&'static str, Fun) {
        match self {
            Self::Neg => ("neg", Fun::new(1, stdlib::neg)),
            Self::Add => ("add", Fun::new(2, stdlib::add)),
            Self::Sub => ("sub", Fun::new(2, stdlib::sub)),
            Self::Mul => ("mul", Fun::new(2, stdlib::mul)),
            Self::Div => ("div", Fun::new(2, stdlib::div)),
            Self::Pow => ("pow", Fun::new(2, stdlib::pow)),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub enum OperationTyp {
    Operator(OperatorTyp),
    Val(Number),
    Ident,
}

#[derive(Clone, Debug)]
pub struct Operation {
    pub typ: OperationTyp,
    pub loc: SubStr,
}

impl Operation {
    /// Number of stack values this operation pops.
    fn consumes(&self, idents: &Idents) -> usize {
        match self.typ {
            OperationTyp::Operator(typ) => typ.fun().1.arity,
            OperationTyp::Val(_) => 0,
            OperationTyp::Ident => match idents.get(&self.loc.clone().into()) {
                Some(Ident::Fun(fun)) => fun.arity,
                _ => 0,
            },
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.typ {
            OperationTyp::Val(val) => write!(f, "push {val}"),
            OperationTyp::Operator(typ) => write!(f, "call '{}'", typ.fun().0),
            OperationTyp::Ident => write!(f, "call '{}'", self.loc.get()),
        }
    }
}

#[derive(Debug)]
pub enum EvalErrTyp {
    Empty,
    MissingArgs {
        name: IdentKey,
        arity: usize,
        found: usize,
    },
    StackMismatch {
        expected: usize,
        found: usize,
    },
    UndefinedIdent {
        text: SubStr,
    },
}

#[derive(Debug)]
pub struct EvalErr {
    pub typ: EvalErrTyp,
    pub op: Option<Operation>, // if none, associated with end-of-program checking
}

impl fmt::Display for EvalErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.typ {
            EvalErrTyp::Empty => write!(f, "cannot evaluate empty program"),

            EvalErrTyp::MissingArgs { name, arity, found } => write!(
                f,
                "function '{name}' requires {arity} argument{s}, but found {found}",
                name = name.get(),
                s = if *arity == 1 { "" } else { "s" }
            ),

            EvalErrTyp::StackMismatch { expected, found } => write!(
                f,
                "expected {expected} value{s} on the stack but found {found}",
                s = if *expected == 1 { "" } else { "s" }
            ),

            EvalErrTyp::UndefinedIdent { text } => {
                write!(f, "undefined identifier '{}'", text.get())
            }
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Fun {
    pub arity: usize,
    pub fun: fn(&[Dual]) -> Dual,
}

impl Fun {
    pub const fn new(arity: usize, fun: fn(&[Dual]) -> Dual) -> Self {
        Self { arity, fun }
    }
}

#[derive(Clone, Copy, Debug)]
pub enum Ident {
    /// The free variable, bound per evaluation.
    Var,
    Const(Number),
    Fun(Fun),
}

#[derive(Clone, Debug, Eq)]
pub enum IdentKey {
    Arc(SubStr),
    Static(&'static str),
}

impl PartialEq for IdentKey {
    fn eq(&self, other: &Self) -> bool {
        self.get() == other.get()
    }
}

impl core::hash::Hash for IdentKey {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        self.get().hash(state)
    }
}

impl IdentKey {
    pub fn get(&self) -> &str {
        match self {
            Self::Arc(s) => s.get(),
            Self::Static(s) => s,
        }
    }
}

impl fmt::Display for IdentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.get())
    }
}

impl From<SubStr> for IdentKey {
    fn from(s: SubStr) -> Self {
        Self::Arc(s)
    }
}

impl From<&'static str> for IdentKey {
    fn from(s: &'static str) -> Self {
        Self::Static(s)
    }
}

pub type Idents = HashMap<IdentKey, Ident>;

/// Postfix program produced by the parser.
#[derive(Clone, Debug)]
pub struct Program {
    pub(crate) ops: Vec<Operation>,
}

impl Program {
    #[inline]
    pub const fn new(ops: Vec<Operation>) -> Self {
        Self { ops }
    }

    #[inline]
    pub fn ops(&self) -> core::slice::Iter<'_, Operation> {
        self.ops.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// If the outermost operation is a division, split into
    /// `(numerator, denominator)` sub-programs.
    pub fn split_quotient(&self, idents: &Idents) -> Option<(Program, Program)> {
        let (last, body) = self.ops.split_last()?;
        if !matches!(last.typ, OperationTyp::Operator(OperatorTyp::Div)) {
            return None;
        }
        // walk back until the right operand is complete
        let mut need: usize = 1;
        for (idx, op) in body.iter().enumerate().rev() {
            need = (need - 1) + op.consumes(idents);
            if need == 0 {
                let (num, den) = body.split_at(idx);
                if num.is_empty() {
                    return None;
                }
                return Some((Program::new(num.to_vec()), Program::new(den.to_vec())));
            }
        }
        None
    }
}

pub fn eval(
    prog: &Program,
    idents: &Idents,
    x: Number,
    stack: &mut Vec<Dual>,
) -> Result<Dual, EvalErr> {
    fn eval_fun(
        stack: &mut Vec<Dual>,
        op: &Operation,
        name: impl Into<IdentKey>,
        fun: &Fun,
    ) -> Result<Dual, EvalErr> {
        let len = stack.len();
        if len < fun.arity {
            return Err(EvalErr {
                typ: EvalErrTyp::MissingArgs {
                    arity: fun.arity,
                    found: len,
                    name: name.into(),
                },
                op: Some(op.clone()),
            });
        }
        // stack: ...a, b, c, d
        //              ^^^^ args if arity is 2
        let at = len - fun.arity;
        let val = (fun.fun)(&stack[at..]);
        stack.truncate(at);
        Ok(val)
    }

    if prog.is_empty() {
        return Err(EvalErr {
            typ: EvalErrTyp::Empty,
            op: None,
        });
    }

    stack.clear();

    for op in prog.ops() {
        let val = match op.typ {
            OperationTyp::Operator(typ) => {
                let (name, fun) = typ.fun();
                eval_fun(stack, op, name, &fun)?
            }

            OperationTyp::Val(num) => Dual::constant(num),

            OperationTyp::Ident => {
                let sym = op.loc.clone();
                match idents.get(&sym.clone().into()) {
                    Some(Ident::Var) => Dual::var(x),
                    Some(Ident::Const(val)) => Dual::constant(*val),
                    Some(Ident::Fun(fun)) => eval_fun(stack, op, sym, fun)?,
                    None => {
                        return Err(EvalErr {
                            typ: EvalErrTyp::UndefinedIdent { text: sym },
                            op: Some(op.clone()),
                        });
                    }
                }
            }
        };
        stack.push(val);
    }

    match stack.as_slice() {
        [val] => Ok(*val),
        _ => Err(EvalErr {
            typ: EvalErrTyp::StackMismatch {
                expected: 1,
                found: stack.len(),
            },
            op: None,
        }),
    }
}
