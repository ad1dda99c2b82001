// SPDX: CC0-1.0

// implementation of shunting yard algorithm by dijkstra (see https://en.wikipedia.org/wiki/Shunting_yard_algorithm)

use crate::{
    eval::{Associativity, Ident, Idents, Operation, OperationTyp, OperatorTyp, Program},
    lex::{LexErr, LexErrTyp, Lexer, SubStr, Tok, TokTyp},
    Number,
};
use core::{fmt, num::ParseFloatError};

#[derive(Debug)]
pub enum ParseErrTyp {
    LexErr(LexErrTyp),
    ParseNum(ParseFloatError),
    ParenMismatch,
}

impl fmt::Display for ParseErrTyp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LexErr(err) => write!(f, "{err}"),
            Self::ParseNum(err) => write!(f, "invalid number: {err}"),
            Self::ParenMismatch => write!(f, "mismatched parentheses"),
        }
    }
}

#[derive(Debug)]
pub struct ParseErr {
    pub typ: ParseErrTyp,
    pub loc: SubStr,
}

impl From<LexErr> for ParseErr {
    fn from(err: LexErr) -> Self {
        Self {
            typ: ParseErrTyp::LexErr(err.typ),
            loc: err.loc,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ShuntOpTyp {
    Operator(OperatorTyp),
    Ident,
    OpenParen,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct ShuntOp {
    typ: ShuntOpTyp,
    loc: SubStr,
}

impl ShuntOp {
    fn precedence(&self) -> i8 {
        match self.typ {
            ShuntOpTyp::Operator(op) => op.precedence(),
            // function application without parentheses binds tightest
            ShuntOpTyp::Ident => i8::MAX,
            ShuntOpTyp::OpenParen => i8::MIN,
        }
    }

    fn into_output(self) -> Operation {
        let typ = match self.typ {
            ShuntOpTyp::Operator(typ) => OperationTyp::Operator(typ),
            ShuntOpTyp::Ident | ShuntOpTyp::OpenParen => OperationTyp::Ident,
        };
        Operation { typ, loc: self.loc }
    }
}

/// What the previous token left the parser expecting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Prev {
    Value,
    Fun,
    Operator,
    Open,
    Comma,
}

impl Prev {
    fn of(tok: &Tok, idents: &Idents) -> Self {
        match tok.typ {
            TokTyp::Number | TokTyp::CloseParen => Self::Value,
            TokTyp::Ident => match idents.get(&tok.loc.clone().into()) {
                Some(Ident::Fun(_)) => Self::Fun,
                _ => Self::Value,
            },
            TokTyp::Op(_) => Self::Operator,
            TokTyp::OpenParen => Self::Open,
            _ => Self::Comma,
        }
    }

    fn expects_operand(prev: Option<Self>) -> bool {
        matches!(
            prev,
            None | Some(Self::Operator | Self::Open | Self::Comma | Self::Fun)
        )
    }
}

/// `2x`, `2(x)`, `(x)(x)`, `x sin(x)`: a value followed by something that
/// starts a new operand.
fn implies_mul(prev: Option<Prev>, tok: &Tok) -> bool {
    matches!(prev, Some(Prev::Value))
        && matches!(
            tok.typ,
            TokTyp::Number | TokTyp::Ident | TokTyp::OpenParen
        )
}

fn push_operator(out: &mut Vec<Operation>, ops: &mut Vec<ShuntOp>, o1: OperatorTyp, loc: SubStr) {
    if !o1.is_prefix() {
        while let Some(o2) = ops.last() {
            if (o2.typ != ShuntOpTyp::OpenParen)
                && ((o2.precedence() > o1.precedence())
                    || ((o1.precedence() == o2.precedence())
                        && (o1.associativity() == Associativity::Left)))
            {
                if let Some(o2) = ops.pop() {
                    out.push(o2.into_output());
                }
            } else {
                break;
            }
        }
    }
    ops.push(ShuntOp {
        typ: ShuntOpTyp::Operator(o1),
        loc,
    });
}

fn pop_until_open(out: &mut Vec<Operation>, ops: &mut Vec<ShuntOp>) {
    while ops
        .last()
        .is_some_and(|op| op.typ != ShuntOpTyp::OpenParen)
    {
        if let Some(op) = ops.pop() {
            out.push(op.into_output());
        }
    }
}

pub fn parse(lex: Lexer<'_>, idents: &Idents) -> Result<Program, ParseErr> {
    let mut out: Vec<Operation> = Vec::new(); // output
    let mut ops: Vec<ShuntOp> = Vec::new(); // operator stack
    let mut prev: Option<Prev> = None;

    for tok in lex {
        let tok = tok?;

        if implies_mul(prev, &tok) {
            let loc = SubStr::new(tok.loc.src(), tok.loc.start(), 0);
            push_operator(&mut out, &mut ops, OperatorTyp::Mul, loc);
        }

        match tok.typ {
            TokTyp::Number => {
                let num: Number = tok.loc.get().parse().map_err(|err| ParseErr {
                    typ: ParseErrTyp::ParseNum(err),
                    loc: tok.loc.clone(),
                })?;
                out.push(Operation {
                    typ: OperationTyp::Val(num),
                    loc: tok.loc.clone(),
                });
            }

            TokTyp::Ident => {
                if let Some(Ident::Fun(_)) = idents.get(&tok.loc.clone().into()) {
                    ops.push(ShuntOp {
                        typ: ShuntOpTyp::Ident,
                        loc: tok.loc.clone(),
                    });
                } else {
                    // unknown identifiers are reported by the evaluator
                    out.push(Operation {
                        typ: OperationTyp::Ident,
                        loc: tok.loc.clone(),
                    });
                }
            }

            TokTyp::Op(o1) => {
                let unary = Prev::expects_operand(prev);
                match o1 {
                    OperatorTyp::Sub if unary => {
                        push_operator(&mut out, &mut ops, OperatorTyp::Neg, tok.loc.clone());
                    }
                    // unary plus is a no-op
                    OperatorTyp::Add if unary => {}
                    _ => push_operator(&mut out, &mut ops, o1, tok.loc.clone()),
                }
            }

            TokTyp::Comma => pop_until_open(&mut out, &mut ops),

            TokTyp::OpenParen => {
                ops.push(ShuntOp {
                    typ: ShuntOpTyp::OpenParen,
                    loc: tok.loc.clone(),
                });
            }

            TokTyp::CloseParen => {
                pop_until_open(&mut out, &mut ops);

                if ops.pop().is_none() {
                    return Err(ParseErr {
                        typ: ParseErrTyp::ParenMismatch,
                        loc: tok.loc,
                    });
                }

                // handle functions
                if ops.last().is_some_and(|op| op.typ == ShuntOpTyp::Ident) {
                    if let Some(op) = ops.pop() {
                        out.push(op.into_output());
                    }
                }
            }

            TokTyp::XGreater
            | TokTyp::XLess
            | TokTyp::XEqual
            | TokTyp::XPipe
            | TokTyp::XOpenSquareBracket
            | TokTyp::XCloseSquareBracket
            | TokTyp::XOpenCurly
            | TokTyp::XCloseCurly => {
                return Err(ParseErr {
                    typ: ParseErrTyp::LexErr(LexErrTyp::Unsupported(tok.typ)),
                    loc: tok.loc,
                })
            }
        }

        prev = Some(Prev::of(&tok, idents));
    }

    while let Some(op) = ops.pop() {
        if op.typ == ShuntOpTyp::OpenParen {
            return Err(ParseErr {
                typ: ParseErrTyp::ParenMismatch,
                loc: op.loc,
            });
        }
        out.push(op.into_output());
    }

    Ok(Program::new(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stdlib::standard_idents;
    use std::sync::Arc;

    fn postfix(src: &str) -> Result<String, ParseErrTyp> {
        let idents = standard_idents();
        let src = Arc::new(src.to_string());
        let prog = parse(Lexer::new(&src), &idents).map_err(|err| err.typ)?;
        Ok(prog
            .ops()
            .map(|op| match op.typ {
                OperationTyp::Val(val) => val.to_string(),
                OperationTyp::Operator(typ) => typ.fun().0.to_string(),
                OperationTyp::Ident => op.loc.get().to_string(),
            })
            .collect::<Vec<_>>()
            .join(" "))
    }

    #[test]
    fn precedence_and_associativity() {
        assert_eq!(postfix("1 + 2 * 3").unwrap(), "1 2 3 mul add");
        assert_eq!(postfix("2^3^2").unwrap(), "2 3 2 pow pow");
        assert_eq!(postfix("x - 1 - 2").unwrap(), "x 1 sub 2 sub");
    }

    #[test]
    fn minus_is_contextual() {
        assert_eq!(postfix("x-1").unwrap(), "x 1 sub");
        assert_eq!(postfix("-x^2").unwrap(), "x 2 pow neg");
        assert_eq!(postfix("2^-x").unwrap(), "2 x neg pow");
        assert_eq!(postfix("(-x)").unwrap(), "x neg");
        assert_eq!(postfix("+x").unwrap(), "x");
    }

    #[test]
    fn implicit_multiplication() {
        assert_eq!(postfix("2x+1").unwrap(), "2 x mul 1 add");
        assert_eq!(postfix("2(x+1)").unwrap(), "2 x 1 add mul");
        assert_eq!(postfix("(x)(x)").unwrap(), "x x mul");
        assert_eq!(postfix("2sin(x)").unwrap(), "2 x sin mul");
        assert_eq!(postfix("3x^2").unwrap(), "3 x 2 pow mul");
    }

    #[test]
    fn functions() {
        assert_eq!(postfix("sin(x)").unwrap(), "x sin");
        assert_eq!(postfix("log(x, 2)").unwrap(), "x 2 log");
        assert_eq!(postfix("sin x + 1").unwrap(), "x sin 1 add");
    }

    #[test]
    fn mismatched_parens() {
        assert!(matches!(postfix("(x"), Err(ParseErrTyp::ParenMismatch)));
        assert!(matches!(postfix("x)"), Err(ParseErrTyp::ParenMismatch)));
    }

    #[test]
    fn bad_number() {
        assert!(matches!(postfix("1.2.3"), Err(ParseErrTyp::ParseNum(_))));
    }
}
