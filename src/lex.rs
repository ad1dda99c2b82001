// SPDX: CC0-1.0

use crate::eval::OperatorTyp;
use core::{fmt, iter::Peekable, str::CharIndices};
use std::sync::Arc;

/// Span into a shared expression source, used to point at errors.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubStr {
    src: Arc<String>,
    start: usize,
    len: usize,
}

impl SubStr {
    #[inline]
    pub const fn new(src: Arc<String>, start: usize, len: usize) -> Self {
        Self { src, start, len }
    }

    #[inline]
    pub fn all(src: Arc<String>) -> Self {
        let len = src.len();
        Self::new(src, 0, len)
    }

    pub fn src(&self) -> Arc<String> {
        Arc::clone(&self.src)
    }

    pub const fn start(&self) -> usize {
        self.start
    }

    pub const fn len(&self) -> usize {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self) -> &str {
        &self.src[self.start..self.start + self.len]
    }

    fn grow(&mut self, by: usize) {
        self.len += by;
    }
}

impl fmt::Display for SubStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.get())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokTyp {
    Ident,
    Number,
    /// `-` is lexed as subtraction; the parser decides whether it negates.
    Op(OperatorTyp),
    Comma,
    OpenParen,
    CloseParen,

    // unsupported tokens
    XGreater,
    XLess,
    XEqual,
    XPipe,
    XOpenSquareBracket,
    XCloseSquareBracket,
    XOpenCurly,
    XCloseCurly,
}

impl TokTyp {
    pub const fn is_unsupported(&self) -> bool {
        match self {
            Self::Ident
            | Self::Number
            | Self::Op(_)
            | Self::Comma
            | Self::OpenParen
            | Self::CloseParen => false,

            Self::XGreater
            | Self::XLess
            | Self::XEqual
            | Self::XPipe
            | Self::XOpenSquareBracket
            | Self::XCloseSquareBracket
            | Self::XOpenCurly
            | Self::XCloseCurly => true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Tok {
    pub typ: TokTyp,
    pub loc: SubStr,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LexErrTyp {
    InvalidChar,
    Unsupported(TokTyp),
}

impl fmt::Display for LexErrTyp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidChar => write!(f, "invalid character"),
            Self::Unsupported(_) => write!(f, "unsupported character"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LexErr {
    pub typ: LexErrTyp,
    pub loc: SubStr,
}

#[derive(Debug)]
pub struct Lexer<'src> {
    src: &'src Arc<String>,
    cur: Peekable<CharIndices<'src>>,
    has_errored: bool, // tells iter to yield None after error
}

impl<'src> Lexer<'src> {
    pub fn new(src: &'src Arc<String>) -> Self {
        Self {
            src,
            cur: src.char_indices().peekable(),
            has_errored: false,
        }
    }

    fn trim_whitespace(&mut self) {
        while self
            .cur
            .next_if(|(_, chr)| chr.is_ascii_whitespace())
            .is_some()
        {}
    }

    const fn single(chr: char) -> Option<TokTyp> {
        let typ = match chr {
            '+' => TokTyp::Op(OperatorTyp::Add),
            '-' => TokTyp::Op(OperatorTyp::Sub),
            '*' => TokTyp::Op(OperatorTyp::Mul),
            '/' => TokTyp::Op(OperatorTyp::Div),
            '^' => TokTyp::Op(OperatorTyp::Pow),
            ',' => TokTyp::Comma,
            '(' => TokTyp::OpenParen,
            ')' => TokTyp::CloseParen,

            '>' => TokTyp::XGreater,
            '<' => TokTyp::XLess,
            '=' => TokTyp::XEqual,
            '|' => TokTyp::XPipe,
            '[' => TokTyp::XOpenSquareBracket,
            ']' => TokTyp::XCloseSquareBracket,
            '{' => TokTyp::XOpenCurly,
            '}' => TokTyp::XCloseCurly,
            _ => return None,
        };
        Some(typ)
    }

    /// Consume the longest run of characters matching `predicate`.
    fn consume_by<P>(&mut self, start: usize, typ: TokTyp, predicate: P) -> Option<Tok>
    where
        P: Fn(char) -> bool,
    {
        let mut loc = SubStr::new(Arc::clone(self.src), start, 0);
        while let Some((_, chr)) = self.cur.next_if(|(_, chr)| predicate(*chr)) {
            loc.grow(chr.len_utf8());
        }
        if loc.is_empty() {
            None
        } else {
            Some(Tok { typ, loc })
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Tok, LexErr>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.has_errored {
            return None;
        }

        self.trim_whitespace();

        let (idx, chr) = self.cur.peek().copied()?;
        let tok = if let Some(typ) = Self::single(chr) {
            self.cur.next();
            Tok {
                typ,
                loc: SubStr::new(Arc::clone(self.src), idx, chr.len_utf8()),
            }
        } else if let Some(tok) =
            self.consume_by(idx, TokTyp::Ident, |chr| chr.is_ascii_alphabetic())
        {
            tok
        } else if let Some(tok) = self.consume_by(idx, TokTyp::Number, |chr| {
            chr.is_ascii_digit() || chr == '.'
        }) {
            tok
        } else {
            self.has_errored = true;
            return Some(Err(LexErr {
                typ: LexErrTyp::InvalidChar,
                loc: SubStr::new(Arc::clone(self.src), idx, chr.len_utf8()),
            }));
        };

        if tok.typ.is_unsupported() {
            self.has_errored = true;
            return Some(Err(LexErr {
                typ: LexErrTyp::Unsupported(tok.typ),
                loc: tok.loc,
            }));
        }
        Some(Ok(tok))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(src: &str) -> Vec<Result<(TokTyp, String), LexErrTyp>> {
        let src = Arc::new(src.to_string());
        Lexer::new(&src)
            .map(|tok| {
                tok.map(|tok| (tok.typ, tok.loc.get().to_string()))
                    .map_err(|err| err.typ)
            })
            .collect()
    }

    #[test]
    fn numbers_idents_and_ops() {
        let toks = lex("2.5x - sin(x)");
        let typs: Vec<_> = toks.into_iter().map(|t| t.unwrap()).collect();
        assert_eq!(
            typs,
            vec![
                (TokTyp::Number, "2.5".into()),
                (TokTyp::Ident, "x".into()),
                (TokTyp::Op(OperatorTyp::Sub), "-".into()),
                (TokTyp::Ident, "sin".into()),
                (TokTyp::OpenParen, "(".into()),
                (TokTyp::Ident, "x".into()),
                (TokTyp::CloseParen, ")".into()),
            ]
        );
    }

    #[test]
    fn unsupported_token_stops_lexing() {
        let toks = lex("x = 1");
        assert_eq!(toks.len(), 2);
        assert_eq!(toks[1], Err(LexErrTyp::Unsupported(TokTyp::XEqual)));
    }

    #[test]
    fn invalid_char_has_span() {
        let src = Arc::new("x # 2".to_string());
        let err = Lexer::new(&src).find_map(Result::err).unwrap();
        assert_eq!(err.typ, LexErrTyp::InvalidChar);
        assert_eq!(err.loc.start(), 2);
    }
}
