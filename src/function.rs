// SPDX: CC0-1.0

use crate::{
    asymptote::{self, LocatorConfig},
    cache::{CurveCache, CurveKey, EvalCache, Evaluator, Sample, HARD_CAPACITY, NORMAL_CAPACITY},
    eval::{self, EvalErr, Idents, Program},
    lex::Lexer,
    parse::{self, ParseErr},
    sample::{self, Curve, SamplerConfig, Strategy},
    stdlib,
    transform::Transform,
    Color, Number, Rect,
};
use core::fmt;
use regex::Regex;
use std::sync::{Arc, LazyLock};

/// Probe points for the linearity check.
const LINEAR_PROBES: [Number; 2] = [0.0, 1.0];
const LINEAR_TOLERANCE: Number = 1e-6;

/// Names whose presence makes an expression expensive to sample.
const HARD_NAMES: [&str; 10] = [
    "sin(", "cos(", "tan(", "cot(", "sec(", "csc(", "sinh(", "cosh(", "tanh(", "coth(",
];
const HARD_DEGREE: Number = 4.0;

/// `x^n` or `x^(n`, capturing the exponent.
static POWER: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"x\^\(?(\d+(?:\.\d+)?)").ok());

#[derive(Debug)]
pub enum CompileErr {
    Parse(ParseErr),
    Eval(EvalErr),
}

impl fmt::Display for CompileErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "parse error: {}", err.typ),
            Self::Eval(err) => write!(f, "evaluation error: {err}"),
        }
    }
}

impl From<ParseErr> for CompileErr {
    fn from(err: ParseErr) -> Self {
        Self::Parse(err)
    }
}

impl From<EvalErr> for CompileErr {
    fn from(err: EvalErr) -> Self {
        Self::Eval(err)
    }
}

/// Program plus the identifier table it was compiled against.
#[derive(Debug)]
struct Compiled {
    prog: Program,
    denominator: Option<Program>,
    idents: Idents,
}

impl Compiled {
    fn new(text: &Arc<String>) -> Result<Self, CompileErr> {
        let idents = stdlib::standard_idents();
        let prog = parse::parse(Lexer::new(text), &idents)?;
        // structural errors do not depend on x, so one trial run finds them
        eval::eval(&prog, &idents, 0.0, &mut Vec::new())?;
        let denominator = prog.split_quotient(&idents).map(|(_, den)| den);
        Ok(Self {
            prog,
            denominator,
            idents,
        })
    }
}

impl Evaluator for Compiled {
    fn sample(&self, x: Number) -> Sample {
        let mut stack = Vec::with_capacity(self.prog.len());
        match eval::eval(&self.prog, &self.idents, x, &mut stack) {
            Ok(d) => Sample { y: d.val, dy: d.eps },
            Err(_) => Sample::NAN,
        }
    }
}

/// Lower-cased text without whitespace, as matched by the text heuristics.
pub(crate) fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

pub fn is_hard_to_evaluate(text: &str) -> bool {
    let s = normalize(text);
    let trig = HARD_NAMES.iter().any(|name| s.contains(name));
    let hyperbola = s.contains("/x");
    let high_degree = POWER.as_ref().is_some_and(|re| {
        re.captures_iter(&s).any(|cap| {
            cap[1]
                .parse::<Number>()
                .is_ok_and(|degree| degree >= HARD_DEGREE)
        })
    });
    trig || hyperbola || high_degree
}

pub fn is_linear(eval: &impl Evaluator) -> bool {
    let [a, b] = LINEAR_PROBES.map(|x| eval.sample(x).dy);
    a.is_finite() && b.is_finite() && (a - b).abs() < LINEAR_TOLERANCE
}

/// A plotted expression of `x` with its caches and fixed sampling strategy.
#[derive(Debug)]
pub struct Function {
    name: String,
    text: Arc<String>,
    color: Color,
    stroke_width: Number,
    compiled: Compiled,
    hard_to_evaluate: bool,
    linear: bool,
    strategy: Strategy,
    samples: EvalCache,
    curves: CurveCache,
}

impl Function {
    pub fn new(
        name: impl Into<String>,
        text: impl Into<String>,
        color: Color,
        stroke_width: Number,
    ) -> Result<Self, CompileErr> {
        let text = Arc::new(text.into());
        let compiled = Compiled::new(&text)?;
        let hard_to_evaluate = is_hard_to_evaluate(&text);
        let linear = is_linear(&compiled);
        let strategy = Strategy::select(&text, linear);
        let capacity = if hard_to_evaluate {
            HARD_CAPACITY
        } else {
            NORMAL_CAPACITY
        };
        let name = name.into();
        log::debug!(
            "compiled {name} = {text}: hard {hard_to_evaluate}, linear {linear}, {strategy:?}"
        );
        Ok(Self {
            name,
            text,
            color,
            stroke_width,
            compiled,
            hard_to_evaluate,
            linear,
            strategy,
            samples: EvalCache::new(capacity),
            curves: CurveCache::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> &Arc<String> {
        &self.text
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn stroke_width(&self) -> Number {
        self.stroke_width
    }

    pub fn program(&self) -> &Program {
        &self.compiled.prog
    }

    pub fn is_hard_to_evaluate(&self) -> bool {
        self.hard_to_evaluate
    }

    pub fn is_linear(&self) -> bool {
        self.linear
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn sample_cache(&self) -> &EvalCache {
        &self.samples
    }

    /// `(f(x), f'(x))` through the sample cache; never fails, NaN on error.
    pub fn evaluate(&self, x: Number) -> Sample {
        self.samples.get_or_eval(x, &self.compiled)
    }

    /// Uncached `f(x)`.
    pub fn value(&self, x: Number) -> Number {
        self.compiled.sample(x).y
    }

    /// Uncached `f'(x)`.
    pub fn derivative(&self, x: Number) -> Number {
        self.compiled.sample(x).dy
    }

    pub fn asymptotes(&self, min: Number, max: Number, config: &LocatorConfig) -> Vec<Number> {
        let compiled = &self.compiled;
        let denominator = compiled.denominator.as_ref().map(|den| {
            move |x: Number| {
                eval::eval(den, &compiled.idents, x, &mut Vec::new()).map(|d| d.val)
            }
        });
        asymptote::locate(&self.text, denominator, min, max, config)
    }

    /// Curves for this view, reusing the previous pass when neither the
    /// viewport, the view state nor the sampler settings changed.
    pub fn curves(&self, rect: Rect, transform: &Transform, config: &SamplerConfig) -> Arc<[Curve]> {
        let key = CurveKey {
            rect,
            transform: transform.snapshot(),
            config: *config,
        };
        if let Some(hit) = self.curves.get(&key) {
            return hit;
        }
        let curves: Arc<[Curve]> = sample::sample(self, rect, transform, config).into();
        self.curves.set(key, Arc::clone(&curves));
        curves
    }

    pub fn clear_caches(&self) {
        self.samples.clear();
        self.curves.clear();
    }
}
