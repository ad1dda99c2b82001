// SPDX: CC0-1.0

use crate::{eval::Program, lex::SubStr, Curve, Function, Point};
use anyhow::Context;
use core::fmt;
use std::{
    io::{self, stdin, BufRead, Write},
    sync::Arc,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Help,
    Quit,
    Add,
    Remove,
    List,
    PrintProg,
    Eval,
    View,
    Tune,
    Plot,
}

impl Command {
    pub const fn exhaustive() -> &'static [Command] {
        &[
            Self::Help,
            Self::Quit,
            Self::Add,
            Self::Remove,
            Self::List,
            Self::PrintProg,
            Self::Eval,
            Self::View,
            Self::Tune,
            Self::Plot,
        ]
    }

    pub const fn help(&self) -> &'static str {
        match self {
            Self::Help => "display help for each command",
            Self::Quit => "quit the shell",
            Self::Add => "add a function, or redefine one with the same name",
            Self::Remove => "remove a function",
            Self::List => "list functions and how they are sampled",
            Self::PrintProg => "print program compiled from a function (for debugging)",
            Self::Eval => "print a function's value and derivative at some x",
            Self::View => "set pan, zoom, unit per grid square and viewport size",
            Self::Tune => "set sampler thresholds",
            Self::Plot => "sample every function and plot the curves",
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Help => "help",
            Self::Quit => "quit",
            Self::Add => "add",
            Self::Remove => "remove",
            Self::List => "list",
            Self::PrintProg => "prog",
            Self::Eval => "eval",
            Self::View => "view",
            Self::Tune => "tune",
            Self::Plot => "plot",
        }
    }

    /// Command whose name is closest to `s`, if any is reasonably close.
    pub fn most_similar(s: &str) -> Option<Self> {
        Self::exhaustive()
            .iter()
            .map(|c| (strsim::normalized_damerau_levenshtein(s, c.name()), *c))
            .filter(|(sim, _)| *sim > 0.3)
            .max_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, c)| c)
    }
}

impl core::str::FromStr for Command {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::exhaustive()
            .iter()
            .find(|c| c.name() == s)
            .copied()
            .ok_or(())
    }
}

pub fn input<W: Write>(out: W, prompt: impl fmt::Display) -> anyhow::Result<String> {
    fn inner<W: Write>(mut out: W, prompt: impl fmt::Display) -> io::Result<String> {
        write!(out, "{prompt}")?;
        out.flush()?;
        let mut stdin = stdin().lock();
        let mut s = String::new();
        stdin.read_line(&mut s)?;
        Ok(s.trim().to_string())
    }

    let s = inner(out, prompt).context("read from standard input failed")?;
    Ok(s)
}

pub fn read_fromstr<W: Write, T: core::str::FromStr>(
    mut out: W,
    prompt: impl fmt::Display,
    ignore_empty: bool,
) -> anyhow::Result<Result<Option<T>, <T as core::str::FromStr>::Err>>
where
    <T as core::str::FromStr>::Err: fmt::Display,
{
    let input = Arc::new(input(&mut out, prompt)?);
    if ignore_empty && input.is_empty() {
        return Ok(Ok(None));
    }
    match input.parse::<T>() {
        Ok(new) => Ok(Ok(Some(new))),
        Err(err) => {
            writeln!(out)?;
            underline(&mut out, &SubStr::all(input))?;
            writeln!(out, "parse error: {err}")?;
            Ok(Err(err))
        }
    }
}

pub fn underline<W: Write>(mut out: W, span: &SubStr) -> io::Result<()> {
    writeln!(out, "{}", span.src())?;
    writeln!(
        out,
        "{}{}",
        " ".repeat(span.start()),
        "^".repeat(span.len().max(1))
    )?;
    Ok(())
}

pub fn dump_program<W: Write>(
    mut out: W,
    prog: &Program,
    title: core::fmt::Arguments,
) -> io::Result<()> {
    writeln!(out, "{title}: ")?;
    if prog.is_empty() {
        writeln!(out, "  (empty)")?;
    }
    for op in prog.ops() {
        writeln!(out, "  {op}")?;
    }
    Ok(())
}

pub fn describe<W: Write>(mut out: W, function: &Function) -> io::Result<()> {
    writeln!(
        out,
        "{name} = {text}  ({strategy:?}{hard}, {color}, width {width})",
        name = function.name(),
        text = function.text(),
        strategy = function.strategy(),
        hard = if function.is_hard_to_evaluate() {
            ", hard"
        } else {
            ""
        },
        color = function.color(),
        width = function.stroke_width(),
    )
}

pub fn no_functions<W: Write>(mut out: W) -> io::Result<()> {
    writeln!(out, "error: no functions are defined")
}

pub fn function_undefined<W: Write>(mut out: W, name: &str) -> io::Result<()> {
    writeln!(out, "error: no function is named '{name}'")
}

/// Counts of what [`write_plot_data`] emitted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DataBlocks {
    /// Blocks `0..curves` hold one curve each.
    pub curves: usize,
    /// Points in the trailing open-endpoint block, if nonzero.
    pub open_ends: usize,
}

/// Write one gnuplot data block per curve, then one block holding every
/// endpoint that was cut by a discontinuity.
pub fn write_plot_data<'a, W: Write>(
    mut out: W,
    curves: impl IntoIterator<Item = &'a Curve>,
) -> io::Result<DataBlocks> {
    let mut blocks = DataBlocks::default();
    let mut open: Vec<Point> = Vec::new();
    for curve in curves {
        for p in &curve.points {
            writeln!(out, "{} {}", p.x, p.y)?;
        }
        // gnuplot separates indexed blocks by two blank lines
        writeln!(out)?;
        writeln!(out)?;
        blocks.curves += 1;

        if curve.open_start {
            open.extend(curve.points.first());
        }
        if curve.open_end {
            open.extend(curve.points.last());
        }
    }
    for p in &open {
        writeln!(out, "{} {}", p.x, p.y)?;
    }
    blocks.open_ends = open.len();
    Ok(blocks)
}
