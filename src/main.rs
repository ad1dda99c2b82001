// SPDX: CC0-1.0

use adaptive_curves::{
    eval::{EvalErrTyp, Ident},
    function::CompileErr,
    lex::{LexErrTyp, SubStr, TokTyp},
    parse::ParseErrTyp,
    render_all,
    shell::{self, Command},
    stdlib,
    transform::{MAX_SCALE, MAX_UNIT, MIN_SCALE, MIN_UNIT},
    Color, Curve, Function, Number, Point, Rect, SamplerConfig, Transform,
};
use anyhow::Context;
use chrono::{DateTime, Local};
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};
#[cfg(not(debug_assertions))]
use std::process::Stdio;
use std::{
    fs::OpenOptions,
    io::{stdout, BufWriter, Write},
    process::{self, Child, ExitCode},
    sync::Arc,
};

const LOG_ENV: &str = "ADAPTIVE_CURVES_LOG";
const PALETTE: [Color; 3] = [Color::BLUE, Color::RED, Color::GREEN];
const DEFAULT_STROKE: Number = 2.0;

fn output_filename(now: DateTime<Local>, ext: &str) -> String {
    format!(
        "{}_output-{}.{ext}",
        env!("CARGO_PKG_NAME"),
        now.format("%Y-%m-%d_%H-%M-%S"),
    )
}

fn init_logger() {
    let level = std::env::var(LOG_ENV)
        .ok()
        .and_then(|s| s.parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::Warn);
    if TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )
    .is_err()
    {
        eprintln!("warning: logger was already initialized");
    }
}

fn main() -> ExitCode {
    init_logger();
    match try_main() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("unexpected error: {err}");
            let chain = err.chain();
            if chain.len() > 1 {
                eprintln!();
                eprintln!("context:");
                for it in chain.skip(1) {
                    eprintln!("  {it}");
                }
            }
            ExitCode::FAILURE
        }
    }
}

#[derive(Clone, Debug)]
struct View {
    offset: Point,
    scale: Number,
    unit: Number,
    width: Number,
    height: Number,
}

impl Default for View {
    fn default() -> Self {
        Self {
            offset: Point::new(400.0, 300.0),
            scale: 1.0,
            unit: 1.0,
            width: 800.0,
            height: 600.0,
        }
    }
}

impl View {
    fn rect(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }

    fn transform(&self) -> Transform {
        Transform::with_view(self.offset, self.scale, self.unit)
    }
}

#[derive(Debug)]
struct State {
    functions: Vec<Function>,
    view: View,
    config: SamplerConfig,
    gnuplot: Option<Child>,
}

impl State {
    fn find(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name() == name)
    }
}

fn try_main() -> anyhow::Result<()> {
    let mut state = State {
        functions: vec![Function::new("f", "1/x", Color::BLUE, DEFAULT_STROKE)
            .map_err(|err| anyhow::anyhow!("{err}"))
            .context("failed to compile default function")?],
        view: View::default(),
        config: SamplerConfig::default(),
        gnuplot: None,
    };

    let mut stdout = BufWriter::new(stdout());
    loop {
        match state.functions.len() {
            0 => writeln!(stdout, "no functions")?,
            1 => writeln!(stdout, "1 function")?,
            n => writeln!(stdout, "{n} functions")?,
        }

        let mut try_cmd = shell::input(&mut stdout, "> ")?;
        try_cmd.make_ascii_lowercase();
        writeln!(stdout)?;

        if let Ok(cmd) = try_cmd.parse::<Command>() {
            match cmd {
                Command::Help => {
                    for c in Command::exhaustive() {
                        writeln!(stdout, "{name}: {help}", name = c.name(), help = c.help())?;
                    }
                }

                Command::Quit => break,

                Command::Add => add_function(&mut stdout, &mut state)?,

                Command::Remove => remove_function(&mut stdout, &mut state)?,

                Command::List => {
                    if state.functions.is_empty() {
                        shell::no_functions(&mut stdout)?;
                    }
                    for function in &state.functions {
                        shell::describe(&mut stdout, function)?;
                    }
                }

                Command::PrintProg => {
                    let name = shell::input(&mut stdout, "function name = ")?;
                    if let Some(function) = state.find(&name) {
                        shell::dump_program(
                            &mut stdout,
                            function.program(),
                            format_args!("program of {name}"),
                        )?;
                    } else {
                        shell::function_undefined(&mut stdout, &name)?;
                    }
                }

                Command::Eval => eval_function(&mut stdout, &state)?,

                Command::View => set_view(&mut stdout, &mut state)?,

                Command::Tune => tune(&mut stdout, &mut state)?,

                Command::Plot => plot(&mut stdout, &mut state)?,
            }
        } else if let Some(similar) = Command::most_similar(&try_cmd) {
            writeln!(
                stdout,
                r#"Unknown command, did you mean "{}"? Try "help" for help"#,
                similar.name()
            )?;
        } else {
            writeln!(stdout, r#"Unknown command, try "help" for help"#)?;
        }

        writeln!(stdout)?;
    }
    stdout.flush()?;
    Ok(())
}

fn add_function<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    let default_name = format!("f{}", state.functions.len() + 1);
    let mut name = shell::input(&mut out, format_args!("name (default {default_name}) = "))?;
    if name.is_empty() {
        name = default_name;
    }

    let text = shell::input(&mut out, format_args!("{name}(x) = "))?;
    if text.is_empty() {
        return Ok(());
    }

    let default_color = PALETTE[state.functions.len() % PALETTE.len()];
    let color = match shell::read_fromstr::<_, Color>(
        &mut out,
        format_args!("?colour (default {default_color}) = "),
        true,
    )? {
        Ok(color) => color.unwrap_or(default_color),
        Err(_) => return Ok(()),
    };
    let stroke_width = match shell::read_fromstr::<_, Number>(
        &mut out,
        format_args!("?stroke width (default {DEFAULT_STROKE}) = "),
        true,
    )? {
        Ok(width) => width.unwrap_or(DEFAULT_STROKE),
        Err(_) => return Ok(()),
    };

    let text = Arc::new(text);
    match Function::new(name.as_str(), text.as_str(), color, stroke_width) {
        Ok(function) => {
            shell::describe(&mut out, &function)?;
            if let Some(old) = state.functions.iter_mut().find(|f| f.name() == name) {
                *old = function;
            } else {
                state.functions.push(function);
            }
        }
        Err(err) => report_compile_err(&mut out, &text, err)?,
    }
    Ok(())
}

fn remove_function<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    if state.functions.is_empty() {
        shell::no_functions(&mut out)?;
        return Ok(());
    }
    let name = shell::input(&mut out, "function name = ")?;
    let before = state.functions.len();
    state.functions.retain(|f| f.name() != name);
    if state.functions.len() == before {
        shell::function_undefined(&mut out, &name)?;
    }
    Ok(())
}

fn eval_function<W: Write>(mut out: W, state: &State) -> anyhow::Result<()> {
    let name = shell::input(&mut out, "function name = ")?;
    let Some(function) = state.find(&name) else {
        shell::function_undefined(&mut out, &name)?;
        return Ok(());
    };
    if let Ok(Some(x)) = shell::read_fromstr::<_, Number>(&mut out, "x = ", false)? {
        writeln!(out, "{name}({x}) = {}", function.value(x))?;
        writeln!(out, "{name}'({x}) = {}", function.derivative(x))?;
    }
    Ok(())
}

fn set_view<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    writeln!(out, "view = {:?}", state.view)?;
    writeln!(out)?;
    writeln!(out, "note: leave blank to skip")?;

    let view = &mut state.view;
    for (name, dst) in [
        ("pan x", &mut view.offset.x),
        ("pan y", &mut view.offset.y),
        ("zoom", &mut view.scale),
        ("unit per square", &mut view.unit),
        ("viewport width", &mut view.width),
        ("viewport height", &mut view.height),
    ] {
        match shell::read_fromstr::<_, Number>(
            &mut out,
            format_args!("?{name} (is {cur}) = ", cur = *dst),
            true,
        )? {
            Ok(Some(new)) => *dst = new,
            Ok(None) => {}
            Err(_) => return Ok(()),
        }
    }

    let (scale, unit) = (view.scale, view.unit);
    view.scale = scale.clamp(MIN_SCALE, MAX_SCALE);
    view.unit = unit.clamp(MIN_UNIT, MAX_UNIT);
    if view.scale != scale || view.unit != unit {
        writeln!(
            out,
            "note: zoom is kept in [{MIN_SCALE}, {MAX_SCALE}] and unit in [{MIN_UNIT}, {MAX_UNIT}]"
        )?;
    }
    Ok(())
}

fn tune<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    writeln!(out, "note: leave blank to skip")?;

    let config = &mut state.config;
    for (name, dst) in [
        ("guard band (px)", &mut config.guard_band),
        ("derivative jump", &mut config.derivative_jump),
        ("steep derivative", &mut config.steep_derivative),
        ("displacement fraction", &mut config.displacement_fraction),
        ("steep threshold", &mut config.steep_threshold),
        ("asymptote tolerance (px)", &mut config.asymptote_tolerance),
        ("max step (px)", &mut config.steps.0),
        ("min step (px)", &mut config.steps.1),
        ("hard max step (px)", &mut config.hard_steps.0),
        ("hard min step (px)", &mut config.hard_steps.1),
    ] {
        match shell::read_fromstr::<_, Number>(
            &mut out,
            format_args!("?{name} (is {cur}) = ", cur = *dst),
            true,
        )? {
            Ok(Some(new)) => *dst = new,
            Ok(None) => {}
            Err(_) => break,
        }
    }
    Ok(())
}

/// One `plot` clause per data block, in block order.
fn plot_clauses(data_path: &str, functions: &[Function], frames: &[Arc<[Curve]>]) -> Vec<String> {
    let mut clauses = Vec::new();
    for (function, curves) in functions.iter().zip(frames) {
        for (i, curve) in curves.iter().enumerate() {
            let title = if i == 0 {
                format!(
                    r#"title "{} = {}" noenhanced"#,
                    function.name(),
                    function.text()
                )
            } else {
                String::from("notitle")
            };
            clauses.push(format!(
                "'{data_path}' index {index} with lines lc rgb '{color}' lw {width} {title}",
                index = clauses.len(),
                color = curve.color,
                width = curve.stroke_width,
            ));
        }
    }
    clauses
}

fn plot<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    if state.functions.is_empty() {
        shell::no_functions(&mut out)?;
        return Ok(());
    }

    let rect = state.view.rect();
    let frames = render_all(
        &state.functions,
        rect,
        &state.view.transform(),
        &state.config,
    );
    for (function, curves) in state.functions.iter().zip(&frames) {
        writeln!(
            out,
            "{}: {} curve{}",
            function.name(),
            curves.len(),
            if curves.len() == 1 { "" } else { "s" }
        )?;
    }
    if frames.iter().all(|curves| curves.is_empty()) {
        writeln!(out, "note: nothing is visible in this view")?;
        return Ok(());
    }

    // set up gnuplot
    if let Some(mut old_child) = state.gnuplot.take() {
        old_child
            .kill()
            .context("failed to kill previous gnuplot child")?;
    }
    let now = Local::now();
    let data_path = output_filename(now, "data");
    let gnuplot_path = output_filename(now, "gnuplot");
    let svg_path = output_filename(now, "svg");
    let mut data = BufWriter::new(
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&data_path)
            .context("failed to open output data file")?,
    );
    let mut gnuplot = BufWriter::new(
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&gnuplot_path)
            .context("failed to open output gnuplot file")?,
    );

    let blocks = shell::write_plot_data(&mut data, frames.iter().flat_map(|c| c.iter()))
        .context("failed to write to output data file")?;
    data.flush()?;
    data.get_mut().sync_data()?;
    drop(data);

    writeln!(gnuplot, "reset")?;
    writeln!(gnuplot, "set term push")?;
    // set output info
    let (width, height) = (rect.width(), rect.height());
    writeln!(gnuplot, "set terminal svg size {width},{height} enhanced")?;
    writeln!(gnuplot, "set output '{svg_path}'")?;

    // data is in screen space, y grows downward
    writeln!(gnuplot, "set xrange[{}:{}]", rect.x0, rect.x1)?;
    writeln!(gnuplot, "set yrange[{}:{}]", rect.y1, rect.y0)?;
    writeln!(gnuplot, "set size ratio -1")?;
    writeln!(gnuplot, r#"set title "{data_path}""#)?;
    writeln!(gnuplot, "set title noenhanced")?;
    writeln!(gnuplot, "unset xtics")?;
    writeln!(gnuplot, "unset ytics")?;
    writeln!(gnuplot, "set key out vertical top right")?;

    let mut clauses = plot_clauses(&data_path, &state.functions, &frames);
    if blocks.open_ends > 0 {
        clauses.push(format!(
            "'{data_path}' index {} with points pt 6 ps 1.5 lc rgb 'black' notitle",
            blocks.curves
        ));
    }
    writeln!(gnuplot, "plot {}", clauses.join(", \\\n  "))?;

    // display window
    writeln!(gnuplot, "set term pop")?;
    writeln!(gnuplot, "replot")?;

    gnuplot.flush()?;
    gnuplot.get_mut().sync_data()?;
    drop(gnuplot);

    // spawn gnuplot and provide the path to the file
    let mut cmd = process::Command::new("gnuplot");
    cmd.arg("--persist").arg(&gnuplot_path);
    #[cfg(not(debug_assertions))]
    {
        cmd.stdout(Stdio::null())
            .stderr(Stdio::null())
            .stdin(Stdio::null());
    }
    let child = cmd
        .spawn()
        .context("failed to spawn gnuplot (is it installed and in ${{PATH}}?)")?;
    state.gnuplot = Some(child);

    Ok(())
}

fn report_compile_err<W: Write>(
    mut out: W,
    text: &Arc<String>,
    err: CompileErr,
) -> anyhow::Result<()> {
    writeln!(out)?;
    match err {
        CompileErr::Parse(err) => {
            shell::underline(&mut out, &err.loc)?;
            writeln!(out, "parse error: {}", err.typ)?;
            match err.typ {
                ParseErrTyp::LexErr(LexErrTyp::InvalidChar) => writeln!(
                    out,
                    "note: available tokens are numbers, alphabetic identifiers, and symbols +-*/^,()"
                )?,
                ParseErrTyp::LexErr(LexErrTyp::Unsupported(typ)) => match typ {
                    TokTyp::XGreater | TokTyp::XLess => {
                        writeln!(out, "note: expected an expression but found an inequality")?
                    }
                    TokTyp::XEqual => {
                        writeln!(out, "note: expected an expression but found an equation")?
                    }
                    TokTyp::XPipe => writeln!(
                        out,
                        "note: use the 'abs' function to compute absolute value"
                    )?,
                    _ => {}
                },
                ParseErrTyp::ParseNum(_) => {
                    writeln!(out, "note: parsing as floating point number")?
                }
                ParseErrTyp::ParenMismatch => {}
            }
        }

        CompileErr::Eval(err) => {
            let loc = err.op.as_ref().map(|op| op.loc.clone());
            shell::underline(
                &mut out,
                &loc.clone()
                    .unwrap_or_else(|| SubStr::new(Arc::clone(text), text.len(), 1)),
            )?;
            writeln!(out, "evaluation error: {err}")?;
            if loc.is_none() {
                writeln!(
                    out,
                    "note: exactly 1 final value is expected on the stack after evaluation"
                )?;
            }
            if let EvalErrTyp::UndefinedIdent { text } = &err.typ {
                similar_ident_note(&mut out, text.get())?;
            }
        }
    }
    Ok(())
}

fn similar_ident_note<W: Write>(mut out: W, text: &str) -> anyhow::Result<()> {
    let idents = stdlib::standard_idents();
    let text = text.to_ascii_lowercase();
    let most_similar = idents
        .iter()
        .map(|(k, v)| {
            (
                strsim::normalized_damerau_levenshtein(&text, &k.get().to_ascii_lowercase()),
                (k, v),
            )
        })
        .max_by(|a, b| a.0.total_cmp(&b.0));
    if let Some((sim, (key, ident))) = most_similar {
        if sim > 0.3 {
            let ident_typ = match ident {
                Ident::Var => "variable",
                Ident::Const(_) => "constant",
                Ident::Fun(_) => "function",
            };
            writeln!(out, "note: {ident_typ} '{key}' has a similar name")?;
        }
    }
    Ok(())
}
