//! Praat scripts: source preparation, forms, and statement execution.
//!
//! A script is prepared once ([`Script::parse`] or [`Script::load`]):
//! `include` lines are expanded, continuation lines joined, comments
//! dropped and the `form` block taken apart. Control structures are then
//! linked into jump targets, so running a script is a walk over a flat
//! list of lines with a program counter.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use rand::rngs::StdRng;
use regex::{Captures, Regex};

use super::expr::{self, BinOp, Expr, Scope, Val, Variables};
use super::lexer::unquote;
use crate::commands::{dispatch, Payload};
use crate::diagnostics::{Melder, WarningPolicy};
use crate::error::{praat_bail, Error, Result};
use crate::objects::Environment;
use crate::value::{format_number, parse_number, Value};

const MAX_INCLUDE_DEPTH: usize = 16;

// ========== Forms ==========

/// The kind of a form field, which decides how its argument is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Real,
    Positive,
    Integer,
    Natural,
    Boolean,
    Word,
    Sentence,
    Text,
    Choice,
}

impl FieldKind {
    fn from_keyword(keyword: &str) -> Option<Self> {
        Some(match keyword {
            "real" => FieldKind::Real,
            "positive" => FieldKind::Positive,
            "integer" => FieldKind::Integer,
            "natural" => FieldKind::Natural,
            "boolean" => FieldKind::Boolean,
            "word" => FieldKind::Word,
            "sentence" => FieldKind::Sentence,
            "text" | "infile" | "outfile" | "folder" | "infolder" | "outfolder" => FieldKind::Text,
            "choice" | "optionmenu" => FieldKind::Choice,
            _ => return None,
        })
    }

    fn is_numeric(self) -> bool {
        matches!(
            self,
            FieldKind::Real | FieldKind::Positive | FieldKind::Integer | FieldKind::Natural
        )
    }
}

/// One field of a script's `form`.
#[derive(Debug, Clone, PartialEq)]
pub struct FormField {
    pub kind: FieldKind,
    /// Label as shown in a dialog.
    pub label: String,
    /// Variable the argument is stored in, without suffix.
    pub variable: String,
    /// Default value, as written in the form.
    pub default: String,
    /// Options of a choice field, in order.
    pub options: Vec<String>,
}

impl FormField {
    /// Store `value` into `vars` under this field's variable(s).
    fn assign(&self, value: &Value, vars: &mut Variables) -> Result<()> {
        match self.kind {
            kind if kind.is_numeric() => {
                let x = match value {
                    Value::Number(x) => *x,
                    Value::Boolean(b) => f64::from(u8::from(*b)),
                    Value::String(s) => {
                        let x = parse_number(s);
                        if x.is_nan() && s.trim() != "--undefined--" {
                            praat_bail!("Argument \"{}\" should be a number, not \"{}\".", self.label, s);
                        }
                        x
                    }
                    other => praat_bail!("Argument \"{}\" should be a number, not {}.", self.label, other.describe()),
                };
                self.check_number(x)?;
                vars.insert(self.variable.clone(), Val::Num(x));
            }
            FieldKind::Boolean => {
                let yes = match value {
                    Value::Boolean(b) => *b,
                    Value::Number(x) => *x != 0.0,
                    Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                        "yes" | "on" | "true" | "1" => true,
                        "no" | "off" | "false" | "0" => false,
                        _ => praat_bail!("Argument \"{}\" should be yes or no, not \"{}\".", self.label, s),
                    },
                    other => praat_bail!("Argument \"{}\" should be a boolean, not {}.", self.label, other.describe()),
                };
                vars.insert(self.variable.clone(), Val::Num(f64::from(u8::from(yes))));
            }
            FieldKind::Choice => {
                let index = match value {
                    Value::Number(x) if x.fract() == 0.0 && *x >= 1.0 && *x <= self.options.len() as f64 => *x as usize,
                    Value::String(s) => match self.options.iter().position(|o| o == s) {
                        Some(i) => i + 1,
                        None => praat_bail!("Argument \"{}\" cannot have the value \"{}\".", self.label, s),
                    },
                    other => praat_bail!("Argument \"{}\" cannot have the value {}.", self.label, other.describe()),
                };
                vars.insert(self.variable.clone(), Val::Num(index as f64));
                vars.insert(format!("{}$", self.variable), Val::Str(self.options[index - 1].clone()));
            }
            _ => {
                let text = match value {
                    Value::String(s) => s.clone(),
                    other => praat_bail!("Argument \"{}\" should be a string, not {}.", self.label, other.describe()),
                };
                if self.kind == FieldKind::Word && text.contains(char::is_whitespace) {
                    praat_bail!("Argument \"{}\" should be a single word.", self.label);
                }
                vars.insert(format!("{}$", self.variable), Val::Str(text));
            }
        }
        Ok(())
    }

    fn check_number(&self, x: f64) -> Result<()> {
        let whole = x.fract() == 0.0;
        match self.kind {
            FieldKind::Positive if !(x > 0.0) => praat_bail!("Argument \"{}\" must be greater than 0.", self.label),
            FieldKind::Integer if !whole => praat_bail!("Argument \"{}\" should be a whole number.", self.label),
            FieldKind::Natural if !whole || x < 1.0 => {
                praat_bail!("Argument \"{}\" should be a positive whole number.", self.label)
            }
            _ => Ok(()),
        }
    }

    /// The default as a host value.
    fn default_value(&self) -> Value {
        match self.kind {
            kind if kind.is_numeric() => Value::Number(parse_number(&self.default)),
            FieldKind::Choice => {
                let index = parse_number(&self.default);
                if index.is_nan() {
                    Value::String(self.default.clone())
                } else {
                    Value::Number(index)
                }
            }
            _ => Value::String(self.default.clone()),
        }
    }
}

/// `"Minimum pitch (Hz)"` becomes `minimum_pitch`.
fn variable_from_label(label: &str) -> String {
    let cut = label.find(" (").or_else(|| label.find(':')).unwrap_or(label.len());
    let name: String = label[..cut]
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
    lowercase_first(name.trim_end_matches('_'))
}

fn lowercase_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn parse_field(text: &str, fields: &mut Vec<FormField>) -> Result<()> {
    let (head, rest) = split_word(text);
    let (keyword, modern) = match head.strip_suffix(':') {
        Some(keyword) => (keyword, true),
        None => (head, false),
    };
    let arguments: Vec<String> = if modern {
        split_arguments(rest).iter().map(|a| literal(a)).collect()
    } else {
        Vec::new()
    };

    match keyword {
        "comment" => return Ok(()),
        "option" | "button" => {
            let option = if modern {
                arguments.into_iter().next().unwrap_or_default()
            } else {
                rest.trim().to_string()
            };
            match fields.last_mut() {
                Some(field) if field.kind == FieldKind::Choice => field.options.push(option),
                _ => praat_bail!("Option « {} » outside of a choice field.", option),
            }
            return Ok(());
        }
        _ => {}
    }

    let Some(kind) = FieldKind::from_keyword(keyword) else {
        praat_bail!("Unknown field type « {} » in form.", keyword);
    };
    let (label, variable, default) = if modern {
        let label = arguments.first().cloned().unwrap_or_default();
        let default = arguments.get(1).cloned().unwrap_or_default();
        (label.clone(), variable_from_label(&label), default)
    } else {
        let (name, default) = split_word(rest);
        (name.replace('_', " "), lowercase_first(name), literal(default))
    };
    if variable.is_empty() {
        praat_bail!("Missing field name in form line « {} ».", text);
    }
    fields.push(FormField {
        kind,
        label,
        variable,
        default,
        options: Vec::new(),
    });
    Ok(())
}

/// A form default or modern-syntax argument, quotes removed.
fn literal(text: &str) -> String {
    let text = text.trim();
    if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
        unquote(text)
    } else {
        text.to_string()
    }
}

// ========== Source preparation ==========

#[derive(Debug, Clone)]
struct Line {
    /// 1-based, counted after include expansion.
    number: usize,
    text: String,
}

fn expand_includes(text: &str, dir: Option<&Path>, depth: usize, out: &mut Vec<String>) -> Result<()> {
    for raw in text.lines() {
        let trimmed = raw.trim_start();
        let Some(target) = strip_keyword(trimmed, "include") else {
            out.push(raw.trim_end_matches('\r').to_string());
            continue;
        };
        if depth >= MAX_INCLUDE_DEPTH {
            praat_bail!("Include files nested too deeply.");
        }
        let target = target.trim();
        let path: PathBuf = match dir {
            Some(dir) if Path::new(target).is_relative() => dir.join(target),
            _ => PathBuf::from(target),
        };
        let included = std::fs::read_to_string(&path)
            .map_err(|_| Error::praat(format!("Include file “{}” not found.", path.display())))?;
        log::debug!("including {}", path.display());
        expand_includes(&included, path.parent(), depth + 1, out)?;
    }
    Ok(())
}

fn join_continuations(physical: Vec<String>) -> Vec<Line> {
    let mut lines: Vec<Line> = Vec::new();
    for (i, raw) in physical.into_iter().enumerate() {
        let text = raw.trim();
        if let Some(tail) = text.strip_prefix("...") {
            if let Some(previous) = lines.last_mut() {
                previous.text.push_str(tail);
                continue;
            }
        }
        lines.push(Line {
            number: i + 1,
            text: text.to_string(),
        });
    }
    lines.retain(|line| !(line.text.is_empty() || line.text.starts_with(['#', ';', '!'])));
    lines
}

fn extract_form(lines: Vec<Line>) -> Result<(Option<Vec<FormField>>, Vec<Line>)> {
    let Some(start) = lines.iter().position(|l| matches!(split_word(&l.text).0, "form" | "form:")) else {
        return Ok((None, lines));
    };
    let Some(length) = lines[start..].iter().position(|l| l.text == "endform") else {
        praat_bail!("Missing endform.");
    };
    let mut fields = Vec::new();
    for line in &lines[start + 1..start + length] {
        parse_field(&line.text, &mut fields).map_err(|e| e.context(format!("Form line {}.", line.number)))?;
    }
    if let Some(field) = fields.iter().find(|f| f.kind == FieldKind::Choice && f.options.is_empty()) {
        praat_bail!("Choice field \"{}\" has no options.", field.label);
    }
    let mut rest = lines;
    rest.drain(start..=start + length);
    Ok((Some(fields), rest))
}

// ========== Control flow ==========

#[derive(Debug, Clone)]
enum Op {
    If { cond: String, next: usize },
    Elsif { cond: String, next: usize, end: usize },
    Else { end: usize },
    Endif,
    For { var: String, from: String, to: String, end: usize },
    Endfor { start: usize },
    While { cond: String, end: usize },
    Endwhile { start: usize },
    Repeat,
    Until { cond: String, start: usize },
    Simple,
}

enum Block {
    If(Vec<usize>),
    For(usize),
    While(usize),
    Repeat(usize),
}

impl Block {
    fn closer(&self) -> &'static str {
        match self {
            Block::If(_) => "endif",
            Block::For(_) => "endfor",
            Block::While(_) => "endwhile",
            Block::Repeat(_) => "until",
        }
    }
}

fn unmatched(word: &str) -> Error {
    Error::praat(format!("Unmatched '{}'.", word))
}

fn parse_for(rest: &str) -> Result<(String, String, String)> {
    let (var, bounds) = split_word(rest);
    if var.is_empty() {
        praat_bail!("Missing loop variable after 'for'.");
    }
    let (from, to) = match strip_keyword(bounds, "from") {
        Some(tail) => match find_word(tail, "to") {
            Some(at) => (tail[..at].trim().to_string(), tail[at + 2..].trim().to_string()),
            None => praat_bail!("Missing 'to' in 'for' loop."),
        },
        None => match strip_keyword(bounds, "to") {
            Some(to) => ("1".to_string(), to.trim().to_string()),
            None => praat_bail!("Missing 'to' in 'for' loop."),
        },
    };
    Ok((var.to_string(), from, to))
}

fn compile(lines: &[Line]) -> Result<Vec<Op>> {
    let mut ops: Vec<Op> = Vec::with_capacity(lines.len());
    let mut open: Vec<Block> = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        let at = |e: Error| e.context(format!("Script line {}: « {} »", line.number, line.text));
        let (word, rest) = split_word(&line.text);
        let op = match word {
            "if" => {
                open.push(Block::If(vec![i]));
                Op::If { cond: rest.to_string(), next: 0 }
            }
            "elsif" | "elif" | "else" => {
                let Some(Block::If(members)) = open.last_mut() else {
                    return Err(at(unmatched(word)));
                };
                let last = *members.last().unwrap_or(&i);
                if matches!(ops[last], Op::Else { .. }) {
                    return Err(at(unmatched(word)));
                }
                link_next(&mut ops[last], i);
                members.push(i);
                if word == "else" {
                    Op::Else { end: 0 }
                } else {
                    Op::Elsif { cond: rest.to_string(), next: 0, end: 0 }
                }
            }
            "endif" | "fi" => {
                let Some(Block::If(members)) = open.pop() else {
                    return Err(at(unmatched(word)));
                };
                for &m in &members {
                    match &mut ops[m] {
                        Op::Elsif { end, .. } | Op::Else { end } => *end = i,
                        _ => {}
                    }
                }
                if let Some(&last) = members.last() {
                    link_next(&mut ops[last], i);
                }
                Op::Endif
            }
            "for" => {
                let (var, from, to) = parse_for(rest).map_err(at)?;
                open.push(Block::For(i));
                Op::For { var, from, to, end: 0 }
            }
            "endfor" => {
                let Some(Block::For(start)) = open.pop() else {
                    return Err(at(unmatched(word)));
                };
                if let Op::For { end, .. } = &mut ops[start] {
                    *end = i;
                }
                Op::Endfor { start }
            }
            "while" => {
                open.push(Block::While(i));
                Op::While { cond: rest.to_string(), end: 0 }
            }
            "endwhile" => {
                let Some(Block::While(start)) = open.pop() else {
                    return Err(at(unmatched(word)));
                };
                if let Op::While { end, .. } = &mut ops[start] {
                    *end = i;
                }
                Op::Endwhile { start }
            }
            "repeat" => {
                open.push(Block::Repeat(i));
                Op::Repeat
            }
            "until" => {
                let Some(Block::Repeat(start)) = open.pop() else {
                    return Err(at(unmatched(word)));
                };
                Op::Until { cond: rest.to_string(), start }
            }
            _ => Op::Simple,
        };
        ops.push(op);
    }
    if let Some(block) = open.last() {
        praat_bail!("Missing {}.", block.closer());
    }
    Ok(ops)
}

fn link_next(op: &mut Op, target: usize) {
    if let Op::If { next, .. } | Op::Elsif { next, .. } = op {
        *next = target;
    }
}

// ========== Scripts ==========

/// A prepared script, ready to run any number of times.
#[derive(Debug, Clone)]
pub struct Script {
    lines: Vec<Line>,
    ops: Vec<Op>,
    form: Option<Vec<FormField>>,
}

impl Script {
    /// Prepare script source; `include` paths are taken relative to the
    /// working directory.
    pub fn parse(text: &str) -> Result<Self> {
        Self::prepare(text, None)
    }

    /// Read and prepare a script file; `include` paths are taken relative
    /// to the file's own directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|_| Error::praat(format!("Cannot open file “{}”.", path.display())))?;
        Self::prepare(&text, path.parent())
    }

    fn prepare(text: &str, dir: Option<&Path>) -> Result<Self> {
        let mut physical = Vec::new();
        expand_includes(text, dir, 0, &mut physical)?;
        let (form, lines) = extract_form(join_continuations(physical))?;
        let ops = compile(&lines)?;
        Ok(Self { lines, ops, form })
    }

    /// The form fields, empty if the script has no form.
    pub fn form(&self) -> &[FormField] {
        self.form.as_deref().unwrap_or(&[])
    }

    /// Run the script on `env`.
    ///
    /// `args` fill the form fields in order. With `use_defaults`, an empty
    /// argument list means "take every default". Returns the variables as
    /// they were when the script ended.
    pub fn run(
        &self,
        env: &mut Environment,
        melder: &mut Melder,
        rng: &mut StdRng,
        args: &[Value],
        use_defaults: bool,
    ) -> Result<Variables> {
        let result = self.bind(args, use_defaults).and_then(|vars| {
            let mut machine = Machine {
                env,
                melder,
                rng,
                vars,
                loops: Vec::new(),
            };
            machine.run(self)?;
            Ok(machine.vars)
        });
        result.map_err(|e| e.context("Script not completed."))
    }

    fn bind(&self, args: &[Value], use_defaults: bool) -> Result<Variables> {
        let form = self.form();
        if args.len() > form.len() {
            praat_bail!("Found {} arguments but expected only {}.", args.len(), form.len());
        }
        if args.len() < form.len() && !(args.is_empty() && use_defaults) {
            praat_bail!("Found {} arguments but expected more.", args.len());
        }
        let mut vars = Variables::new();
        for (i, field) in form.iter().enumerate() {
            match args.get(i) {
                Some(value) => field.assign(value, &mut vars)?,
                None => field.assign(&field.default_value(), &mut vars)?,
            }
        }
        Ok(vars)
    }
}

// ========== Execution ==========

enum Flow {
    Next,
    Exit,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Suffix {
    Number,
    String,
    Vector,
    Matrix,
    StringVector,
}

impl Suffix {
    fn of(name: &str) -> Self {
        if name.ends_with("$#") {
            Suffix::StringVector
        } else if name.ends_with('$') {
            Suffix::String
        } else if name.ends_with("##") {
            Suffix::Matrix
        } else if name.ends_with('#') {
            Suffix::Vector
        } else {
            Suffix::Number
        }
    }

    fn accepts(self, value: &Val) -> bool {
        matches!(
            (self, value),
            (Suffix::Number, Val::Num(_))
                | (Suffix::String, Val::Str(_))
                | (Suffix::Vector, Val::Vec(_))
                | (Suffix::Matrix, Val::Mat(_))
                | (Suffix::StringVector, Val::StrVec(_))
        )
    }
}

static ASSIGNMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([a-z_][A-Za-z0-9_.]*(?:\$#|\$|##|#)?)\s*(?:\[(.*)\])?\s*([-+*/]?=)\s*(.*)$")
        .expect("valid assignment pattern")
});

static SUBSTITUTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"'([a-z_][A-Za-z0-9_.]*\$?)(?::([0-9]+))?'").expect("valid substitution pattern")
});

/// What expressions inside a running script can see.
struct ScriptScope<'s> {
    vars: &'s Variables,
    env: &'s Environment,
    rng: &'s mut StdRng,
}

impl Scope for ScriptScope<'_> {
    fn variable(&self, name: &str) -> Option<Val> {
        self.vars.get(name).cloned()
    }

    fn environment(&self) -> Option<&Environment> {
        Some(self.env)
    }

    fn rng(&mut self) -> &mut StdRng {
        &mut *self.rng
    }
}

struct Machine<'a> {
    env: &'a mut Environment,
    melder: &'a mut Melder,
    rng: &'a mut StdRng,
    vars: Variables,
    /// Open `for` loops: line index of the `for`, and the upper bound.
    loops: Vec<(usize, f64)>,
}

impl Machine<'_> {
    fn run(&mut self, script: &Script) -> Result<()> {
        let mut pc = 0;
        while pc < script.ops.len() {
            let line = &script.lines[pc];
            log::debug!("script line {}: {}", line.number, line.text);
            match self.step(script, pc) {
                Ok(Some(next)) => pc = next,
                Ok(None) => break,
                Err(e) => {
                    return Err(e.context(format!(
                        "Script line {} not performed or completed:\n« {} »",
                        line.number, line.text
                    )))
                }
            }
        }
        Ok(())
    }

    /// Execute line `pc`; returns the next line, or `None` to stop.
    fn step(&mut self, script: &Script, pc: usize) -> Result<Option<usize>> {
        let next = match &script.ops[pc] {
            Op::If { cond, next } => {
                if self.condition(cond)? {
                    pc + 1
                } else {
                    self.branch(&script.ops, *next)?
                }
            }
            Op::Elsif { end, .. } | Op::Else { end } => end + 1,
            Op::Endif | Op::Repeat => pc + 1,
            Op::For { var, from, to, end } => {
                let from = self.number(from)?;
                let to = self.number(to)?;
                self.vars.insert(var.clone(), Val::Num(from));
                if from > to {
                    end + 1
                } else {
                    self.loops.push((pc, to));
                    pc + 1
                }
            }
            Op::Endfor { start } => {
                let Some(&(open, to)) = self.loops.last() else {
                    praat_bail!("Unmatched 'endfor'.");
                };
                let Op::For { var, .. } = &script.ops[open] else {
                    praat_bail!("Unmatched 'endfor'.");
                };
                let counter = match self.vars.get(var) {
                    Some(Val::Num(x)) => x + 1.0,
                    _ => praat_bail!("Loop variable « {} » is no longer a number.", var),
                };
                self.vars.insert(var.clone(), Val::Num(counter));
                if counter <= to {
                    start + 1
                } else {
                    self.loops.pop();
                    pc + 1
                }
            }
            Op::While { cond, end } => {
                if self.condition(cond)? {
                    pc + 1
                } else {
                    end + 1
                }
            }
            Op::Endwhile { start } => *start,
            Op::Until { cond, start } => {
                if self.condition(cond)? {
                    pc + 1
                } else {
                    start + 1
                }
            }
            Op::Simple => match self.statement(&script.lines[pc].text)? {
                Flow::Next => pc + 1,
                Flow::Exit => return Ok(None),
            },
        };
        Ok(Some(next))
    }

    /// Find the branch to take after a failed `if` or `elsif`, starting at `at`.
    fn branch(&mut self, ops: &[Op], mut at: usize) -> Result<usize> {
        loop {
            match &ops[at] {
                Op::Elsif { cond, next, .. } => {
                    if self.condition(cond)? {
                        return Ok(at + 1);
                    }
                    at = *next;
                }
                _ => return Ok(at + 1),
            }
        }
    }

    // ---------- expressions ----------

    fn evaluate(&mut self, expr: &Expr) -> Result<Val> {
        let mut scope = ScriptScope {
            vars: &self.vars,
            env: &*self.env,
            rng: &mut *self.rng,
        };
        expr::evaluate(expr, &mut scope)
    }

    fn eval(&mut self, text: &str) -> Result<Val> {
        let text = self.substitute(text);
        self.evaluate(&expr::parse(&text)?)
    }

    fn number(&mut self, text: &str) -> Result<f64> {
        match self.eval(text)? {
            Val::Num(x) => Ok(x),
            other => praat_bail!("A number was expected, not {}.", other.kind_name()),
        }
    }

    fn condition(&mut self, text: &str) -> Result<bool> {
        Ok(self.number(text)? != 0.0)
    }

    /// Replace `'name'` and `'name:decimals'` by the value of a known variable.
    fn substitute(&self, text: &str) -> String {
        if !text.contains('\'') {
            return text.to_string();
        }
        SUBSTITUTION
            .replace_all(text, |caps: &Captures<'_>| {
                let decimals = caps.get(2).and_then(|d| d.as_str().parse::<usize>().ok());
                match (self.vars.get(&caps[1]), decimals) {
                    (Some(Val::Num(x)), Some(decimals)) => format!("{:.*}", decimals, x),
                    (Some(Val::Num(x)), None) => format_number(*x),
                    (Some(Val::Str(s)), _) => s.clone(),
                    _ => caps[0].to_string(),
                }
            })
            .into_owned()
    }

    fn arguments(&mut self, text: &str) -> Result<Vec<Val>> {
        split_arguments(text).iter().map(|a| self.eval(a)).collect()
    }

    // ---------- statements ----------

    fn statement(&mut self, raw: &str) -> Result<Flow> {
        let text = self.substitute(raw);
        self.execute(text.trim())
    }

    fn execute(&mut self, text: &str) -> Result<Flow> {
        if let Some(rest) = strip_keyword(text, "nocheck") {
            return match self.execute(rest) {
                Err(Error::Praat(message)) | Err(Error::Warning(message)) => {
                    log::debug!("nocheck ignored: {}", message);
                    Ok(Flow::Next)
                }
                other => other,
            };
        }
        if let Some(rest) = strip_keyword(text, "nowarn") {
            let policy = self.melder.policy();
            self.melder.set_policy(WarningPolicy::Ignore);
            let result = self.execute(rest);
            self.melder.set_policy(policy);
            return result;
        }
        if let Some(rest) = strip_keyword(text, "noprogress") {
            return self.execute(rest);
        }

        let compact: String = text.split_whitespace().collect();
        if matches!(compact.as_str(), "exitScript" | "exitScript()" | "exit") {
            return Ok(Flow::Exit);
        }
        let (word, rest) = split_word(text);
        match word {
            "clearinfo" => {
                self.melder.clear_info();
                return Ok(Flow::Next);
            }
            "assert" => {
                if !self.condition(rest)? {
                    praat_bail!("Script assertion fails (false):\n   {}", rest);
                }
                return Ok(Flow::Next);
            }
            "procedure" | "endproc" | "call" => praat_bail!("Procedures are not supported."),
            _ if word.starts_with('@') => praat_bail!("Procedures are not supported."),
            _ => {}
        }

        if let Some(caps) = ASSIGNMENT.captures(text) {
            let target = caps.get(1).map_or("", |m| m.as_str());
            let index = caps.get(2).map(|m| m.as_str());
            let op = caps.get(3).map_or("=", |m| m.as_str());
            let rhs = caps.get(4).map_or("", |m| m.as_str());
            if !rhs.starts_with('=') {
                self.assign(target, index, op, rhs)?;
                return Ok(Flow::Next);
            }
        }

        if text.starts_with(|c: char| c.is_ascii_uppercase()) {
            let (name, args) = self.command_parts(text)?;
            dispatch(&mut *self.env, &mut *self.melder, &mut *self.rng, Some(&self.vars), &name, &args, false)?;
            return Ok(Flow::Next);
        }

        if let Some((name, rest)) = colon_call(text) {
            return self.directive(name, rest);
        }
        if expr::is_call(text) {
            self.eval(text)?;
            return Ok(Flow::Next);
        }
        praat_bail!("Unknown statement « {} ».", text)
    }

    fn directive(&mut self, name: &str, rest: &str) -> Result<Flow> {
        match name {
            "writeInfo" | "writeInfoLine" | "appendInfo" | "appendInfoLine" => {
                let mut text = String::new();
                for value in self.arguments(rest)? {
                    text.push_str(&value.to_string());
                }
                if name.ends_with("Line") {
                    text.push('\n');
                }
                if name.starts_with("write") {
                    self.melder.write_info(&text);
                } else {
                    self.melder.append_info(&text);
                }
            }
            "selectObject" => {
                let ids = self.object_ids(rest)?;
                self.env.deselect_all();
                for id in ids {
                    self.env.plus(id)?;
                }
            }
            "plusObject" => {
                for id in self.object_ids(rest)? {
                    self.env.plus(id)?;
                }
            }
            "minusObject" => {
                for id in self.object_ids(rest)? {
                    self.env.minus(id)?;
                }
            }
            "removeObject" => {
                for id in self.object_ids(rest)? {
                    self.env.remove(id)?;
                }
            }
            "exitScript" | "exit" => {
                let mut message = String::new();
                for value in self.arguments(rest)? {
                    message.push_str(&value.to_string());
                }
                return Err(Error::praat(message));
            }
            _ => {
                let args = self.arguments(rest)?;
                let mut scope = ScriptScope {
                    vars: &self.vars,
                    env: &*self.env,
                    rng: &mut *self.rng,
                };
                expr::call(name, args, &mut scope)?;
            }
        }
        Ok(Flow::Next)
    }

    /// Objects named by id, full name, or a vector of ids.
    fn object_ids(&mut self, rest: &str) -> Result<Vec<usize>> {
        let mut ids = Vec::new();
        for value in self.arguments(rest)? {
            match value {
                Val::Num(x) => ids.push(object_id(x)?),
                Val::Str(name) => ids.push(self.env.find_by_full_name(&name)?),
                Val::Vec(v) => {
                    for &x in v.iter() {
                        ids.push(object_id(x)?);
                    }
                }
                other => praat_bail!("An object number or name was expected, not {}.", other.kind_name()),
            }
        }
        Ok(ids)
    }

    /// Split `Name: arg, arg` into the command name and its evaluated arguments.
    fn command_parts(&mut self, text: &str) -> Result<(String, Vec<Value>)> {
        match text.find(':') {
            Some(colon) => {
                let args = self.arguments(&text[colon + 1..])?;
                Ok((
                    text[..colon].trim().to_string(),
                    args.into_iter().map(Val::into_value).collect(),
                ))
            }
            None => Ok((text.trim().to_string(), Vec::new())),
        }
    }

    /// Run a command whose result is assigned to `target`.
    fn command_value(&mut self, target: &str, text: &str) -> Result<Val> {
        let (name, args) = self.command_parts(text)?;
        let reply = dispatch(&mut *self.env, &mut *self.melder, &mut *self.rng, Some(&self.vars), &name, &args, true)?;
        Ok(match (Suffix::of(target), reply.payload) {
            (Suffix::String, _) => {
                let info = reply.info.strip_suffix('\n').unwrap_or(&reply.info);
                Val::Str(info.to_string())
            }
            (Suffix::Vector, Payload::Vector(v)) => Val::Vec(v),
            (Suffix::Matrix, Payload::Matrix(m)) => Val::Mat(m),
            (Suffix::StringVector, Payload::StringVector(s)) => Val::StrVec(s),
            (Suffix::Number, _) => match reply.created.first() {
                Some(&id) => Val::Num(id as f64),
                None => Val::Num(parse_number(&reply.info)),
            },
            _ => praat_bail!("Command \"{}\" does not return a value of the type of « {} ».", name, target),
        })
    }

    fn assign(&mut self, target: &str, index: Option<&str>, op: &str, rhs: &str) -> Result<()> {
        let rhs = rhs.trim();
        let value = if rhs.starts_with(|c: char| c.is_ascii_uppercase()) {
            if op != "=" || index.is_some() {
                praat_bail!("A command result can only be assigned with a plain '='.");
            }
            self.command_value(target, rhs)?
        } else {
            let rhs = expr::parse(rhs)?;
            let expr = match op {
                "=" => rhs,
                _ => {
                    let op = match op {
                        "+=" => BinOp::Add,
                        "-=" => BinOp::Sub,
                        "*=" => BinOp::Mul,
                        _ => BinOp::Div,
                    };
                    let current = match index {
                        Some(index) => Expr::Index(target.to_string(), self.index_exprs(index)?),
                        None => Expr::Variable(target.to_string()),
                    };
                    Expr::Binary(op, Box::new(current), Box::new(rhs))
                }
            };
            self.evaluate(&expr)?
        };

        match index {
            None => {
                if !Suffix::of(target).accepts(&value) {
                    praat_bail!(
                        "The value for « {} » should match its name, not be {}.",
                        target,
                        value.kind_name()
                    );
                }
                self.vars.insert(target.to_string(), value);
            }
            Some(index) => self.assign_element(target, index, value)?,
        }
        Ok(())
    }

    fn index_exprs(&self, index: &str) -> Result<Vec<Expr>> {
        split_arguments(index).iter().map(|i| expr::parse(i)).collect()
    }

    fn assign_element(&mut self, target: &str, index: &str, value: Val) -> Result<()> {
        let mut positions = Vec::new();
        for expr in self.index_exprs(index)? {
            match self.evaluate(&expr)? {
                Val::Num(x) => positions.push(x),
                other => praat_bail!("An index should be a number, not {}.", other.kind_name()),
            }
        }
        let Some(slot) = self.vars.get_mut(target) else {
            praat_bail!("Unknown variable « {} ».", target);
        };
        match (slot, positions.as_slice(), value) {
            (Val::Vec(v), [i], Val::Num(x)) => {
                let i = position(*i, v.len())?;
                v[i] = x;
            }
            (Val::Mat(m), [r, c], Val::Num(x)) => {
                let (r, c) = (position(*r, m.nrows())?, position(*c, m.ncols())?);
                m[[r, c]] = x;
            }
            (Val::StrVec(v), [i], Val::Str(s)) => {
                let i = position(*i, v.len())?;
                v[i] = s;
            }
            (slot, _, value) => praat_bail!(
                "Cannot put {} into {} with {} indices.",
                value.kind_name(),
                slot.kind_name(),
                positions.len()
            ),
        }
        Ok(())
    }
}

fn position(index: f64, size: usize) -> Result<usize> {
    if index.fract() != 0.0 || index < 1.0 || index > size as f64 {
        praat_bail!("Index {} out of range 1..{}.", format_number(index), size);
    }
    Ok(index as usize - 1)
}

fn object_id(x: f64) -> Result<usize> {
    if x.fract() != 0.0 || x < 1.0 {
        praat_bail!("Object number {} is not valid.", format_number(x));
    }
    Ok(x as usize)
}

// ========== Text helpers ==========

/// First whitespace-delimited word, and the trimmed rest.
fn split_word(text: &str) -> (&str, &str) {
    match text.find(char::is_whitespace) {
        Some(i) => (&text[..i], text[i..].trim_start()),
        None => (text, ""),
    }
}

/// The rest of `text` after `keyword`, if `text` starts with it as a word.
fn strip_keyword<'t>(text: &'t str, keyword: &str) -> Option<&'t str> {
    let rest = text.strip_prefix(keyword)?;
    if rest.is_empty() || rest.starts_with(char::is_whitespace) {
        Some(rest.trim_start())
    } else {
        None
    }
}

/// Byte offset of `word` standing alone in `text`, outside string literals.
fn find_word(text: &str, word: &str) -> Option<usize> {
    let mut in_string = false;
    let bytes = text.as_bytes();
    for (i, c) in text.char_indices() {
        if c == '"' {
            in_string = !in_string;
        }
        if in_string || !text[i..].starts_with(word) {
            continue;
        }
        let before = i == 0 || bytes[i - 1].is_ascii_whitespace();
        let after = bytes.get(i + word.len()).map_or(true, |b| b.is_ascii_whitespace());
        if before && after {
            return Some(i);
        }
    }
    None
}

/// `name: rest` where `name` is a lowercase identifier.
fn colon_call(text: &str) -> Option<(&str, &str)> {
    let colon = text.find(':')?;
    let name = text[..colon].trim_end();
    let valid = name.starts_with(|c: char| c.is_ascii_lowercase())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$' || c == '#');
    valid.then(|| (name, text[colon + 1..].trim()))
}

/// Split an argument list at top-level commas.
pub(crate) fn split_arguments(text: &str) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut in_string = false;
    for c in text.chars() {
        match c {
            '"' => in_string = !in_string,
            '(' | '[' | '{' if !in_string => depth += 1,
            ')' | ']' | '}' if !in_string => depth = depth.saturating_sub(1),
            ',' if !in_string && depth == 0 => {
                parts.push(current.trim().to_string());
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    parts.push(current.trim().to_string());
    parts
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;
    use crate::diagnostics::SharedBuffer;
    use crate::objects::Thing;
    use crate::sound::Sound;

    struct Fixture {
        env: Environment,
        melder: Melder,
        rng: StdRng,
        console: SharedBuffer,
    }

    impl Fixture {
        fn new() -> Self {
            let console = SharedBuffer::new();
            Self {
                env: Environment::new(),
                melder: Melder::new(Box::new(console.clone()), Box::new(SharedBuffer::new())),
                rng: StdRng::seed_from_u64(0),
                console,
            }
        }

        fn run(&mut self, source: &str, args: &[Value]) -> Result<Variables> {
            Script::parse(source)?.run(&mut self.env, &mut self.melder, &mut self.rng, args, false)
        }
    }

    #[test]
    fn splits_arguments_at_top_level() {
        assert_eq!(
            split_arguments(r#" "a, b", f(1, 2), x#[3] "#),
            vec![r#""a, b""#, "f(1, 2)", "x#[3]"]
        );
        assert!(split_arguments("  ").is_empty());
    }

    #[test]
    fn labels_become_variable_names() {
        assert_eq!(variable_from_label("Minimum pitch (Hz)"), "minimum_pitch");
        assert_eq!(variable_from_label("Time step"), "time_step");
        assert_eq!(variable_from_label("F0"), "f0");
    }

    #[test]
    fn old_and_new_form_syntax() {
        let script = Script::parse(
            "form Test\n\
             \tpositive minPitch 100.0\n\
             \tboolean subtractMean \"yes\"\n\
             \tchoice: \"Window shape\", 2\n\
             \t\toption: \"Gaussian\"\n\
             \t\toption: \"Hanning\"\n\
             \tcomment: \"ignored\"\n\
             \tsentence: \"Title\", \"hello world\"\n\
             endform\n",
        )
        .unwrap();
        let form = script.form();
        assert_eq!(form.len(), 4);
        assert_eq!(form[0].variable, "minPitch");
        assert_eq!(form[1].default, "yes");
        assert_eq!(form[2].variable, "window_shape");
        assert_eq!(form[2].options, vec!["Gaussian", "Hanning"]);
        assert_eq!(form[3].default, "hello world");
    }

    #[test]
    fn argument_counts_are_checked() {
        let source = "form Test\n\tpositive minPitch 100.0\n\treal timeStep 0.0\n\tboolean subtractMean \"yes\"\nendform\n";
        let mut fx = Fixture::new();
        let err = fx.run(source, &[]).unwrap_err().to_string();
        assert!(err.starts_with("Found 0 arguments but expected more."), "{}", err);
        assert!(err.ends_with("Script not completed."));

        let err = fx.run("x = 1", &[Value::Number(42.0)]).unwrap_err().to_string();
        assert!(err.starts_with("Found 1 arguments but expected only 0."), "{}", err);

        let script = Script::parse(source).unwrap();
        let vars = script
            .run(&mut fx.env, &mut fx.melder, &mut fx.rng, &[], true)
            .unwrap();
        assert_eq!(vars.get("minPitch"), Some(&Val::Num(100.0)));
        assert_eq!(vars.get("subtractMean"), Some(&Val::Num(1.0)));
    }

    #[test]
    fn control_flow() {
        let mut fx = Fixture::new();
        let vars = fx
            .run(
                "total = 0\n\
                 for i from 1 to 10\n\
                 \tif i mod 2 = 0\n\
                 \t\ttotal += i\n\
                 \telsif i = 5\n\
                 \t\ttotal -= 100\n\
                 \telse\n\
                 \t\ttotal = total\n\
                 \tendif\n\
                 endfor\n\
                 n = 0\n\
                 while n < 3\n\
                 \tn = n + 1\n\
                 endwhile\n\
                 repeat\n\
                 \tn = n * 2\n\
                 until n > 20\n",
                &[],
            )
            .unwrap();
        assert_eq!(vars.get("total"), Some(&Val::Num(30.0 - 100.0)));
        assert_eq!(vars.get("n"), Some(&Val::Num(24.0)));
    }

    #[test]
    fn empty_for_loop_is_skipped() {
        let mut fx = Fixture::new();
        let vars = fx.run("k = 7\nfor i to 0\n\tk = 0\nendfor\n", &[]).unwrap();
        assert_eq!(vars.get("k"), Some(&Val::Num(7.0)));
    }

    #[test]
    fn unmatched_blocks_are_reported() {
        assert!(Script::parse("if 1\nx = 2\n").unwrap_err().to_string().contains("Missing endif."));
        assert!(Script::parse("endfor\n").unwrap_err().to_string().contains("Unmatched 'endfor'."));
    }

    #[test]
    fn info_output_and_continuation_lines() {
        let mut fx = Fixture::new();
        fx.run(
            "# comment\n\
             name$ = \"world\"\n\
             writeInfoLine: \"hello \",\n\
             ... name$, \"!\"\n\
             appendInfo: 1 + 1\n\
             appendInfoLine: \" 'name$'\"\n",
            &[],
        )
        .unwrap();
        assert_eq!(fx.console.contents(), "hello world!\n2 world\n");
    }

    #[test]
    fn errors_name_the_failing_line() {
        let mut fx = Fixture::new();
        let err = fx.run("x = 1\nGet number of samples\n", &[]).unwrap_err().to_string();
        assert_eq!(
            err,
            "Command \"Get number of samples\" not available for given objects.\n\
             Script line 2 not performed or completed:\n\
             « Get number of samples »\n\
             Script not completed."
        );
    }

    #[test]
    fn nocheck_and_exit() {
        let mut fx = Fixture::new();
        let vars = fx
            .run("nocheck Get number of samples\nx = 1\nexitScript\nx = 2\n", &[])
            .unwrap();
        assert_eq!(vars.get("x"), Some(&Val::Num(1.0)));
        let err = fx.run("exitScript: \"bye \", 3\n", &[]).unwrap_err().to_string();
        assert!(err.starts_with("bye 3\n"));
    }

    #[test]
    fn commands_and_selection() {
        let mut fx = Fixture::new();
        fx.env.add_new(Thing::new(Sound::from_slice(&vec![0.5; 100], 100.0), Some("a")));
        fx.env.add_new(Thing::new(Sound::from_slice(&vec![0.25; 50], 100.0), Some("b")));
        let vars = fx
            .run(
                "selectObject: \"Sound a\"\n\
                 n = Get number of samples\n\
                 unit$ = Get number of samples\n\
                 values## = List values\n\
                 selectObject: 2\n\
                 m = Get number of samples\n\
                 part = Extract part: 0, 0.2, \"rectangular\", 1, \"no\"\n\
                 plusObject: 1\n\
                 minusObject: part\n",
                &[],
            )
            .unwrap();
        assert_eq!(vars.get("n"), Some(&Val::Num(100.0)));
        assert_eq!(vars.get("unit$"), Some(&Val::Str("100 samples".into())));
        assert_eq!(vars.get("m"), Some(&Val::Num(50.0)));
        assert_eq!(vars.get("part"), Some(&Val::Num(3.0)));
        assert_eq!(fx.env.selected_ids(), vec![1]);
    }

    #[test]
    fn indexed_and_typed_assignment() {
        let mut fx = Fixture::new();
        let vars = fx.run("v# = {1, 2, 3}\nv#[2] = 20\nv#[3] += 1\n", &[]).unwrap();
        assert_eq!(vars.get("v#"), Some(&Val::Vec(ndarray::array![1.0, 20.0, 4.0])));
        let err = fx.run("x = \"text\"\n", &[]).unwrap_err().to_string();
        assert!(err.contains("should match its name"), "{}", err);
    }

    #[test]
    fn assertions() {
        let mut fx = Fixture::new();
        fx.run("assert 1 + 1 = 2\n", &[]).unwrap();
        let err = fx.run("assert 1 = 2\n", &[]).unwrap_err().to_string();
        assert!(err.starts_with("Script assertion fails (false):\n   1 = 2"), "{}", err);
    }

    #[test]
    fn includes_resolve_next_to_the_script() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("lib.praat"), "shared = 41\n").unwrap();
        let main = dir.path().join("main.praat");
        std::fs::write(&main, "include lib.praat\nshared += 1\n").unwrap();
        let mut fx = Fixture::new();
        let vars = Script::load(&main)
            .unwrap()
            .run(&mut fx.env, &mut fx.melder, &mut fx.rng, &[], false)
            .unwrap();
        assert_eq!(vars.get("shared"), Some(&Val::Num(42.0)));
    }

    #[test]
    fn procedures_are_rejected() {
        let mut fx = Fixture::new();
        assert!(fx.run("@helper\n", &[]).is_err());
    }
}
