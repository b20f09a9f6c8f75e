//! Command registry and dispatch.
//!
//! Every engine operation is a named [`Command`]. *Actions* apply to a
//! selection of objects of given classes (`Get mean...` on one Pitch,
//! `Union` on two PointProcesses); *menu commands* need no selection
//! (`Create Sound from formula...`). A command's callback name carries its
//! [`ReturnKind`] as a prefix, exactly as in Praat.
//!
//! Commands report scalar results by writing them to the info window, with
//! units (`"12.5 Hz"`); the dispatcher intercepts that text and the caller
//! decodes it. Vectors, matrices and new objects travel as a [`Payload`].
//!
//! # Dispatch
//!
//! 1. A trailing `...` is stripped from the name.
//! 2. Actions whose applicability matches the selection exactly win.
//! 3. Otherwise menu commands with that name are tried.
//! 4. Arguments are checked against the parameter declarations.
//! 5. The implementation runs inside the crash guard.

mod analysis;
mod general;
mod matrix;
mod point_process;
mod sound;
mod textgrid;

use ndarray::{Array1, Array2};
use num_complex::Complex64;
use once_cell::sync::Lazy;
use rand::rngs::StdRng;

use crate::diagnostics::{guard, Melder};
use crate::error::{praat_bail, Error, Result};
use crate::interpreter::{Scope, Val, Variables};
use crate::objects::{Class, Environment, Handle, ObjectKind, Thing};
use crate::value::{format_complex, format_number, parse_complex, parse_number, Outcome, ReturnKind, Value};

// ========== Declarations ==========

/// How many selected objects of a class an action takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Count {
    One,
    Two,
    /// One or more.
    Many,
}

impl Count {
    fn accepts(self, n: usize) -> bool {
        match self {
            Count::One => n == 1,
            Count::Two => n == 2,
            Count::Many => n >= 1,
        }
    }
}

/// One term of an action's applicability; `class: None` means any class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selector {
    pub class: Option<Class>,
    pub count: Count,
}

/// Kind of a declared parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Real,
    Positive,
    Integer,
    Natural,
    Boolean,
    Word,
    Sentence,
    Text,
    /// One of the listed options, by name or 1-based number.
    Choice(&'static [&'static str]),
    RealVector,
    RealMatrix,
    StringVector,
}

/// A declared parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Param {
    pub label: &'static str,
    pub kind: ParamKind,
    /// Default text, if the argument may be left out.
    pub default: Option<&'static str>,
}

/// Raw result of a command implementation, before decoding.
#[derive(Debug, Default)]
pub enum Payload {
    /// Everything went to the info window, if anywhere.
    #[default]
    None,
    Vector(Array1<f64>),
    Matrix(Array2<f64>),
    StringVector(Vec<String>),
    /// New objects; they replace the selection.
    Objects(Vec<Thing>),
}

/// Signature of command implementations.
pub type Callback = fn(&mut Cx<'_>, &Args) -> Result<Payload>;

/// A registered command.
pub struct Command {
    pub name: &'static str,
    /// `None` for menu commands.
    pub selectors: Option<Vec<Selector>>,
    /// Praat callback name, e.g. `REAL_Sound_getRootMeanSquare`.
    pub callback: &'static str,
    pub params: Vec<Param>,
    pub run: Callback,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("callback", &self.callback)
            .field("params", &self.params.len())
            .finish()
    }
}

impl Command {
    /// Return kind, from the callback prefix.
    pub fn return_kind(&self) -> ReturnKind {
        ReturnKind::from_callback(self.callback)
    }

    fn applies_to(&self, selected: &[Class]) -> bool {
        let Some(selectors) = &self.selectors else {
            return false;
        };
        let mut covered = 0;
        for selector in selectors.iter().filter(|s| s.class.is_some()) {
            let n = selected.iter().filter(|c| Some(**c) == selector.class).count();
            if !selector.count.accepts(n) {
                return false;
            }
            covered += n;
        }
        let rest = selected.len() - covered.min(selected.len());
        match selectors.iter().find(|s| s.class.is_none()) {
            Some(any) => any.count.accepts(rest),
            None => rest == 0 && covered == selected.len(),
        }
    }

    fn check_args(&self, args: &[Value]) -> Result<()> {
        let required = self
            .params
            .iter()
            .rposition(|p| p.default.is_none())
            .map_or(0, |i| i + 1);
        if args.len() > self.params.len() || args.len() < required {
            praat_bail!(
                "Command \"{}\" expects {} arguments, not {}.",
                self.name,
                self.params.len(),
                args.len()
            );
        }
        Ok(())
    }
}

/// Builder shorthands used by the command modules.
pub(crate) mod decl {
    use super::*;

    pub fn one(class: Class) -> Option<Vec<Selector>> {
        Some(vec![Selector {
            class: Some(class),
            count: Count::One,
        }])
    }

    pub fn two(class: Class) -> Option<Vec<Selector>> {
        Some(vec![Selector {
            class: Some(class),
            count: Count::Two,
        }])
    }

    pub fn pair(a: Class, b: Class) -> Option<Vec<Selector>> {
        Some(vec![
            Selector {
                class: Some(a),
                count: Count::One,
            },
            Selector {
                class: Some(b),
                count: Count::One,
            },
        ])
    }

    pub fn any(count: Count) -> Option<Vec<Selector>> {
        Some(vec![Selector { class: None, count }])
    }

    pub fn real(label: &'static str, default: &'static str) -> Param {
        Param {
            label,
            kind: ParamKind::Real,
            default: Some(default),
        }
    }

    pub fn positive(label: &'static str, default: &'static str) -> Param {
        Param {
            label,
            kind: ParamKind::Positive,
            default: Some(default),
        }
    }

    pub fn integer(label: &'static str, default: &'static str) -> Param {
        Param {
            label,
            kind: ParamKind::Integer,
            default: Some(default),
        }
    }

    pub fn natural(label: &'static str, default: &'static str) -> Param {
        Param {
            label,
            kind: ParamKind::Natural,
            default: Some(default),
        }
    }

    pub fn boolean(label: &'static str, default: bool) -> Param {
        Param {
            label,
            kind: ParamKind::Boolean,
            default: Some(if default { "yes" } else { "no" }),
        }
    }

    pub fn word(label: &'static str, default: &'static str) -> Param {
        Param {
            label,
            kind: ParamKind::Word,
            default: Some(default),
        }
    }

    pub fn sentence(label: &'static str, default: &'static str) -> Param {
        Param {
            label,
            kind: ParamKind::Sentence,
            default: Some(default),
        }
    }

    pub fn text(label: &'static str, default: &'static str) -> Param {
        Param {
            label,
            kind: ParamKind::Text,
            default: Some(default),
        }
    }

    pub fn choice(label: &'static str, options: &'static [&'static str], default: &'static str) -> Param {
        Param {
            label,
            kind: ParamKind::Choice(options),
            default: Some(default),
        }
    }

    pub fn required(mut param: Param) -> Param {
        param.default = None;
        param
    }

    pub fn command(
        name: &'static str,
        selectors: Option<Vec<Selector>>,
        callback: &'static str,
        params: Vec<Param>,
        run: Callback,
    ) -> Command {
        Command {
            name,
            selectors,
            callback,
            params,
            run,
        }
    }
}

// ========== Registry ==========

static REGISTRY: Lazy<Vec<Command>> = Lazy::new(|| {
    let mut commands = Vec::new();
    general::register(&mut commands);
    sound::register(&mut commands);
    analysis::register(&mut commands);
    point_process::register(&mut commands);
    textgrid::register(&mut commands);
    matrix::register(&mut commands);
    #[cfg(test)]
    commands.push(decl::command("Crash", decl::any(Count::One), "MODIFY_Thing_crash", vec![], crash));
    log::debug!("registered {} commands", commands.len());
    commands
});

#[cfg(test)]
fn crash(cx: &mut Cx<'_>, _args: &Args) -> Result<Payload> {
    let name = cx.any()?.full_name();
    panic!("{} has an impossible shape", name);
}

/// All registered commands.
pub fn registry() -> &'static [Command] {
    &REGISTRY
}

/// Find the command `name` for a selection of `classes`.
pub fn lookup(name: &str, classes: &[Class]) -> Result<&'static Command> {
    let name = name.trim_end().trim_end_matches("...").trim_end();
    let registry = registry();
    if !classes.is_empty() {
        if let Some(action) = registry
            .iter()
            .find(|c| c.name == name && c.applies_to(classes))
        {
            return Ok(action);
        }
    }
    registry
        .iter()
        .find(|c| c.name == name && c.selectors.is_none())
        .ok_or_else(|| Error::praat(format!("Command \"{}\" not available for given objects.", name)))
}

// ========== Arguments ==========

/// A checked argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Number(f64),
    Boolean(bool),
    Text(String),
    /// 1-based option number and its text.
    Choice(usize, &'static str),
    Vector(Array1<f64>),
    Matrix(Array2<f64>),
    StringVector(Vec<String>),
}

/// Checked arguments, with defaults filled in.
#[derive(Debug, Clone, Default)]
pub struct Args {
    values: Vec<Arg>,
}

fn parse_boolean(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "yes" | "on" | "true" | "1" => Some(true),
        "no" | "off" | "false" | "0" => Some(false),
        _ => None,
    }
}

fn convert(param: &Param, value: &Value) -> Result<Arg> {
    let wrong = |wanted: &str| {
        Error::praat(format!(
            "Argument \"{}\" should be {}, not a {}.",
            param.label,
            wanted,
            value.kind_name()
        ))
    };
    let number = |value: &Value| match value {
        Value::Number(x) => Ok(*x),
        Value::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
        _ => Err(wrong("a number")),
    };
    let arg = match param.kind {
        ParamKind::Real => Arg::Number(number(value)?),
        ParamKind::Positive => {
            let x = number(value)?;
            if x <= 0.0 {
                praat_bail!("Argument \"{}\" must be greater than 0.", param.label);
            }
            Arg::Number(x)
        }
        ParamKind::Integer | ParamKind::Natural => {
            let x = number(value)?;
            if x.fract() != 0.0 {
                praat_bail!("Argument \"{}\" should be a whole number.", param.label);
            }
            if param.kind == ParamKind::Natural && x < 1.0 {
                praat_bail!("Argument \"{}\" should be a positive whole number.", param.label);
            }
            Arg::Number(x)
        }
        ParamKind::Boolean => match value {
            Value::Boolean(b) => Arg::Boolean(*b),
            Value::Number(x) => Arg::Boolean(*x != 0.0),
            Value::String(s) => Arg::Boolean(parse_boolean(s).ok_or_else(|| wrong("yes or no"))?),
            _ => return Err(wrong("a boolean")),
        },
        ParamKind::Word | ParamKind::Sentence | ParamKind::Text => match value {
            Value::String(s) => {
                if param.kind == ParamKind::Word && s.split_whitespace().count() > 1 {
                    praat_bail!("Argument \"{}\" should be a single word.", param.label);
                }
                Arg::Text(s.clone())
            }
            _ => return Err(wrong("a string")),
        },
        ParamKind::Choice(options) => {
            let index = match value {
                Value::String(s) => options.iter().position(|o| o.eq_ignore_ascii_case(s.trim())),
                Value::Number(x) if x.fract() == 0.0 && *x >= 1.0 => Some(*x as usize - 1).filter(|&i| i < options.len()),
                _ => None,
            };
            let Some(index) = index else {
                praat_bail!(
                    "Argument \"{}\" should be one of: {}; not {}.",
                    param.label,
                    options.join(", "),
                    value.describe()
                );
            };
            Arg::Choice(index + 1, options[index])
        }
        ParamKind::RealVector => match value {
            Value::Vector(v) => Arg::Vector(v.clone()),
            _ => return Err(wrong("a numeric vector")),
        },
        ParamKind::RealMatrix => match value {
            Value::Matrix(m) => Arg::Matrix(m.clone()),
            _ => return Err(wrong("a numeric matrix")),
        },
        ParamKind::StringVector => match value {
            Value::StringVector(v) => Arg::StringVector(v.clone()),
            _ => return Err(wrong("a string vector")),
        },
    };
    Ok(arg)
}

fn default_value(param: &Param, text: &str) -> Value {
    match param.kind {
        ParamKind::Real | ParamKind::Positive | ParamKind::Integer | ParamKind::Natural => {
            Value::Number(parse_number(text))
        }
        ParamKind::Boolean => Value::Boolean(parse_boolean(text).unwrap_or(false)),
        ParamKind::RealVector => Value::Vector(Array1::zeros(0)),
        ParamKind::RealMatrix => Value::Matrix(Array2::zeros((0, 0))),
        ParamKind::StringVector => Value::StringVector(Vec::new()),
        _ => Value::String(text.to_string()),
    }
}

impl Args {
    /// Check `values` against `params`, filling in defaults.
    pub fn check(params: &[Param], values: &[Value]) -> Result<Self> {
        let mut checked = Vec::with_capacity(params.len());
        for (i, param) in params.iter().enumerate() {
            let arg = match (values.get(i), param.default) {
                (Some(value), _) => convert(param, value)?,
                (None, Some(text)) => convert(param, &default_value(param, text))?,
                (None, None) => praat_bail!("Argument \"{}\" is missing.", param.label),
            };
            checked.push(arg);
        }
        Ok(Self { values: checked })
    }

    fn get(&self, i: usize) -> Result<&Arg> {
        self.values
            .get(i)
            .ok_or_else(|| Error::praat(format!("Argument {} is missing.", i + 1)))
    }

    /// Numeric argument `i`.
    pub fn real(&self, i: usize) -> Result<f64> {
        match self.get(i)? {
            Arg::Number(x) => Ok(*x),
            Arg::Boolean(b) => Ok(f64::from(u8::from(*b))),
            other => Err(Error::praat(format!("Argument {} is not a number: {:?}.", i + 1, other))),
        }
    }

    /// Whole-number argument `i`.
    pub fn integer(&self, i: usize) -> Result<i64> {
        Ok(self.real(i)? as i64)
    }

    /// Non-negative whole-number argument `i`, as an index.
    pub fn index(&self, i: usize) -> Result<usize> {
        Ok(self.integer(i)?.max(0) as usize)
    }

    /// Boolean argument `i`.
    pub fn boolean(&self, i: usize) -> Result<bool> {
        match self.get(i)? {
            Arg::Boolean(b) => Ok(*b),
            Arg::Number(x) => Ok(*x != 0.0),
            other => Err(Error::praat(format!("Argument {} is not a boolean: {:?}.", i + 1, other))),
        }
    }

    /// Text argument `i` (choices give their option text).
    pub fn text(&self, i: usize) -> Result<&str> {
        match self.get(i)? {
            Arg::Text(s) => Ok(s),
            Arg::Choice(_, option) => Ok(option),
            other => Err(Error::praat(format!("Argument {} is not text: {:?}.", i + 1, other))),
        }
    }

    /// Vector argument `i`.
    pub fn vector(&self, i: usize) -> Result<&Array1<f64>> {
        match self.get(i)? {
            Arg::Vector(v) => Ok(v),
            other => Err(Error::praat(format!("Argument {} is not a vector: {:?}.", i + 1, other))),
        }
    }
}

// ========== Execution context ==========

/// What a command implementation gets to work with.
pub struct Cx<'a> {
    pub env: &'a mut Environment,
    pub melder: &'a mut Melder,
    pub rng: &'a mut StdRng,
    /// Variables of the running script, visible to formulas.
    pub variables: Option<&'a Variables>,
}

impl Scope for Cx<'_> {
    fn variable(&self, name: &str) -> Option<Val> {
        self.variables.and_then(|vars| vars.get(name).cloned())
    }

    fn environment(&self) -> Option<&Environment> {
        Some(&*self.env)
    }

    fn rng(&mut self) -> &mut StdRng {
        &mut *self.rng
    }
}

impl<'a> Cx<'a> {
    /// Id of the only selected object of type `T`.
    pub fn selected_id<T: ObjectKind>(&self) -> Result<usize> {
        self.env.selected_nth(Some(T::CLASS), 1)
    }

    /// The `n`th (1-based) selected object of type `T`.
    pub fn nth<T: ObjectKind>(&self, n: i64) -> Result<&T> {
        let id = self.env.selected_nth(Some(T::CLASS), n)?;
        self.env.get(id)?.downcast::<T>()
    }

    /// The first selected object of type `T`.
    pub fn one<T: ObjectKind>(&self) -> Result<&T> {
        self.nth::<T>(1)
    }

    /// The first selected object of type `T`, mutably.
    pub fn one_mut<T: ObjectKind>(&mut self) -> Result<&mut T> {
        let id = self.selected_id::<T>()?;
        self.env.get_mut(id)?.downcast_mut::<T>()
    }

    /// The only selected object, of any class.
    pub fn any(&self) -> Result<&Thing> {
        let id = self.env.selected_nth(None, 1)?;
        self.env.get(id)
    }

    /// Name of the first selected object of type `T`.
    pub fn name_of<T: ObjectKind>(&self) -> Result<Option<String>> {
        let id = self.selected_id::<T>()?;
        Ok(self.env.get(id)?.name().map(str::to_string))
    }

    /// Report a real number with its unit.
    pub fn real(&mut self, x: f64, unit: &str) -> Result<Payload> {
        let text = format_number(x);
        if unit.is_empty() || x.is_nan() {
            self.melder.append_info_line(&text);
        } else {
            self.melder.append_info_line(&format!("{} {}", text, unit));
        }
        Ok(Payload::None)
    }

    /// Report a whole number with its unit.
    pub fn integer(&mut self, n: i64, unit: &str) -> Result<Payload> {
        if unit.is_empty() {
            self.melder.append_info_line(&n.to_string());
        } else {
            self.melder.append_info_line(&format!("{} {}", n, unit));
        }
        Ok(Payload::None)
    }

    /// Report a yes/no answer.
    pub fn boolean(&mut self, b: bool, what: &str) -> Result<Payload> {
        let answer = if b { "1 (yes" } else { "0 (no" };
        if what.is_empty() {
            self.melder.append_info_line(&format!("{})", answer));
        } else {
            self.melder.append_info_line(&format!("{}, {})", answer, what));
        }
        Ok(Payload::None)
    }

    /// Report a complex number.
    pub fn complex(&mut self, z: Complex64) -> Result<Payload> {
        self.melder.append_info_line(&format_complex(z));
        Ok(Payload::None)
    }

    /// Report a string.
    pub fn string(&mut self, s: &str) -> Result<Payload> {
        self.melder.append_info_line(s);
        Ok(Payload::None)
    }
}

/// A finished dispatch: the command's kind, intercepted text and payload.
#[derive(Debug)]
pub struct Reply {
    pub kind: ReturnKind,
    pub info: String,
    pub payload: Payload,
    /// Ids of the objects the command created, in list order.
    pub created: Vec<usize>,
}

/// Run command `name` on the current selection of `env`.
///
/// With `intercept`, info output is captured in the reply instead of
/// reaching the info window. `variables` are those of the calling script.
pub fn dispatch(
    env: &mut Environment,
    melder: &mut Melder,
    rng: &mut StdRng,
    variables: Option<&Variables>,
    name: &str,
    args: &[Value],
    intercept: bool,
) -> Result<Reply> {
    let classes: Vec<Class> = env
        .selected_ids()
        .into_iter()
        .filter_map(|id| env.get(id).ok().map(Thing::class))
        .collect();
    let command = lookup(name, &classes)?;
    let kind = command.return_kind();
    if kind == ReturnKind::Unsupported {
        praat_bail!("Command \"{}\" cannot be called from a script.", command.name);
    }
    command.check_args(args)?;
    let checked = Args::check(&command.params, args)?;
    log::debug!("dispatching \"{}\" ({}) with {} argument(s)", command.name, command.callback, args.len());

    if intercept {
        melder.divert();
    }
    let result = guard(|| {
        let mut cx = Cx {
            env: &mut *env,
            melder: &mut *melder,
            rng: &mut *rng,
            variables,
        };
        (command.run)(&mut cx, &checked)
    });
    let info = if intercept { melder.undivert() } else { String::new() };
    let payload = result?;

    let mut created = Vec::new();
    let payload = match payload {
        Payload::Objects(things) => {
            env.deselect_all();
            created = things.into_iter().map(|t| env.add_new(t)).collect();
            Payload::None
        }
        other => other,
    };
    Ok(Reply {
        kind,
        info,
        payload,
        created,
    })
}

fn leading_integer(text: &str) -> i64 {
    let trimmed = text.trim_start();
    let end = trimmed
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+'))))
        .map_or(trimmed.len(), |(i, _)| i);
    trimmed[..end].parse().unwrap_or(0)
}

impl Reply {
    /// Decode into a host outcome; `handles` are the created objects as
    /// they ended up in the host arena.
    pub fn into_outcome(self, handles: Vec<Handle>) -> Outcome {
        match self.kind {
            ReturnKind::Real => Outcome::Number(parse_number(&self.info)),
            ReturnKind::Integer => Outcome::Integer(leading_integer(&self.info)),
            ReturnKind::Boolean => Outcome::Boolean(leading_integer(&self.info) != 0),
            ReturnKind::Complex => Outcome::Complex(parse_complex(&self.info)),
            ReturnKind::NumericVector | ReturnKind::NumericMatrix | ReturnKind::StringVector => match self.payload {
                Payload::Vector(v) => Outcome::Vector(v),
                Payload::Matrix(m) => Outcome::Matrix(m),
                Payload::StringVector(s) => Outcome::StringVector(s),
                _ => Outcome::None,
            },
            kind if kind.creates_objects() => {
                if handles.len() == 1 && !kind.always_list() {
                    Outcome::Object(handles[0])
                } else {
                    Outcome::Objects(handles)
                }
            }
            _ if !self.info.is_empty() => Outcome::Text(self.info),
            _ => Outcome::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applicability_is_exact() {
        let union = lookup("Union", &[Class::PointProcess, Class::PointProcess]).unwrap();
        assert_eq!(union.name, "Union");
        assert!(lookup("Union", &[Class::PointProcess]).is_err());
        let err = lookup("Get mean", &[Class::Sound, Class::Pitch]).unwrap_err();
        assert_eq!(err.to_string(), "Command \"Get mean\" not available for given objects.");
    }

    #[test]
    fn ellipsis_is_ignored() {
        assert!(lookup("To Pitch...", &[Class::Sound]).is_ok());
        assert!(lookup("Create Poisson process...", &[]).is_ok());
    }

    #[test]
    fn argument_counting() {
        let command = lookup("To Intensity", &[Class::Sound]).unwrap();
        assert!(command.check_args(&[]).is_ok());
        let too_many = vec![Value::Number(1.0); 4];
        let err = command.check_args(&too_many).unwrap_err();
        assert_eq!(err.to_string(), "Command \"To Intensity\" expects 3 arguments, not 4.");
    }

    #[test]
    fn choices_accept_names_and_numbers() {
        let param = decl::choice("Interpolation", &["nearest", "linear", "cubic"], "linear");
        assert_eq!(
            convert(&param, &Value::String("Cubic".into())).unwrap(),
            Arg::Choice(3, "cubic")
        );
        assert_eq!(convert(&param, &Value::Number(1.0)).unwrap(), Arg::Choice(1, "nearest"));
        assert!(convert(&param, &Value::Number(4.0)).is_err());
    }

    #[test]
    fn booleans_accept_yes_and_numbers() {
        let param = decl::boolean("Preserve times", false);
        assert_eq!(convert(&param, &Value::String("yes".into())).unwrap(), Arg::Boolean(true));
        assert_eq!(convert(&param, &Value::Number(0.0)).unwrap(), Arg::Boolean(false));
        let err = convert(&decl::real("Time", "0"), &Value::String("x".into())).unwrap_err();
        assert_eq!(err.to_string(), "Argument \"Time\" should be a number, not a string.");
    }

    #[test]
    fn reply_decoding() {
        let reply = |kind, info: &str| Reply {
            kind,
            info: info.to_string(),
            payload: Payload::None,
            created: Vec::new(),
        };
        assert_eq!(reply(ReturnKind::Real, "12.5 Hz\n").into_outcome(vec![]), Outcome::Number(12.5));
        assert_eq!(reply(ReturnKind::Integer, "3 points\n").into_outcome(vec![]), Outcome::Integer(3));
        assert_eq!(reply(ReturnKind::Boolean, "0 (no)\n").into_outcome(vec![]), Outcome::Boolean(false));
        assert_eq!(reply(ReturnKind::Nothing, "").into_outcome(vec![]), Outcome::None);
        assert_eq!(reply(ReturnKind::Info, "hi\n").into_outcome(vec![]), Outcome::Text("hi\n".into()));
    }
}
