//! Value marshalling between the host and the engine.
//!
//! Arguments travel into commands as [`Value`]s; results come back as
//! [`Outcome`]s. Which outcome a command produces is decided by its
//! [`ReturnKind`], derived from the prefix of the command's callback name
//! (`REAL_…`, `NEWMANY_…`, and so on).
//!
//! The prefix taxonomy changes between engine versions (string vectors and
//! the `NEWTIMES2_` object prefix are relatively recent), so it is kept in
//! one table here rather than spread over the dispatcher.

use ndarray::{Array1, Array2};
use num_complex::Complex64;

use crate::error::{Error, Result};
use crate::objects::Handle;

/// An argument passed to a command or script.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Any real number; integers are numbers too.
    Number(f64),
    /// A yes/no flag.
    Boolean(bool),
    /// Text.
    String(String),
    /// A numeric vector (`#` variables).
    Vector(Array1<f64>),
    /// A numeric matrix (`##` variables).
    Matrix(Array2<f64>),
    /// A vector of strings (`$#` variables).
    StringVector(Vec<String>),
}

impl Value {
    /// Short name of the argument kind, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Boolean(_) => "boolean",
            Value::String(_) => "string",
            Value::Vector(_) => "numeric vector",
            Value::Matrix(_) => "numeric matrix",
            Value::StringVector(_) => "string vector",
        }
    }

    /// Render the value as script-literal-ish text.
    pub fn describe(&self) -> String {
        match self {
            Value::Number(x) => format_number(*x),
            Value::Boolean(b) => if *b { "yes".into() } else { "no".into() },
            Value::String(s) => format!("\"{}\"", s),
            Value::Vector(v) => format!(
                "{{{}}}",
                v.iter().map(|x| format_number(*x)).collect::<Vec<_>>().join(", ")
            ),
            Value::Matrix(m) => format!("<{}×{} matrix>", m.nrows(), m.ncols()),
            Value::StringVector(v) => format!(
                "{{{}}}",
                v.iter().map(|s| format!("\"{}\"", s)).collect::<Vec<_>>().join(", ")
            ),
        }
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Number(x)
    }
}

impl From<f32> for Value {
    fn from(x: f32) -> Self {
        Value::Number(x as f64)
    }
}

impl From<i32> for Value {
    fn from(x: i32) -> Self {
        Value::Number(x as f64)
    }
}

impl From<i64> for Value {
    fn from(x: i64) -> Self {
        Value::Number(x as f64)
    }
}

impl From<usize> for Value {
    fn from(x: usize) -> Self {
        Value::Number(x as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<f64>> for Value {
    fn from(v: Vec<f64>) -> Self {
        Value::Vector(Array1::from_vec(v))
    }
}

impl From<Array1<f64>> for Value {
    fn from(v: Array1<f64>) -> Self {
        Value::Vector(v)
    }
}

impl From<Array2<f64>> for Value {
    fn from(m: Array2<f64>) -> Self {
        Value::Matrix(m)
    }
}

impl From<Vec<String>> for Value {
    fn from(v: Vec<String>) -> Self {
        Value::StringVector(v)
    }
}

impl From<&[&str]> for Value {
    fn from(v: &[&str]) -> Self {
        Value::StringVector(v.iter().map(|s| s.to_string()).collect())
    }
}

/// Build a `Vec<Value>` from heterogeneous arguments.
///
/// ```
/// use praatfan_bridge::{args, Value};
///
/// let a = args![75.0, 600.0, "yes"];
/// assert_eq!(a[2], Value::String("yes".into()));
/// ```
#[macro_export]
macro_rules! args {
    () => { ::std::vec::Vec::<$crate::Value>::new() };
    ($($x:expr),+ $(,)?) => { vec![$($crate::Value::from($x)),+] };
}

/// A decoded command result.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The command produced nothing the host can see.
    None,
    /// A real number (`REAL_`).
    Number(f64),
    /// An integer (`INTEGER_`).
    Integer(i64),
    /// A flag (`BOOLEAN_`).
    Boolean(bool),
    /// A complex number (`COMPLEX_`).
    Complex(Complex64),
    /// A numeric vector (`NUMVEC_`).
    Vector(Array1<f64>),
    /// A numeric matrix (`NUMMAT_`).
    Matrix(Array2<f64>),
    /// A string vector (`STRVEC_`).
    StringVector(Vec<String>),
    /// Text written to the info window (`INFO_`, `LIST_`, `HINT_`), or the
    /// captured text of any command when a string was requested.
    Text(String),
    /// A single new object.
    Object(Handle),
    /// Several new objects, in creation order.
    Objects(Vec<Handle>),
}

impl Outcome {
    /// Interpret the outcome as a real number.
    pub fn as_number(&self) -> Result<f64> {
        match self {
            Outcome::Number(x) => Ok(*x),
            Outcome::Integer(n) => Ok(*n as f64),
            Outcome::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
            Outcome::Text(s) => Ok(parse_number(s)),
            other => Err(Error::praat(format!("Result {} is not a number.", other.kind_name()))),
        }
    }

    /// Interpret the outcome as a single object.
    pub fn as_object(&self) -> Result<Handle> {
        match self {
            Outcome::Object(h) => Ok(*h),
            Outcome::Objects(list) if list.len() == 1 => Ok(list[0]),
            other => Err(Error::praat(format!("Result {} is not a single object.", other.kind_name()))),
        }
    }

    /// Interpret the outcome as a list of objects.
    pub fn as_objects(&self) -> Result<Vec<Handle>> {
        match self {
            Outcome::Object(h) => Ok(vec![*h]),
            Outcome::Objects(list) => Ok(list.clone()),
            other => Err(Error::praat(format!("Result {} is not a list of objects.", other.kind_name()))),
        }
    }

    /// Interpret the outcome as text.
    pub fn as_text(&self) -> Result<&str> {
        match self {
            Outcome::Text(s) => Ok(s),
            other => Err(Error::praat(format!("Result {} is not text.", other.kind_name()))),
        }
    }

    /// Whether nothing came back.
    pub fn is_none(&self) -> bool {
        matches!(self, Outcome::None)
    }

    fn kind_name(&self) -> &'static str {
        match self {
            Outcome::None => "(none)",
            Outcome::Number(_) => "(number)",
            Outcome::Integer(_) => "(integer)",
            Outcome::Boolean(_) => "(boolean)",
            Outcome::Complex(_) => "(complex)",
            Outcome::Vector(_) => "(vector)",
            Outcome::Matrix(_) => "(matrix)",
            Outcome::StringVector(_) => "(string vector)",
            Outcome::Text(_) => "(text)",
            Outcome::Object(_) => "(object)",
            Outcome::Objects(_) => "(objects)",
        }
    }
}

/// How a command's result is decoded, by callback-name prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReturnKind {
    /// `REAL_`
    Real,
    /// `INTEGER_`
    Integer,
    /// `BOOLEAN_`
    Boolean,
    /// `COMPLEX_`
    Complex,
    /// `NUMVEC_`
    NumericVector,
    /// `NUMMAT_`
    NumericMatrix,
    /// `STRVEC_`
    StringVector,
    /// `NEW_`, `NEW1_`, `NEW2_`, `NEWTIMES2_`: one object, or a list if several.
    New,
    /// `NEWMANY_`: always a list.
    NewMany,
    /// `READ1_`: one object.
    ReadOne,
    /// `READMANY_`: always a list.
    ReadMany,
    /// `INFO_`, `HINT_`, `LIST_`: info text.
    Info,
    /// `MODIFY_`, `SAVE_`, `PRAAT_`, `PREFS_`, `HELP_`: nothing.
    Nothing,
    /// Anything else (graphics, playback, movies): not callable.
    Unsupported,
}

const PREFIXES: &[(&str, ReturnKind)] = &[
    ("REAL_", ReturnKind::Real),
    ("INTEGER_", ReturnKind::Integer),
    ("BOOLEAN_", ReturnKind::Boolean),
    ("COMPLEX_", ReturnKind::Complex),
    ("NUMVEC_", ReturnKind::NumericVector),
    ("NUMMAT_", ReturnKind::NumericMatrix),
    ("STRVEC_", ReturnKind::StringVector),
    ("NEWMANY_", ReturnKind::NewMany),
    ("NEWTIMES2_", ReturnKind::New),
    ("NEW1_", ReturnKind::New),
    ("NEW2_", ReturnKind::New),
    ("NEW_", ReturnKind::New),
    ("READ1_", ReturnKind::ReadOne),
    ("READMANY_", ReturnKind::ReadMany),
    ("INFO_", ReturnKind::Info),
    ("HINT_", ReturnKind::Info),
    ("LIST_", ReturnKind::Info),
    ("MODIFY_", ReturnKind::Nothing),
    ("SAVE_", ReturnKind::Nothing),
    ("PRAAT_", ReturnKind::Nothing),
    ("PREFS_", ReturnKind::Nothing),
    ("HELP_", ReturnKind::Nothing),
];

impl ReturnKind {
    /// Classify a callback name such as `REAL_Sound_getRootMeanSquare`.
    pub fn from_callback(name: &str) -> ReturnKind {
        PREFIXES
            .iter()
            .find(|(prefix, _)| name.starts_with(prefix))
            .map(|&(_, kind)| kind)
            .unwrap_or(ReturnKind::Unsupported)
    }

    /// Whether the command creates objects.
    pub fn creates_objects(self) -> bool {
        matches!(
            self,
            ReturnKind::New | ReturnKind::NewMany | ReturnKind::ReadOne | ReturnKind::ReadMany
        )
    }

    /// Whether new objects are always returned as a list.
    pub fn always_list(self) -> bool {
        matches!(self, ReturnKind::NewMany | ReturnKind::ReadMany)
    }
}

/// Format a number the way the engine prints it.
///
/// Undefined values (NaN) print as `--undefined--`; integral values print
/// without a fractional part; everything else uses the shortest text that
/// reads back to the same `f64`.
pub fn format_number(x: f64) -> String {
    if x.is_nan() {
        "--undefined--".to_string()
    } else if x.is_infinite() {
        if x > 0.0 { "+inf".into() } else { "-inf".into() }
    } else if x == x.trunc() && x.abs() < 1e15 {
        format!("{:.0}", x)
    } else {
        format!("{}", x)
    }
}

/// Read the leading number from engine text, ignoring trailing units.
///
/// Returns NaN for `--undefined--` or text without a leading number.
pub fn parse_number(text: &str) -> f64 {
    let text = text.trim_start();
    if text.starts_with("--undefined--") {
        return f64::NAN;
    }
    if text.starts_with("+inf") {
        return f64::INFINITY;
    }
    if text.starts_with("-inf") {
        return f64::NEG_INFINITY;
    }
    let end = leading_number_len(text);
    text[..end].parse().unwrap_or(f64::NAN)
}

fn leading_number_len(text: &str) -> usize {
    let bytes = text.as_bytes();
    let mut i = 0;
    if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
        i += 1;
    }
    let digits_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
    }
    if i == digits_start {
        return 0;
    }
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        let mut j = i + 1;
        if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
            j += 1;
        }
        let exp_start = j;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j > exp_start {
            i = j;
        }
    }
    i
}

/// Format a complex number as `re + im i`.
pub fn format_complex(z: Complex64) -> String {
    if z.re.is_nan() || z.im.is_nan() {
        return "--undefined--".to_string();
    }
    if z.im < 0.0 {
        format!("{} - {}i", format_number(z.re), format_number(-z.im))
    } else {
        format!("{} + {}i", format_number(z.re), format_number(z.im))
    }
}

/// Decode `re + im i` text back into a complex number.
///
/// The imaginary part starts at the first sign after the first digit of the
/// real part. If either part is undefined, the whole result is undefined.
pub fn parse_complex(text: &str) -> Complex64 {
    let re = parse_number(text);
    let first_digit = text.find(|c: char| c.is_ascii_digit());
    let im_start = first_digit.and_then(|d| {
        text[d..]
            .find(|c: char| c == '+' || c == '-')
            .map(|offset| d + offset)
    });
    let im = match im_start {
        Some(start) => {
            let rest = &text[start..];
            let sign = if rest.starts_with('-') { -1.0 } else { 1.0 };
            sign * parse_number(rest[1..].trim_start())
        }
        None => f64::NAN,
    };
    if re.is_nan() || im.is_nan() {
        Complex64::new(f64::NAN, f64::NAN)
    } else {
        Complex64::new(re, im)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn callback_prefixes() {
        assert_eq!(ReturnKind::from_callback("REAL_Sound_getRootMeanSquare"), ReturnKind::Real);
        assert_eq!(ReturnKind::from_callback("NEWMANY_TextGrid_Sound_extractNonemptyIntervals"), ReturnKind::NewMany);
        assert_eq!(ReturnKind::from_callback("NEWTIMES2_PointProcess_union"), ReturnKind::New);
        assert_eq!(ReturnKind::from_callback("NEW1_Sound_Pitch_to_PointProcess_cc"), ReturnKind::New);
        assert_eq!(ReturnKind::from_callback("READMANY_Data_readFromFile"), ReturnKind::ReadMany);
        assert_eq!(ReturnKind::from_callback("STRVEC_TextGrid_getTierNames"), ReturnKind::StringVector);
        assert_eq!(ReturnKind::from_callback("LIST_Pitch_countDifferences"), ReturnKind::Info);
        assert_eq!(ReturnKind::from_callback("SAVE_Data_writeToTextFile"), ReturnKind::Nothing);
        assert_eq!(ReturnKind::from_callback("GRAPHICS_Sound_draw"), ReturnKind::Unsupported);
    }

    #[test]
    fn numbers_print_like_the_engine() {
        assert_eq!(format_number(42.0), "42");
        assert_eq!(format_number(-0.5), "-0.5");
        assert_eq!(format_number(f64::NAN), "--undefined--");
        assert_eq!(parse_number("0.0123 Hz"), 0.0123);
        assert_eq!(parse_number("  12 frames"), 12.0);
        assert_eq!(parse_number("1e-3 s"), 0.001);
        assert!(parse_number("--undefined-- Hz").is_nan());
        assert!(parse_number("Hz").is_nan());
    }

    #[test]
    fn complex_text_round_trip() {
        let z = Complex64::new(1.5, -2.25);
        assert_eq!(format_complex(z), "1.5 - 2.25i");
        assert_eq!(parse_complex(&format_complex(z)), z);
        assert_eq!(parse_complex("-3 + 4i"), Complex64::new(-3.0, 4.0));
        let undefined = parse_complex("--undefined--");
        assert!(undefined.re.is_nan() && undefined.im.is_nan());
    }

    #[test]
    fn outcome_accessors() {
        assert_eq!(Outcome::Integer(3).as_number().unwrap(), 3.0);
        assert_eq!(Outcome::Text("0.25 seconds".into()).as_number().unwrap(), 0.25);
        assert!(Outcome::None.as_number().is_err());
        assert!(Outcome::None.is_none());
    }

    #[test]
    fn args_macro_converts_each_kind() {
        let a = crate::args![1, 2.5, true, "tier", vec![1.0, 2.0]];
        assert_eq!(a[0], Value::Number(1.0));
        assert_eq!(a[2], Value::Boolean(true));
        assert_eq!(a[3].kind_name(), "string");
        assert_eq!(a[4].kind_name(), "numeric vector");
    }
}
