//! Expressions of the script language and of object formulas.
//!
//! Parsing produces an [`Expr`] tree once; evaluation walks it against a
//! [`Scope`] that supplies variables, the object list (for `selected`) and
//! the random generator.
//!
//! Precedence, loosest first: `or`, `and`, `not`, comparisons, `+ -`,
//! `* / div mod`, unary minus, `^` (right-associative), indexing.

use std::collections::BTreeMap;
use std::fmt;

use ndarray::{Array1, Array2, Zip};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use regex::Regex;

use super::lexer::{tokenize, unquote, SpannedToken, Token};
use crate::error::{praat_bail, Error, Result};
use crate::matrix::Cell;
use crate::objects::{Class, Environment};
use crate::value::{format_number, parse_number, Value};

// ========== Values ==========

/// A script value. The variable's suffix decides which kind it holds.
#[derive(Debug, Clone, PartialEq)]
pub enum Val {
    Num(f64),
    Str(String),
    Vec(Array1<f64>),
    Mat(Array2<f64>),
    StrVec(Vec<String>),
}

/// Script variables by name, suffix included.
pub type Variables = BTreeMap<String, Val>;

impl Val {
    pub(crate) fn kind_name(&self) -> &'static str {
        match self {
            Val::Num(_) => "a number",
            Val::Str(_) => "a string",
            Val::Vec(_) => "a vector",
            Val::Mat(_) => "a matrix",
            Val::StrVec(_) => "a string array",
        }
    }

    fn boolean(b: bool) -> Val {
        Val::Num(if b { 1.0 } else { 0.0 })
    }

    /// The number, or an error naming what it is instead.
    pub fn as_number(&self) -> Result<f64> {
        match self {
            Val::Num(x) => Ok(*x),
            other => praat_bail!("A number was expected, not {}.", other.kind_name()),
        }
    }

    /// The string, or an error naming what it is instead.
    pub fn as_text(&self) -> Result<&str> {
        match self {
            Val::Str(s) => Ok(s),
            other => praat_bail!("A string was expected, not {}.", other.kind_name()),
        }
    }

    /// Truth value of a condition: any number other than zero.
    pub fn truth(&self) -> Result<bool> {
        Ok(self.as_number()? != 0.0)
    }

    /// Convert into a command argument.
    pub fn into_value(self) -> Value {
        match self {
            Val::Num(x) => Value::Number(x),
            Val::Str(s) => Value::String(s),
            Val::Vec(v) => Value::Vector(v),
            Val::Mat(m) => Value::Matrix(m),
            Val::StrVec(v) => Value::StringVector(v),
        }
    }

    /// Convert a host argument; booleans become 1 or 0.
    pub fn from_value(value: Value) -> Val {
        match value {
            Value::Number(x) => Val::Num(x),
            Value::Boolean(b) => Val::boolean(b),
            Value::String(s) => Val::Str(s),
            Value::Vector(v) => Val::Vec(v),
            Value::Matrix(m) => Val::Mat(m),
            Value::StringVector(v) => Val::StrVec(v),
        }
    }
}

impl fmt::Display for Val {
    /// The text `writeInfo` prints: vectors one element per line, matrices
    /// one row per line.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Val::Num(x) => write!(f, "{}", format_number(*x)),
            Val::Str(s) => write!(f, "{}", s),
            Val::Vec(v) => {
                let lines: Vec<String> = v.iter().map(|x| format_number(*x)).collect();
                write!(f, "{}", lines.join("\n"))
            }
            Val::Mat(m) => {
                let rows: Vec<String> = m
                    .rows()
                    .into_iter()
                    .map(|row| row.iter().map(|x| format_number(*x)).collect::<Vec<_>>().join(" "))
                    .collect();
                write!(f, "{}", rows.join("\n"))
            }
            Val::StrVec(v) => write!(f, "{}", v.join("\n")),
        }
    }
}

// ========== Syntax tree ==========

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    IntDiv,
    Mod,
    Pow,
}

impl BinOp {
    fn symbol(self) -> &'static str {
        match self {
            BinOp::Or => "or",
            BinOp::And => "and",
            BinOp::Eq => "=",
            BinOp::Ne => "<>",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::IntDiv => "div",
            BinOp::Mod => "mod",
            BinOp::Pow => "^",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Text(String),
    Variable(String),
    Vector(Vec<Expr>),
    Matrix(Vec<Vec<Expr>>),
    Index(String, Vec<Expr>),
    Call(String, Vec<Expr>),
    Negate(Box<Expr>),
    Not(Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Conditional(Box<Expr>, Box<Expr>, Box<Expr>),
}

// ========== Parser ==========

struct Parser {
    tokens: Vec<SpannedToken>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&SpannedToken> {
        self.tokens.get(self.pos)
    }

    fn peek_token(&self) -> Option<Token> {
        self.peek().map(|t| t.token)
    }

    fn peek_second(&self) -> Option<Token> {
        self.tokens.get(self.pos + 1).map(|t| t.token)
    }

    fn at_keyword(&self, word: &str) -> bool {
        self.peek()
            .map_or(false, |t| t.token == Token::Ident && t.lexeme == word)
    }

    fn eat(&mut self, token: Token) -> bool {
        if self.peek_token() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, word: &str) -> bool {
        if self.at_keyword(word) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn unexpected(&self) -> Error {
        match self.peek() {
            Some(t) => Error::praat(format!("Unexpected « {} » in formula.", t.lexeme)),
            None => Error::praat("Unexpected end of formula."),
        }
    }

    fn expect(&mut self, token: Token) -> Result<()> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn expect_keyword(&mut self, word: &str) -> Result<()> {
        if self.eat_keyword(word) {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn expression(&mut self) -> Result<Expr> {
        self.or()
    }

    fn or(&mut self) -> Result<Expr> {
        let mut lhs = self.and()?;
        while self.eat_keyword("or") {
            let rhs = self.and()?;
            lhs = Expr::Binary(BinOp::Or, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn and(&mut self) -> Result<Expr> {
        let mut lhs = self.not()?;
        while self.eat_keyword("and") {
            let rhs = self.not()?;
            lhs = Expr::Binary(BinOp::And, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn not(&mut self) -> Result<Expr> {
        if self.eat_keyword("not") {
            return Ok(Expr::Not(Box::new(self.not()?)));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr> {
        let mut lhs = self.additive()?;
        loop {
            let op = match self.peek_token() {
                Some(Token::Equal) => BinOp::Eq,
                Some(Token::NotEqual) => BinOp::Ne,
                Some(Token::Less) => BinOp::Lt,
                Some(Token::LessEqual) => BinOp::Le,
                Some(Token::Greater) => BinOp::Gt,
                Some(Token::GreaterEqual) => BinOp::Ge,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.additive()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn additive(&mut self) -> Result<Expr> {
        let mut lhs = self.multiplicative()?;
        loop {
            let op = match self.peek_token() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.multiplicative()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn multiplicative(&mut self) -> Result<Expr> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek_token() {
                Some(Token::Star) => BinOp::Mul,
                Some(Token::Slash) => BinOp::Div,
                _ if self.at_keyword("div") => BinOp::IntDiv,
                _ if self.at_keyword("mod") => BinOp::Mod,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn unary(&mut self) -> Result<Expr> {
        if self.eat(Token::Minus) {
            return Ok(Expr::Negate(Box::new(self.unary()?)));
        }
        if self.eat(Token::Plus) {
            return self.unary();
        }
        self.power()
    }

    fn power(&mut self) -> Result<Expr> {
        let base = self.primary()?;
        if self.eat(Token::Caret) {
            let exponent = self.unary()?;
            return Ok(Expr::Binary(BinOp::Pow, Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    fn list(&mut self, close: Token) -> Result<Vec<Expr>> {
        let mut items = Vec::new();
        if self.eat(close) {
            return Ok(items);
        }
        loop {
            items.push(self.expression()?);
            if self.eat(close) {
                return Ok(items);
            }
            self.expect(Token::Comma)?;
        }
    }

    fn braces(&mut self) -> Result<Expr> {
        if self.peek_token() != Some(Token::LBrace) {
            return Ok(Expr::Vector(self.list(Token::RBrace)?));
        }
        let mut rows = Vec::new();
        loop {
            self.expect(Token::LBrace)?;
            rows.push(self.list(Token::RBrace)?);
            if self.eat(Token::RBrace) {
                return Ok(Expr::Matrix(rows));
            }
            self.expect(Token::Comma)?;
        }
    }

    fn primary(&mut self) -> Result<Expr> {
        let Some(token) = self.peek().cloned() else {
            return Err(self.unexpected());
        };
        match token.token {
            Token::Number => {
                self.pos += 1;
                let x = token
                    .lexeme
                    .parse::<f64>()
                    .map_err(|_| Error::praat(format!("Bad number « {} » in formula.", token.lexeme)))?;
                Ok(Expr::Number(x))
            }
            Token::Str => {
                self.pos += 1;
                Ok(Expr::Text(unquote(&token.lexeme)))
            }
            Token::LParen => {
                self.pos += 1;
                let inner = self.expression()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Token::LBrace => {
                self.pos += 1;
                self.braces()
            }
            Token::Ident if token.lexeme == "if" => {
                self.pos += 1;
                let condition = self.expression()?;
                self.expect_keyword("then")?;
                let yes = self.expression()?;
                self.expect_keyword("else")?;
                let no = self.expression()?;
                if !self.eat_keyword("fi") {
                    self.expect_keyword("endif")?;
                }
                Ok(Expr::Conditional(Box::new(condition), Box::new(yes), Box::new(no)))
            }
            Token::Ident => {
                self.pos += 1;
                let name = token.lexeme;
                match self.peek_token() {
                    Some(Token::LParen) => {
                        self.pos += 1;
                        Ok(Expr::Call(name, self.list(Token::RParen)?))
                    }
                    Some(Token::Colon) => {
                        self.pos += 1;
                        let mut args = vec![self.expression()?];
                        while self.eat(Token::Comma) {
                            args.push(self.expression()?);
                        }
                        Ok(Expr::Call(name, args))
                    }
                    Some(Token::LBracket) => {
                        self.pos += 1;
                        Ok(Expr::Index(name, self.list(Token::RBracket)?))
                    }
                    _ => Ok(Expr::Variable(name)),
                }
            }
            _ => Err(self.unexpected()),
        }
    }
}

/// Parse a complete expression.
pub fn parse(text: &str) -> Result<Expr> {
    let mut parser = Parser {
        tokens: tokenize(text)?,
        pos: 0,
    };
    let expr = parser.expression()?;
    if parser.peek().is_some() {
        return Err(parser.unexpected());
    }
    Ok(expr)
}

/// Whether `text` is a plain function call such as `f (1)`, with no
/// operators after it.
pub fn is_call(text: &str) -> bool {
    let Ok(tokens) = tokenize(text) else {
        return false;
    };
    let mut parser = Parser { tokens, pos: 0 };
    if parser.peek_token() != Some(Token::Ident) || parser.peek_second() != Some(Token::LParen) {
        return false;
    }
    matches!(parser.primary(), Ok(Expr::Call(..))) && parser.peek().is_none()
}

// ========== Evaluation ==========

/// What an expression can see besides its own literals.
pub trait Scope {
    /// A variable, by name with its suffix.
    fn variable(&self, name: &str) -> Option<Val>;
    /// The object list, for `selected` and friends.
    fn environment(&self) -> Option<&Environment>;
    /// The random generator.
    fn rng(&mut self) -> &mut StdRng;
}

fn constant(name: &str) -> Option<Val> {
    Some(match name {
        "pi" => Val::Num(std::f64::consts::PI),
        "e" => Val::Num(std::f64::consts::E),
        "undefined" => Val::Num(f64::NAN),
        "newline$" => Val::Str("\n".into()),
        "tab$" => Val::Str("\t".into()),
        _ => return None,
    })
}

fn lookup(name: &str, scope: &dyn Scope) -> Result<Val> {
    scope
        .variable(name)
        .or_else(|| constant(name))
        .ok_or_else(|| Error::praat(format!("Unknown variable « {} ».", name)))
}

fn position(index: f64, size: usize) -> Result<usize> {
    if index.fract() != 0.0 || index < 1.0 || index > size as f64 {
        praat_bail!("Index {} out of range 1..{}.", format_number(index), size);
    }
    Ok(index as usize - 1)
}

fn index(value: Val, indices: &[f64]) -> Result<Val> {
    match (value, indices) {
        (Val::Vec(v), [i]) => Ok(Val::Num(v[position(*i, v.len())?])),
        (Val::StrVec(v), [i]) => Ok(Val::Str(v[position(*i, v.len())?].clone())),
        (Val::Mat(m), [r]) => Ok(Val::Vec(m.row(position(*r, m.nrows())?).to_owned())),
        (Val::Mat(m), [r, c]) => Ok(Val::Num(m[[position(*r, m.nrows())?, position(*c, m.ncols())?]])),
        (other, _) => praat_bail!("Cannot index {} with {} indices.", other.kind_name(), indices.len()),
    }
}

/// Evaluate `expr` in `scope`.
pub fn evaluate(expr: &Expr, scope: &mut dyn Scope) -> Result<Val> {
    match expr {
        Expr::Number(x) => Ok(Val::Num(*x)),
        Expr::Text(s) => Ok(Val::Str(s.clone())),
        Expr::Variable(name) => lookup(name, scope),
        Expr::Vector(items) => {
            let values = items
                .iter()
                .map(|item| evaluate(item, scope)?.as_number())
                .collect::<Result<Vec<f64>>>()?;
            Ok(Val::Vec(Array1::from(values)))
        }
        Expr::Matrix(rows) => {
            let ncols = rows.first().map_or(0, Vec::len);
            let mut values = Vec::with_capacity(rows.len() * ncols);
            for row in rows {
                if row.len() != ncols {
                    praat_bail!("All rows of a matrix should have the same number of columns.");
                }
                for item in row {
                    values.push(evaluate(item, scope)?.as_number()?);
                }
            }
            Array2::from_shape_vec((rows.len(), ncols), values)
                .map(Val::Mat)
                .map_err(|e| Error::praat(e.to_string()))
        }
        Expr::Index(name, indices) => {
            let value = lookup(name, scope)?;
            let indices = indices
                .iter()
                .map(|i| evaluate(i, scope)?.as_number())
                .collect::<Result<Vec<f64>>>()?;
            index(value, &indices)
        }
        Expr::Call(name, args) => {
            let args = args
                .iter()
                .map(|a| evaluate(a, scope))
                .collect::<Result<Vec<Val>>>()?;
            call(name, args, scope)
        }
        Expr::Negate(inner) => map_numeric("-", evaluate(inner, scope)?, |x| -x),
        Expr::Not(inner) => Ok(Val::boolean(!evaluate(inner, scope)?.truth()?)),
        Expr::Binary(BinOp::And, lhs, rhs) => {
            let truth = evaluate(lhs, scope)?.truth()? && evaluate(rhs, scope)?.truth()?;
            Ok(Val::boolean(truth))
        }
        Expr::Binary(BinOp::Or, lhs, rhs) => {
            let truth = evaluate(lhs, scope)?.truth()? || evaluate(rhs, scope)?.truth()?;
            Ok(Val::boolean(truth))
        }
        Expr::Binary(op, lhs, rhs) => {
            let a = evaluate(lhs, scope)?;
            let b = evaluate(rhs, scope)?;
            binary(*op, a, b)
        }
        Expr::Conditional(condition, yes, no) => {
            if evaluate(condition, scope)?.truth()? {
                evaluate(yes, scope)
            } else {
                evaluate(no, scope)
            }
        }
    }
}

fn arithmetic(op: BinOp) -> fn(f64, f64) -> f64 {
    match op {
        BinOp::Add => |x, y| x + y,
        BinOp::Sub => |x, y| x - y,
        BinOp::Mul => |x, y| x * y,
        BinOp::Div => |x, y| if y == 0.0 { f64::NAN } else { x / y },
        BinOp::IntDiv => |x, y| if y == 0.0 { f64::NAN } else { (x / y).floor() },
        BinOp::Mod => |x, y| if y == 0.0 { f64::NAN } else { x - y * (x / y).floor() },
        _ => f64::powf,
    }
}

fn same_size(a: usize, b: usize) -> Result<()> {
    if a != b {
        praat_bail!("Cannot combine a vector of size {} with one of size {}.", a, b);
    }
    Ok(())
}

fn elementwise(op: BinOp, a: Val, b: Val) -> Result<Val> {
    let f = arithmetic(op);
    Ok(match (a, b) {
        (Val::Num(x), Val::Num(y)) => Val::Num(f(x, y)),
        (Val::Vec(v), Val::Num(y)) => Val::Vec(v.mapv(|x| f(x, y))),
        (Val::Num(x), Val::Vec(v)) => Val::Vec(v.mapv(|y| f(x, y))),
        (Val::Mat(m), Val::Num(y)) => Val::Mat(m.mapv(|x| f(x, y))),
        (Val::Num(x), Val::Mat(m)) => Val::Mat(m.mapv(|y| f(x, y))),
        (Val::Vec(u), Val::Vec(v)) => {
            same_size(u.len(), v.len())?;
            Val::Vec(Zip::from(&u).and(&v).map_collect(|&x, &y| f(x, y)))
        }
        (Val::Mat(m), Val::Mat(n)) => {
            if m.dim() != n.dim() {
                praat_bail!("Cannot combine matrices of different shapes.");
            }
            Val::Mat(Zip::from(&m).and(&n).map_collect(|&x, &y| f(x, y)))
        }
        (a, b) => praat_bail!(
            "Cannot apply « {} » to {} and {}.",
            op.symbol(),
            a.kind_name(),
            b.kind_name()
        ),
    })
}

fn binary(op: BinOp, a: Val, b: Val) -> Result<Val> {
    use std::cmp::Ordering;
    let ordering = match (&a, &b) {
        (Val::Num(x), Val::Num(y)) => {
            if x.is_nan() && y.is_nan() {
                Some(Ordering::Equal)
            } else {
                x.partial_cmp(y)
            }
        }
        (Val::Str(s), Val::Str(t)) => Some(s.cmp(t)),
        _ => None,
    };
    match op {
        BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
            if !matches!((&a, &b), (Val::Num(_), Val::Num(_)) | (Val::Str(_), Val::Str(_))) {
                praat_bail!(
                    "Cannot compare {} with {}.",
                    a.kind_name(),
                    b.kind_name()
                );
            }
            let truth = match op {
                BinOp::Eq => ordering == Some(Ordering::Equal),
                BinOp::Ne => ordering != Some(Ordering::Equal),
                BinOp::Lt => ordering == Some(Ordering::Less),
                BinOp::Le => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
                BinOp::Gt => ordering == Some(Ordering::Greater),
                _ => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
            };
            Ok(Val::boolean(truth))
        }
        BinOp::Add => match (a, b) {
            (Val::Str(s), Val::Str(t)) => Ok(Val::Str(s + &t)),
            (a, b) => elementwise(op, a, b),
        },
        BinOp::Sub => match (a, b) {
            (Val::Str(s), Val::Str(t)) => Ok(Val::Str(s.strip_suffix(t.as_str()).unwrap_or(&s).to_string())),
            (a, b) => elementwise(op, a, b),
        },
        _ => elementwise(op, a, b),
    }
}

fn map_numeric(name: &str, value: Val, f: fn(f64) -> f64) -> Result<Val> {
    Ok(match value {
        Val::Num(x) => Val::Num(f(x)),
        Val::Vec(v) => Val::Vec(v.mapv(f)),
        Val::Mat(m) => Val::Mat(m.mapv(f)),
        other => praat_bail!("The function « {} » cannot be applied to {}.", name, other.kind_name()),
    })
}

// ========== Functions ==========

fn math_function(name: &str) -> Option<fn(f64) -> f64> {
    let f: fn(f64) -> f64 = match name {
        "abs" => f64::abs,
        "round" => |x| (x + 0.5).floor(),
        "floor" => f64::floor,
        "ceiling" => f64::ceil,
        "sqrt" => |x| if x < 0.0 { f64::NAN } else { x.sqrt() },
        "exp" => f64::exp,
        "ln" => |x| if x <= 0.0 { f64::NAN } else { x.ln() },
        "log10" => |x| if x <= 0.0 { f64::NAN } else { x.log10() },
        "log2" => |x| if x <= 0.0 { f64::NAN } else { x.log2() },
        "sin" => f64::sin,
        "cos" => f64::cos,
        "tan" => f64::tan,
        "arcsin" => f64::asin,
        "arccos" => f64::acos,
        "arctan" => f64::atan,
        "sinh" => f64::sinh,
        "cosh" => f64::cosh,
        "tanh" => f64::tanh,
        "sigmoid" => |x| 1.0 / (1.0 + (-x).exp()),
        "isundefined" => |x| if x.is_finite() { 0.0 } else { 1.0 },
        _ => return None,
    };
    Some(f)
}

/// Arguments of one function call.
struct Call<'a> {
    name: &'a str,
    args: Vec<Val>,
}

impl Call<'_> {
    fn arity(&self, min: usize, max: usize) -> Result<()> {
        let n = self.args.len();
        if n < min || n > max {
            if min == max {
                praat_bail!("The function « {} » requires {} argument(s), not {}.", self.name, min, n);
            }
            praat_bail!(
                "The function « {} » requires {} to {} arguments, not {}.",
                self.name,
                min,
                max,
                n
            );
        }
        Ok(())
    }

    fn arg(&self, i: usize) -> Result<&Val> {
        self.args
            .get(i)
            .ok_or_else(|| Error::praat(format!("The function « {} » lacks argument {}.", self.name, i + 1)))
    }

    fn wrong(&self, i: usize, wanted: &str) -> Error {
        let got = self.args.get(i).map_or("nothing", Val::kind_name);
        Error::praat(format!(
            "Argument {} of « {} » should be {}, not {}.",
            i + 1,
            self.name,
            wanted,
            got
        ))
    }

    fn num(&self, i: usize) -> Result<f64> {
        match self.arg(i)? {
            Val::Num(x) => Ok(*x),
            _ => Err(self.wrong(i, "a number")),
        }
    }

    fn num_or(&self, i: usize, default: f64) -> Result<f64> {
        if i < self.args.len() {
            self.num(i)
        } else {
            Ok(default)
        }
    }

    fn count(&self, i: usize) -> Result<usize> {
        let x = self.num(i)?;
        if x.is_nan() || x < 0.0 {
            praat_bail!(
                "Argument {} of « {} » should be a non-negative number, not {}.",
                i + 1,
                self.name,
                format_number(x)
            );
        }
        Ok(x.round() as usize)
    }

    fn text(&self, i: usize) -> Result<&str> {
        match self.arg(i)? {
            Val::Str(s) => Ok(s),
            _ => Err(self.wrong(i, "a string")),
        }
    }

    fn vector(&self, i: usize) -> Result<&Array1<f64>> {
        match self.arg(i)? {
            Val::Vec(v) => Ok(v),
            _ => Err(self.wrong(i, "a vector")),
        }
    }

    fn matrix(&self, i: usize) -> Result<&Array2<f64>> {
        match self.arg(i)? {
            Val::Mat(m) => Ok(m),
            _ => Err(self.wrong(i, "a matrix")),
        }
    }
}

fn char_index(haystack: &str, byte: usize) -> f64 {
    (haystack[..byte].chars().count() + 1) as f64
}

fn regex(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| Error::praat(format!("Invalid regular expression « {} »: {}.", pattern, e)))
}

/// Turn `\1` style back references into the `${1}` the regex crate expects.
fn replacement(to: &str) -> String {
    let mut out = String::with_capacity(to.len());
    let mut chars = to.chars().peekable();
    while let Some(c) = chars.next() {
        match (c, chars.peek()) {
            ('\\', Some(d)) if d.is_ascii_digit() => {
                out.push_str(&format!("${{{}}}", d));
                chars.next();
            }
            ('$', _) => out.push_str("$$"),
            _ => out.push(c),
        }
    }
    out
}

fn after<'s>(text: &'s str, marker: &str) -> Option<&'s str> {
    if marker.is_empty() {
        return Some(text);
    }
    text.find(marker).map(|at| &text[at + marker.len()..])
}

fn gauss(rng: &mut StdRng) -> f64 {
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

fn poisson(rng: &mut StdRng, mean: f64) -> f64 {
    if mean > 500.0 {
        return (mean + mean.sqrt() * gauss(rng)).round().max(0.0);
    }
    let limit = (-mean).exp();
    let mut k = 0.0;
    let mut p: f64 = rng.gen();
    while p > limit {
        k += 1.0;
        p *= rng.gen::<f64>();
    }
    k
}

fn class_named(name: &str) -> Result<Class> {
    Class::from_name(name).ok_or_else(|| Error::praat(format!("Unknown object type « {} ».", name)))
}

fn selection(c: &Call, env: &Environment) -> Result<Val> {
    let (class, n) = match c.args.as_slice() {
        [] => (None, 1),
        [Val::Num(n)] => (None, *n as i64),
        [Val::Str(s)] => (Some(class_named(s)?), 1),
        [Val::Str(s), Val::Num(n)] => (Some(class_named(s)?), *n as i64),
        _ => praat_bail!("The function « {} » takes an optional object type and position.", c.name),
    };
    match c.name {
        "numberOfSelected" => Ok(Val::Num(env.selected_of(class).len() as f64)),
        "selected" => Ok(Val::Num(env.selected_nth(class, n)? as f64)),
        _ => {
            let thing = env.get(env.selected_nth(class, n)?)?;
            let name = thing.name().unwrap_or("untitled");
            Ok(Val::Str(match class {
                Some(_) => name.to_string(),
                None => format!("{} {}", thing.class(), name),
            }))
        }
    }
}

/// Call the built-in function `name`.
pub fn call(name: &str, args: Vec<Val>, scope: &mut dyn Scope) -> Result<Val> {
    let c = Call { name, args };
    if let Some(f) = math_function(name) {
        c.arity(1, 1)?;
        let Call { args, .. } = c;
        let value = args.into_iter().next().unwrap_or(Val::Num(f64::NAN));
        return map_numeric(name, value, f);
    }
    let value = match name {
        // Numbers
        "arctan2" => {
            c.arity(2, 2)?;
            Val::Num(c.num(0)?.atan2(c.num(1)?))
        }
        "min" | "max" => {
            let values: Vec<f64> = match c.args.as_slice() {
                [Val::Vec(v)] => v.to_vec(),
                _ => (0..c.args.len()).map(|i| c.num(i)).collect::<Result<_>>()?,
            };
            if values.is_empty() {
                praat_bail!("The function « {} » requires at least one number.", name);
            }
            let pick = if name == "min" { f64::min } else { f64::max };
            Val::Num(values[1..].iter().fold(values[0], |acc, &x| pick(acc, x)))
        }

        // Random numbers
        "randomUniform" => {
            c.arity(2, 2)?;
            let (lo, hi) = (c.num(0)?, c.num(1)?);
            Val::Num(lo + (hi - lo) * scope.rng().gen::<f64>())
        }
        "randomInteger" => {
            c.arity(2, 2)?;
            let (lo, hi) = (c.num(0)?.round() as i64, c.num(1)?.round() as i64);
            if hi < lo {
                praat_bail!("randomInteger: the maximum should not be less than the minimum.");
            }
            Val::Num(scope.rng().gen_range(lo..=hi) as f64)
        }
        "randomGauss" => {
            c.arity(2, 2)?;
            let (mu, sigma) = (c.num(0)?, c.num(1)?);
            Val::Num(mu + sigma * gauss(scope.rng()))
        }
        "randomPoisson" => {
            c.arity(1, 1)?;
            Val::Num(poisson(scope.rng(), c.num(0)?))
        }
        "random_initializeWithSeedUnsafelyButPredictably" => {
            c.arity(1, 1)?;
            *scope.rng() = StdRng::seed_from_u64(c.num(0)? as u64);
            Val::Num(0.0)
        }
        "random_initializeSafelyAndUnpredictably" => {
            c.arity(0, 0)?;
            *scope.rng() = StdRng::from_entropy();
            Val::Num(0.0)
        }

        // Strings
        "length" => {
            c.arity(1, 1)?;
            Val::Num(c.text(0)?.chars().count() as f64)
        }
        "left$" | "right$" => {
            c.arity(1, 2)?;
            let s = c.text(0)?;
            let n = if c.args.len() > 1 { c.count(1)? } else { 1 };
            let len = s.chars().count();
            Val::Str(if name == "left$" {
                s.chars().take(n).collect()
            } else {
                s.chars().skip(len.saturating_sub(n)).collect()
            })
        }
        "mid$" => {
            c.arity(2, 3)?;
            let s = c.text(0)?;
            let start = c.num(1)?.round().max(1.0) as usize;
            let n = if c.args.len() > 2 { c.count(2)? } else { 1 };
            Val::Str(s.chars().skip(start - 1).take(n).collect())
        }
        "index" | "rindex" => {
            c.arity(2, 2)?;
            let (s, part) = (c.text(0)?, c.text(1)?);
            let found = if name == "index" { s.find(part) } else { s.rfind(part) };
            Val::Num(found.map_or(0.0, |at| char_index(s, at)))
        }
        "index_regex" | "rindex_regex" => {
            c.arity(2, 2)?;
            let s = c.text(0)?;
            let re = regex(c.text(1)?)?;
            let found = if name == "index_regex" {
                re.find(s)
            } else {
                re.find_iter(s).last()
            };
            Val::Num(found.map_or(0.0, |m| char_index(s, m.start())))
        }
        "replace$" => {
            c.arity(4, 4)?;
            let (s, from, to) = (c.text(0)?, c.text(1)?, c.text(2)?);
            let n = c.count(3)?;
            Val::Str(if from.is_empty() {
                s.to_string()
            } else if n == 0 {
                s.replace(from, to)
            } else {
                s.replacen(from, to, n)
            })
        }
        "replace_regex$" => {
            c.arity(4, 4)?;
            let s = c.text(0)?;
            let re = regex(c.text(1)?)?;
            let to = replacement(c.text(2)?);
            Val::Str(re.replacen(s, c.count(3)?, to.as_str()).into_owned())
        }
        "startsWith" => {
            c.arity(2, 2)?;
            Val::boolean(c.text(0)?.starts_with(c.text(1)?))
        }
        "endsWith" => {
            c.arity(2, 2)?;
            Val::boolean(c.text(0)?.ends_with(c.text(1)?))
        }
        "fixed$" | "percent$" => {
            c.arity(2, 2)?;
            let (x, digits) = (c.num(0)?, c.count(1)?);
            Val::Str(if x.is_nan() {
                "--undefined--".to_string()
            } else if name == "fixed$" {
                format!("{:.*}", digits, x)
            } else {
                format!("{:.*}%", digits, 100.0 * x)
            })
        }
        "string$" => {
            c.arity(1, 1)?;
            Val::Str(format_number(c.num(0)?))
        }
        "number" => {
            c.arity(1, 1)?;
            Val::Num(parse_number(c.text(0)?))
        }
        "extractNumber" => {
            c.arity(2, 2)?;
            Val::Num(after(c.text(0)?, c.text(1)?).map_or(f64::NAN, parse_number))
        }
        "extractWord$" | "extractLine$" => {
            c.arity(2, 2)?;
            let rest = after(c.text(0)?, c.text(1)?).unwrap_or("");
            Val::Str(if name == "extractWord$" {
                rest.split_whitespace().next().unwrap_or("").to_string()
            } else {
                rest.lines().next().unwrap_or("").to_string()
            })
        }

        // Vectors and matrices
        "zero#" => {
            c.arity(1, 1)?;
            Val::Vec(Array1::zeros(c.count(0)?))
        }
        "linear#" => {
            c.arity(3, 4)?;
            let (lo, hi, n) = (c.num(0)?, c.num(1)?, c.count(2)?);
            let exclude_edges = c.num_or(3, 0.0)? != 0.0;
            Val::Vec(if exclude_edges {
                let step = (hi - lo) / n as f64;
                Array1::from_iter((0..n).map(|i| lo + (i as f64 + 0.5) * step))
            } else if n == 1 {
                Array1::from_elem(1, lo)
            } else {
                Array1::linspace(lo, hi, n)
            })
        }
        "from_to#" => {
            c.arity(2, 2)?;
            let (from, to) = (c.num(0)?, c.num(1)?);
            let n = if to < from { 0 } else { (to - from).floor() as usize + 1 };
            Val::Vec(Array1::from_iter((0..n).map(|i| from + i as f64)))
        }
        "to#" => {
            c.arity(1, 1)?;
            Val::Vec(Array1::from_iter((1..=c.count(0)?).map(|i| i as f64)))
        }
        "randomUniform#" | "randomGauss#" => {
            c.arity(3, 3)?;
            let (n, a, b) = (c.count(0)?, c.num(1)?, c.num(2)?);
            let rng = scope.rng();
            let values: Vec<f64> = (0..n)
                .map(|_| {
                    if name == "randomUniform#" {
                        a + (b - a) * rng.gen::<f64>()
                    } else {
                        a + b * gauss(rng)
                    }
                })
                .collect();
            Val::Vec(Array1::from(values))
        }
        "size" => {
            c.arity(1, 1)?;
            match c.arg(0)? {
                Val::StrVec(v) => Val::Num(v.len() as f64),
                _ => Val::Num(c.vector(0)?.len() as f64),
            }
        }
        "sum" => {
            c.arity(1, 1)?;
            match c.arg(0)? {
                Val::Mat(m) => Val::Num(m.sum()),
                _ => Val::Num(c.vector(0)?.sum()),
            }
        }
        "mean" => {
            c.arity(1, 1)?;
            Val::Num(c.vector(0)?.mean().unwrap_or(f64::NAN))
        }
        "stdev" => {
            c.arity(1, 1)?;
            let v = c.vector(0)?;
            Val::Num(if v.len() < 2 { f64::NAN } else { v.std(1.0) })
        }
        "inner" => {
            c.arity(2, 2)?;
            let (u, v) = (c.vector(0)?, c.vector(1)?);
            same_size(u.len(), v.len())?;
            Val::Num(u.dot(v))
        }
        "norm" => {
            c.arity(1, 1)?;
            let v = c.vector(0)?;
            Val::Num(v.dot(v).sqrt())
        }
        "sort#" => {
            c.arity(1, 1)?;
            let mut values = c.vector(0)?.to_vec();
            values.sort_by(|a, b| a.total_cmp(b));
            Val::Vec(Array1::from(values))
        }
        "reverse#" => {
            c.arity(1, 1)?;
            Val::Vec(c.vector(0)?.iter().rev().copied().collect())
        }
        "numberOfRows" | "numberOfColumns" => {
            c.arity(1, 1)?;
            let m = c.matrix(0)?;
            let n = if name == "numberOfRows" { m.nrows() } else { m.ncols() };
            Val::Num(n as f64)
        }
        "zero##" => {
            c.arity(2, 2)?;
            Val::Mat(Array2::zeros((c.count(0)?, c.count(1)?)))
        }
        "transpose##" => {
            c.arity(1, 1)?;
            Val::Mat(c.matrix(0)?.t().to_owned())
        }

        // The object list
        "selected" | "selected$" | "numberOfSelected" => {
            let Some(env) = scope.environment() else {
                praat_bail!("The function « {} » needs an object list.", name);
            };
            selection(&c, env)?
        }

        _ => praat_bail!("Unknown function « {} » in formula.", name),
    };
    Ok(value)
}

// ========== Formulas ==========

/// Wraps a scope and adds the cell variables of a formula.
struct CellScope<'a> {
    inner: &'a mut dyn Scope,
    cell: Cell,
}

impl Scope for CellScope<'_> {
    fn variable(&self, name: &str) -> Option<Val> {
        let cell = &self.cell;
        match name {
            "self" => Some(Val::Num(cell.value)),
            "row" => Some(Val::Num(cell.row as f64)),
            "col" => Some(Val::Num(cell.col as f64)),
            "x" => Some(Val::Num(cell.x)),
            "y" => Some(Val::Num(cell.y)),
            _ => self.inner.variable(name),
        }
    }

    fn environment(&self) -> Option<&Environment> {
        self.inner.environment()
    }

    fn rng(&mut self) -> &mut StdRng {
        self.inner.rng()
    }
}

/// A parsed formula, evaluated once per cell of a Sound or Matrix.
///
/// Inside the formula `self` is the current value, `row` and `col` the
/// 1-based cell position, `x` and `y` its coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    expr: Expr,
}

impl Formula {
    pub fn parse(text: &str) -> Result<Self> {
        Ok(Self { expr: parse(text)? })
    }

    /// The value for one cell.
    pub fn cell_value(&self, scope: &mut dyn Scope, cell: Cell) -> Result<f64> {
        let mut cell_scope = CellScope { inner: scope, cell };
        match evaluate(&self.expr, &mut cell_scope)? {
            Val::Num(x) => Ok(x),
            other => praat_bail!("A numeric formula should produce a number, not {}.", other.kind_name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Bare {
        vars: Variables,
        rng: StdRng,
    }

    impl Bare {
        fn new() -> Self {
            Self {
                vars: Variables::new(),
                rng: StdRng::seed_from_u64(1),
            }
        }
    }

    impl Scope for Bare {
        fn variable(&self, name: &str) -> Option<Val> {
            self.vars.get(name).cloned()
        }
        fn environment(&self) -> Option<&Environment> {
            None
        }
        fn rng(&mut self) -> &mut StdRng {
            &mut self.rng
        }
    }

    fn eval(text: &str) -> Val {
        evaluate(&parse(text).unwrap(), &mut Bare::new()).unwrap()
    }

    fn num(text: &str) -> f64 {
        eval(text).as_number().unwrap()
    }

    #[test]
    fn precedence() {
        assert_eq!(num("1 + 2 * 3"), 7.0);
        assert_eq!(num("-2 ^ 2"), -4.0);
        assert_eq!(num("2 ^ 3 ^ 2"), 512.0);
        assert_eq!(num("7 div 2 + 7 mod 2"), 4.0);
        assert_eq!(num("-7 mod 3"), 2.0);
        assert_eq!(num("1 < 2 and not 3 = 4"), 1.0);
        assert_eq!(num("0 or 0"), 0.0);
    }

    #[test]
    fn division_by_zero_is_undefined() {
        assert!(num("1 / 0").is_nan());
        assert_eq!(num("undefined = undefined"), 1.0);
        assert_eq!(num("isundefined (1/0)"), 1.0);
    }

    #[test]
    fn strings() {
        assert_eq!(eval("\"abc\" + \"def\""), Val::Str("abcdef".into()));
        assert_eq!(eval("\"hello.wav\" - \".wav\""), Val::Str("hello".into()));
        assert_eq!(eval("left$ (\"hello\", 2) + right$ (\"hello\", 3)"), Val::Str("hello".into()));
        assert_eq!(eval("mid$ (\"hello\", 2, 3)"), Val::Str("ell".into()));
        assert_eq!(num("index (\"hello\", \"l\") + rindex (\"hello\", \"l\")"), 7.0);
        assert_eq!(eval("replace$ (\"a-b-c\", \"-\", \"+\", 0)"), Val::Str("a+b+c".into()));
        assert_eq!(eval("replace_regex$ (\"ab12\", \"([a-z]+)\", \"<\\1>\", 0)"), Val::Str("<ab>12".into()));
        assert_eq!(eval("fixed$ (pi, 3)"), Val::Str("3.142".into()));
        assert_eq!(num("extractNumber (\"F0 = 120.5 Hz\", \"F0 = \")"), 120.5);
        assert_eq!(num("\"abc\" < \"abd\""), 1.0);
    }

    #[test]
    fn negative_counts_are_reported_with_their_value() {
        let err = evaluate(&parse("left$ (\"hello\", -2)").unwrap(), &mut Bare::new()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Argument 2 of « left$ » should be a non-negative number, not -2."
        );
    }

    #[test]
    fn vectors_and_matrices() {
        assert_eq!(eval("{1, 2, 3} * 2"), Val::Vec(Array1::from(vec![2.0, 4.0, 6.0])));
        assert_eq!(num("sum (linear# (0, 10, 6))"), 30.0);
        assert_eq!(num("size (from_to# (3, 7))"), 5.0);
        assert_eq!(eval("sort# ({3, 1, 2})"), Val::Vec(Array1::from(vec![1.0, 2.0, 3.0])));
        let m = eval("{{1, 2}, {3, 4}}");
        assert_eq!(m, Val::Mat(ndarray::array![[1.0, 2.0], [3.0, 4.0]]));
        let mut scope = Bare::new();
        scope.vars.insert("m##".into(), m);
        scope.vars.insert("v#".into(), Val::Vec(Array1::from(vec![5.0, 6.0])));
        let indexed = evaluate(&parse("m## [2, 1] + v# [2]").unwrap(), &mut scope).unwrap();
        assert_eq!(indexed, Val::Num(9.0));
        assert!(evaluate(&parse("v# [3]").unwrap(), &mut scope).is_err());
    }

    #[test]
    fn conditional_expression() {
        assert_eq!(num("if 2 > 1 then 10 else 20 fi"), 10.0);
        assert_eq!(eval("if 0 then \"a\" else \"b\" endif"), Val::Str("b".into()));
    }

    #[test]
    fn seeded_random_numbers_repeat() {
        let mut scope = Bare::new();
        let seed = parse("random_initializeWithSeedUnsafelyButPredictably (5489)").unwrap();
        let draw = parse("randomInteger (1, 1000) + randomUniform (0, 1)").unwrap();
        evaluate(&seed, &mut scope).unwrap();
        let first = evaluate(&draw, &mut scope).unwrap();
        evaluate(&seed, &mut scope).unwrap();
        assert_eq!(evaluate(&draw, &mut scope).unwrap(), first);
    }

    #[test]
    fn errors_name_the_culprit() {
        let err = evaluate(&parse("foo (1)").unwrap(), &mut Bare::new()).unwrap_err();
        assert_eq!(err.to_string(), "Unknown function « foo » in formula.");
        let err = evaluate(&parse("x + 1").unwrap(), &mut Bare::new()).unwrap_err();
        assert_eq!(err.to_string(), "Unknown variable « x ».");
        assert!(parse("1 +").is_err());
        assert!(parse("(1").is_err());
    }

    #[test]
    fn bare_calls_are_recognised() {
        assert!(is_call("random_initializeWithSeedUnsafelyButPredictably (5489)"));
        assert!(!is_call("f (1) + 2"));
        assert!(!is_call("x"));
    }

    #[test]
    fn formula_sees_cell_variables() {
        let formula = Formula::parse("self + row * 10 + x").unwrap();
        let cell = Cell {
            row: 2,
            col: 1,
            x: 0.5,
            y: 0.0,
            value: 1.0,
        };
        assert_eq!(formula.cell_value(&mut Bare::new(), cell).unwrap(), 21.5);
        let text = Formula::parse("\"a\"").unwrap();
        assert!(text.cell_value(&mut Bare::new(), cell).is_err());
    }
}
