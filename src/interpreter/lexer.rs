//! Tokens of Praat-script expressions.

use logos::Logos;

use crate::error::{praat_bail, Result};

#[derive(Logos, Debug, PartialEq, Clone, Copy)]
#[logos(skip r"[ \t\r\n]+")]
pub enum Token {
    // Literals and names
    #[regex(r"[0-9]+(\.[0-9]*)?([eE][+-]?[0-9]+)?")]
    #[regex(r"\.[0-9]+([eE][+-]?[0-9]+)?")]
    Number,
    #[regex(r#""([^"]|"")*""#)]
    Str,
    /// A name with its type suffix: `x`, `s$`, `v#`, `m##`, `t$#`.
    #[regex(r"[A-Za-z_][A-Za-z0-9_.]*(\$#|\$|##|#)?")]
    Ident,

    // Operators
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("^")]
    Caret,
    #[token("=")]
    #[token("==")]
    Equal,
    #[token("<>")]
    #[token("!=")]
    NotEqual,
    #[token("<")]
    Less,
    #[token("<=")]
    LessEqual,
    #[token(">")]
    Greater,
    #[token(">=")]
    GreaterEqual,

    // Punctuation
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    pub lexeme: String,
    pub start: usize,
    pub end: usize,
}

/// Split `input` into tokens; an unknown character is an error.
pub fn tokenize(input: &str) -> Result<Vec<SpannedToken>> {
    let mut lex = Token::lexer(input);
    let mut out = Vec::new();
    while let Some(res) = lex.next() {
        let span = lex.span();
        match res {
            Ok(token) => out.push(SpannedToken {
                token,
                lexeme: lex.slice().to_string(),
                start: span.start,
                end: span.end,
            }),
            Err(()) => praat_bail!("Unknown symbol « {} » in formula.", lex.slice()),
        }
    }
    Ok(out)
}

/// The text of a string literal, with doubled quotes undone.
pub fn unquote(lexeme: &str) -> String {
    let inner = lexeme
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(lexeme);
    inner.replace("\"\"", "\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<Token> {
        tokenize(input).unwrap().into_iter().map(|t| t.token).collect()
    }

    #[test]
    fn names_keep_their_suffix() {
        let tokens = tokenize("a$ + b# * c## - d").unwrap();
        let names: Vec<&str> = tokens
            .iter()
            .filter(|t| t.token == Token::Ident)
            .map(|t| t.lexeme.as_str())
            .collect();
        assert_eq!(names, vec!["a$", "b#", "c##", "d"]);
    }

    #[test]
    fn numbers_and_comparisons() {
        assert_eq!(
            kinds("1.5e3 <= .25 <> 3"),
            vec![Token::Number, Token::LessEqual, Token::Number, Token::NotEqual, Token::Number]
        );
        assert_eq!(kinds("x = 1"), vec![Token::Ident, Token::Equal, Token::Number]);
    }

    #[test]
    fn doubled_quotes_in_strings() {
        let tokens = tokenize(r#""say ""hi""""#).unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(unquote(&tokens[0].lexeme), r#"say "hi""#);
    }

    #[test]
    fn unknown_symbols_fail() {
        assert!(tokenize("a @ b").is_err());
    }
}
