//! SQL text scanner using nom.
//!
//! This is not a SQL parser. It splits statement text into just enough
//! tokens to find positional `?` placeholders that sit outside string
//! literals, quoted identifiers and comments, and to recognize a full
//! `CREATE PROCEDURE` header inside a procedure definition.
//!
//! ```text
//! CALL "p?"(?, 'a?b', ?) -- trailing?
//!        │  │    │    │       │
//!        │  │    │    │       └── comment, ignored
//!        │  │    │    └── placeholder #2
//!        │  │    └── string literal, ignored
//!        │  └── placeholder #1
//!        └── quoted identifier, ignored
//! ```

use nom::{
    branch::alt,
    bytes::complete::{is_not, tag, tag_no_case, take_until},
    character::complete::{anychar, char, multispace1},
    combinator::{map, opt, recognize, value},
    multi::{many0, many_till},
    sequence::{pair, tuple},
    IResult,
};

use crate::error::{HanaError, HanaResult};

/// Placeholder token replaced by the procedure name in full definitions.
pub const NAME_PLACEHOLDER: &str = "{name}";

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token<'a> {
    Text(&'a str),
    Placeholder,
}

/// Parse a single-quoted string literal ('' escapes a quote).
fn string_literal(input: &str) -> IResult<&str, &str> {
    recognize(tuple((
        char('\''),
        many0(alt((is_not("'"), tag("''")))),
        char('\''),
    )))(input)
}

/// Parse a double-quoted identifier ("" escapes a quote).
fn quoted_identifier(input: &str) -> IResult<&str, &str> {
    recognize(tuple((
        char('"'),
        many0(alt((is_not("\""), tag("\"\"")))),
        char('"'),
    )))(input)
}

fn line_comment(input: &str) -> IResult<&str, &str> {
    recognize(pair(tag("--"), opt(is_not("\n"))))(input)
}

fn block_comment(input: &str) -> IResult<&str, &str> {
    recognize(tuple((tag("/*"), take_until("*/"), tag("*/"))))(input)
}

/// Plain text up to the next interesting character, or one stray character.
fn plain(input: &str) -> IResult<&str, &str> {
    alt((is_not("'\"?-/"), recognize(anychar)))(input)
}

fn token(input: &str) -> IResult<&str, Token<'_>> {
    alt((
        map(string_literal, Token::Text),
        map(quoted_identifier, Token::Text),
        map(line_comment, Token::Text),
        map(block_comment, Token::Text),
        value(Token::Placeholder, char('?')),
        map(plain, Token::Text),
    ))(input)
}

fn tokenize(sql: &str) -> HanaResult<Vec<Token<'_>>> {
    match many0(token)(sql) {
        Ok(("", tokens)) => Ok(tokens),
        Ok((remaining, _)) => Err(HanaError::argument(format!(
            "Unexpected trailing content at position {}: '{}'",
            sql.len() - remaining.len(),
            remaining
        ))),
        Err(e) => Err(HanaError::argument(format!("Scan failed: {:?}", e))),
    }
}

/// Count positional placeholders in `sql`.
pub fn placeholder_count(sql: &str) -> HanaResult<usize> {
    Ok(tokenize(sql)?
        .iter()
        .filter(|t| matches!(t, Token::Placeholder))
        .count())
}

/// Substitute placeholders positionally.
///
/// `values[i]` belongs to the i-th placeholder. `Some(text)` is inserted
/// verbatim, `None` leaves the `?` in place for later binding.
pub fn bind_placeholders(sql: &str, values: &[Option<String>]) -> HanaResult<String> {
    let tokens = tokenize(sql)?;
    let expected = tokens.iter().filter(|t| matches!(t, Token::Placeholder)).count();
    if expected != values.len() {
        return Err(HanaError::argument(format!(
            "Statement has {} placeholder(s) but {} value(s) were given",
            expected,
            values.len()
        )));
    }

    let mut out = String::with_capacity(sql.len());
    let mut values = values.iter();
    for token in tokens {
        match token {
            Token::Text(text) => out.push_str(text),
            Token::Placeholder => match values.next() {
                Some(Some(literal)) => out.push_str(literal),
                _ => out.push('?'),
            },
        }
    }
    Ok(out)
}

fn create_procedure_header(input: &str) -> IResult<&str, ()> {
    value(
        (),
        tuple((tag_no_case("create"), multispace1, tag_no_case("procedure"))),
    )(input)
}

/// Whether a definition already carries its own `CREATE PROCEDURE` header.
pub fn is_create_procedure(definition: &str) -> bool {
    many_till(anychar, create_procedure_header)(definition).is_ok()
}
