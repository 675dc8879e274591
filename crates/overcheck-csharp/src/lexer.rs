//! Tokenizer for the C# subset.
//!
//! Comments, whitespace, and preprocessor lines are trivia and produce no
//! tokens. Every token carries its byte span in the source; token text is
//! always read back through the span.
//!
//! Not supported: raw string literals (`"""`), verbatim identifiers
//! (`@class`), and call sites inside interpolation holes.

use overcheck_core::patch::Span;
use thiserror::Error;
use winnow::ascii::{digit1, multispace1};
use winnow::combinator::{alt, opt, repeat};
use winnow::prelude::*;
use winnow::token::{any, none_of, one_of, take_until, take_while};
use winnow::ModalResult;

// ============================================================================
// Tokens
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Identifiers and keywords alike; the parser tells them apart.
    Ident,
    Number,
    String,
    Char,
    Punct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.span.as_range()]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("unterminated {what} starting at byte {offset}")]
    Unterminated { what: &'static str, offset: usize },

    #[error("unexpected character {ch:?} at byte {offset}")]
    UnexpectedChar { ch: char, offset: usize },
}

impl LexError {
    pub fn offset(&self) -> usize {
        match self {
            LexError::Unterminated { offset, .. } | LexError::UnexpectedChar { offset, .. } => {
                *offset
            }
        }
    }
}

/// Split `source` into tokens.
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    let mut input = source;
    let mut tokens = Vec::new();

    loop {
        trivia
            .parse_next(&mut input)
            .map_err(|_| LexError::Unterminated {
                what: "comment",
                offset: source.len() - input.len(),
            })?;
        let start = source.len() - input.len();
        if input.starts_with("/*") {
            return Err(LexError::Unterminated {
                what: "comment",
                offset: start,
            });
        }
        let Some(ch) = input.chars().next() else {
            break;
        };

        let kind = token.parse_next(&mut input).map_err(|_| match ch {
            '"' | '$' | '@' => LexError::Unterminated {
                what: "string literal",
                offset: start,
            },
            '\'' => LexError::Unterminated {
                what: "character literal",
                offset: start,
            },
            _ => LexError::UnexpectedChar { ch, offset: start },
        })?;
        let end = source.len() - input.len();
        tokens.push(Token {
            kind,
            span: Span::new(start, end),
        });
    }

    Ok(tokens)
}

// ============================================================================
// Trivia
// ============================================================================

fn line_comment(input: &mut &str) -> ModalResult<()> {
    ("//", take_while(0.., |c: char| c != '\n'))
        .void()
        .parse_next(input)
}

fn block_comment(input: &mut &str) -> ModalResult<()> {
    ("/*", take_until(0.., "*/"), "*/").void().parse_next(input)
}

/// `#region`, `#nullable enable`, and friends.
fn directive(input: &mut &str) -> ModalResult<()> {
    ('#', take_while(0.., |c: char| c != '\n'))
        .void()
        .parse_next(input)
}

fn trivia(input: &mut &str) -> ModalResult<()> {
    repeat(
        0..,
        alt((multispace1.void(), line_comment, block_comment, directive)),
    )
    .parse_next(input)
}

// ============================================================================
// Token Parsers
// ============================================================================

fn token(input: &mut &str) -> ModalResult<TokenKind> {
    alt((
        verbatim_string.value(TokenKind::String),
        regular_string.value(TokenKind::String),
        char_literal.value(TokenKind::Char),
        number.value(TokenKind::Number),
        identifier.value(TokenKind::Ident),
        punct.value(TokenKind::Punct),
    ))
    .parse_next(input)
}

fn identifier(input: &mut &str) -> ModalResult<()> {
    (
        one_of(|c: char| c == '_' || c.is_alphabetic()),
        take_while(0.., |c: char| c == '_' || c.is_alphanumeric()),
    )
        .void()
        .parse_next(input)
}

/// `"..."` and `$"..."` with backslash escapes.
fn regular_string(input: &mut &str) -> ModalResult<()> {
    (
        opt('$'),
        '"',
        repeat::<_, _, (), _, _>(
            0..,
            alt((('\\', any).void(), none_of(['"', '\\', '\n']).void())),
        ),
        '"',
    )
        .void()
        .parse_next(input)
}

/// `@"..."`, `$@"..."`, `@$"..."`: no escapes except a doubled quote.
fn verbatim_string(input: &mut &str) -> ModalResult<()> {
    (
        alt(("$@", "@$", "@")),
        '"',
        repeat::<_, _, (), _, _>(0.., alt(("\"\"".void(), none_of(['"']).void()))),
        '"',
    )
        .void()
        .parse_next(input)
}

fn char_literal(input: &mut &str) -> ModalResult<()> {
    (
        '\'',
        alt((
            ('\\', any, take_while(0.., |c: char| c != '\'' && c != '\n')).void(),
            none_of(['\'', '\\', '\n']).void(),
        )),
        '\'',
    )
        .void()
        .parse_next(input)
}

fn number(input: &mut &str) -> ModalResult<()> {
    alt((
        (
            alt(("0x", "0X", "0b", "0B")),
            take_while(1.., |c: char| c.is_ascii_hexdigit() || c == '_'),
            take_while(0.., |c: char| c.is_ascii_alphabetic()),
        )
            .void(),
        (
            digit1,
            take_while(0.., |c: char| c.is_ascii_digit() || c == '_'),
            opt(('.', digit1)),
            opt((one_of(['e', 'E']), opt(one_of(['+', '-'])), digit1)),
            take_while(0.., |c: char| c.is_ascii_alphabetic()),
        )
            .void(),
    ))
    .parse_next(input)
}

/// Operators and punctuation. `>>` is never one token so nested generic
/// argument lists close cleanly.
fn punct(input: &mut &str) -> ModalResult<()> {
    alt((
        alt((
            "=>", "?.", "??=", "??", "::", "==", "!=", "<=", ">=", "&&", "||", "++", "--",
        ))
        .void(),
        alt(("+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=")).void(),
        one_of(|c: char| "{}()[];,.:?=<>+-*/%&|^!~".contains(c)).void(),
    ))
    .parse_next(input)
}

// ============================================================================
// Literal Types
// ============================================================================

/// The C# type of a numeric literal, from its suffix and shape.
pub fn numeric_literal_type(text: &str) -> &'static str {
    let lower = text.to_ascii_lowercase();
    let is_hex = lower.starts_with("0x") || lower.starts_with("0b");
    if lower.ends_with("ul") || lower.ends_with("lu") {
        return "ulong";
    }
    if lower.ends_with('l') {
        return "long";
    }
    if lower.ends_with('u') {
        return "uint";
    }
    if is_hex {
        return "int";
    }
    if lower.ends_with('f') {
        return "float";
    }
    if lower.ends_with('m') {
        return "decimal";
    }
    if lower.ends_with('d') || lower.contains('.') || lower.contains('e') {
        return "double";
    }
    "int"
}
