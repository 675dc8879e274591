//! Call-site scanning inside member bodies.
//!
//! Bodies are not parsed into statements. The scanner makes two passes over
//! a body's tokens:
//!
//! 1. Record local declarations (`Type name =`, `var name = new T()`,
//!    `foreach (Type name in`, `out var name`) with their declared types.
//! 2. Report every identifier used as an invocation or a method group,
//!    with its receiver and, for invocations, the static argument types
//!    that can be read off the tokens.
//!
//! Anything the scanner cannot classify becomes `Receiver::Expression` or
//! `ArgType::Unknown`, which the binder treats conservatively.

use std::collections::{HashMap, HashSet};

use crate::cursor::{Cursor, PREDEFINED_TYPES};
use crate::lexer::{numeric_literal_type, TokenKind};
use crate::syntax::{ArgType, CallSite, Param, Receiver};

/// Tokens after which a local declaration may start.
const DECLARATION_STARTS: &[&str] = &["{", "}", ";", "(", ",", "out", "using", "const"];

/// Tokens that may follow a declared local's name.
const DECLARATION_FOLLOWS: &[&str] = &["=", ";", ",", "in", ")"];

/// Identifiers that may directly precede an expression.
const EXPRESSION_WORDS: &[&str] = &[
    "await", "yield", "when", "not", "and", "or", "select", "where", "orderby", "by", "on",
    "equals", "group", "with",
];

/// Contextual words that are never method groups.
const CONTEXTUAL: &[&str] = &[
    "get", "set", "init", "add", "remove", "value", "var", "global", "nameof", "await", "async",
    "yield", "where", "when",
];

/// Scan `tokens` (the inside of one body) for call sites.
///
/// `enclosing` is the simple name of the type whose body this is; `params`
/// are the enclosing member's parameters, visible as locals.
pub fn scan_body(
    source: &str,
    tokens: &[crate::lexer::Token],
    enclosing: &str,
    params: &[Param],
) -> Vec<CallSite> {
    let mut scanner = BodyScanner {
        cursor: Cursor::new(source, tokens),
        enclosing,
        locals: params
            .iter()
            .map(|p| (p.name.clone(), Some(p.ty.clone())))
            .collect(),
        declared: HashSet::new(),
    };
    scanner.collect_locals();
    scanner.collect_calls()
}

struct BodyScanner<'a> {
    cursor: Cursor<'a>,
    enclosing: &'a str,
    locals: HashMap<String, Option<String>>,
    /// Token indices that are part of a local declaration's type or name.
    declared: HashSet<usize>,
}

impl BodyScanner<'_> {
    // ------------------------------------------------------------------------
    // Pass 1: locals
    // ------------------------------------------------------------------------

    fn collect_locals(&mut self) {
        let cursor = self.cursor;
        for i in 0..cursor.len() {
            if cursor.text(i) == "=>" {
                self.collect_lambda_params(i);
                continue;
            }
            let at_start = i == 0 || DECLARATION_STARTS.contains(&cursor.text(i - 1));
            if !at_start {
                continue;
            }
            let Some((ty, name_at)) = cursor.type_at(i) else {
                continue;
            };
            if !cursor.is_ident(name_at) || !DECLARATION_FOLLOWS.contains(&cursor.text(name_at + 1))
            {
                continue;
            }
            let declared_type = if ty == "var" {
                self.initializer_type(name_at + 1)
            } else {
                Some(ty)
            };
            self.locals
                .insert(cursor.text(name_at).to_string(), declared_type);
            self.declared.extend(i..=name_at);
        }
    }

    /// `x =>` and `(x, y) =>` with the arrow at `arrow`.
    fn collect_lambda_params(&mut self, arrow: usize) {
        let cursor = self.cursor;
        if arrow == 0 {
            return;
        }
        let last = arrow - 1;
        if cursor.is_ident(last) {
            self.locals.insert(cursor.text(last).to_string(), None);
            return;
        }
        if cursor.text(last) != ")" {
            return;
        }
        let mut k = last;
        while k > 0 {
            k -= 1;
            match cursor.text(k) {
                "(" => break,
                "," | ")" => {}
                _ if cursor.is_ident(k) && matches!(cursor.text(k + 1), "," | ")") => {
                    self.locals.insert(cursor.text(k).to_string(), None);
                }
                _ => {}
            }
        }
    }

    /// Type of `= new T(...)` or `= literal` at `eq`.
    fn initializer_type(&self, eq: usize) -> Option<String> {
        let cursor = self.cursor;
        if cursor.text(eq) != "=" {
            return None;
        }
        let value = eq + 1;
        if cursor.text(value) == "new" {
            let (ty, next) = cursor.type_at(value + 1)?;
            return matches!(cursor.text(next), "(" | "{").then_some(ty);
        }
        match self.literal_type(value) {
            ArgType::Known(ty) => Some(ty),
            _ => None,
        }
    }

    fn literal_type(&self, i: usize) -> ArgType {
        let cursor = self.cursor;
        let text = cursor.text(i);
        match cursor.kind(i) {
            Some(TokenKind::Number) => ArgType::Known(numeric_literal_type(text).to_string()),
            Some(TokenKind::String) => ArgType::Known("string".to_string()),
            Some(TokenKind::Char) => ArgType::Known("char".to_string()),
            Some(TokenKind::Ident) if text == "true" || text == "false" => {
                ArgType::Known("bool".to_string())
            }
            Some(TokenKind::Ident) if text == "null" => ArgType::Null,
            _ => ArgType::Unknown,
        }
    }

    // ------------------------------------------------------------------------
    // Pass 2: call sites
    // ------------------------------------------------------------------------

    fn collect_calls(&self) -> Vec<CallSite> {
        let cursor = self.cursor;
        let mut calls = Vec::new();
        let mut i = 0;

        while i < cursor.len() {
            if self.declared.contains(&i) || !cursor.is_ident(i) {
                i += 1;
                continue;
            }
            let prev = if i > 0 { cursor.text(i - 1) } else { "" };

            // `new T(...)`: the type name is not a use.
            if prev == "new" {
                i = cursor.type_at(i).map(|(_, next)| next).unwrap_or(i + 1);
                continue;
            }

            let name = cursor.text(i);
            let mut open = i + 1;
            if cursor.text(open) == "<" {
                if let Some((_, next)) = cursor.type_args_at(open) {
                    if cursor.text(next) == "(" {
                        open = next;
                    }
                }
            }
            let is_call = cursor.text(open) == "(";

            let receiver = if prev == "." || prev == "?." {
                self.receiver_before(i - 1)
            } else if i > 0 && self.is_declaration_prefix(i - 1) {
                // `int Helper(...)` local function or `Type name` pattern.
                i += 1;
                continue;
            } else {
                Receiver::Implicit
            };

            let Some(token) = cursor.token(i) else {
                break;
            };
            if is_call {
                let args = cursor.matching(open).map(|close| self.arg_types(open, close));
                calls.push(CallSite {
                    name: name.to_string(),
                    span: token.span,
                    receiver,
                    args: Some(args.unwrap_or_default()),
                });
            } else if !self.is_non_member_use(i, prev, &receiver) {
                calls.push(CallSite {
                    name: name.to_string(),
                    span: token.span,
                    receiver,
                    args: None,
                });
            }
            i += 1;
        }
        calls
    }

    /// Whether the token at `i` ends a type, so the identifier after it is
    /// being declared.
    fn is_declaration_prefix(&self, i: usize) -> bool {
        let cursor = self.cursor;
        let text = cursor.text(i);
        if cursor.is_ident(i) {
            return !EXPRESSION_WORDS.contains(&text);
        }
        (cursor.kind(i) == Some(TokenKind::Ident) && PREDEFINED_TYPES.contains(&text)) || text == "]"
    }

    /// Bare identifiers that cannot be a method group.
    fn is_non_member_use(&self, i: usize, prev: &str, receiver: &Receiver) -> bool {
        let cursor = self.cursor;
        let name = cursor.text(i);
        let next = cursor.text(i + 1);
        if matches!(next, "=>" | "." | "?.") {
            return true;
        }
        if next == ":" && matches!(prev, "(" | ",") {
            return true;
        }
        *receiver == Receiver::Implicit
            && (self.locals.contains_key(name) || CONTEXTUAL.contains(&name))
    }

    /// Receiver of the member access whose `.` or `?.` is at `dot`.
    fn receiver_before(&self, dot: usize) -> Receiver {
        let cursor = self.cursor;
        let mut segments: Vec<&str> = Vec::new();
        let mut dot = dot;
        loop {
            if dot == 0 {
                return Receiver::Expression;
            }
            let seg = dot - 1;
            let text = cursor.text(seg);
            let is_segment = cursor.is_ident(seg)
                || text == "this"
                || text == "base"
                || (cursor.kind(seg) == Some(TokenKind::Ident) && PREDEFINED_TYPES.contains(&text));
            if !is_segment {
                return Receiver::Expression;
            }
            segments.push(text);
            if seg > 0 && cursor.text(seg - 1) == "." && cursor.is_ident(seg) {
                dot = seg - 1;
                continue;
            }
            if seg > 0 && cursor.text(seg - 1) == "?." {
                return Receiver::Expression;
            }
            break;
        }
        segments.reverse();

        match segments.as_slice() {
            ["this"] => Receiver::This,
            ["base"] => Receiver::Base,
            ["this", field] => Receiver::Name(field.to_string()),
            [single] => match self.locals.get(*single) {
                Some(ty) => Receiver::Local(ty.clone()),
                None => Receiver::Name(single.to_string()),
            },
            [first, ..]
                if !self.locals.contains_key(*first)
                    && segments.iter().all(|s| *s != "this" && *s != "base") =>
            {
                Receiver::Name(segments.join("."))
            }
            _ => Receiver::Expression,
        }
    }

    // ------------------------------------------------------------------------
    // Arguments
    // ------------------------------------------------------------------------

    fn arg_types(&self, open: usize, close: usize) -> Vec<ArgType> {
        let cursor = self.cursor;
        let mut args = Vec::new();
        if open + 1 == close {
            return args;
        }
        let mut depth = 0usize;
        let mut start = open + 1;
        for k in open + 1..close {
            match cursor.text(k) {
                "(" | "[" | "{" => depth += 1,
                ")" | "]" | "}" => depth = depth.saturating_sub(1),
                "," if depth == 0 => {
                    args.push(self.arg_type(start, k));
                    start = k + 1;
                }
                _ => {}
            }
        }
        args.push(self.arg_type(start, close));
        args
    }

    fn arg_type(&self, mut start: usize, end: usize) -> ArgType {
        let cursor = self.cursor;
        // named argument
        if end > start + 2 && cursor.is_ident(start) && cursor.text(start + 1) == ":" {
            start += 2;
        }
        while start < end && matches!(cursor.text(start), "ref" | "out" | "in") {
            start += 1;
        }
        if start >= end {
            return ArgType::Unknown;
        }

        let text = cursor.text(start);
        match end - start {
            1 if cursor.is_ident(start) => match self.locals.get(text) {
                Some(Some(ty)) => ArgType::Known(ty.clone()),
                Some(None) => ArgType::Unknown,
                None => ArgType::Name(text.to_string()),
            },
            1 if text == "this" => ArgType::Known(self.enclosing.to_string()),
            1 => self.literal_type(start),
            2 if text == "-" && cursor.kind(start + 1) == Some(TokenKind::Number) => {
                self.literal_type(start + 1)
            }
            _ if text == "new" => match cursor.type_at(start + 1) {
                Some((ty, next)) if next < end && matches!(cursor.text(next), "(" | "{") => {
                    ArgType::Known(ty)
                }
                _ => ArgType::Unknown,
            },
            _ => ArgType::Unknown,
        }
    }
}
