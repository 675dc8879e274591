//! Read-only lookahead over a token slice.
//!
//! Shared by the declaration parser and the body scanner. Nothing here
//! consumes input: every query takes a token index and answers with a value
//! and, where relevant, the index just past what it matched.

use crate::lexer::{Token, TokenKind};

/// Reserved C# keywords. Contextual keywords (`var`, `partial`, `get`, ...)
/// are ordinary identifiers here.
pub const KEYWORDS: &[&str] = &[
    "abstract", "as", "base", "bool", "break", "byte", "case", "catch", "char", "checked",
    "class", "const", "continue", "decimal", "default", "delegate", "do", "double", "else",
    "enum", "event", "explicit", "extern", "false", "finally", "fixed", "float", "for",
    "foreach", "goto", "if", "implicit", "in", "int", "interface", "internal", "is", "lock",
    "long", "namespace", "new", "null", "object", "operator", "out", "override", "params",
    "private", "protected", "public", "readonly", "ref", "return", "sbyte", "sealed", "short",
    "sizeof", "stackalloc", "static", "string", "struct", "switch", "this", "throw", "true",
    "try", "typeof", "uint", "ulong", "unchecked", "unsafe", "ushort", "using", "virtual",
    "void", "volatile", "while",
];

/// Keywords that name types.
pub const PREDEFINED_TYPES: &[&str] = &[
    "bool", "byte", "sbyte", "char", "decimal", "double", "float", "int", "uint", "long",
    "ulong", "short", "ushort", "object", "string", "void",
];

pub fn is_keyword(text: &str) -> bool {
    KEYWORDS.contains(&text)
}

#[derive(Clone, Copy)]
pub struct Cursor<'a> {
    source: &'a str,
    tokens: &'a [Token],
}

impl<'a> Cursor<'a> {
    pub fn new(source: &'a str, tokens: &'a [Token]) -> Self {
        Cursor { source, tokens }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn token(&self, i: usize) -> Option<&'a Token> {
        self.tokens.get(i)
    }

    /// Token text, or `""` past the end.
    pub fn text(&self, i: usize) -> &'a str {
        self.tokens.get(i).map(|t| t.text(self.source)).unwrap_or("")
    }

    pub fn kind(&self, i: usize) -> Option<TokenKind> {
        self.tokens.get(i).map(|t| t.kind)
    }

    /// An identifier that is not a reserved keyword.
    pub fn is_ident(&self, i: usize) -> bool {
        self.kind(i) == Some(TokenKind::Ident) && !is_keyword(self.text(i))
    }

    /// Index of the bracket closing the one opened at `open`.
    pub fn matching(&self, open: usize) -> Option<usize> {
        let mut depth = 0usize;
        for i in open..self.tokens.len() {
            match self.text(i) {
                "(" | "[" | "{" => depth += 1,
                ")" | "]" | "}" => {
                    depth = depth.checked_sub(1)?;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            }
        }
        None
    }

    /// Parse a type starting at `i`, normalized to a canonical spelling
    /// (`Dictionary<string, int>`, `int?`, `(int, string)`, `T[]`).
    pub fn type_at(&self, i: usize) -> Option<(String, usize)> {
        let (mut out, mut i) = if self.text(i) == "(" {
            self.tuple_type_at(i)?
        } else {
            self.named_type_at(i)?
        };

        loop {
            match self.text(i) {
                "?" => {
                    out.push('?');
                    i += 1;
                }
                "[" => {
                    let mut j = i + 1;
                    let mut rank = String::from("[");
                    while self.text(j) == "," {
                        rank.push(',');
                        j += 1;
                    }
                    if self.text(j) != "]" {
                        break;
                    }
                    rank.push(']');
                    out.push_str(&rank);
                    i = j + 1;
                }
                _ => break,
            }
        }
        Some((out, i))
    }

    fn named_type_at(&self, mut i: usize) -> Option<(String, usize)> {
        if self.text(i) == "global" && self.text(i + 1) == "::" {
            i += 2;
        }
        let first = self.text(i);
        let is_name = self.is_ident(i)
            || (self.kind(i) == Some(TokenKind::Ident) && PREDEFINED_TYPES.contains(&first));
        if !is_name {
            return None;
        }
        let mut out = first.to_string();
        i += 1;

        loop {
            if self.text(i) == "<" {
                let (args, next) = self.type_args_at(i)?;
                out.push('<');
                out.push_str(&args.join(", "));
                out.push('>');
                i = next;
            }
            if matches!(self.text(i), "." | "::") && self.is_ident(i + 1) {
                out.push('.');
                out.push_str(self.text(i + 1));
                i += 2;
            } else {
                break;
            }
        }
        Some((out, i))
    }

    fn tuple_type_at(&self, mut i: usize) -> Option<(String, usize)> {
        i += 1;
        let mut parts = Vec::new();
        loop {
            let (ty, next) = self.type_at(i)?;
            parts.push(ty);
            i = next;
            if self.is_ident(i) {
                i += 1;
            }
            match self.text(i) {
                "," => i += 1,
                ")" => break,
                _ => return None,
            }
        }
        if parts.len() < 2 {
            return None;
        }
        Some((format!("({})", parts.join(", ")), i + 1))
    }

    /// Parse `<T1, T2>` at `i`.
    pub fn type_args_at(&self, mut i: usize) -> Option<(Vec<String>, usize)> {
        if self.text(i) != "<" {
            return None;
        }
        i += 1;
        let mut args = Vec::new();
        loop {
            let (ty, next) = self.type_at(i)?;
            args.push(ty);
            i = next;
            match self.text(i) {
                "," => i += 1,
                ">" => return Some((args, i + 1)),
                _ => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn type_of(source: &str) -> Option<(String, usize)> {
        let tokens = tokenize(source).unwrap();
        Cursor::new(source, &tokens).type_at(0)
    }

    #[test]
    fn simple_and_predefined_types() {
        assert_eq!(type_of("int x"), Some(("int".to_string(), 1)));
        assert_eq!(type_of("Query q"), Some(("Query".to_string(), 1)));
        assert_eq!(type_of("return x"), None);
    }

    #[test]
    fn generic_nullable_and_array_types() {
        assert_eq!(
            type_of("Dictionary<string,List<int>> x").map(|(t, _)| t),
            Some("Dictionary<string, List<int>>".to_string())
        );
        assert_eq!(type_of("int? x").map(|(t, _)| t), Some("int?".to_string()));
        assert_eq!(type_of("int[,] x").map(|(t, _)| t), Some("int[,]".to_string()));
        assert_eq!(
            type_of("global::Api.Query x").map(|(t, _)| t),
            Some("Api.Query".to_string())
        );
    }

    #[test]
    fn tuple_types() {
        assert_eq!(
            type_of("(int id, string name) x").map(|(t, _)| t),
            Some("(int, string)".to_string())
        );
        assert_eq!(type_of("(x) y"), None);
    }

    #[test]
    fn matching_brackets() {
        let source = "Foo(a, (b), c[1]) + d";
        let tokens = tokenize(source).unwrap();
        let cursor = Cursor::new(source, &tokens);
        assert_eq!(cursor.matching(1), Some(11));
        assert_eq!(cursor.text(11), ")");
        assert_eq!(cursor.matching(12), None);
    }
}
