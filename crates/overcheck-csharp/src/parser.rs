//! Declaration parser for the C# subset.
//!
//! A recursive-descent parser over the token stream. Namespaces, type
//! declarations, and member signatures are parsed precisely; member bodies
//! are bracket-matched and handed to [`crate::body::scan_body`].
//!
//! Supported declarations:
//!
//! - `using`, `global using`, `extern alias`
//! - block and file-scoped `namespace`
//! - `class`, `struct`, `interface`, `enum`, `record` / `record struct`,
//!   nested to any depth, with `partial` fragments
//! - methods (generic, expression-bodied, partial), constructors,
//!   destructors, operators, conversions, properties, indexers, fields,
//!   events, and `delegate` declarations (skipped)

use overcheck_core::patch::Span;
use overcheck_core::provider::{AggregateKind, MemberKind};
use overcheck_core::text::byte_offset_to_position_str;
use thiserror::Error;
use tracing::trace;

use crate::body::scan_body;
use crate::cursor::Cursor;
use crate::lexer::{tokenize, LexError, Token};
use crate::syntax::{MemberDecl, Param, SourceFile, TypeDecl};

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("{line}:{col}: {source}")]
    Lex {
        line: u32,
        col: u32,
        source: LexError,
    },

    #[error("{line}:{col}: expected {expected}, found '{found}'")]
    Unexpected {
        line: u32,
        col: u32,
        expected: String,
        found: String,
    },

    #[error("unexpected end of file, expected {expected}")]
    UnexpectedEof { expected: String },
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Declaration modifiers, including the contextual ones.
const MODIFIERS: &[&str] = &[
    "public", "private", "protected", "internal", "static", "partial", "abstract", "sealed",
    "virtual", "override", "readonly", "unsafe", "extern", "new", "async", "const", "volatile",
    "required", "file", "fixed", "ref",
];

/// Parse one source file.
pub fn parse_source(source: &str) -> ParseResult<SourceFile> {
    let tokens = tokenize(source).map_err(|err| {
        let (line, col) = byte_offset_to_position_str(source, err.offset());
        ParseError::Lex {
            line,
            col,
            source: err,
        }
    })?;
    let mut parser = Parser {
        source,
        tokens: &tokens,
        pos: 0,
        file: SourceFile::default(),
    };
    parser.parse_namespace_body(None, false)?;
    trace!(
        types = parser.file.types.len(),
        usings = parser.file.usings.len(),
        "parsed source"
    );
    Ok(parser.file)
}

struct Parser<'a> {
    source: &'a str,
    tokens: &'a [Token],
    pos: usize,
    file: SourceFile,
}

impl<'a> Parser<'a> {
    // ------------------------------------------------------------------------
    // Token helpers
    // ------------------------------------------------------------------------

    fn cursor(&self) -> Cursor<'a> {
        Cursor::new(self.source, self.tokens)
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn text_at(&self, i: usize) -> &'a str {
        self.cursor().text(i)
    }

    fn current(&self) -> &'a str {
        self.text_at(self.pos)
    }

    fn at(&self, text: &str) -> bool {
        !self.is_eof() && self.current() == text
    }

    fn eat(&mut self, text: &str) -> bool {
        if self.at(text) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, text: &str) -> ParseResult<Token> {
        match self.tokens.get(self.pos) {
            Some(token) if token.text(self.source) == text => {
                self.pos += 1;
                Ok(*token)
            }
            _ => Err(self.error_at(self.pos, format!("'{}'", text))),
        }
    }

    fn expect_name(&mut self) -> ParseResult<(String, Span)> {
        match self.tokens.get(self.pos) {
            Some(token) if self.cursor().is_ident(self.pos) => {
                self.pos += 1;
                Ok((token.text(self.source).to_string(), token.span))
            }
            _ => Err(self.error_at(self.pos, "identifier")),
        }
    }

    fn error_at(&self, i: usize, expected: impl Into<String>) -> ParseError {
        match self.tokens.get(i) {
            Some(token) => {
                let (line, col) = byte_offset_to_position_str(self.source, token.span.start);
                ParseError::Unexpected {
                    line,
                    col,
                    expected: expected.into(),
                    found: token.text(self.source).to_string(),
                }
            }
            None => ParseError::UnexpectedEof {
                expected: expected.into(),
            },
        }
    }

    fn matching(&self, open: usize) -> ParseResult<usize> {
        self.cursor().matching(open).ok_or_else(|| ParseError::UnexpectedEof {
            expected: format!("closing bracket for '{}'", self.text_at(open)),
        })
    }

    /// First token at bracket depth zero, from `from`, whose text is in `stops`.
    fn find_at_depth0(&self, from: usize, stops: &[&str]) -> ParseResult<usize> {
        let mut depth = 0usize;
        for i in from..self.tokens.len() {
            let text = self.text_at(i);
            if depth == 0 && stops.contains(&text) {
                return Ok(i);
            }
            match text {
                "(" | "[" | "{" => depth += 1,
                ")" | "]" | "}" => {
                    if depth == 0 {
                        return Err(self.error_at(i, stops.join(" or ")));
                    }
                    depth -= 1;
                }
                _ => {}
            }
        }
        Err(ParseError::UnexpectedEof {
            expected: stops.join(" or "),
        })
    }

    fn parse_type(&mut self) -> ParseResult<String> {
        match self.cursor().type_at(self.pos) {
            Some((ty, next)) => {
                self.pos = next;
                Ok(ty)
            }
            None => Err(self.error_at(self.pos, "type")),
        }
    }

    fn skip_attributes(&mut self) -> ParseResult<()> {
        while self.at("[") {
            self.pos = self.matching(self.pos)? + 1;
        }
        Ok(())
    }

    fn parse_modifiers(&mut self) -> Vec<String> {
        let mut modifiers = Vec::new();
        while !self.is_eof() && MODIFIERS.contains(&self.current()) {
            modifiers.push(self.current().to_string());
            self.pos += 1;
        }
        modifiers
    }

    /// The type keyword at `i` and how many tokens it spans.
    fn type_keyword_at(&self, i: usize) -> Option<(AggregateKind, usize)> {
        match self.text_at(i) {
            "class" => Some((AggregateKind::Class, 1)),
            "struct" => Some((AggregateKind::Struct, 1)),
            "interface" => Some((AggregateKind::Interface, 1)),
            "enum" => Some((AggregateKind::Enum, 1)),
            "record" => match self.text_at(i + 1) {
                "class" | "struct" => Some((AggregateKind::Record, 2)),
                _ if self.cursor().is_ident(i + 1) => Some((AggregateKind::Record, 1)),
                _ => None,
            },
            _ => None,
        }
    }

    fn start_offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|t| t.span.start)
            .unwrap_or(self.source.len())
    }

    fn skip_past(&mut self, stop: &str) -> ParseResult<()> {
        self.pos = self.find_at_depth0(self.pos, &[stop])? + 1;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Namespaces
    // ------------------------------------------------------------------------

    fn parse_namespace_body(&mut self, namespace: Option<String>, braced: bool) -> ParseResult<()> {
        let mut namespace = namespace;
        loop {
            if self.is_eof() {
                return if braced {
                    Err(self.error_at(self.pos, "'}'"))
                } else {
                    Ok(())
                };
            }
            if braced && self.eat("}") {
                self.eat(";");
                return Ok(());
            }
            if self.at("using") || (self.at("global") && self.text_at(self.pos + 1) == "using") {
                self.parse_using()?;
                continue;
            }
            if self.at("extern") && self.text_at(self.pos + 1) == "alias" {
                self.skip_past(";")?;
                continue;
            }
            if self.eat("namespace") {
                let name = self.parse_dotted_name()?;
                let full = match &namespace {
                    Some(outer) => format!("{}.{}", outer, name),
                    None => name,
                };
                if self.eat(";") {
                    namespace = Some(full);
                    continue;
                }
                self.expect("{")?;
                self.parse_namespace_body(Some(full), true)?;
                continue;
            }
            if self.eat(";") {
                continue;
            }
            if self.at("[") && matches!(self.text_at(self.pos + 1), "assembly" | "module") {
                self.pos = self.matching(self.pos)? + 1;
                continue;
            }
            self.parse_type_declaration(namespace.clone(), None)?;
        }
    }

    fn parse_using(&mut self) -> ParseResult<()> {
        self.eat("global");
        self.expect("using")?;
        let is_static = self.eat("static");
        let is_alias = self.cursor().is_ident(self.pos) && self.text_at(self.pos + 1) == "=";
        let end = self.find_at_depth0(self.pos, &[";"])?;
        if !is_static && !is_alias {
            let name: String = (self.pos..end).map(|i| self.text_at(i)).collect();
            self.file.usings.push(name);
        }
        self.pos = end + 1;
        Ok(())
    }

    fn parse_dotted_name(&mut self) -> ParseResult<String> {
        let (mut name, _) = self.expect_name()?;
        while self.eat(".") {
            let (segment, _) = self.expect_name()?;
            name.push('.');
            name.push_str(&segment);
        }
        Ok(name)
    }

    // ------------------------------------------------------------------------
    // Types
    // ------------------------------------------------------------------------

    fn parse_type_declaration(
        &mut self,
        namespace: Option<String>,
        outer: Option<String>,
    ) -> ParseResult<()> {
        let start = self.start_offset();
        self.skip_attributes()?;
        let modifiers = self.parse_modifiers();
        if self.at("delegate") {
            return self.skip_past(";");
        }
        let Some((kind, len)) = self.type_keyword_at(self.pos) else {
            return Err(self.error_at(self.pos, "type declaration"));
        };
        self.pos += len;
        self.parse_type_decl(kind, modifiers, start, namespace, outer)
    }

    fn parse_type_decl(
        &mut self,
        kind: AggregateKind,
        modifiers: Vec<String>,
        start: usize,
        namespace: Option<String>,
        outer: Option<String>,
    ) -> ParseResult<()> {
        let (name, name_span) = self.expect_name()?;
        let type_params = if self.at("<") {
            self.parse_type_params()?
        } else {
            Vec::new()
        };

        let index = self.file.types.len();
        self.file.types.push(TypeDecl {
            kind,
            name,
            name_span,
            namespace,
            outer,
            span: Span::new(start, name_span.end),
            modifiers,
            type_params,
            members: Vec::new(),
            calls: Vec::new(),
        });
        let qualified = self.file.types[index].qualified_name();

        // Primary constructor parameters; on records they are properties.
        if self.at("(") {
            let params = self.parse_params()?;
            if kind == AggregateKind::Record {
                for param in params {
                    self.file.types[index].members.push(MemberDecl {
                        kind: MemberKind::Property,
                        name: param.name,
                        name_span: param.name_span,
                        ty: Some(param.ty),
                        params: Vec::new(),
                        type_params: Vec::new(),
                        partial_declaration: false,
                    });
                }
            }
        }

        // Base list and constraints.
        if !self.at("{") && !self.at(";") {
            self.pos = self.find_at_depth0(self.pos, &["{", ";"])?;
        }

        let end = if self.at(";") {
            self.expect(";")?.span.end
        } else {
            self.expect("{")?;
            if kind == AggregateKind::Enum {
                self.parse_enum_body(index)?
            } else {
                self.parse_type_body(index, &qualified)?
            }
        };
        self.eat(";");
        self.file.types[index].span = Span::new(start, end);
        Ok(())
    }

    fn parse_type_params(&mut self) -> ParseResult<Vec<String>> {
        self.expect("<")?;
        let mut params = Vec::new();
        loop {
            self.skip_attributes()?;
            if self.at("in") || self.at("out") {
                self.pos += 1;
            }
            let (name, _) = self.expect_name()?;
            params.push(name);
            if self.eat(">") {
                return Ok(params);
            }
            self.expect(",")?;
        }
    }

    /// Parse enum members up to and including `}`; returns the end offset.
    fn parse_enum_body(&mut self, index: usize) -> ParseResult<usize> {
        loop {
            if self.at("}") {
                return Ok(self.expect("}")?.span.end);
            }
            self.skip_attributes()?;
            let (name, name_span) = self.expect_name()?;
            self.push_member(index, MemberKind::Field, name, name_span, None, Vec::new());
            if self.eat("=") {
                self.pos = self.find_at_depth0(self.pos, &[",", "}"])?;
            }
            if !self.eat(",") {
                return Ok(self.expect("}")?.span.end);
            }
        }
    }

    /// Parse members up to and including `}`; returns the end offset.
    fn parse_type_body(&mut self, index: usize, qualified: &str) -> ParseResult<usize> {
        loop {
            if self.is_eof() {
                return Err(self.error_at(self.pos, "'}'"));
            }
            if self.at("}") {
                return Ok(self.expect("}")?.span.end);
            }
            if self.eat(";") {
                continue;
            }
            self.parse_member(index, qualified)?;
        }
    }

    // ------------------------------------------------------------------------
    // Members
    // ------------------------------------------------------------------------

    fn push_member(
        &mut self,
        index: usize,
        kind: MemberKind,
        name: String,
        name_span: Span,
        ty: Option<String>,
        params: Vec<Param>,
    ) {
        self.file.types[index].members.push(MemberDecl {
            kind,
            name,
            name_span,
            ty,
            params,
            type_params: Vec::new(),
            partial_declaration: false,
        });
    }

    fn parse_member(&mut self, index: usize, qualified: &str) -> ParseResult<()> {
        let start = self.start_offset();
        self.skip_attributes()?;
        let modifiers = self.parse_modifiers();

        if self.at("delegate") {
            return self.skip_past(";");
        }
        if let Some((kind, len)) = self.type_keyword_at(self.pos) {
            self.pos += len;
            let scope = Some(qualified.to_string());
            return self.parse_type_decl(kind, modifiers, start, scope.clone(), scope);
        }

        if self.eat("~") {
            let (name, name_span) = self.expect_name()?;
            let params = self.parse_params()?;
            self.push_member(index, MemberKind::Destructor, name, name_span, None, params.clone());
            return self.parse_body(index, &params);
        }

        if self.eat("event") {
            return self.parse_event(index);
        }

        if self.at("implicit") || self.at("explicit") {
            let name = if self.at("implicit") {
                "op_Implicit"
            } else {
                "op_Explicit"
            };
            self.pos += 1;
            let keyword = self.expect("operator")?;
            let ty = self.parse_type()?;
            let params = self.parse_params()?;
            self.push_member(
                index,
                MemberKind::Operator,
                name.to_string(),
                keyword.span,
                Some(ty),
                params.clone(),
            );
            return self.parse_body(index, &params);
        }

        let type_name = self.file.types[index].name.clone();
        if self.current() == type_name && self.text_at(self.pos + 1) == "(" {
            let (name, name_span) = self.expect_name()?;
            let params = self.parse_params()?;
            self.push_member(index, MemberKind::Constructor, name, name_span, None, params.clone());
            if self.eat(":") {
                // `: base(...)` / `: this(...)`
                let stop = self.find_at_depth0(self.pos, &["{", "=>", ";"])?;
                self.scan_region(index, self.pos, stop, &params);
                self.pos = stop;
            }
            return self.parse_body(index, &params);
        }

        let ty = self.parse_type()?;

        if self.at("operator") {
            let keyword = self.expect("operator")?;
            let open = self.find_at_depth0(self.pos, &["("])?;
            let symbol: String = (self.pos..open).map(|i| self.text_at(i)).collect();
            self.pos = open;
            let params = self.parse_params()?;
            self.push_member(
                index,
                MemberKind::Operator,
                format!("operator{}", symbol),
                keyword.span,
                Some(ty),
                params.clone(),
            );
            return self.parse_body(index, &params);
        }

        if self.at("this") && self.text_at(self.pos + 1) == "[" {
            // Indexers have no name to collide with; only the body matters.
            self.pos += 1;
            let params = self.parse_params()?;
            return self.parse_accessors_or_body(index, &params);
        }

        let (mut name, mut name_span) = self.expect_name()?;
        let mut explicit_interface = false;
        loop {
            if self.at(".") && self.cursor().is_ident(self.pos + 1) {
                self.pos += 1;
                (name, name_span) = self.expect_name()?;
                explicit_interface = true;
                continue;
            }
            if self.at("<") {
                if let Some((_, next)) = self.cursor().type_args_at(self.pos) {
                    if self.text_at(next) == "." {
                        self.pos = next;
                        explicit_interface = true;
                        continue;
                    }
                }
            }
            break;
        }

        if self.at("<") || self.at("(") {
            let type_params = if self.at("<") {
                self.parse_type_params()?
            } else {
                Vec::new()
            };
            let params = self.parse_params()?;
            if self.at("where") {
                self.pos = self.find_at_depth0(self.pos, &["{", "=>", ";"])?;
            }
            let has_body = !self.at(";");
            if !explicit_interface {
                self.file.types[index].members.push(MemberDecl {
                    kind: MemberKind::Method,
                    name,
                    name_span,
                    ty: Some(ty),
                    params: params.clone(),
                    type_params,
                    partial_declaration: modifiers.iter().any(|m| m == "partial") && !has_body,
                });
            }
            return self.parse_body(index, &params);
        }

        if self.at("{") || self.at("=>") {
            if !explicit_interface {
                self.push_member(index, MemberKind::Property, name, name_span, Some(ty), Vec::new());
            }
            return self.parse_accessors_or_body(index, &[]);
        }

        self.parse_field_declarators(index, ty, name, name_span)
    }

    fn parse_event(&mut self, index: usize) -> ParseResult<()> {
        let ty = self.parse_type()?;
        loop {
            let (name, name_span) = self.expect_name()?;
            let explicit_interface = self.at(".");
            if explicit_interface {
                self.pos += 1;
                self.expect_name()?;
            } else {
                self.push_member(index, MemberKind::Event, name, name_span, Some(ty.clone()), Vec::new());
            }
            if self.at("{") {
                return self.parse_accessors_or_body(index, &[]);
            }
            if self.eat("=") {
                let stop = self.find_at_depth0(self.pos, &[",", ";"])?;
                self.scan_region(index, self.pos, stop, &[]);
                self.pos = stop;
            }
            if !self.eat(",") {
                self.expect(";")?;
                return Ok(());
            }
        }
    }

    fn parse_field_declarators(
        &mut self,
        index: usize,
        ty: String,
        name: String,
        name_span: Span,
    ) -> ParseResult<()> {
        let (mut name, mut name_span) = (name, name_span);
        loop {
            self.push_member(index, MemberKind::Field, name, name_span, Some(ty.clone()), Vec::new());
            if self.at("[") {
                // fixed-size buffer
                self.pos = self.matching(self.pos)? + 1;
            }
            if self.eat("=") {
                let stop = self.find_at_depth0(self.pos, &[",", ";"])?;
                self.scan_region(index, self.pos, stop, &[]);
                self.pos = stop;
            }
            if !self.eat(",") {
                self.expect(";")?;
                return Ok(());
            }
            (name, name_span) = self.expect_name()?;
        }
    }

    fn parse_params(&mut self) -> ParseResult<Vec<Param>> {
        let open = self.pos;
        if !self.at("(") && !self.at("[") {
            return Err(self.error_at(open, "parameter list"));
        }
        let close = self.matching(open)?;
        self.pos = open + 1;

        let mut params = Vec::new();
        while self.pos < close {
            self.skip_attributes()?;
            let mut is_params = false;
            while matches!(
                self.current(),
                "this" | "ref" | "out" | "in" | "params" | "scoped" | "readonly"
            ) {
                is_params |= self.current() == "params";
                self.pos += 1;
            }
            let ty = self.parse_type()?;
            let (name, name_span) = self.expect_name()?;
            let optional = self.eat("=");
            if optional {
                self.pos = self.find_at_depth0(self.pos, &[",", ")", "]"])?;
            }
            params.push(Param {
                ty,
                name,
                name_span,
                optional,
                is_params,
            });
            if self.pos < close {
                self.expect(",")?;
            }
        }
        if self.pos != close {
            return Err(self.error_at(close, "parameter"));
        }
        self.pos = close + 1;
        Ok(params)
    }

    // ------------------------------------------------------------------------
    // Bodies
    // ------------------------------------------------------------------------

    /// `;`, `=> expr;`, or `{ ... }` after a callable's signature.
    fn parse_body(&mut self, index: usize, params: &[Param]) -> ParseResult<()> {
        if self.eat(";") {
            return Ok(());
        }
        if self.eat("=>") {
            let stop = self.find_at_depth0(self.pos, &[";"])?;
            self.scan_region(index, self.pos, stop, params);
            self.pos = stop + 1;
            return Ok(());
        }
        if self.at("{") {
            let close = self.matching(self.pos)?;
            self.scan_region(index, self.pos + 1, close, params);
            self.pos = close + 1;
            return Ok(());
        }
        Err(self.error_at(self.pos, "member body"))
    }

    /// Accessor block (with optional `= initializer;`) or `=> expr;`.
    fn parse_accessors_or_body(&mut self, index: usize, params: &[Param]) -> ParseResult<()> {
        if self.at("=>") {
            return self.parse_body(index, params);
        }
        let close = self.matching(self.pos)?;
        self.scan_region(index, self.pos + 1, close, params);
        self.pos = close + 1;
        if self.eat("=") {
            let stop = self.find_at_depth0(self.pos, &[";"])?;
            self.scan_region(index, self.pos, stop, &[]);
            self.pos = stop + 1;
        }
        Ok(())
    }

    fn scan_region(&mut self, index: usize, start: usize, end: usize, params: &[Param]) {
        if start >= end {
            return;
        }
        let decl = &self.file.types[index];
        let calls = scan_body(self.source, &self.tokens[start..end], &decl.name, params);
        self.file.types[index].calls.extend(calls);
    }
}
