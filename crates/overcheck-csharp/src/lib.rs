//! C# front end for overcheck.
//!
//! A reference [`overcheck_core::provider::SourceModelProvider`] for a
//! C#-shaped subset: namespaces, `partial` classes, structs, records and
//! interfaces, and their members. Member bodies are scanned for call sites
//! and method-group references, which the binder resolves by receiver,
//! argument count, and argument types.
//!
//! This crate provides:
//! - A `winnow` tokenizer ([`lexer`])
//! - A declaration parser ([`parser`]) and body scanner
//! - A conservative binder ([`binder::CSharpBinder`])
//! - [`CSharpProvider`] and on-disk project loading ([`files`])

pub mod binder;
mod body;
mod cursor;
pub mod files;
pub mod lexer;
pub mod parser;
pub mod provider;
pub mod syntax;

pub use files::{collect_csharp_files, load_dir, write_changes, FileError, FileResult};
pub use parser::{parse_source, ParseError};
pub use provider::CSharpProvider;
