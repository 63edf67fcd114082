//! spindrift-compiler
//!
//! This crate implements:
//!  1) A lexer + parser for Thrift IDL files,
//!  2) A two-phase compiler (declare, then link) that resolves references
//!     across files and produces a typed specification graph,
//!  3) A module loader that caches compiled files by canonical path and
//!     detects include cycles,
//!  4) Error types (`CompileError`).
//!
//! The compiler is a pure function from a file set (seen through the
//! [`Filesystem`] seam) to a [`Compilation`] or an error; nothing is
//! persisted or retried.

pub mod ast;
pub mod error;
pub mod lexer;
pub mod loader;
pub mod parser;
pub mod spec;
pub mod utils;

mod compiler;
mod constant;

pub use error::CompileError;
pub use loader::{Compiler, Filesystem, MemoryFilesystem, OsFilesystem};
pub use spec::{Compilation, DefId, DefSpec, ModuleId, ModuleSpec, TypeSpec};

use std::path::PathBuf;

/// Compile a single module from source text, with no includes. The module
/// is named as if it were read from `<name>.thrift`.
pub fn compile_source(name: &str, text: &str) -> Result<Compilation, CompileError> {
    let mut fs = MemoryFilesystem::new();
    let path = PathBuf::from(format!("{}.thrift", name));
    fs.insert(&path, text);
    Compiler::with_filesystem(fs).compile(&path)
}
