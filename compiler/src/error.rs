use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors produced by the front-end. Every error originating in source text
/// carries its position; definition-level failures are wrapped with the path
/// of the symbol being compiled, and file-level failures with the file.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Lex error at line {line}, column {column}: {msg}")]
    Lex { msg: String, line: usize, column: usize },

    #[error("Parse error at line {line}, column {column}: {msg}")]
    Parse { msg: String, line: usize, column: usize },

    #[error("cannot include {}: {reason}", .path.display())]
    Include { path: PathBuf, reason: String },

    #[error("import cycle detected: {cycle}")]
    ImportCycle { cycle: String },

    #[error("the name {0:?} has already been used")]
    Redefinition(String),

    #[error("could not resolve reference {name:?} at line {line}")]
    UnknownType { name: String, line: usize },

    #[error("{0:?} is not a type")]
    NotAType(String),

    #[error("{0:?} is not a service")]
    NotAService(String),

    #[error("field id {0} has already been used")]
    DuplicateFieldId(i16),

    #[error("the field name {0:?} has already been used")]
    DuplicateFieldName(String),

    #[error("the name {0:?} has already been used")]
    DuplicateEnumItem(String),

    #[error("enum value {0} is out of range for i32")]
    EnumValueOutOfRange(i64),

    #[error("field id {0} is out of range for i16")]
    FieldIdOutOfRange(i64),

    #[error("a union must have at least two fields, found {0}")]
    UnionTooFewFields(usize),

    #[error("field {0:?} of a union cannot be required")]
    UnionRequiredField(String),

    #[error("default value is not assignable: {0}")]
    UnassignableDefault(String),

    #[error("service inheritance cycle through {0:?}")]
    CycleInExtends(String),

    #[error("typedef {0:?} is circular")]
    InvalidTypedef(String),

    #[error("oneway function {0:?} cannot return a value")]
    OnewayNotVoid(String),

    #[error("throws entry {0:?} must be an exception")]
    ThrowsNotException(String),

    #[error("cannot compile \"{symbol}\": {source}")]
    Compile {
        symbol: String,
        #[source]
        source: Box<CompileError>,
    },

    #[error("{}: {source}", .path.display())]
    InFile {
        path: PathBuf,
        #[source]
        source: Box<CompileError>,
    },
}

/// Wrap an error with the path of the symbol that was being compiled.
pub(crate) fn cannot_compile(symbol: impl Into<String>, source: CompileError) -> CompileError {
    CompileError::Compile { symbol: symbol.into(), source: Box::new(source) }
}

/// Wrap an error with the file it originated in, unless it already carries
/// one.
pub(crate) fn in_file(path: &Path, source: CompileError) -> CompileError {
    match source {
        err @ CompileError::InFile { .. } => err,
        err => CompileError::InFile { path: path.to_path_buf(), source: Box::new(err) },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_wrapper_chains_messages() {
        let err = cannot_compile("Foo.A", CompileError::DuplicateEnumItem("A".to_owned()));
        let text = err.to_string();
        assert!(text.contains("cannot compile \"Foo.A\""));
        assert!(text.contains("the name \"A\" has already been used"));
    }

    #[test]
    fn in_file_does_not_double_wrap() {
        let path = PathBuf::from("a.thrift");
        let err = in_file(
            &path,
            in_file(&path, CompileError::Redefinition("Foo".to_owned())),
        );
        assert_eq!(
            err.to_string(),
            "a.thrift: the name \"Foo\" has already been used"
        );
    }
}
