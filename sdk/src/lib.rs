//! spindrift-sdk
//!
//! This crate re-exports the pieces embedders usually need:
//!
//! - the compiler entry points (re-exported from `spindrift-compiler`),
//! - the wire value model and codec (re-exported from `spindrift-wire`),
//! - helpers for dumping a compiled module graph as JSON.

pub use spindrift_compiler::error::CompileError;
pub use spindrift_compiler::{compile_source, Compilation, Compiler, MemoryFilesystem};
pub use spindrift_wire::{
    decode_value, decode_value_limited, encode_value, BinaryStreamReader, BinaryStreamWriter,
    Envelope, TypeCode, Value, WireError,
};

/// Render a compiled module graph as pretty-printed JSON.
pub fn compilation_to_json(compilation: &Compilation) -> String {
    serde_json::to_string_pretty(compilation)
        .unwrap_or_else(|err| format!("{{\"error\": {:?}}}", err.to_string()))
}

pub mod error {
    pub use spindrift_compiler::error::CompileError;
    pub use spindrift_wire::error::WireError;
}

pub mod spec {
    pub use spindrift_compiler::spec::*;
}
