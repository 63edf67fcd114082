//! spindrift-wire
//!
//! Runtime support for the Thrift binary protocol. This crate implements:
//!  1) The wire value model (`Value`) — a tagged, schema-less representation
//!     of a decoded Thrift datum,
//!  2) Streaming reader/writer pairs for the binary encoding, including
//!     structural skip logic (`BinaryStreamReader` / `BinaryStreamWriter`),
//!  3) A value codec on top of the streaming calls (`encode_value` /
//!     `decode_value`),
//!  4) Message envelopes in both strict and non-strict layouts (`Envelope`),
//!  5) Error types (`WireError`).
//!
//! ```
//! use spindrift_wire::{decode_value, encode_value, BinaryStreamReader, BinaryStreamWriter, TypeCode, Value};
//! use spindrift_wire::value::{FieldValue, StructValue};
//!
//! let value = Value::Struct(StructValue::new(vec![
//!     FieldValue { id: 1, value: Value::I32(7) },
//!     FieldValue { id: 2, value: Value::string("hi") },
//! ]));
//!
//! let mut writer = BinaryStreamWriter::new(Vec::new());
//! encode_value(&value, &mut writer).unwrap();
//! let bytes = writer.into_inner();
//!
//! let mut reader = BinaryStreamReader::new(&bytes[..]);
//! assert_eq!(decode_value(TypeCode::Struct, &mut reader).unwrap(), value);
//! ```

pub mod codec;
pub mod envelope;
pub mod error;
pub mod reader;
pub mod stream;
pub mod value;
pub mod writer;

pub use codec::{decode_value, decode_value_limited, encode_value};
pub use envelope::{Envelope, EnvelopeType};
pub use error::WireError;
pub use reader::BinaryStreamReader;
pub use stream::{FieldHeader, ListHeader, MapHeader, SetHeader, StreamReader, StreamWriter};
pub use value::Value;
pub use writer::BinaryStreamWriter;

/// Binary reads up to this many bytes are allocated in one shot; larger
/// payloads are stream-copied into a growable buffer so that an untrusted
/// length field cannot trigger a huge up-front allocation.
pub const BYTES_ALLOC_THRESHOLD: usize = 1 << 20;

/// One-byte code tagging the on-wire shape of a Thrift datum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i8)]
pub enum TypeCode {
    Bool   = 2,
    I8     = 3,
    Double = 4,
    I16    = 6,
    I32    = 8,
    I64    = 10,
    Binary = 11,
    Struct = 12,
    Map    = 13,
    Set    = 14,
    List   = 15,
}

impl TypeCode {
    /// Decode a raw type byte read off the wire.
    pub fn from_wire(raw: i8) -> Result<TypeCode, WireError> {
        Ok(match raw {
            2 => TypeCode::Bool,
            3 => TypeCode::I8,
            4 => TypeCode::Double,
            6 => TypeCode::I16,
            8 => TypeCode::I32,
            10 => TypeCode::I64,
            11 => TypeCode::Binary,
            12 => TypeCode::Struct,
            13 => TypeCode::Map,
            14 => TypeCode::Set,
            15 => TypeCode::List,
            other => return Err(WireError::UnknownType(other)),
        })
    }

    /// The number of bytes a value of this type occupies on the wire, for
    /// the types whose encoding is fixed-width.
    pub fn fixed_width(self) -> Option<u64> {
        match self {
            TypeCode::Bool | TypeCode::I8 => Some(1),
            TypeCode::I16 => Some(2),
            TypeCode::I32 => Some(4),
            TypeCode::I64 | TypeCode::Double => Some(8),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_code_from_wire() {
        for code in [
            TypeCode::Bool,
            TypeCode::I8,
            TypeCode::Double,
            TypeCode::I16,
            TypeCode::I32,
            TypeCode::I64,
            TypeCode::Binary,
            TypeCode::Struct,
            TypeCode::Map,
            TypeCode::Set,
            TypeCode::List,
        ] {
            assert_eq!(TypeCode::from_wire(code as i8).unwrap(), code);
        }

        for raw in [0i8, 1, 5, 7, 9, 16, -1] {
            assert!(matches!(
                TypeCode::from_wire(raw),
                Err(WireError::UnknownType(b)) if b == raw
            ));
        }
    }

    #[test]
    fn fixed_widths() {
        assert_eq!(TypeCode::Bool.fixed_width(), Some(1));
        assert_eq!(TypeCode::I8.fixed_width(), Some(1));
        assert_eq!(TypeCode::I16.fixed_width(), Some(2));
        assert_eq!(TypeCode::I32.fixed_width(), Some(4));
        assert_eq!(TypeCode::I64.fixed_width(), Some(8));
        assert_eq!(TypeCode::Double.fixed_width(), Some(8));
        assert_eq!(TypeCode::Binary.fixed_width(), None);
        assert_eq!(TypeCode::Struct.fixed_width(), None);
        assert_eq!(TypeCode::Map.fixed_width(), None);
        assert_eq!(TypeCode::Set.fixed_width(), None);
        assert_eq!(TypeCode::List.fixed_width(), None);
    }
}
