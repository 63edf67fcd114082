use std::io::{Read, Write};

use crate::codec::{decode_value, encode_value};
use crate::error::WireError;
use crate::reader::BinaryStreamReader;
use crate::stream::{StreamReader, StreamWriter};
use crate::writer::BinaryStreamWriter;
use crate::{TypeCode, Value};

/// Version word emitted by strict-form envelopes: high bit set, protocol
/// version 1 in the upper half, envelope type in the low byte.
pub const ENVELOPE_VERSION_1: u32 = 0x8001_0000;

const VERSION_MASK: u32 = 0xFFFF_0000;

/// The kind of call an envelope conveys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i8)]
pub enum EnvelopeType {
    Call      = 1,
    Reply     = 2,
    Exception = 3,
    Oneway    = 4,
}

impl EnvelopeType {
    pub fn from_wire(raw: i8) -> Result<EnvelopeType, WireError> {
        Ok(match raw {
            1 => EnvelopeType::Call,
            2 => EnvelopeType::Reply,
            3 => EnvelopeType::Exception,
            4 => EnvelopeType::Oneway,
            other => return Err(WireError::UnknownEnvelopeType(other)),
        })
    }
}

/// A message envelope: method name, call kind, sequence id, and the payload
/// struct. Decoding accepts both the strict (version-tagged) and non-strict
/// (legacy) layouts; encoding always emits the strict form.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub name:          String,
    pub envelope_type: EnvelopeType,
    pub seq_id:        i32,
    pub value:         Value,
}

impl Envelope {
    pub fn decode<R: Read>(reader: &mut BinaryStreamReader<R>) -> Result<Envelope, WireError> {
        let word = reader.read_i32()?;

        let (name, envelope_type) = if word < 0 {
            // Strict form: the high bit marks a version word.
            let version = word as u32 & VERSION_MASK;
            if version != ENVELOPE_VERSION_1 {
                return Err(WireError::EnvelopeVersionMismatch(word as u32));
            }
            let envelope_type = EnvelopeType::from_wire((word & 0xFF) as i8)?;
            (reader.read_string()?, envelope_type)
        } else {
            // Non-strict form: the word is the name length.
            let bytes = reader.read_bytes(word as usize)?;
            let name = String::from_utf8_lossy(&bytes).into_owned();
            let envelope_type = EnvelopeType::from_wire(reader.read_i8()?)?;
            (name, envelope_type)
        };

        let seq_id = reader.read_i32()?;
        let value = decode_value(TypeCode::Struct, reader)?;

        Ok(Envelope { name, envelope_type, seq_id, value })
    }

    pub fn encode<W: Write>(&self, writer: &mut BinaryStreamWriter<W>) -> Result<(), WireError> {
        let word = ENVELOPE_VERSION_1 | self.envelope_type as u32;
        writer.write_i32(word as i32)?;
        writer.write_string(&self.name)?;
        writer.write_i32(self.seq_id)?;
        encode_value(&self.value, writer)
    }
}
