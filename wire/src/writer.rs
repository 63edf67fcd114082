use std::io::Write;

use crate::error::WireError;
use crate::stream::{FieldHeader, ListHeader, MapHeader, SetHeader, StreamWriter};

/// A streaming writer for the Thrift binary protocol, symmetric to
/// [`BinaryStreamReader`](crate::BinaryStreamReader). Lengths are emitted
/// before payloads, so collection sizes must be known before a container is
/// started.
///
/// Example usage:
///
/// ```
/// use spindrift_wire::{BinaryStreamWriter, StreamWriter};
///
/// let mut writer = BinaryStreamWriter::new(Vec::new());
/// writer.write_i32(42).unwrap();
/// assert_eq!(writer.into_inner(), [0x00, 0x00, 0x00, 0x2A]);
/// ```
pub struct BinaryStreamWriter<W> {
    writer: W,
}

impl<W: Write> BinaryStreamWriter<W> {
    pub fn new(writer: W) -> BinaryStreamWriter<W> {
        BinaryStreamWriter { writer }
    }

    /// Unwrap the underlying byte sink.
    pub fn into_inner(self) -> W {
        self.writer
    }

    pub fn flush(&mut self) -> Result<(), WireError> {
        self.writer.flush()?;
        Ok(())
    }

    fn length_of(payload: usize) -> Result<i32, WireError> {
        i32::try_from(payload).map_err(|_| WireError::LimitExceeded {
            size:  payload,
            limit: i32::MAX as usize,
        })
    }
}

impl<W: Write> StreamWriter for BinaryStreamWriter<W> {
    fn write_bool(&mut self, value: bool) -> Result<(), WireError> {
        self.writer.write_all(&[value as u8])?;
        Ok(())
    }

    fn write_i8(&mut self, value: i8) -> Result<(), WireError> {
        self.writer.write_all(&[value as u8])?;
        Ok(())
    }

    fn write_i16(&mut self, value: i16) -> Result<(), WireError> {
        self.writer.write_all(&value.to_be_bytes())?;
        Ok(())
    }

    fn write_i32(&mut self, value: i32) -> Result<(), WireError> {
        self.writer.write_all(&value.to_be_bytes())?;
        Ok(())
    }

    fn write_i64(&mut self, value: i64) -> Result<(), WireError> {
        self.writer.write_all(&value.to_be_bytes())?;
        Ok(())
    }

    fn write_double(&mut self, value: f64) -> Result<(), WireError> {
        self.write_i64(value.to_bits() as i64)
    }

    fn write_binary(&mut self, value: &[u8]) -> Result<(), WireError> {
        let length = Self::length_of(value.len())?;
        self.write_i32(length)?;
        self.writer.write_all(value)?;
        Ok(())
    }

    fn write_struct_end(&mut self) -> Result<(), WireError> {
        self.writer.write_all(&[0])?;
        Ok(())
    }

    fn write_field_begin(&mut self, header: FieldHeader) -> Result<(), WireError> {
        self.write_i8(header.type_code as i8)?;
        self.write_i16(header.id)
    }

    fn write_list_begin(&mut self, header: ListHeader) -> Result<(), WireError> {
        self.write_i8(header.elem_type as i8)?;
        self.write_i32(Self::length_of(header.length)?)
    }

    fn write_set_begin(&mut self, header: SetHeader) -> Result<(), WireError> {
        self.write_i8(header.elem_type as i8)?;
        self.write_i32(Self::length_of(header.length)?)
    }

    fn write_map_begin(&mut self, header: MapHeader) -> Result<(), WireError> {
        self.write_i8(header.key_type as i8)?;
        self.write_i8(header.value_type as i8)?;
        self.write_i32(Self::length_of(header.length)?)
    }
}

#[cfg(test)]
use crate::TypeCode;

#[cfg(test)]
fn write_once(cb: fn(&mut BinaryStreamWriter<Vec<u8>>)) -> Vec<u8> {
    let mut writer = BinaryStreamWriter::new(Vec::new());
    cb(&mut writer);
    writer.into_inner()
}

#[test]
fn write_bool() {
    assert_eq!(write_once(|w| w.write_bool(false).unwrap()), [0x00]);
    assert_eq!(write_once(|w| w.write_bool(true).unwrap()), [0x01]);
}

#[test]
fn write_scalars() {
    assert_eq!(write_once(|w| w.write_i8(-1).unwrap()), [0xFF]);
    assert_eq!(write_once(|w| w.write_i16(258).unwrap()), [0x01, 0x02]);
    assert_eq!(
        write_once(|w| w.write_i32(42).unwrap()),
        [0x00, 0x00, 0x00, 0x2A]
    );
    assert_eq!(
        write_once(|w| w.write_i64(-1).unwrap()),
        [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]
    );
    assert_eq!(
        write_once(|w| w.write_double(0.5).unwrap()),
        [0x3F, 0xE0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]
    );
}

#[test]
fn write_binary() {
    assert_eq!(
        write_once(|w| w.write_binary(b"hi").unwrap()),
        [0x00, 0x00, 0x00, 0x02, 0x68, 0x69]
    );
    assert_eq!(
        write_once(|w| w.write_binary(&[]).unwrap()),
        [0x00, 0x00, 0x00, 0x00]
    );
    assert_eq!(
        write_once(|w| w.write_string("🍕").unwrap()),
        [0x00, 0x00, 0x00, 0x04, 0xF0, 0x9F, 0x8D, 0x95]
    );
}

#[test]
fn write_struct_framing() {
    assert_eq!(
        write_once(|w| {
            w.write_struct_begin().unwrap();
            w.write_field_begin(FieldHeader { type_code: TypeCode::I32, id: 1 }).unwrap();
            w.write_i32(7).unwrap();
            w.write_field_end().unwrap();
            w.write_struct_end().unwrap();
        }),
        [0x08, 0x00, 0x01, 0x00, 0x00, 0x00, 0x07, 0x00]
    );
}

#[test]
fn write_container_headers() {
    assert_eq!(
        write_once(|w| {
            w.write_list_begin(ListHeader { elem_type: TypeCode::I32, length: 3 }).unwrap()
        }),
        [0x08, 0x00, 0x00, 0x00, 0x03]
    );
    assert_eq!(
        write_once(|w| {
            w.write_set_begin(SetHeader { elem_type: TypeCode::Binary, length: 0 }).unwrap()
        }),
        [0x0B, 0x00, 0x00, 0x00, 0x00]
    );
    assert_eq!(
        write_once(|w| {
            w.write_map_begin(MapHeader {
                key_type:   TypeCode::I32,
                value_type: TypeCode::Binary,
                length:     2,
            })
            .unwrap()
        }),
        [0x08, 0x0B, 0x00, 0x00, 0x00, 0x02]
    );
}
