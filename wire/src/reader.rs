use std::io;
use std::io::Read;

use crate::error::WireError;
use crate::stream::{FieldHeader, ListHeader, MapHeader, SetHeader, StreamReader};
use crate::{TypeCode, BYTES_ALLOC_THRESHOLD};

/// A streaming reader for the Thrift binary protocol.
///
/// Wraps any byte source and decodes big-endian scalars and structural tags
/// through a small scratch buffer. All multi-byte reads that hit the end of
/// the stream partway through report `UnexpectedEof`; the relaxed
/// "EOF at a value boundary" semantics of random-access decoding do not
/// apply here.
///
/// Example usage:
///
/// ```
/// use spindrift_wire::{BinaryStreamReader, StreamReader};
///
/// let mut reader = BinaryStreamReader::new(&[0x00, 0x00, 0x00, 0x2A][..]);
/// assert_eq!(reader.read_i32().unwrap(), 42);
/// ```
pub struct BinaryStreamReader<R> {
    reader: R,
    buffer: [u8; 8],
}

impl<R: Read> BinaryStreamReader<R> {
    pub fn new(reader: R) -> BinaryStreamReader<R> {
        BinaryStreamReader { reader, buffer: [0; 8] }
    }

    /// Unwrap the underlying byte source. The source is left at whatever
    /// position the last read put it.
    pub fn into_inner(self) -> R {
        self.reader
    }

    fn fill(&mut self, n: usize) -> Result<(), WireError> {
        self.reader.read_exact(&mut self.buffer[..n])?;
        Ok(())
    }

    fn discard(&mut self, n: u64) -> Result<(), WireError> {
        let copied = io::copy(&mut (&mut self.reader).take(n), &mut io::sink())?;
        if copied < n {
            return Err(WireError::UnexpectedEof);
        }
        Ok(())
    }

    /// Read exactly `len` raw bytes off the stream.
    pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>, WireError> {
        let mut bytes = vec![0; len];
        self.reader.read_exact(&mut bytes)?;
        Ok(bytes)
    }

    fn read_length(&mut self) -> Result<usize, WireError> {
        let length = self.read_i32()?;
        if length < 0 {
            return Err(WireError::InvalidLength(length));
        }
        Ok(length as usize)
    }

    fn skip_struct(&mut self) -> Result<(), WireError> {
        loop {
            let raw = self.read_i8()?;
            if raw == 0 {
                return Ok(());
            }
            let code = TypeCode::from_wire(raw)?;
            // field id
            self.discard(2)?;
            self.skip(code)?;
        }
    }

    fn skip_list(&mut self, header: ListHeader) -> Result<(), WireError> {
        if let Some(width) = header.elem_type.fixed_width() {
            return self.discard(width * header.length as u64);
        }
        for _ in 0..header.length {
            self.skip(header.elem_type)?;
        }
        Ok(())
    }

    fn skip_map(&mut self) -> Result<(), WireError> {
        let header = self.read_map_begin()?;
        let key_width = header.key_type.fixed_width();
        let value_width = header.value_type.fixed_width();
        if let (Some(kw), Some(vw)) = (key_width, value_width) {
            return self.discard((kw + vw) * header.length as u64);
        }
        for _ in 0..header.length {
            self.skip(header.key_type)?;
            self.skip(header.value_type)?;
        }
        Ok(())
    }
}

impl<R: Read> StreamReader for BinaryStreamReader<R> {
    fn read_bool(&mut self) -> Result<bool, WireError> {
        self.fill(1)?;
        match self.buffer[0] {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(WireError::InvalidBool(other)),
        }
    }

    fn read_i8(&mut self) -> Result<i8, WireError> {
        self.fill(1)?;
        Ok(self.buffer[0] as i8)
    }

    fn read_i16(&mut self) -> Result<i16, WireError> {
        self.fill(2)?;
        Ok(i16::from_be_bytes([self.buffer[0], self.buffer[1]]))
    }

    fn read_i32(&mut self) -> Result<i32, WireError> {
        self.fill(4)?;
        Ok(i32::from_be_bytes([
            self.buffer[0],
            self.buffer[1],
            self.buffer[2],
            self.buffer[3],
        ]))
    }

    fn read_i64(&mut self) -> Result<i64, WireError> {
        self.fill(8)?;
        Ok(i64::from_be_bytes(self.buffer))
    }

    fn read_double(&mut self) -> Result<f64, WireError> {
        let bits = self.read_i64()?;
        Ok(f64::from_bits(bits as u64))
    }

    fn read_binary_limited(&mut self, limit: Option<usize>) -> Result<Vec<u8>, WireError> {
        let length = self.read_length()?;

        if let Some(limit) = limit {
            if length > limit {
                return Err(WireError::LimitExceeded { size: length, limit });
            }
        }

        if length == 0 {
            return Ok(Vec::new());
        }

        if length > BYTES_ALLOC_THRESHOLD {
            // The declared length is untrusted: copy incrementally rather
            // than allocating it up front.
            let mut buffer = Vec::new();
            let copied = io::copy(&mut (&mut self.reader).take(length as u64), &mut buffer)?;
            if copied < length as u64 {
                return Err(WireError::UnexpectedEof);
            }
            return Ok(buffer);
        }

        self.read_bytes(length)
    }

    fn read_struct_end(&mut self) -> Result<(), WireError> {
        let end = self.read_i8()?;
        if end != 0 {
            return Err(WireError::InvalidStopField(end));
        }
        Ok(())
    }

    fn read_field_begin(&mut self) -> Result<Option<FieldHeader>, WireError> {
        let raw = self.read_i8()?;
        if raw == 0 {
            return Ok(None);
        }
        let type_code = TypeCode::from_wire(raw)?;
        let id = self.read_i16()?;
        Ok(Some(FieldHeader { type_code, id }))
    }

    fn read_list_begin(&mut self) -> Result<ListHeader, WireError> {
        let elem_type = TypeCode::from_wire(self.read_i8()?)?;
        let length = self.read_length()?;
        Ok(ListHeader { elem_type, length })
    }

    fn read_set_begin(&mut self) -> Result<SetHeader, WireError> {
        let elem_type = TypeCode::from_wire(self.read_i8()?)?;
        let length = self.read_length()?;
        Ok(SetHeader { elem_type, length })
    }

    fn read_map_begin(&mut self) -> Result<MapHeader, WireError> {
        let key_type = TypeCode::from_wire(self.read_i8()?)?;
        let value_type = TypeCode::from_wire(self.read_i8()?)?;
        let length = self.read_length()?;
        Ok(MapHeader { key_type, value_type, length })
    }

    fn skip(&mut self, code: TypeCode) -> Result<(), WireError> {
        if let Some(width) = code.fixed_width() {
            return self.discard(width);
        }

        match code {
            TypeCode::Binary => {
                let length = self.read_length()?;
                self.discard(length as u64)
            }
            TypeCode::Struct => self.skip_struct(),
            TypeCode::Map => self.skip_map(),
            TypeCode::Set => {
                let header = self.read_set_begin()?;
                self.skip_list(ListHeader { elem_type: header.elem_type, length: header.length })
            }
            TypeCode::List => {
                let header = self.read_list_begin()?;
                self.skip_list(header)
            }
            // Fixed-width scalars were discarded above.
            TypeCode::Bool
            | TypeCode::I8
            | TypeCode::I16
            | TypeCode::I32
            | TypeCode::I64
            | TypeCode::Double => unreachable!(),
        }
    }
}

#[cfg(test)]
fn reader(bytes: &[u8]) -> BinaryStreamReader<&[u8]> {
    BinaryStreamReader::new(bytes)
}

#[test]
fn read_bool() {
    let read = |bytes: &[u8]| reader(bytes).read_bool();
    assert!(matches!(read(&[]), Err(WireError::UnexpectedEof)));
    assert!(matches!(read(&[0]), Ok(false)));
    assert!(matches!(read(&[1]), Ok(true)));
    assert!(matches!(read(&[2]), Err(WireError::InvalidBool(2))));
    assert!(matches!(read(&[255]), Err(WireError::InvalidBool(255))));
}

#[test]
fn read_i8() {
    let read = |bytes: &[u8]| reader(bytes).read_i8();
    assert!(matches!(read(&[]), Err(WireError::UnexpectedEof)));
    assert_eq!(read(&[0x00]).unwrap(), 0);
    assert_eq!(read(&[0x7F]).unwrap(), 127);
    assert_eq!(read(&[0xFF]).unwrap(), -1);
}

#[test]
fn read_i16() {
    let read = |bytes: &[u8]| reader(bytes).read_i16();
    assert!(matches!(read(&[0x01]), Err(WireError::UnexpectedEof)));
    assert_eq!(read(&[0x00, 0x01]).unwrap(), 1);
    assert_eq!(read(&[0x01, 0x02]).unwrap(), 258);
    assert_eq!(read(&[0xFF, 0xFF]).unwrap(), -1);
}

#[test]
fn read_i32() {
    let read = |bytes: &[u8]| reader(bytes).read_i32();
    assert!(matches!(read(&[0x00, 0x00, 0x00]), Err(WireError::UnexpectedEof)));
    assert_eq!(read(&[0x00, 0x00, 0x00, 0x2A]).unwrap(), 42);
    assert_eq!(read(&[0x00, 0x01, 0x02, 0x03]).unwrap(), 66051);
    assert_eq!(read(&[0xFF, 0xFF, 0xFF, 0xFF]).unwrap(), -1);
}

#[test]
fn read_i64() {
    let read = |bytes: &[u8]| reader(bytes).read_i64();
    assert_eq!(
        read(&[0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07]).unwrap(),
        0x0001_0203_0405_0607
    );
    assert_eq!(
        read(&[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]).unwrap(),
        -1
    );
    assert!(matches!(
        read(&[0x00, 0x01, 0x02, 0x03]),
        Err(WireError::UnexpectedEof)
    ));
}

#[test]
fn read_double() {
    let read = |bytes: &[u8]| reader(bytes).read_double();
    assert_eq!(
        read(&[0x3F, 0xE0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]).unwrap(),
        0.5
    );
    assert_eq!(
        read(&[0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]).unwrap(),
        0.0
    );
    assert_eq!(
        read(&[0xC0, 0x5E, 0xDD, 0x2F, 0x1A, 0x9F, 0xBE, 0x77]).unwrap(),
        -123.456
    );
}

#[test]
fn read_binary() {
    let read = |bytes: &[u8]| reader(bytes).read_binary();
    assert_eq!(read(&[0x00, 0x00, 0x00, 0x00]).unwrap(), Vec::<u8>::new());
    assert_eq!(
        read(&[0x00, 0x00, 0x00, 0x02, 0x68, 0x69]).unwrap(),
        b"hi".to_vec()
    );
    assert!(matches!(
        read(&[0xFF, 0xFF, 0xFF, 0xFF]),
        Err(WireError::InvalidLength(-1))
    ));
    // Declared length longer than the stream.
    assert!(matches!(
        read(&[0x00, 0x00, 0x00, 0x05, 0x68, 0x69]),
        Err(WireError::UnexpectedEof)
    ));
}

#[test]
fn read_binary_limited() {
    let bytes = [0x00, 0x00, 0x00, 0x02, 0x68, 0x69];
    assert_eq!(
        reader(&bytes).read_binary_limited(Some(2)).unwrap(),
        b"hi".to_vec()
    );
    assert!(matches!(
        reader(&bytes).read_binary_limited(Some(1)),
        Err(WireError::LimitExceeded { size: 2, limit: 1 })
    ));
}

#[test]
fn read_string() {
    let read = |bytes: &[u8]| reader(bytes).read_string();
    assert_eq!(read(&[0x00, 0x00, 0x00, 0x00]).unwrap(), "");
    assert_eq!(
        read(&[0x00, 0x00, 0x00, 0x04, 0xF0, 0x9F, 0x8D, 0x95]).unwrap(),
        "🍕"
    );
}

#[test]
fn read_struct_end() {
    assert!(reader(&[0x00]).read_struct_end().is_ok());
    assert!(matches!(
        reader(&[0x01]).read_struct_end(),
        Err(WireError::InvalidStopField(1))
    ));
    assert!(matches!(
        reader(&[]).read_struct_end(),
        Err(WireError::UnexpectedEof)
    ));
}

#[test]
fn read_field_begin() {
    let mut r = reader(&[0x08, 0x00, 0x01, 0x00]);
    assert_eq!(
        r.read_field_begin().unwrap(),
        Some(FieldHeader { type_code: TypeCode::I32, id: 1 })
    );
    // The stop byte terminates the field sequence.
    assert_eq!(r.read_field_begin().unwrap(), None);

    assert!(matches!(
        reader(&[0x07, 0x00, 0x01]).read_field_begin(),
        Err(WireError::UnknownType(7))
    ));
}

#[test]
fn read_container_headers() {
    assert_eq!(
        reader(&[0x08, 0x00, 0x00, 0x00, 0x03]).read_list_begin().unwrap(),
        ListHeader { elem_type: TypeCode::I32, length: 3 }
    );
    assert_eq!(
        reader(&[0x0B, 0x00, 0x00, 0x00, 0x00]).read_set_begin().unwrap(),
        SetHeader { elem_type: TypeCode::Binary, length: 0 }
    );
    assert_eq!(
        reader(&[0x08, 0x0B, 0x00, 0x00, 0x00, 0x02]).read_map_begin().unwrap(),
        MapHeader { key_type: TypeCode::I32, value_type: TypeCode::Binary, length: 2 }
    );

    assert!(matches!(
        reader(&[0x08, 0xFF, 0xFF, 0xFF, 0xFF]).read_list_begin(),
        Err(WireError::InvalidLength(-1))
    ));
    assert!(matches!(
        reader(&[0x08, 0x08, 0xFF, 0xFF, 0xFF, 0xFE]).read_map_begin(),
        Err(WireError::InvalidLength(-2))
    ));
}

#[cfg(test)]
fn assert_skip_consumes(code: TypeCode, bytes: &[u8]) {
    // A sentinel byte after the encoded value proves skip stopped exactly at
    // the value boundary.
    let mut padded = bytes.to_vec();
    padded.push(0x5C);
    let mut r = reader(&padded);
    r.skip(code).unwrap();
    assert_eq!(r.read_i8().unwrap(), 0x5C);
}

#[test]
fn skip_scalars() {
    assert_skip_consumes(TypeCode::Bool, &[0x01]);
    assert_skip_consumes(TypeCode::I8, &[0x7F]);
    assert_skip_consumes(TypeCode::I16, &[0x00, 0x01]);
    assert_skip_consumes(TypeCode::I32, &[0x00, 0x00, 0x00, 0x01]);
    assert_skip_consumes(TypeCode::I64, &[0; 8]);
    assert_skip_consumes(TypeCode::Double, &[0; 8]);
}

#[test]
fn skip_binary() {
    assert_skip_consumes(TypeCode::Binary, &[0x00, 0x00, 0x00, 0x02, 0x68, 0x69]);
    assert!(matches!(
        reader(&[0xFF, 0xFF, 0xFF, 0xFF]).skip(TypeCode::Binary),
        Err(WireError::InvalidLength(-1))
    ));
}

#[test]
fn skip_struct() {
    assert_skip_consumes(
        TypeCode::Struct,
        &[
            0x08, 0x00, 0x01, 0x00, 0x00, 0x00, 0x07, // 1: i32 = 7
            0x0B, 0x00, 0x02, 0x00, 0x00, 0x00, 0x02, 0x68, 0x69, // 2: "hi"
            0x00, // stop
        ],
    );
}

#[test]
fn skip_fixed_width_map() {
    // A MAP<I32, I32> of length 3 is 6 header bytes plus 24 payload bytes.
    let mut bytes = vec![0x08, 0x08, 0x00, 0x00, 0x00, 0x03];
    bytes.extend_from_slice(&[0; 24]);
    assert_eq!(bytes.len(), 30);
    assert_skip_consumes(TypeCode::Map, &bytes);

    // Truncating the payload must fail rather than stop short.
    let mut r = reader(&bytes[..29]);
    assert!(matches!(r.skip(TypeCode::Map), Err(WireError::UnexpectedEof)));
}

#[test]
fn skip_nested_containers() {
    // list<list<i32>> = [[1], []]
    assert_skip_consumes(
        TypeCode::List,
        &[
            0x0F, 0x00, 0x00, 0x00, 0x02, // list<list>, 2 elements
            0x08, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, // [1]
            0x08, 0x00, 0x00, 0x00, 0x00, // []
        ],
    );

    // map<binary, list<i8>> falls back to element-wise skipping.
    assert_skip_consumes(
        TypeCode::Map,
        &[
            0x0B, 0x0F, 0x00, 0x00, 0x00, 0x01, // map<binary, list>, 1 pair
            0x00, 0x00, 0x00, 0x01, 0x61, // "a"
            0x03, 0x00, 0x00, 0x00, 0x02, 0x01, 0x02, // [1, 2]
        ],
    );
}

#[test]
fn skip_unknown_nested_type() {
    // Struct containing a field of unknown type 9.
    assert!(matches!(
        reader(&[0x09, 0x00, 0x01, 0x00]).skip(TypeCode::Struct),
        Err(WireError::UnknownType(9))
    ));
}
