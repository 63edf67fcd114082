use crate::error::WireError;
use crate::TypeCode;

/// Header of one encoded struct field: wire type plus ordinal id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldHeader {
    pub type_code: TypeCode,
    pub id:        i16,
}

/// Header of an encoded list: element type plus declared length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListHeader {
    pub elem_type: TypeCode,
    pub length:    usize,
}

/// Header of an encoded set: element type plus declared length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetHeader {
    pub elem_type: TypeCode,
    pub length:    usize,
}

/// Header of an encoded map: key/value element types plus declared length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapHeader {
    pub key_type:   TypeCode,
    pub value_type: TypeCode,
    pub length:     usize,
}

/// The capability set of a streaming protocol reader: scalar reads plus
/// structural tags. Buffering strategy is up to the implementation; the
/// value codec is written once against this contract.
pub trait StreamReader {
    fn read_bool(&mut self) -> Result<bool, WireError>;
    fn read_i8(&mut self) -> Result<i8, WireError>;
    fn read_i16(&mut self) -> Result<i16, WireError>;
    fn read_i32(&mut self) -> Result<i32, WireError>;
    fn read_i64(&mut self) -> Result<i64, WireError>;
    fn read_double(&mut self) -> Result<f64, WireError>;

    /// Read a length-prefixed byte payload. With `Some(limit)`, a declared
    /// length above the limit fails with `LimitExceeded` before anything is
    /// allocated.
    fn read_binary_limited(&mut self, limit: Option<usize>) -> Result<Vec<u8>, WireError>;

    fn read_binary(&mut self) -> Result<Vec<u8>, WireError> {
        self.read_binary_limited(None)
    }

    fn read_string(&mut self) -> Result<String, WireError> {
        let bytes = self.read_binary()?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// There is no encoding for the beginning of a struct, so this is a noop.
    fn read_struct_begin(&mut self) -> Result<(), WireError> {
        Ok(())
    }

    /// Read the stop field of an encoded struct.
    fn read_struct_end(&mut self) -> Result<(), WireError>;

    /// Read the next field header, or `None` if the stop byte was
    /// encountered instead (in which case the stop byte is consumed and the
    /// struct is finished).
    fn read_field_begin(&mut self) -> Result<Option<FieldHeader>, WireError>;

    /// There is no encoding for the end of a field, so this is a noop.
    fn read_field_end(&mut self) -> Result<(), WireError> {
        Ok(())
    }

    fn read_list_begin(&mut self) -> Result<ListHeader, WireError>;

    fn read_list_end(&mut self) -> Result<(), WireError> {
        Ok(())
    }

    fn read_set_begin(&mut self) -> Result<SetHeader, WireError>;

    fn read_set_end(&mut self) -> Result<(), WireError> {
        Ok(())
    }

    fn read_map_begin(&mut self) -> Result<MapHeader, WireError>;

    fn read_map_end(&mut self) -> Result<(), WireError> {
        Ok(())
    }

    /// Advance past exactly one value of the given wire type without
    /// materializing it.
    fn skip(&mut self, code: TypeCode) -> Result<(), WireError>;
}

/// The capability set of a streaming protocol writer. Lengths are emitted
/// before payloads, so callers must know collection sizes up front.
pub trait StreamWriter {
    fn write_bool(&mut self, value: bool) -> Result<(), WireError>;
    fn write_i8(&mut self, value: i8) -> Result<(), WireError>;
    fn write_i16(&mut self, value: i16) -> Result<(), WireError>;
    fn write_i32(&mut self, value: i32) -> Result<(), WireError>;
    fn write_i64(&mut self, value: i64) -> Result<(), WireError>;
    fn write_double(&mut self, value: f64) -> Result<(), WireError>;
    fn write_binary(&mut self, value: &[u8]) -> Result<(), WireError>;

    fn write_string(&mut self, value: &str) -> Result<(), WireError> {
        self.write_binary(value.as_bytes())
    }

    /// There is no encoding for the beginning of a struct, so this is a noop.
    fn write_struct_begin(&mut self) -> Result<(), WireError> {
        Ok(())
    }

    /// Emit the stop byte terminating a struct.
    fn write_struct_end(&mut self) -> Result<(), WireError>;

    fn write_field_begin(&mut self, header: FieldHeader) -> Result<(), WireError>;

    /// There is no encoding for the end of a field, so this is a noop.
    fn write_field_end(&mut self) -> Result<(), WireError> {
        Ok(())
    }

    fn write_list_begin(&mut self, header: ListHeader) -> Result<(), WireError>;

    fn write_list_end(&mut self) -> Result<(), WireError> {
        Ok(())
    }

    fn write_set_begin(&mut self, header: SetHeader) -> Result<(), WireError>;

    fn write_set_end(&mut self) -> Result<(), WireError> {
        Ok(())
    }

    fn write_map_begin(&mut self, header: MapHeader) -> Result<(), WireError>;

    fn write_map_end(&mut self) -> Result<(), WireError> {
        Ok(())
    }
}
