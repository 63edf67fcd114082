use crate::error::WireError;
use crate::stream::{FieldHeader, ListHeader, MapHeader, SetHeader, StreamReader, StreamWriter};
use crate::value::{FieldValue, ListValue, MapValue, SetValue, StructValue, Value};
use crate::TypeCode;

/// Container buffers are never reserved beyond this many elements up front,
/// whatever length the header declares.
const PREALLOC_CLAMP: usize = 1024;

/// Encode one value onto a streaming writer.
pub fn encode_value<W: StreamWriter + ?Sized>(value: &Value, writer: &mut W) -> Result<(), WireError> {
    match *value {
        Value::Bool(v) => writer.write_bool(v),
        Value::I8(v) => writer.write_i8(v),
        Value::I16(v) => writer.write_i16(v),
        Value::I32(v) => writer.write_i32(v),
        Value::I64(v) => writer.write_i64(v),
        Value::Double(v) => writer.write_double(v),
        Value::Binary(ref v) => writer.write_binary(v),

        Value::Struct(ref v) => {
            writer.write_struct_begin()?;
            for field in &v.fields {
                writer.write_field_begin(FieldHeader {
                    type_code: field.value.type_code(),
                    id:        field.id,
                })?;
                encode_value(&field.value, writer)?;
                writer.write_field_end()?;
            }
            writer.write_struct_end()
        }

        Value::Map(ref v) => {
            writer.write_map_begin(MapHeader {
                key_type:   v.key_type,
                value_type: v.value_type,
                length:     v.pairs.len(),
            })?;
            for (key, value) in &v.pairs {
                encode_value(key, writer)?;
                encode_value(value, writer)?;
            }
            writer.write_map_end()
        }

        Value::Set(ref v) => {
            writer.write_set_begin(SetHeader { elem_type: v.elem_type, length: v.items.len() })?;
            for item in &v.items {
                encode_value(item, writer)?;
            }
            writer.write_set_end()
        }

        Value::List(ref v) => {
            writer.write_list_begin(ListHeader { elem_type: v.elem_type, length: v.items.len() })?;
            for item in &v.items {
                encode_value(item, writer)?;
            }
            writer.write_list_end()
        }
    }
}

/// Decode one value of the given wire type off a streaming reader.
pub fn decode_value<R: StreamReader + ?Sized>(
    code: TypeCode,
    reader: &mut R,
) -> Result<Value, WireError> {
    decode_value_limited(code, reader, None)
}

/// Decode one value, rejecting any binary payload whose declared size
/// exceeds `limit` before it is allocated.
pub fn decode_value_limited<R: StreamReader + ?Sized>(
    code: TypeCode,
    reader: &mut R,
    limit: Option<usize>,
) -> Result<Value, WireError> {
    Ok(match code {
        TypeCode::Bool => Value::Bool(reader.read_bool()?),
        TypeCode::I8 => Value::I8(reader.read_i8()?),
        TypeCode::I16 => Value::I16(reader.read_i16()?),
        TypeCode::I32 => Value::I32(reader.read_i32()?),
        TypeCode::I64 => Value::I64(reader.read_i64()?),
        TypeCode::Double => Value::Double(reader.read_double()?),
        TypeCode::Binary => Value::Binary(reader.read_binary_limited(limit)?),

        TypeCode::Struct => {
            reader.read_struct_begin()?;
            let mut fields = Vec::new();
            // The stop byte is consumed by the field header read.
            while let Some(header) = reader.read_field_begin()? {
                let value = decode_value_limited(header.type_code, reader, limit)?;
                reader.read_field_end()?;
                fields.push(FieldValue { id: header.id, value });
            }
            Value::Struct(StructValue { fields })
        }

        TypeCode::Map => {
            let header = reader.read_map_begin()?;
            let mut pairs = Vec::with_capacity(header.length.min(PREALLOC_CLAMP));
            for _ in 0..header.length {
                let key = decode_value_limited(header.key_type, reader, limit)?;
                let value = decode_value_limited(header.value_type, reader, limit)?;
                pairs.push((key, value));
            }
            reader.read_map_end()?;
            Value::Map(MapValue {
                key_type: header.key_type,
                value_type: header.value_type,
                pairs,
            })
        }

        TypeCode::Set => {
            let header = reader.read_set_begin()?;
            let mut items = Vec::with_capacity(header.length.min(PREALLOC_CLAMP));
            for _ in 0..header.length {
                items.push(decode_value_limited(header.elem_type, reader, limit)?);
            }
            reader.read_set_end()?;
            Value::Set(SetValue { elem_type: header.elem_type, items })
        }

        TypeCode::List => {
            let header = reader.read_list_begin()?;
            let mut items = Vec::with_capacity(header.length.min(PREALLOC_CLAMP));
            for _ in 0..header.length {
                items.push(decode_value_limited(header.elem_type, reader, limit)?);
            }
            reader.read_list_end()?;
            Value::List(ListValue { elem_type: header.elem_type, items })
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::BinaryStreamReader;
    use crate::writer::BinaryStreamWriter;

    fn encode(value: &Value) -> Vec<u8> {
        let mut writer = BinaryStreamWriter::new(Vec::new());
        encode_value(value, &mut writer).unwrap();
        writer.into_inner()
    }

    fn decode(code: TypeCode, bytes: &[u8]) -> Result<Value, WireError> {
        let mut reader = BinaryStreamReader::new(bytes);
        decode_value(code, &mut reader)
    }

    fn assert_round_trip(value: Value) {
        let bytes = encode(&value);
        assert_eq!(decode(value.type_code(), &bytes).unwrap(), value);

        // Skipping the same encoding consumes exactly the value.
        let mut padded = bytes.clone();
        padded.push(0x5C);
        let mut reader = BinaryStreamReader::new(&padded[..]);
        reader.skip(value.type_code()).unwrap();
        assert_eq!(reader.read_i8().unwrap(), 0x5C);
    }

    fn sample_struct() -> Value {
        Value::Struct(StructValue::new(vec![
            FieldValue { id: 1, value: Value::I32(7) },
            FieldValue { id: 2, value: Value::string("hi") },
        ]))
    }

    #[test]
    fn round_trip_scalars() {
        assert_round_trip(Value::Bool(true));
        assert_round_trip(Value::Bool(false));
        assert_round_trip(Value::I8(-1));
        assert_round_trip(Value::I16(-2));
        assert_round_trip(Value::I32(1 << 20));
        assert_round_trip(Value::I64(-(1 << 40)));
        assert_round_trip(Value::Double(123.456));
        assert_round_trip(Value::Binary(vec![]));
        assert_round_trip(Value::string("🍕"));
    }

    #[test]
    fn round_trip_containers() {
        assert_round_trip(Value::List(ListValue {
            elem_type: TypeCode::I32,
            items:     vec![Value::I32(1), Value::I32(2), Value::I32(3)],
        }));
        assert_round_trip(Value::Set(SetValue {
            elem_type: TypeCode::Binary,
            items:     vec![Value::string("a"), Value::string("b")],
        }));
        assert_round_trip(Value::Map(MapValue {
            key_type:   TypeCode::Binary,
            value_type: TypeCode::List,
            pairs:      vec![(
                Value::string("xs"),
                Value::List(ListValue {
                    elem_type: TypeCode::I64,
                    items:     vec![Value::I64(9)],
                }),
            )],
        }));
        // Empty containers keep their declared element types.
        assert_round_trip(Value::Map(MapValue {
            key_type:   TypeCode::I32,
            value_type: TypeCode::I32,
            pairs:      vec![],
        }));
    }

    #[test]
    fn round_trip_structs() {
        assert_round_trip(sample_struct());
        assert_round_trip(Value::Struct(StructValue::new(vec![])));
        assert_round_trip(Value::Struct(StructValue::new(vec![FieldValue {
            id:    1,
            value: sample_struct(),
        }])));
    }

    #[test]
    fn struct_byte_layout() {
        assert_eq!(
            encode(&sample_struct()),
            [
                0x08, 0x00, 0x01, 0x00, 0x00, 0x00, 0x07, // 1: i32 = 7
                0x0B, 0x00, 0x02, 0x00, 0x00, 0x00, 0x02, 0x68, 0x69, // 2: "hi"
                0x00, // stop
            ]
        );
    }

    #[test]
    fn decode_rejects_truncation() {
        let bytes = encode(&sample_struct());
        for cut in 1..bytes.len() {
            assert!(decode(TypeCode::Struct, &bytes[..cut]).is_err());
        }
    }

    #[test]
    fn decode_limited_rejects_large_binaries() {
        let value = Value::Struct(StructValue::new(vec![FieldValue {
            id:    1,
            value: Value::string("hello"),
        }]));
        let bytes = encode(&value);

        let mut reader = BinaryStreamReader::new(&bytes[..]);
        assert_eq!(
            decode_value_limited(TypeCode::Struct, &mut reader, Some(5)).unwrap(),
            value
        );

        let mut reader = BinaryStreamReader::new(&bytes[..]);
        assert!(matches!(
            decode_value_limited(TypeCode::Struct, &mut reader, Some(4)),
            Err(WireError::LimitExceeded { size: 5, limit: 4 })
        ));
    }

    #[test]
    fn decode_rejects_bad_bool_in_struct() {
        // 1: bool = 2 is not a valid encoding.
        let bytes = [0x02, 0x00, 0x01, 0x02, 0x00];
        assert!(matches!(
            decode(TypeCode::Struct, &bytes),
            Err(WireError::InvalidBool(2))
        ));
    }
}
