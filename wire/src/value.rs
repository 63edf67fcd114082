use std::fmt;
use std::str;

use crate::TypeCode;

/// This type holds dynamic Thrift data.
///
/// A `Value` can represent anything the binary protocol can transport and is
/// converted to and from bytes by the value codec. Strings travel as
/// [Binary](#variant.Binary); enums travel as [I32](#variant.I32). Containers
/// own the type tag of their elements alongside the payload, so an empty
/// collection still round-trips its declared element type.
#[derive(Clone)]
pub enum Value {
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    Double(f64),
    Binary(Vec<u8>),
    Struct(StructValue),
    Map(MapValue),
    Set(SetValue),
    List(ListValue),
}

/// One field slot of a decoded struct: ordinal id plus payload. The slot's
/// wire type is derived from the payload.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldValue {
    pub id:    i16,
    pub value: Value,
}

/// A decoded struct, union, or exception: fields in encounter order.
#[derive(Debug, Clone, PartialEq)]
pub struct StructValue {
    pub fields: Vec<FieldValue>,
}

/// A decoded map: element type tags plus key/value pairs in encounter order.
#[derive(Debug, Clone, PartialEq)]
pub struct MapValue {
    pub key_type:   TypeCode,
    pub value_type: TypeCode,
    pub pairs:      Vec<(Value, Value)>,
}

/// A decoded set: element type tag plus items in encounter order.
#[derive(Debug, Clone, PartialEq)]
pub struct SetValue {
    pub elem_type: TypeCode,
    pub items:     Vec<Value>,
}

/// A decoded list: element type tag plus items in order.
#[derive(Debug, Clone, PartialEq)]
pub struct ListValue {
    pub elem_type: TypeCode,
    pub items:     Vec<Value>,
}

impl StructValue {
    pub fn new(fields: Vec<FieldValue>) -> StructValue {
        StructValue { fields }
    }

    /// Look up the first field carrying the given id.
    pub fn get(&self, id: i16) -> Option<&Value> {
        self.fields.iter().find(|f| f.id == id).map(|f| &f.value)
    }
}

impl Value {
    /// Build a [Binary](#variant.Binary) value from UTF-8 text.
    pub fn string(text: &str) -> Value {
        Value::Binary(text.as_bytes().to_vec())
    }

    /// The wire type used to transport this value.
    pub fn type_code(&self) -> TypeCode {
        match *self {
            Value::Bool(_) => TypeCode::Bool,
            Value::I8(_) => TypeCode::I8,
            Value::I16(_) => TypeCode::I16,
            Value::I32(_) => TypeCode::I32,
            Value::I64(_) => TypeCode::I64,
            Value::Double(_) => TypeCode::Double,
            Value::Binary(_) => TypeCode::Binary,
            Value::Struct(_) => TypeCode::Struct,
            Value::Map(_) => TypeCode::Map,
            Value::Set(_) => TypeCode::Set,
            Value::List(_) => TypeCode::List,
        }
    }

    /// A convenience method to extract the value out of a [Bool](#variant.Bool).
    /// Returns `false` for other value kinds.
    pub fn as_bool(&self) -> bool {
        match *self {
            Value::Bool(value) => value,
            _ => false,
        }
    }

    /// A convenience method to extract the value out of an [I8](#variant.I8).
    /// Returns `0` for other value kinds.
    pub fn as_i8(&self) -> i8 {
        match *self {
            Value::I8(value) => value,
            _ => 0,
        }
    }

    /// A convenience method to extract the value out of an [I16](#variant.I16).
    /// Returns `0` for other value kinds.
    pub fn as_i16(&self) -> i16 {
        match *self {
            Value::I16(value) => value,
            _ => 0,
        }
    }

    /// A convenience method to extract the value out of an [I32](#variant.I32).
    /// Returns `0` for other value kinds.
    pub fn as_i32(&self) -> i32 {
        match *self {
            Value::I32(value) => value,
            _ => 0,
        }
    }

    /// A convenience method to extract the value out of an [I64](#variant.I64).
    /// Returns `0` for other value kinds.
    pub fn as_i64(&self) -> i64 {
        match *self {
            Value::I64(value) => value,
            _ => 0,
        }
    }

    /// A convenience method to extract the value out of a [Double](#variant.Double).
    /// Returns `0.0` for other value kinds.
    pub fn as_double(&self) -> f64 {
        match *self {
            Value::Double(value) => value,
            _ => 0.0,
        }
    }

    /// A convenience method to extract the bytes out of a [Binary](#variant.Binary).
    /// Returns an empty slice for other value kinds.
    pub fn as_binary(&self) -> &[u8] {
        match *self {
            Value::Binary(ref value) => value.as_slice(),
            _ => &[],
        }
    }

    /// A convenience method to view a [Binary](#variant.Binary) as UTF-8 text.
    /// Returns `""` for other value kinds or for bytes that are not UTF-8.
    pub fn as_str(&self) -> &str {
        match *self {
            Value::Binary(ref value) => str::from_utf8(value).unwrap_or(""),
            _ => "",
        }
    }

    /// A convenience method to look up a field on a [Struct](#variant.Struct).
    /// Returns `None` for other value kinds or if the field isn't present.
    pub fn get(&self, id: i16) -> Option<&Value> {
        match *self {
            Value::Struct(ref value) => value.get(id),
            _ => None,
        }
    }

    /// A convenience method to extract the element count out of a container.
    /// Returns `0` for non-container value kinds.
    pub fn len(&self) -> usize {
        match *self {
            Value::Struct(ref value) => value.fields.len(),
            Value::Map(ref value) => value.pairs.len(),
            Value::Set(ref value) => value.items.len(),
            Value::List(ref value) => value.items.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Structural equality with doubles compared by bit pattern instead of
    /// IEEE semantics, so `NaN` payloads compare equal to themselves.
    pub fn bits_eq(&self, other: &Value) -> bool {
        value_eq(self, other, true)
    }
}

/// The single equality engine. `bits` selects bit-pattern comparison for
/// doubles; everything else is structural. Structs, maps, and sets compare as
/// multisets; lists compare index-wise.
fn value_eq(a: &Value, b: &Value, bits: bool) -> bool {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::I8(x), Value::I8(y)) => x == y,
        (Value::I16(x), Value::I16(y)) => x == y,
        (Value::I32(x), Value::I32(y)) => x == y,
        (Value::I64(x), Value::I64(y)) => x == y,
        (Value::Double(x), Value::Double(y)) => {
            if bits {
                x.to_bits() == y.to_bits()
            } else {
                x == y
            }
        }
        (Value::Binary(x), Value::Binary(y)) => x == y,
        (Value::Struct(x), Value::Struct(y)) => multiset_eq(&x.fields, &y.fields, &|f, g| {
            f.id == g.id && value_eq(&f.value, &g.value, bits)
        }),
        (Value::Map(x), Value::Map(y)) => {
            x.key_type == y.key_type
                && x.value_type == y.value_type
                && multiset_eq(&x.pairs, &y.pairs, &|p, q| {
                    value_eq(&p.0, &q.0, bits) && value_eq(&p.1, &q.1, bits)
                })
        }
        (Value::Set(x), Value::Set(y)) => {
            x.elem_type == y.elem_type
                && multiset_eq(&x.items, &y.items, &|v, w| value_eq(v, w, bits))
        }
        (Value::List(x), Value::List(y)) => {
            x.elem_type == y.elem_type
                && x.items.len() == y.items.len()
                && x.items
                    .iter()
                    .zip(&y.items)
                    .all(|(v, w)| value_eq(v, w, bits))
        }
        _ => false,
    }
}

/// Order-insensitive, multiplicity-preserving comparison: every element must
/// occur the same number of times on both sides.
fn multiset_eq<T>(a: &[T], b: &[T], eq: &dyn Fn(&T, &T) -> bool) -> bool {
    if a.len() != b.len() {
        return false;
    }
    for x in a {
        let in_a = a.iter().filter(|y| eq(x, y)).count();
        let in_b = b.iter().filter(|y| eq(x, y)).count();
        if in_a != in_b {
            return false;
        }
    }
    true
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        value_eq(self, other, false)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        match *self {
            Value::Bool(value) => value.fmt(f),
            Value::I8(value) => value.fmt(f),
            Value::I16(value) => value.fmt(f),
            Value::I32(value) => value.fmt(f),
            Value::I64(value) => value.fmt(f),
            Value::Double(value) => value.fmt(f),

            Value::Binary(ref value) => match str::from_utf8(value) {
                Ok(text) => text.fmt(f),
                Err(_) => value.fmt(f),
            },

            Value::Struct(ref value) => {
                let mut fields: Vec<_> = value.fields.iter().collect();
                fields.sort_by_key(|field| field.id);
                let mut first = true;
                write!(f, "{{")?;
                for field in fields {
                    if first {
                        first = false;
                    } else {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {:?}", field.id, field.value)?;
                }
                write!(f, "}}")
            }

            Value::Map(ref value) => {
                let mut first = true;
                write!(f, "{{")?;
                for (key, val) in &value.pairs {
                    if first {
                        first = false;
                    } else {
                        write!(f, ", ")?;
                    }
                    write!(f, "{:?}: {:?}", key, val)?;
                }
                write!(f, "}}")
            }

            Value::Set(ref value) => {
                let mut first = true;
                write!(f, "{{")?;
                for item in &value.items {
                    if first {
                        first = false;
                    } else {
                        write!(f, ", ")?;
                    }
                    write!(f, "{:?}", item)?;
                }
                write!(f, "}}")
            }

            Value::List(ref value) => value.items.fmt(f),
        }
    }
}
