//! Provides the dynamic value type the engine evaluates against.
//!
//! A [`Value`] is an immutable tagged union covering the shapes a
//! render context can contain: scalars, nested records, lists of
//! records, and the record-set wrapper (`{results: [...]}`) that query
//! layers commonly hand back.  Values are created from any
//! [`serde::Serialize`] data, usually through the
//! [`context!`](crate::context!) macro:
//!
//! ```
//! # use railplate::value::Value;
//! let value = Value::from_serialize(&[1, 2, 3]);
//! ```
//!
//! Values render with the interpolation semantics the template
//! language inherits from its JavaScript ancestry: absent values
//! render as the empty string, lists join on commas, and whole-number
//! floats drop their fraction.
//!
//! Values are internally reference counted which means they can be
//! copied relatively cheaply.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::ser::{self, Serialize, Serializer};

use crate::error::{Error, ErrorKind};

/// The map type backing record values.
pub type ValueMap = BTreeMap<String, Value>;

/// Field under which a record-set wrapper carries its list.
const RESULTS_KEY: &str = "results";

/// Describes the kind of value.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub enum ValueKind {
    /// The value produced by a failed lookup.
    Undefined,
    /// The null value.
    None,
    /// A boolean.
    Bool,
    /// A number (integer or float).
    Number,
    /// A string.
    String,
    /// A list of values.
    Seq,
    /// A record, including the record-set wrapper shape.
    Map,
}

#[derive(Clone)]
pub(crate) enum ValueRepr {
    Undefined,
    None,
    Bool(bool),
    I64(i64),
    F64(f64),
    String(Arc<str>),
    Seq(Arc<Vec<Value>>),
    Map(Arc<ValueMap>),
}

/// Represents a dynamically typed context value.
#[derive(Clone)]
pub struct Value(pub(crate) ValueRepr);

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            ValueRepr::Undefined => write!(f, "Undefined"),
            ValueRepr::None => write!(f, "None"),
            ValueRepr::Bool(val) => fmt::Debug::fmt(val, f),
            ValueRepr::I64(val) => fmt::Debug::fmt(val, f),
            ValueRepr::F64(val) => fmt::Debug::fmt(val, f),
            ValueRepr::String(val) => fmt::Debug::fmt(val, f),
            ValueRepr::Seq(val) => fmt::Debug::fmt(val, f),
            ValueRepr::Map(val) => fmt::Debug::fmt(val, f),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            ValueRepr::Undefined | ValueRepr::None => Ok(()),
            ValueRepr::Bool(val) => write!(f, "{val}"),
            ValueRepr::I64(val) => write!(f, "{val}"),
            ValueRepr::F64(val) => {
                if val.is_finite() && val.fract() == 0.0 {
                    write!(f, "{}", *val as i64)
                } else {
                    write!(f, "{val}")
                }
            }
            ValueRepr::String(val) => write!(f, "{val}"),
            ValueRepr::Seq(items) => {
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
            ValueRepr::Map(_) => write!(f, "[object Object]"),
        }
    }
}

impl Default for Value {
    fn default() -> Value {
        Value(ValueRepr::Undefined)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (ValueRepr::Undefined, ValueRepr::Undefined) => true,
            (ValueRepr::None, ValueRepr::None) => true,
            (ValueRepr::Bool(a), ValueRepr::Bool(b)) => a == b,
            (ValueRepr::String(a), ValueRepr::String(b)) => a == b,
            (ValueRepr::Seq(a), ValueRepr::Seq(b)) => a == b,
            (ValueRepr::Map(a), ValueRepr::Map(b)) => a == b,
            (a, b) => match (number_of(a), number_of(b)) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }
}

fn number_of(repr: &ValueRepr) -> Option<f64> {
    match repr {
        ValueRepr::I64(val) => Some(*val as f64),
        ValueRepr::F64(val) => Some(*val),
        _ => None,
    }
}

impl Value {
    /// The undefined value, as produced by any failed lookup.
    pub const UNDEFINED: Value = Value(ValueRepr::Undefined);

    /// Creates a value from anything serializable.
    ///
    /// Data that cannot be expressed in the value model (a map keyed
    /// by a sequence, for instance) degrades to
    /// [`UNDEFINED`](Self::UNDEFINED) rather than failing the render.
    pub fn from_serialize<T: Serialize>(value: &T) -> Value {
        value.serialize(ValueSerializer).unwrap_or(Value::UNDEFINED)
    }

    /// Returns the kind of the value.
    pub fn kind(&self) -> ValueKind {
        match self.0 {
            ValueRepr::Undefined => ValueKind::Undefined,
            ValueRepr::None => ValueKind::None,
            ValueRepr::Bool(_) => ValueKind::Bool,
            ValueRepr::I64(_) | ValueRepr::F64(_) => ValueKind::Number,
            ValueRepr::String(_) => ValueKind::String,
            ValueRepr::Seq(_) => ValueKind::Seq,
            ValueRepr::Map(_) => ValueKind::Map,
        }
    }

    /// Returns `true` for the undefined value.
    pub fn is_undefined(&self) -> bool {
        matches!(self.0, ValueRepr::Undefined)
    }

    /// Returns `true` for the none (null) value.
    pub fn is_none(&self) -> bool {
        matches!(self.0, ValueRepr::None)
    }

    /// Is this value truthy?
    ///
    /// Undefined, none, `false`, zero, the empty string and empty
    /// containers are falsy, everything else is truthy.
    pub fn is_true(&self) -> bool {
        match &self.0 {
            ValueRepr::Undefined | ValueRepr::None => false,
            ValueRepr::Bool(val) => *val,
            ValueRepr::I64(val) => *val != 0,
            ValueRepr::F64(val) => *val != 0.0,
            ValueRepr::String(val) => !val.is_empty(),
            ValueRepr::Seq(items) => !items.is_empty(),
            ValueRepr::Map(map) => !map.is_empty(),
        }
    }

    /// If the value is a string, returns it.
    pub fn as_str(&self) -> Option<&str> {
        match &self.0 {
            ValueRepr::String(val) => Some(val),
            _ => None,
        }
    }

    /// Returns the numeric form of the value, if it is a number.
    pub fn as_f64(&self) -> Option<f64> {
        number_of(&self.0)
    }

    /// Coerces the value into a number the way a loose comparison
    /// would: numbers pass through, numeric strings parse, booleans
    /// become 0/1.
    pub fn coerce_f64(&self) -> Option<f64> {
        match &self.0 {
            ValueRepr::Bool(val) => Some(*val as u8 as f64),
            ValueRepr::String(val) => val.trim().parse::<f64>().ok(),
            other => number_of(other),
        }
    }

    /// Returns the length of the value.
    ///
    /// Strings count characters, sequences count elements, and maps
    /// count entries, except a record-set wrapper, which reports the
    /// length of its inner list.
    pub fn len(&self) -> Option<usize> {
        match &self.0 {
            ValueRepr::String(val) => Some(val.chars().count()),
            ValueRepr::Seq(items) => Some(items.len()),
            ValueRepr::Map(map) => Some(match self.as_list() {
                Some(items) => items.len(),
                None => map.len(),
            }),
            _ => None,
        }
    }

    /// Returns `true` if the length of the value is zero or the value
    /// has no length.
    pub fn is_empty(&self) -> bool {
        self.len().map_or(true, |len| len == 0)
    }

    /// Looks up an attribute on the value.
    ///
    /// A miss yields [`UNDEFINED`](Self::UNDEFINED), never an error.
    /// The `length` attribute is synthesized for strings, sequences
    /// and maps when the record does not carry a field of that name.
    pub fn get_attr(&self, name: &str) -> Value {
        if let ValueRepr::Map(map) = &self.0 {
            if let Some(value) = map.get(name) {
                return value.clone();
            }
        }
        if name == "length" {
            if let Some(len) = self.len() {
                return Value::from(len as i64);
            }
        }
        Value::UNDEFINED
    }

    /// Views the value as a list, unwrapping a record-set wrapper.
    ///
    /// A bare sequence and a `{results: [...]}` record produce the
    /// same slice, which makes the unwrapping idempotent at every spot
    /// a list is expected.
    pub fn as_list(&self) -> Option<&[Value]> {
        match &self.0 {
            ValueRepr::Seq(items) => Some(items),
            ValueRepr::Map(map) => match map.get(RESULTS_KEY).map(|v| &v.0) {
                Some(ValueRepr::Seq(items)) => Some(items),
                _ => None,
            },
            _ => None,
        }
    }
}

macro_rules! value_from {
    ($src:ty, $dst:ident) => {
        impl From<$src> for Value {
            fn from(val: $src) -> Value {
                Value(ValueRepr::$dst(val as _))
            }
        }
    };
}

impl From<bool> for Value {
    fn from(val: bool) -> Value {
        Value(ValueRepr::Bool(val))
    }
}

value_from!(i8, I64);
value_from!(i16, I64);
value_from!(i32, I64);
value_from!(i64, I64);
value_from!(u8, I64);
value_from!(u16, I64);
value_from!(u32, I64);
value_from!(f32, F64);
value_from!(f64, F64);

impl From<u64> for Value {
    fn from(val: u64) -> Value {
        match i64::try_from(val) {
            Ok(val) => Value(ValueRepr::I64(val)),
            Err(_) => Value(ValueRepr::F64(val as f64)),
        }
    }
}

impl From<usize> for Value {
    fn from(val: usize) -> Value {
        Value::from(val as u64)
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Value {
        Value(ValueRepr::None)
    }
}

impl From<&str> for Value {
    fn from(val: &str) -> Value {
        Value(ValueRepr::String(Arc::from(val)))
    }
}

impl From<String> for Value {
    fn from(val: String) -> Value {
        Value(ValueRepr::String(Arc::from(val)))
    }
}

impl<'a> From<std::borrow::Cow<'a, str>> for Value {
    fn from(val: std::borrow::Cow<'a, str>) -> Value {
        Value::from(val.as_ref())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(val: Option<T>) -> Value {
        match val {
            Some(val) => val.into(),
            None => Value(ValueRepr::None),
        }
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(val: Vec<T>) -> Value {
        Value(ValueRepr::Seq(Arc::new(
            val.into_iter().map(Into::into).collect(),
        )))
    }
}

impl From<ValueMap> for Value {
    fn from(val: ValueMap) -> Value {
        Value(ValueRepr::Map(Arc::new(val)))
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match &self.0 {
            ValueRepr::Undefined | ValueRepr::None => serializer.serialize_unit(),
            ValueRepr::Bool(val) => serializer.serialize_bool(*val),
            ValueRepr::I64(val) => serializer.serialize_i64(*val),
            ValueRepr::F64(val) => serializer.serialize_f64(*val),
            ValueRepr::String(val) => serializer.serialize_str(val),
            ValueRepr::Seq(items) => {
                use serde::ser::SerializeSeq;
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items.iter() {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            ValueRepr::Map(map) => {
                use serde::ser::SerializeMap;
                let mut m = serializer.serialize_map(Some(map.len()))?;
                for (key, value) in map.iter() {
                    m.serialize_entry(key, value)?;
                }
                m.end()
            }
        }
    }
}

fn map_key(value: &Value) -> Result<String, Error> {
    match value.kind() {
        ValueKind::String | ValueKind::Number | ValueKind::Bool => Ok(value.to_string()),
        kind => Err(Error::new(
            ErrorKind::BadSerialization,
            format!("map key must be a primitive, got {kind:?}"),
        )),
    }
}

struct ValueSerializer;

impl Serializer for ValueSerializer {
    type Ok = Value;
    type Error = Error;

    type SerializeSeq = SerializeSeq;
    type SerializeTuple = SerializeSeq;
    type SerializeTupleStruct = SerializeSeq;
    type SerializeTupleVariant = SerializeTupleVariant;
    type SerializeMap = SerializeMap;
    type SerializeStruct = SerializeStruct;
    type SerializeStructVariant = SerializeStructVariant;

    fn serialize_bool(self, v: bool) -> Result<Value, Error> {
        Ok(Value(ValueRepr::Bool(v)))
    }

    fn serialize_i8(self, v: i8) -> Result<Value, Error> {
        Ok(Value::from(v))
    }

    fn serialize_i16(self, v: i16) -> Result<Value, Error> {
        Ok(Value::from(v))
    }

    fn serialize_i32(self, v: i32) -> Result<Value, Error> {
        Ok(Value::from(v))
    }

    fn serialize_i64(self, v: i64) -> Result<Value, Error> {
        Ok(Value::from(v))
    }

    fn serialize_i128(self, v: i128) -> Result<Value, Error> {
        match i64::try_from(v) {
            Ok(v) => Ok(Value::from(v)),
            Err(_) => Ok(Value(ValueRepr::F64(v as f64))),
        }
    }

    fn serialize_u8(self, v: u8) -> Result<Value, Error> {
        Ok(Value::from(v))
    }

    fn serialize_u16(self, v: u16) -> Result<Value, Error> {
        Ok(Value::from(v))
    }

    fn serialize_u32(self, v: u32) -> Result<Value, Error> {
        Ok(Value::from(v))
    }

    fn serialize_u64(self, v: u64) -> Result<Value, Error> {
        Ok(Value::from(v))
    }

    fn serialize_u128(self, v: u128) -> Result<Value, Error> {
        match i64::try_from(v) {
            Ok(v) => Ok(Value::from(v)),
            Err(_) => Ok(Value(ValueRepr::F64(v as f64))),
        }
    }

    fn serialize_f32(self, v: f32) -> Result<Value, Error> {
        Ok(Value::from(v))
    }

    fn serialize_f64(self, v: f64) -> Result<Value, Error> {
        Ok(Value::from(v))
    }

    fn serialize_char(self, v: char) -> Result<Value, Error> {
        Ok(Value::from(v.to_string()))
    }

    fn serialize_str(self, value: &str) -> Result<Value, Error> {
        Ok(Value::from(value))
    }

    fn serialize_bytes(self, value: &[u8]) -> Result<Value, Error> {
        Ok(Value(ValueRepr::Seq(Arc::new(
            value.iter().map(|&b| Value::from(b)).collect(),
        ))))
    }

    fn serialize_none(self) -> Result<Value, Error> {
        Ok(Value(ValueRepr::None))
    }

    fn serialize_some<T: ?Sized>(self, value: &T) -> Result<Value, Error>
    where
        T: Serialize,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Value, Error> {
        Ok(Value(ValueRepr::None))
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Value, Error> {
        Ok(Value(ValueRepr::None))
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<Value, Error> {
        Ok(Value::from(variant))
    }

    fn serialize_newtype_struct<T: ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<Value, Error>
    where
        T: Serialize,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Value, Error>
    where
        T: Serialize,
    {
        let mut map = ValueMap::new();
        map.insert(variant.to_string(), value.serialize(ValueSerializer)?);
        Ok(Value::from(map))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<Self::SerializeSeq, Error> {
        Ok(SerializeSeq {
            elements: Vec::with_capacity(len.unwrap_or(0).min(1024)),
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<Self::SerializeTuple, Error> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleStruct, Error> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleVariant, Error> {
        Ok(SerializeTupleVariant {
            name: variant,
            fields: Vec::with_capacity(len.min(1024)),
        })
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, Error> {
        Ok(SerializeMap {
            entries: ValueMap::new(),
            key: None,
        })
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStruct, Error> {
        Ok(SerializeStruct {
            fields: ValueMap::new(),
        })
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, Error> {
        Ok(SerializeStructVariant {
            variant,
            map: ValueMap::new(),
        })
    }
}

struct SerializeSeq {
    elements: Vec<Value>,
}

impl ser::SerializeSeq for SerializeSeq {
    type Ok = Value;
    type Error = Error;

    fn serialize_element<T: ?Sized>(&mut self, value: &T) -> Result<(), Error>
    where
        T: Serialize,
    {
        self.elements.push(value.serialize(ValueSerializer)?);
        Ok(())
    }

    fn end(self) -> Result<Value, Error> {
        Ok(Value(ValueRepr::Seq(Arc::new(self.elements))))
    }
}

impl ser::SerializeTuple for SerializeSeq {
    type Ok = Value;
    type Error = Error;

    fn serialize_element<T: ?Sized>(&mut self, value: &T) -> Result<(), Error>
    where
        T: Serialize,
    {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Value, Error> {
        ser::SerializeSeq::end(self)
    }
}

impl ser::SerializeTupleStruct for SerializeSeq {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T: ?Sized>(&mut self, value: &T) -> Result<(), Error>
    where
        T: Serialize,
    {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Value, Error> {
        ser::SerializeSeq::end(self)
    }
}

struct SerializeTupleVariant {
    name: &'static str,
    fields: Vec<Value>,
}

impl ser::SerializeTupleVariant for SerializeTupleVariant {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T: ?Sized>(&mut self, value: &T) -> Result<(), Error>
    where
        T: Serialize,
    {
        self.fields.push(value.serialize(ValueSerializer)?);
        Ok(())
    }

    fn end(self) -> Result<Value, Error> {
        let mut map = ValueMap::new();
        map.insert(
            self.name.to_string(),
            Value(ValueRepr::Seq(Arc::new(self.fields))),
        );
        Ok(Value::from(map))
    }
}

struct SerializeMap {
    entries: ValueMap,
    key: Option<String>,
}

impl ser::SerializeMap for SerializeMap {
    type Ok = Value;
    type Error = Error;

    fn serialize_key<T: ?Sized>(&mut self, key: &T) -> Result<(), Error>
    where
        T: Serialize,
    {
        let key = key.serialize(ValueSerializer)?;
        self.key = Some(map_key(&key)?);
        Ok(())
    }

    fn serialize_value<T: ?Sized>(&mut self, value: &T) -> Result<(), Error>
    where
        T: Serialize,
    {
        if let Some(key) = self.key.take() {
            self.entries.insert(key, value.serialize(ValueSerializer)?);
        }
        Ok(())
    }

    fn end(self) -> Result<Value, Error> {
        Ok(Value::from(self.entries))
    }
}

struct SerializeStruct {
    fields: ValueMap,
}

impl ser::SerializeStruct for SerializeStruct {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T: ?Sized>(&mut self, key: &'static str, value: &T) -> Result<(), Error>
    where
        T: Serialize,
    {
        self.fields
            .insert(key.to_string(), value.serialize(ValueSerializer)?);
        Ok(())
    }

    fn end(self) -> Result<Value, Error> {
        Ok(Value::from(self.fields))
    }
}

struct SerializeStructVariant {
    variant: &'static str,
    map: ValueMap,
}

impl ser::SerializeStructVariant for SerializeStructVariant {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T: ?Sized>(&mut self, key: &'static str, value: &T) -> Result<(), Error>
    where
        T: Serialize,
    {
        self.map
            .insert(key.to_string(), value.serialize(ValueSerializer)?);
        Ok(())
    }

    fn end(self) -> Result<Value, Error> {
        let mut rv = ValueMap::new();
        rv.insert(self.variant.to_string(), Value::from(self.map));
        Ok(Value::from(rv))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    #[test]
    fn test_display() {
        assert_eq!(Value::UNDEFINED.to_string(), "");
        assert_eq!(Value::from(()).to_string(), "");
        assert_eq!(Value::from(2.0).to_string(), "2");
        assert_eq!(Value::from(2.5).to_string(), "2.5");
        assert_eq!(Value::from(vec![1, 2, 3]).to_string(), "1,2,3");
        assert_eq!(Value::from(ValueMap::new()).to_string(), "[object Object]");
    }

    #[test]
    fn test_length_synthesis() {
        let units = Value::from(vec!["a", "b"]);
        assert_eq!(units.get_attr("length"), Value::from(2));
        assert_eq!(Value::from("choo").get_attr("length"), Value::from(4));
        assert_eq!(Value::from(1).get_attr("length"), Value::UNDEFINED);
    }

    #[test]
    fn test_record_set_unwrapping() {
        let wrapped = Value::from_serialize(&serde_json::json!({
            "results": [{"id": 5}],
            "meta": {"duration": 1},
        }));
        let bare = Value::from_serialize(&serde_json::json!([{"id": 5}]));
        assert_eq!(wrapped.as_list(), bare.as_list());
        assert_eq!(wrapped.get_attr("length"), Value::from(1));
    }

    #[test]
    fn test_from_serialize_struct() {
        #[derive(serde::Serialize)]
        struct Unit {
            road_number: u32,
            railroad: &'static str,
        }
        let unit = Value::from_serialize(&Unit {
            road_number: 844,
            railroad: "UP",
        });
        assert_eq!(unit.get_attr("road_number"), Value::from(844));
        assert_eq!(unit.get_attr("railroad"), Value::from("UP"));
        assert_eq!(unit.get_attr("livery"), Value::UNDEFINED);
    }
}
