//! CSV tables: a sequence of records with named fields, one row per record.
//!
//! Columns are the union of record fields in key order. Cells are untyped on
//! disk. Reading infers scalars only where the target type asks for
//! "anything", so a `String` field keeps `"007"` as written.

use serde::de::value::{Error, MapDeserializer, SeqDeserializer, StrDeserializer};
use serde::de::{self, DeserializeOwned, IntoDeserializer, Visitor};
use serde::Serialize;
use serde_json::{Map, Value};

pub(super) fn write<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, String> {
    let rows = match serde_json::to_value(value).map_err(|e| e.to_string())? {
        Value::Array(rows) => rows,
        _ => return Err("a csv pin must be a sequence of records".to_string()),
    };

    let mut header: Vec<String> = Vec::new();
    let mut records: Vec<Map<String, Value>> = Vec::with_capacity(rows.len());
    for row in rows {
        let Value::Object(fields) = row else {
            return Err("every csv row must be a record with named fields".to_string());
        };
        for key in fields.keys() {
            if !header.contains(key) {
                header.push(key.clone());
            }
        }
        records.push(fields);
    }

    let mut writer = csv::Writer::from_writer(Vec::new());
    if !header.is_empty() {
        writer.write_record(&header).map_err(|e| e.to_string())?;
    }
    for record in &records {
        let cells = header
            .iter()
            .map(|key| cell(key, record.get(key)))
            .collect::<Result<Vec<_>, _>>()?;
        writer.write_record(&cells).map_err(|e| e.to_string())?;
    }

    writer.into_inner().map_err(|e| e.error().to_string())
}

fn cell(key: &str, value: Option<&Value>) -> Result<String, String> {
    match value {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::Bool(b)) => Ok(b.to_string()),
        Some(_) => Err(format!("field {key:?} holds a nested value")),
    }
}

pub(super) fn read<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, String> {
    let mut reader = csv::Reader::from_reader(bytes);
    let header: Vec<String> = reader
        .headers()
        .map_err(|e| e.to_string())?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| e.to_string())?;
        rows.push(record.iter().map(str::to_string).collect::<Vec<_>>());
    }

    let table = rows.iter().map(|fields| Row {
        header: &header,
        fields,
    });
    T::deserialize(SeqDeserializer::<_, Error>::new(table)).map_err(|e| e.to_string())
}

/// One record, seen as a map from column name to cell.
#[derive(Clone, Copy)]
struct Row<'a> {
    header: &'a [String],
    fields: &'a [String],
}

impl<'de, 'a> de::Deserializer<'de> for Row<'a> {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        let entries = self
            .header
            .iter()
            .map(String::as_str)
            .zip(self.fields.iter().map(|f| Cell(f.as_str())));
        let mut map: MapDeserializer<'de, _, Error> = MapDeserializer::new(entries);
        let value = visitor.visit_map(&mut map)?;
        map.end()?;
        Ok(value)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        let mut seq: SeqDeserializer<_, Error> =
            SeqDeserializer::new(self.fields.iter().map(|f| Cell(f.as_str())));
        let value = visitor.visit_seq(&mut seq)?;
        seq.end()?;
        Ok(value)
    }

    fn deserialize_tuple<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value, Error> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, Error> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_some(self)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Error> {
        visitor.visit_newtype_struct(self)
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct map struct enum identifier ignored_any
    }
}

impl<'de, 'a> IntoDeserializer<'de, Error> for Row<'a> {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}

/// A single cell. Empty cells are missing values.
#[derive(Clone, Copy)]
struct Cell<'a>(&'a str);

fn looks_numeric(s: &str) -> bool {
    s.bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'-' | b'+' | b'.' | b'e' | b'E'))
}

impl<'de, 'a> de::Deserializer<'de> for Cell<'a> {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        let s = self.0;
        if s.is_empty() {
            return visitor.visit_unit();
        }
        if s.eq_ignore_ascii_case("true") {
            return visitor.visit_bool(true);
        }
        if s.eq_ignore_ascii_case("false") {
            return visitor.visit_bool(false);
        }
        if let Ok(n) = s.parse::<i64>() {
            return visitor.visit_i64(n);
        }
        if let Ok(n) = s.parse::<u64>() {
            return visitor.visit_u64(n);
        }
        if looks_numeric(s) {
            if let Ok(n) = s.parse::<f64>() {
                return visitor.visit_f64(n);
            }
        }
        visitor.visit_str(s)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        if self.0.is_empty() {
            visitor.visit_none()
        } else {
            visitor.visit_some(self)
        }
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_str(self.0)
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_str(self.0)
    }

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_str(self.0)
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_str(self.0)
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_bytes(self.0.as_bytes())
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_bytes(self.0.as_bytes())
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        if self.0.is_empty() {
            visitor.visit_unit()
        } else {
            Err(de::Error::invalid_type(de::Unexpected::Str(self.0), &visitor))
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Error> {
        visitor.visit_enum(StrDeserializer::<Error>::new(self.0))
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_unit()
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64
        unit_struct seq tuple tuple_struct map struct
    }
}

impl<'de, 'a> IntoDeserializer<'de, Error> for Cell<'a> {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::BTreeMap;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Reading {
        name: String,
        value: i32,
        ok: bool,
        note: Option<String>,
    }

    #[test]
    fn records_round_trip() {
        let rows = vec![
            Reading {
                name: "007".to_string(),
                value: -3,
                ok: true,
                note: None,
            },
            Reading {
                name: "b, with comma".to_string(),
                value: 12,
                ok: false,
                note: Some("x".to_string()),
            },
        ];

        let bytes = write(&rows).unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.starts_with("name,note,ok,value\n"));
        assert!(text.contains("\"b, with comma\""));

        let back: Vec<Reading> = read(&bytes).unwrap();
        assert_eq!(back, rows);
    }

    #[test]
    fn untyped_reads_infer_scalars() {
        let back: Vec<serde_json::Value> = read(b"a,b,c,d\n1,2.5,true,hi\n,,,\n").unwrap();
        assert_eq!(
            back,
            vec![
                serde_json::json!({"a": 1, "b": 2.5, "c": true, "d": "hi"}),
                serde_json::json!({"a": null, "b": null, "c": null, "d": null}),
            ]
        );

        let raw: Vec<BTreeMap<String, String>> = read(b"a\n007\n").unwrap();
        assert_eq!(raw[0]["a"], "007");
    }

    #[test]
    fn header_is_union_of_fields() {
        let rows = vec![
            serde_json::json!({"a": 1}),
            serde_json::json!({"b": "x"}),
        ];
        let back: Vec<BTreeMap<String, Option<String>>> = read(&write(&rows).unwrap()).unwrap();
        assert_eq!(back[0]["a"].as_deref(), Some("1"));
        assert_eq!(back[0]["b"], None);
        assert_eq!(back[1]["b"].as_deref(), Some("x"));
    }

    #[test]
    fn rows_can_be_read_as_tuples() {
        let back: Vec<(String, u8)> = read(b"k,v\na,1\nb,2\n").unwrap();
        assert_eq!(back, vec![("a".to_string(), 1), ("b".to_string(), 2)]);
    }

    #[test]
    fn non_tabular_values_are_rejected() {
        assert!(write(&42).is_err());
        assert!(write(&vec![1, 2]).is_err());
        assert!(write(&vec![serde_json::json!({"a": [1]})]).is_err());
    }

    #[test]
    fn empty_table_round_trips() {
        let rows: Vec<Reading> = Vec::new();
        let bytes = write(&rows).unwrap();
        assert!(bytes.is_empty());
        let back: Vec<Reading> = read(&bytes).unwrap();
        assert!(back.is_empty());
    }
}
