use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use thiserror::Error;

use super::mapping::{FieldMapping, FieldType, TagMapping};
use crate::decoder::Record;
use crate::timefmt::parse_timestamp;

#[derive(Error, Debug)]
pub enum PointError {
    #[error("invalid measurement: measurement required")]
    EmptyMeasurement,

    #[error("invalid row for {kind}: {row}")]
    MissingRow { kind: &'static str, row: String },

    #[error("invalid timestamp '{value}' for layout '{layout}': {source}")]
    Timestamp {
        value: String,
        layout: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("timestamp {0} cannot be expressed in nanoseconds since the epoch")]
    TimestampOutOfRange(DateTime<Utc>),

    #[error("value '{value}' of field '{field}' is not a valid {field_type}")]
    InvalidValue {
        field: String,
        value: String,
        field_type: FieldType,
    },
}

/// Typed value of a point field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl FieldValue {
    /// Parse a raw column value as `field_type`.
    ///
    /// Booleans accept `1 t T TRUE true True` and `0 f F FALSE false False`.
    /// Floats must be finite.
    pub fn parse(raw: &str, field_type: FieldType) -> Option<Self> {
        match field_type {
            FieldType::Bool => match raw {
                "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(FieldValue::Bool(true)),
                "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(FieldValue::Bool(false)),
                _ => None,
            },
            FieldType::Integer => raw.parse().ok().map(FieldValue::Integer),
            FieldType::Float => raw
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(FieldValue::Float),
            FieldType::String => Some(FieldValue::String(raw.to_string())),
        }
    }
}

/// How records are turned into points
#[derive(Debug, Clone)]
pub struct PointSchema {
    pub measurement: String,
    pub timestamp_row: String,
    pub timestamp_layout: String,
    pub tags: Vec<TagMapping>,
    pub fields: Vec<FieldMapping>,
}

/// One time-series record
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub measurement: String,
    pub timestamp: DateTime<Utc>,
    pub tags: BTreeMap<String, String>,
    pub fields: BTreeMap<String, FieldValue>,
}

impl Point {
    pub fn new(measurement: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            measurement: measurement.into(),
            timestamp,
            tags: BTreeMap::new(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: FieldValue) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    /// Render as one line of InfluxDB line protocol with a nanosecond
    /// timestamp. Tags and fields come out sorted by key. Tags with an empty
    /// value are left out since the server rejects them.
    pub fn to_line(&self) -> String {
        let mut line = escape(&self.measurement, &[',', ' ']);

        for (key, value) in &self.tags {
            if value.is_empty() {
                continue;
            }
            let _ = write!(
                line,
                ",{}={}",
                escape(key, &[',', '=', ' ']),
                escape(value, &[',', '=', ' '])
            );
        }

        let fields: Vec<String> = self
            .fields
            .iter()
            .map(|(key, value)| {
                let key = escape(key, &[',', '=', ' ']);
                match value {
                    FieldValue::Bool(v) => format!("{}={}", key, v),
                    FieldValue::Integer(v) => format!("{}={}i", key, v),
                    FieldValue::Float(v) => format!("{}={}", key, v),
                    FieldValue::String(v) => format!("{}=\"{}\"", key, escape(v, &['"', '\\'])),
                }
            })
            .collect();
        line.push(' ');
        line.push_str(&fields.join(","));

        if let Some(ns) = self.timestamp.timestamp_nanos_opt() {
            let _ = write!(line, " {}", ns);
        }

        line
    }
}

fn escape(value: &str, special: &[char]) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if special.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn column<'a>(row: &'a Record, name: &str, kind: &'static str) -> Result<&'a str, PointError> {
    row.get(name)
        .map(String::as_str)
        .ok_or_else(|| PointError::MissingRow {
            kind,
            row: name.to_string(),
        })
}

/// Convert one record
pub fn to_point(row: &Record, schema: &PointSchema) -> Result<Point, PointError> {
    if schema.measurement.is_empty() {
        return Err(PointError::EmptyMeasurement);
    }

    let raw_ts = column(row, &schema.timestamp_row, "timestamp")?;
    let timestamp =
        parse_timestamp(raw_ts, &schema.timestamp_layout).map_err(|source| PointError::Timestamp {
            value: raw_ts.to_string(),
            layout: schema.timestamp_layout.clone(),
            source,
        })?;
    if timestamp.timestamp_nanos_opt().is_none() {
        return Err(PointError::TimestampOutOfRange(timestamp));
    }

    let mut point = Point::new(schema.measurement.clone(), timestamp);

    for tag in &schema.tags {
        let value = column(row, &tag.row, "tag")?;
        point.tags.insert(tag.tag.clone(), value.to_string());
    }

    for field in &schema.fields {
        let raw = column(row, &field.row, "field")?;
        let value =
            FieldValue::parse(raw, field.field_type).ok_or_else(|| PointError::InvalidValue {
                field: field.field.clone(),
                value: raw.to_string(),
                field_type: field.field_type,
            })?;
        point.fields.insert(field.field.clone(), value);
    }

    Ok(point)
}

/// Convert records in order. The first failing record fails the batch.
pub fn to_points(rows: &[Record], schema: &PointSchema) -> Result<Vec<Point>, PointError> {
    rows.iter().map(|row| to_point(row, schema)).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const LAYOUT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

    fn schema(measurement: &str) -> PointSchema {
        PointSchema {
            measurement: measurement.to_string(),
            timestamp_row: "timestamp".to_string(),
            timestamp_layout: LAYOUT.to_string(),
            tags: vec![],
            fields: vec![],
        }
    }

    fn record(pairs: &[(&str, &str)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_empty_rows_give_no_points() {
        assert!(to_points(&[], &schema("foo")).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_timestamp() {
        let rows = vec![record(&[("timestamp", "foo")])];
        assert!(matches!(
            to_points(&rows, &schema("foo")),
            Err(PointError::Timestamp { .. })
        ));
    }

    #[test]
    fn test_missing_timestamp_row() {
        let rows = vec![record(&[("ts", "2021-06-30T13:06:18.000Z")])];
        assert!(matches!(
            to_points(&rows, &schema("foo")),
            Err(PointError::MissingRow { kind: "timestamp", .. })
        ));
    }

    #[test]
    fn test_invalid_field_value() {
        let mut s = schema("foo");
        s.fields = vec![FieldMapping::new("foo", "foo", FieldType::Bool)];
        let rows = vec![record(&[("timestamp", "2021-06-30T13:06:18.000Z"), ("foo", "bar")])];
        assert!(matches!(
            to_points(&rows, &s),
            Err(PointError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_measurement_required() {
        let rows = vec![record(&[("timestamp", "2021-06-30T13:06:18.000Z")])];
        assert!(matches!(
            to_points(&rows, &schema("")),
            Err(PointError::EmptyMeasurement)
        ));
    }

    #[test]
    fn test_timestamp_only_point() {
        let rows = vec![record(&[("timestamp", "2021-06-30T13:06:18.000Z")])];
        let points = to_points(&rows, &schema("foo")).unwrap();
        assert_eq!(
            points,
            vec![Point::new(
                "foo",
                Utc.with_ymd_and_hms(2021, 6, 30, 13, 6, 18).unwrap()
            )]
        );
    }

    #[test]
    fn test_missing_row_is_an_error() {
        let mut s = schema("foo");
        s.tags = vec![TagMapping::new("foo", "foo"), TagMapping::new("bar", "bar")];
        let rows = vec![record(&[("timestamp", "2022-06-30T13:06:18.000Z"), ("foo", "bar")])];
        let err = to_points(&rows, &s).unwrap_err();
        assert!(matches!(err, PointError::MissingRow { kind: "tag", ref row } if row == "bar"));

        let mut s = schema("foo");
        s.fields = vec![FieldMapping::new("baz", "baz", FieldType::String)];
        let err = to_points(&rows, &s).unwrap_err();
        assert!(matches!(err, PointError::MissingRow { kind: "field", .. }));
    }

    #[test]
    fn test_complete_rows() {
        let mut s = schema("foo");
        s.tags = vec![
            TagMapping::new("tag1Foo", "tag1Row"),
            TagMapping::new("tag2Foo", "tag2Row"),
        ];
        s.fields = vec![
            FieldMapping::new("fieldBoolFoo", "fieldBool", FieldType::Bool),
            FieldMapping::new("fieldIntFoo", "fieldInt", FieldType::Integer),
            FieldMapping::new("fieldFloatFoo", "fieldFloat", FieldType::Float),
            FieldMapping::new("fieldStringFoo", "fieldString", FieldType::String),
        ];
        let rows = vec![
            record(&[
                ("timestamp", "2022-06-30T13:06:18.000Z"),
                ("tag1Row", "row1tag1Value"),
                ("tag2Row", "row1tag2Value"),
                ("fieldBool", "true"),
                ("fieldInt", "64"),
                ("fieldFloat", "12.76"),
                ("fieldString", "foo"),
            ]),
            record(&[
                ("timestamp", "2022-06-30T13:06:18.000Z"),
                ("tag1Row", "row2tag1Value"),
                ("tag2Row", "row2tag2Value"),
                ("fieldBool", "F"),
                ("fieldInt", "-32"),
                ("fieldFloat", "3.4567"),
                ("fieldString", "bar"),
            ]),
        ];

        let points = to_points(&rows, &s).unwrap();
        let ts = Utc.with_ymd_and_hms(2022, 6, 30, 13, 6, 18).unwrap();
        assert_eq!(
            points,
            vec![
                Point::new("foo", ts)
                    .with_tag("tag1Foo", "row1tag1Value")
                    .with_tag("tag2Foo", "row1tag2Value")
                    .with_field("fieldBoolFoo", FieldValue::Bool(true))
                    .with_field("fieldIntFoo", FieldValue::Integer(64))
                    .with_field("fieldFloatFoo", FieldValue::Float(12.76))
                    .with_field("fieldStringFoo", FieldValue::String("foo".into())),
                Point::new("foo", ts)
                    .with_tag("tag1Foo", "row2tag1Value")
                    .with_tag("tag2Foo", "row2tag2Value")
                    .with_field("fieldBoolFoo", FieldValue::Bool(false))
                    .with_field("fieldIntFoo", FieldValue::Integer(-32))
                    .with_field("fieldFloatFoo", FieldValue::Float(3.4567))
                    .with_field("fieldStringFoo", FieldValue::String("bar".into())),
            ]
        );
    }

    #[test]
    fn test_field_value_parsing() {
        assert_eq!(FieldValue::parse("1", FieldType::Bool), Some(FieldValue::Bool(true)));
        assert_eq!(FieldValue::parse("False", FieldType::Bool), Some(FieldValue::Bool(false)));
        assert_eq!(FieldValue::parse("yes", FieldType::Bool), None);
        assert_eq!(FieldValue::parse("12.5", FieldType::Integer), None);
        assert_eq!(FieldValue::parse("NaN", FieldType::Float), None);
        assert_eq!(FieldValue::parse("7", FieldType::Float), Some(FieldValue::Float(7.0)));
    }

    #[test]
    fn test_line_protocol() {
        let ts = Utc.with_ymd_and_hms(2021, 6, 24, 6, 0, 0).unwrap();
        let point = Point::new("audience", ts)
            .with_tag("pp", "/foo_bar_00")
            .with_tag("host", "a")
            .with_field("count", FieldValue::Integer(6892))
            .with_field("ratio", FieldValue::Float(0.5))
            .with_field("live", FieldValue::Bool(true))
            .with_field("label", FieldValue::String("x".into()));

        assert_eq!(
            point.to_line(),
            "audience,host=a,pp=/foo_bar_00 count=6892i,label=\"x\",live=true,ratio=0.5 1624514400000000000"
        );
    }

    #[test]
    fn test_line_protocol_escaping() {
        let ts = Utc.timestamp_opt(0, 5).unwrap();
        let point = Point::new("my measure,x", ts)
            .with_tag("tag key", "a=b,c")
            .with_tag("empty", "")
            .with_field("f=1", FieldValue::String("say \"hi\" \\o/".into()));

        assert_eq!(
            point.to_line(),
            r#"my\ measure\,x,tag\ key=a\=b\,c f\=1="say \"hi\" \\o/" 5"#
        );
    }
}
