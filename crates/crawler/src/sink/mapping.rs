//! Tag and field mappings
//!
//! Mappings tell the sink which record column feeds which tag or field of a
//! point. They are given on the command line as
//! `name[={key:value,...}]`, for example `host` or `cpu={type:float,row:cpu_pct}`.
//! When `row` is omitted the column has the same name as the tag or field.

use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MappingError {
    #[error("'{0}' failed to parse")]
    Syntax(String),

    #[error("'{0}' has no name")]
    EmptyName(String),

    #[error("'{arg}' has an invalid field type '{value}' (expected float, int, string or bool)")]
    InvalidType { arg: String, value: String },

    #[error(transparent)]
    Pattern(#[from] regex::Error),
}

/// Name plus `key:value` options, as written on the command line
struct FlagMap {
    name: String,
    options: BTreeMap<String, String>,
}

impl FlagMap {
    fn parse(arg: &str) -> Result<Self, MappingError> {
        let pattern = Regex::new(r"^(\w*)(?:=\{(.*)\})?$")?;
        let caps = pattern
            .captures(arg)
            .ok_or_else(|| MappingError::Syntax(arg.to_string()))?;

        let name = caps.get(1).map_or("", |m| m.as_str());
        if name.is_empty() {
            return Err(MappingError::EmptyName(arg.to_string()));
        }

        let mut options = BTreeMap::new();
        let values = caps.get(2).map_or("", |m| m.as_str());
        if !values.is_empty() {
            for entry in values.split(',') {
                match entry.split(':').collect::<Vec<_>>().as_slice() {
                    [key, value] => {
                        options.insert(key.to_string(), value.to_string());
                    }
                    _ => return Err(MappingError::Syntax(arg.to_string())),
                }
            }
        }

        Ok(Self {
            name: name.to_string(),
            options,
        })
    }

    /// Source column, defaulting to the mapping name
    fn row(&self) -> String {
        match self.options.get("row") {
            Some(row) if !row.is_empty() => row.clone(),
            _ => self.name.clone(),
        }
    }
}

impl fmt::Display for FlagMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.options.is_empty() {
            let args: Vec<String> = self
                .options
                .iter()
                .map(|(k, v)| format!("{}:{}", k, v))
                .collect();
            write!(f, "={{{}}}", args.join(","))?;
        }
        Ok(())
    }
}

/// Maps a record column to a point tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagMapping {
    pub tag: String,
    pub row: String,
}

impl TagMapping {
    pub fn new(tag: impl Into<String>, row: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            row: row.into(),
        }
    }
}

impl FromStr for TagMapping {
    type Err = MappingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let flag = FlagMap::parse(s)?;
        Ok(Self {
            row: flag.row(),
            tag: flag.name,
        })
    }
}

impl fmt::Display for TagMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut options = BTreeMap::new();
        if self.row != self.tag {
            options.insert("row".to_string(), self.row.clone());
        }
        let flag = FlagMap {
            name: self.tag.clone(),
            options,
        };
        fmt::Display::fmt(&flag, f)
    }
}

/// Value type of a point field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Float,
    Integer,
    String,
    Bool,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Float => "float",
            FieldType::Integer => "int",
            FieldType::String => "string",
            FieldType::Bool => "bool",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "float" => Ok(FieldType::Float),
            "int" | "integer" => Ok(FieldType::Integer),
            "string" => Ok(FieldType::String),
            "bool" => Ok(FieldType::Bool),
            other => Err(other.to_string()),
        }
    }
}

/// Maps a record column to a typed point field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMapping {
    pub field: String,
    pub row: String,
    pub field_type: FieldType,
}

impl FieldMapping {
    pub fn new(field: impl Into<String>, row: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            field: field.into(),
            row: row.into(),
            field_type,
        }
    }
}

impl FromStr for FieldMapping {
    type Err = MappingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let flag = FlagMap::parse(s)?;
        let raw_type = flag.options.get("type").cloned().unwrap_or_default();
        let field_type = raw_type
            .parse::<FieldType>()
            .map_err(|value| MappingError::InvalidType {
                arg: s.to_string(),
                value,
            })?;

        Ok(Self {
            row: flag.row(),
            field: flag.name,
            field_type,
        })
    }
}

impl fmt::Display for FieldMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut options = BTreeMap::new();
        options.insert("type".to_string(), self.field_type.to_string());
        if self.row != self.field {
            options.insert("row".to_string(), self.row.clone());
        }
        let flag = FlagMap {
            name: self.field.clone(),
            options,
        };
        fmt::Display::fmt(&flag, f)
    }
}
