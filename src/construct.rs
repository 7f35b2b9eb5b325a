//! The constructs kept by the store: property groups, properties and tags.
//!
//! Identity is incidental for all of them. A construct compares equal to
//! another when its *content* matches, so a freshly built value can be
//! compared with one read back from storage regardless of the generated id.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

use crate::error::{KeeperError, Result};

pub type Identity = i64;

lazy_static! {
    static ref TAG_KEY: Regex = Regex::new(r"^[0-9a-zA-Z_]{1,64}$").unwrap();
}

pub const MAX_NAME_LENGTH: usize = 128;
pub const MAX_VERSION_LENGTH: usize = 128;
pub const MAX_KEY_LENGTH: usize = 128;
pub const MAX_VALUE_LENGTH: usize = 1024;
pub const MAX_DESCRIPTION_LENGTH: usize = 512;
pub const MAX_TAG_VALUE_LENGTH: usize = 128;

fn check_length(what: &str, value: &str, min: usize, max: usize) -> Result<()> {
    let length = value.chars().count();
    if length < min || length > max {
        return Err(KeeperError::Validation(format!(
            "{what} must be between {min} and {max} characters, got {length}"
        )));
    }
    Ok(())
}

/// Tag keys double as filter parameter names, hence the narrow alphabet.
pub fn check_tag_key(key: &str) -> Result<()> {
    if !TAG_KEY.is_match(key) {
        return Err(KeeperError::Validation(format!(
            "tag key '{key}' must be 1 to 64 alphanumerics or underscores"
        )));
    }
    Ok(())
}

// ------------- Status -------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Active,
    Inactive,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Active => "ACTIVE",
            Status::Inactive => "INACTIVE",
        }
    }
}

impl FromStr for Status {
    type Err = KeeperError;
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ACTIVE" => Ok(Status::Active),
            "INACTIVE" => Ok(Status::Inactive),
            _ => Err(KeeperError::Validation(format!("unknown status '{s}'"))),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for Status {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Status {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: KeeperError| FromSqlError::Other(Box::new(e)))
    }
}

// ------------- PropertyGroup -------------
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyGroup {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Identity>,
    pub name: String,
    pub version: String,
    pub status: Status,
}

impl PropertyGroup {
    pub fn new(name: impl Into<String>, version: impl Into<String>, status: Status) -> Self {
        Self {
            id: None,
            name: name.into(),
            version: version.into(),
            status,
        }
    }
    pub fn with_id(mut self, id: Identity) -> Self {
        self.id = Some(id);
        self
    }
    pub fn validate(&self) -> Result<()> {
        check_length("name", &self.name, 1, MAX_NAME_LENGTH)?;
        check_length("version", &self.version, 1, MAX_VERSION_LENGTH)
    }
}

impl PartialEq for PropertyGroup {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.version == other.version && self.status == other.status
    }
}
impl Eq for PropertyGroup {}
impl Hash for PropertyGroup {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.version.hash(state);
        self.status.hash(state);
    }
}

// ------------- Property -------------
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Identity>,
    pub key: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub property_group_id: Identity,
}

impl Property {
    pub fn new(
        key: impl Into<String>,
        value: Option<&str>,
        description: Option<&str>,
        property_group_id: Identity,
    ) -> Self {
        Self {
            id: None,
            key: key.into(),
            value: value.map(String::from),
            description: description.map(String::from),
            property_group_id,
        }
    }
    pub fn with_id(mut self, id: Identity) -> Self {
        self.id = Some(id);
        self
    }
    pub fn validate(&self) -> Result<()> {
        check_length("key", &self.key, 1, MAX_KEY_LENGTH)?;
        if let Some(value) = &self.value {
            check_length("value", value, 0, MAX_VALUE_LENGTH)?;
        }
        if let Some(description) = &self.description {
            check_length("description", description, 0, MAX_DESCRIPTION_LENGTH)?;
        }
        Ok(())
    }
}

impl PartialEq for Property {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
            && self.value == other.value
            && self.description == other.description
            && self.property_group_id == other.property_group_id
    }
}
impl Eq for Property {}
impl Hash for Property {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
        self.value.hash(state);
        self.description.hash(state);
        self.property_group_id.hash(state);
    }
}

// ------------- Tag -------------
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Identity>,
    pub key: String,
    #[serde(default)]
    pub value: Option<String>,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: Option<&str>) -> Self {
        Self {
            id: None,
            key: key.into(),
            value: value.map(String::from),
        }
    }
    pub fn with_id(mut self, id: Identity) -> Self {
        self.id = Some(id);
        self
    }
    pub fn validate(&self) -> Result<()> {
        check_tag_key(&self.key)?;
        if let Some(value) = &self.value {
            check_length("tag value", value, 0, MAX_TAG_VALUE_LENGTH)?;
        }
        Ok(())
    }
}

// keys are compared case-insensitively, values exactly
impl PartialEq for Tag {
    fn eq(&self, other: &Self) -> bool {
        self.key.eq_ignore_ascii_case(&other.key) && self.value == other.value
    }
}
impl Eq for Tag {}
impl Hash for Tag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.to_ascii_lowercase().hash(state);
        self.value.hash(state);
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{} = '{}'", self.key, value),
            None => write!(f, "{} = null", self.key),
        }
    }
}
