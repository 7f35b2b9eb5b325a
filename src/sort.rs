//! Ordering directives for filtered queries.
//!
//! A [`Sort`] is parsed from a single token such as `"name"` or `"name desc"`.
//! The field is only a *name* at this point; it is resolved against the
//! entity's allow-list by the composer before anything reaches SQL.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{KeeperError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn keyword(&self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

impl FromStr for Direction {
    type Err = KeeperError;
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "ASC" => Ok(Direction::Asc),
            "DESC" => Ok(Direction::Desc),
            _ => Err(KeeperError::Validation(format!("invalid direction '{s}'"))),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Sort {
    field: String,
    direction: Direction,
}

impl Sort {
    pub fn new(field: impl Into<String>, direction: Direction) -> Result<Self> {
        let field = field.into();
        if field.is_empty() {
            return Err(KeeperError::Validation("sort field is required".into()));
        }
        Ok(Self { field, direction })
    }
    pub fn asc(field: impl Into<String>) -> Result<Self> {
        Self::new(field, Direction::Asc)
    }
    pub fn desc(field: impl Into<String>) -> Result<Self> {
        Self::new(field, Direction::Desc)
    }
    pub fn field(&self) -> &str {
        &self.field
    }
    pub fn direction(&self) -> Direction {
        self.direction
    }
}

impl FromStr for Sort {
    type Err = KeeperError;
    fn from_str(token: &str) -> Result<Self> {
        match token.split_once(' ') {
            None => Self::new(token, Direction::Asc),
            Some((field, direction)) => Self::new(field, direction.trim().parse()?),
        }
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.direction)
    }
}
