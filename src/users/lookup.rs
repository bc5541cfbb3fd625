use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;

/// Columns a user may be looked up by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserColumn {
    Id,
    Name,
    Email,
}

impl UserColumn {
    pub fn as_str(self) -> &'static str {
        match self {
            UserColumn::Id => "id",
            UserColumn::Name => "name",
            UserColumn::Email => "email",
        }
    }
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ColumnError {
    #[error("column name {0:?} contains disallowed characters")]
    Unsafe(String),
    #[error("unknown column {0:?}")]
    Unknown(String),
    #[error("invalid value for column {column}: {value:?}")]
    InvalidValue { column: &'static str, value: String },
}

fn is_safe_identifier(s: &str) -> bool {
    lazy_static! {
        static ref IDENT_RE: Regex = Regex::new(r"^[a-z0-9_]+$").unwrap();
    }
    IDENT_RE.is_match(s)
}

impl FromStr for UserColumn {
    type Err = ColumnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !is_safe_identifier(s) {
            return Err(ColumnError::Unsafe(s.to_string()));
        }
        match s {
            "id" => Ok(UserColumn::Id),
            "name" => Ok(UserColumn::Name),
            "email" => Ok(UserColumn::Email),
            other => Err(ColumnError::Unknown(other.to_string())),
        }
    }
}

/// A user lookup: the column and a value of the right type for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup<'a> {
    Id(i64),
    Name(&'a str),
    Email(&'a str),
}

impl<'a> Lookup<'a> {
    pub fn column(&self) -> UserColumn {
        match self {
            Lookup::Id(_) => UserColumn::Id,
            Lookup::Name(_) => UserColumn::Name,
            Lookup::Email(_) => UserColumn::Email,
        }
    }

    /// Builds a lookup from untyped input. Fails closed before any query is
    /// built.
    pub fn parse(column: &str, value: &'a str) -> Result<Self, ColumnError> {
        Self::new(column.parse()?, value)
    }

    pub fn new(column: UserColumn, value: &'a str) -> Result<Self, ColumnError> {
        match column {
            UserColumn::Id => value
                .parse()
                .map(Lookup::Id)
                .map_err(|_| ColumnError::InvalidValue {
                    column: column.as_str(),
                    value: value.to_string(),
                }),
            UserColumn::Name => Ok(Lookup::Name(value)),
            UserColumn::Email => Ok(Lookup::Email(value)),
        }
    }
}
