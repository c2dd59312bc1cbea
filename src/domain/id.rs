//! Domain identifiers with the NewType pattern.
//!
//! Every entity id is a short alphabetic prefix, an 8-hex-digit encoding of
//! the creation time in unix seconds, and a 10-character base36 random
//! suffix. Ids of the same kind therefore sort chronologically, decode back
//! to their creation second, and collide only with negligible probability
//! even at high creation rates within one second.
//!
//! The per-kind NewType wrappers prevent id mixing at compile time, the way
//! the rest of the codebase passes `DatasourceId` instead of bare strings.

use crate::errors::{Result, SourceplaneError};
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Width of the hex-encoded unix-seconds component
const TIME_WIDTH: usize = 8;

/// Width of the random suffix
const RANDOM_WIDTH: usize = 10;

/// Alphabet for the random suffix (base36, lowercase)
const RANDOM_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Closed enumeration of entity kinds that receive generated identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Datasource,
    Project,
    DriverInstance,
}

impl EntityKind {
    /// Short alphabetic prefix code carried by every id of this kind
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Datasource => "ds",
            Self::Project => "prj",
            Self::DriverInstance => "drv",
        }
    }

    /// Generate a fresh identifier for this kind
    pub fn create(&self) -> String {
        let seconds = chrono::Utc::now().timestamp().max(0) as u64;
        let mut rng = rand::thread_rng();
        let suffix: String = (0..RANDOM_WIDTH)
            .map(|_| RANDOM_ALPHABET[rng.gen_range(0..RANDOM_ALPHABET.len())] as char)
            .collect();
        format!("{}_{:0width$x}{}", self.prefix(), seconds, suffix, width = TIME_WIDTH)
    }

    /// Structural validator accepting only well-formed ids of this kind
    pub fn validator(&self) -> &'static IdValidator {
        static VALIDATORS: Lazy<HashMap<EntityKind, IdValidator>> = Lazy::new(|| {
            [EntityKind::Datasource, EntityKind::Project, EntityKind::DriverInstance]
                .into_iter()
                .map(|kind| (kind, IdValidator::for_prefix(kind.prefix())))
                .collect()
        });
        &VALIDATORS[self]
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.prefix())
    }
}

/// Regex-backed structural validator for one id prefix.
///
/// Malformed ids fail validation here instead of surfacing later as decode
/// errors; [`decode_timestamp`] refuses input that has not passed this.
#[derive(Debug)]
pub struct IdValidator {
    pattern: Regex,
}

impl IdValidator {
    fn for_prefix(prefix: &str) -> Self {
        let pattern = Regex::new(&format!(
            "^{}_[0-9a-f]{{{}}}[0-9a-z]{{{}}}$",
            regex::escape(prefix),
            TIME_WIDTH,
            RANDOM_WIDTH
        ))
        .expect("id pattern is statically well-formed");
        Self { pattern }
    }

    /// Check whether the given string is a well-formed id for this prefix
    pub fn validate(&self, id: &str) -> bool {
        self.pattern.is_match(id)
    }
}

/// Decode the creation time (unix seconds) from a validated identifier.
///
/// Fails with a validation error on malformed input; the random suffix is
/// opaque and never decoded.
pub fn decode_timestamp(kind: EntityKind, id: &str) -> Result<u64> {
    if !kind.validator().validate(id) {
        return Err(SourceplaneError::validation(format!(
            "'{}' is not a well-formed {} identifier",
            id,
            kind.prefix()
        )));
    }
    let body = &id[kind.prefix().len() + 1..];
    u64::from_str_radix(&body[..TIME_WIDTH], 16)
        .map_err(|e| SourceplaneError::validation(format!("Invalid id timestamp: {}", e)))
}

/// Macro to generate NewType id wrappers with all required traits
macro_rules! domain_id {
    ($(#[$meta:meta])* $name:ident, $kind:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Entity kind backing this id type
            pub const KIND: EntityKind = $kind;

            /// Generate a new id stamped with the current second
            pub fn new() -> Self {
                Self(Self::KIND.create())
            }

            /// Wrap an existing string without validation (storage retrieval)
            pub fn from_string(s: String) -> Self {
                Self(s)
            }

            /// Parse and validate an id string
            pub fn parse(s: &str) -> Result<Self> {
                if !Self::KIND.validator().validate(s) {
                    return Err(SourceplaneError::validation(format!(
                        "'{}' is not a well-formed {} identifier",
                        s,
                        Self::KIND.prefix()
                    )));
                }
                Ok(Self(s.to_string()))
            }

            /// Creation time in unix seconds, decoded from the id itself
            pub fn timestamp(&self) -> Result<u64> {
                decode_timestamp(Self::KIND, &self.0)
            }

            /// Get the inner string value
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Convert to inner string value
            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = SourceplaneError;

            fn from_str(s: &str) -> Result<Self> {
                Self::parse(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

domain_id!(
    /// Unique identifier for a datasource record
    DatasourceId,
    EntityKind::Datasource
);

domain_id!(
    /// Unique identifier for a project owning datasources
    ProjectId,
    EntityKind::Project
);

domain_id!(
    /// Unique identifier for a materialized driver instance
    DriverInstanceId,
    EntityKind::DriverInstance
);
