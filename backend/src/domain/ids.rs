//! Store-assigned document identifiers.
//!
//! Every document in the backing store carries an opaque string identifier.
//! The newtypes below keep trip, day, slot, proposal and user identifiers
//! from being mixed up and reject blank or padded values at the edge.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Validation errors raised by identifier constructors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdValidationError {
    Empty { kind: &'static str },
    SurroundingWhitespace { kind: &'static str },
}

impl fmt::Display for IdValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty { kind } => write!(f, "{kind} id must not be empty"),
            Self::SurroundingWhitespace { kind } => {
                write!(f, "{kind} id must not have leading or trailing whitespace")
            }
        }
    }
}

impl std::error::Error for IdValidationError {}

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident => $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Validate and construct the identifier.
            pub fn new(id: impl Into<String>) -> Result<Self, IdValidationError> {
                let id = id.into();
                if id.is_empty() {
                    return Err(IdValidationError::Empty { kind: $kind });
                }
                if id.trim() != id {
                    return Err(IdValidationError::SurroundingWhitespace { kind: $kind });
                }
                Ok(Self(id))
            }

            /// Borrow the raw identifier.
            #[must_use]
            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                self.as_str()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl FromStr for $name {
            type Err = IdValidationError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                Self::new(value)
            }
        }
    };
}

define_id! {
    /// Identifier of a trip document.
    TripId => "trip"
}

define_id! {
    /// Identifier of a day document.
    DayId => "day"
}

define_id! {
    /// Identifier of a slot document.
    SlotId => "slot"
}

define_id! {
    /// Identifier of a proposal document.
    ProposalId => "proposal"
}

define_id! {
    /// Identity of a signed-in trip member, as issued by the auth service.
    UserId => "user"
}
