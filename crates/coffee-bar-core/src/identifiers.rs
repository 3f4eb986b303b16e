use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;

macro_rules! string_id {
    ($name:ident, $label:literal) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Mutation inputs address records by their integer primary key.
            pub fn numeric(&self) -> Result<i64, CoreError> {
                self.0.trim().parse::<i64>().map_err(|_| {
                    CoreError::Configuration(format!(
                        "{} id `{}` is not numeric.",
                        $label, self.0
                    ))
                })
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str(&self.0)
            }
        }
    };
}

string_id!(DomainId, "domain allowlist");
string_id!(UserId, "user");
string_id!(WorkspaceId, "workspace");
