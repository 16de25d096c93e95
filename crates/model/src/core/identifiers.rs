use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(Arc<str>);

        impl $name {
            pub fn new() -> Self {
                Self(Arc::from(Uuid::new_v4().to_string().as_str()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(Arc::from(s))
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(Arc::from(s.as_str()))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

/// Identifies one invocation of the Pipeline Kernel's `Run`.
id_newtype!(RunId);
/// Identifies one batch handed off between reader, transformer chain, and writer.
id_newtype!(BatchId);
/// Identifies one staging table instance created by the writer for a given run.
id_newtype!(StagingId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip_through_display() {
        let id = RunId::from("run-123");
        assert_eq!(id.as_str(), "run-123");
        assert_eq!(format!("{id}"), "run-123");
    }

    #[test]
    fn generated_ids_are_distinct() {
        assert_ne!(RunId::new(), RunId::new());
    }
}
