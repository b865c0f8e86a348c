//! Branded ID newtypes for type safety.
//!
//! Activities are addressed by the `identifier` their manifest item carried,
//! so [`ActivityId`] wraps an arbitrary string. Sessions are generated here
//! and use UUID v7 (time-ordered) via [`uuid::Uuid::now_v7`].

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! branded_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Return the inner string as a slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

branded_id! {
    /// Identifier of an activity (organization or item) in the course structure.
    ActivityId
}

branded_id! {
    /// Unique identifier for one sequencing session (one loaded course).
    SessionId
}

impl SessionId {
    /// Create a new random session ID (UUID v7, time-ordered).
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_is_uuid_v7() {
        let id = SessionId::new();
        let parsed = Uuid::parse_str(id.as_str()).expect("should be valid UUID");
        assert_eq!(parsed.get_version(), Some(uuid::Version::SortRand));
    }

    #[test]
    fn session_ids_are_unique() {
        assert_ne!(SessionId::new(), SessionId::default());
    }

    #[test]
    fn activity_id_keeps_manifest_identifier() {
        let id = ActivityId::from("ITEM-lesson_1");
        assert_eq!(id.as_str(), "ITEM-lesson_1");
        assert_eq!(format!("{id}"), "ITEM-lesson_1");
    }

    #[test]
    fn activity_id_borrows_as_str_for_map_lookup() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        let _ = map.insert(ActivityId::from("a1"), 7);
        assert_eq!(map.get("a1"), Some(&7));
    }

    #[test]
    fn serde_is_transparent() {
        let id = ActivityId::from("module-2");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"module-2\"");
        let back: ActivityId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn into_inner() {
        let id = ActivityId::from("inner");
        assert_eq!(id.into_inner(), "inner");
    }
}
