//! Type-safe identifiers for routes, stops and vehicles.
//!
//! Stop short names use Arc<str> for cheap cloning; route and vehicle ids are
//! the integer ids handed out by the feed.

use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

macro_rules! impl_string_identifier {
    ($name:ident) => {
        #[derive(Clone, Debug)]
        pub struct $name(Arc<str>);

        impl $name {
            pub fn new(s: impl AsRef<str>) -> Self {
                Self(s.as_ref().into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
            }
        }

        impl Eq for $name {}

        impl PartialOrd for $name {
            fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
                Some(self.cmp(other))
            }
        }

        impl Ord for $name {
            fn cmp(&self, other: &Self) -> std::cmp::Ordering {
                self.0.cmp(&other.0)
            }
        }

        impl Hash for $name {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.0.hash(state);
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self::new(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.0)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                String::deserialize(deserializer).map(Self::from)
            }
        }
    };
}

macro_rules! impl_numeric_identifier {
    ($name:ident, $inner:ty) => {
        #[derive(
            Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name($inner);

        impl $name {
            pub const fn new(id: $inner) -> Self {
                Self(id)
            }

            pub const fn get(self) -> $inner {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$inner> for $name {
            fn from(id: $inner) -> Self {
                Self(id)
            }
        }
    };
}

impl_string_identifier!(StopIdentifier);
impl_numeric_identifier!(RouteIdentifier, u32);
impl_numeric_identifier!(VehicleIdentifier, u64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_identifier_equality() {
        let id1 = StopIdentifier::new("union");
        let id2 = StopIdentifier::new("union");
        let id3 = id1.clone();

        assert_eq!(id1, id2);
        assert_eq!(id1, id3);
        assert!(Arc::ptr_eq(&id1.0, &id3.0)); // Clone shares Arc
    }

    #[test]
    fn test_stop_identifier_lookup_by_str() {
        use std::collections::HashMap;

        let mut map = HashMap::new();
        map.insert(StopIdentifier::new("sage"), 7);

        assert_eq!(map.get("sage"), Some(&7));
        assert_eq!(map.get(&StopIdentifier::new("sage")), Some(&7));
    }

    #[test]
    fn test_numeric_identifier_ordering() {
        assert!(RouteIdentifier::new(1) < RouteIdentifier::new(2));
        assert_eq!(VehicleIdentifier::from(9).get(), 9);
        assert_eq!(format!("{}", RouteIdentifier::new(4)), "4");
    }

    #[test]
    fn test_identifiers_serialize_transparently() {
        assert_eq!(serde_json::to_string(&RouteIdentifier::new(3)).unwrap(), "3");
        assert_eq!(serde_json::to_string(&StopIdentifier::new("blitman")).unwrap(), "\"blitman\"");

        let stop: StopIdentifier = serde_json::from_str("\"city\"").unwrap();
        assert_eq!(stop.as_str(), "city");
    }
}
