//! Macro for defining the identifier newtypes used by migration sets.
//!
//! Set names and step names share one invariant: non-empty, and free of
//! leading or trailing whitespace (a padded name in a config file would
//! silently never match the recorded one).

/// Returns the reason `s` is not a usable identifier, if any.
pub(crate) fn invalid_reason(s: &str) -> Option<&'static str> {
    if s.is_empty() {
        Some("must not be empty")
    } else if s.trim() != s {
        Some("must not have leading or trailing whitespace")
    } else {
        None
    }
}

/// Define a strongly-typed identifier newtype.
///
/// Generates the struct plus `try_new`, `new` (panics), `as_str`,
/// `into_inner`, `Display`, `Deref<Target = str>`, `AsRef<str>`,
/// `Borrow<str>`, `FromStr`, `TryFrom<String>`, `TryFrom<&str>`,
/// comparisons against string types, and validating serde impls.
macro_rules! define_newtype_string {
    (
        $(#[$meta:meta])*
        $vis:vis struct $Name:ident;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
        #[serde(transparent)]
        $vis struct $Name(String);

        impl<'de> serde::Deserialize<'de> for $Name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                $Name::parse(s).map_err(serde::de::Error::custom)
            }
        }

        impl $Name {
            fn parse(s: String) -> Result<Self, $crate::error::CoreError> {
                match $crate::newtype_string::invalid_reason(&s) {
                    None => Ok(Self(s)),
                    Some(reason) => Err($crate::error::CoreError::InvalidName {
                        kind: stringify!($Name),
                        name: s,
                        reason,
                    }),
                }
            }

            /// Create a new instance, panicking if the name is invalid.
            ///
            /// Prefer [`try_new`](Self::try_new) for names read from files or
            /// the command line.
            pub fn new(name: impl Into<String>) -> Self {
                match Self::parse(name.into()) {
                    Ok(v) => v,
                    Err(e) => panic!("{e}"),
                }
            }

            /// Try to create a new instance, returning the validation error.
            pub fn try_new(name: impl Into<String>) -> Result<Self, $crate::error::CoreError> {
                Self::parse(name.into())
            }

            /// Return the underlying name as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the wrapper and return the inner `String`.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl std::fmt::Display for $Name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $Name {
            fn as_ref(&self) -> &str { &self.0 }
        }

        impl std::ops::Deref for $Name {
            type Target = str;
            fn deref(&self) -> &str { &self.0 }
        }

        impl std::borrow::Borrow<str> for $Name {
            fn borrow(&self) -> &str { &self.0 }
        }

        impl std::str::FromStr for $Name {
            type Err = $crate::error::CoreError;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s.to_string())
            }
        }

        impl TryFrom<String> for $Name {
            type Error = $crate::error::CoreError;
            fn try_from(s: String) -> Result<Self, Self::Error> {
                Self::parse(s)
            }
        }

        impl TryFrom<&str> for $Name {
            type Error = $crate::error::CoreError;
            fn try_from(s: &str) -> Result<Self, Self::Error> {
                Self::parse(s.to_string())
            }
        }

        impl PartialEq<str> for $Name {
            fn eq(&self, other: &str) -> bool { self.0 == other }
        }

        impl PartialEq<&str> for $Name {
            fn eq(&self, other: &&str) -> bool { self.0 == *other }
        }

        impl PartialEq<String> for $Name {
            fn eq(&self, other: &String) -> bool { self.0 == *other }
        }
    };
}

pub(crate) use define_newtype_string;
