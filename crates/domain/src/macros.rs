//! Macro for implementing Display and FromStr for wire-name enums
//!
//! Entity types, run statuses and reconciliation outcomes all travel as
//! SCREAMING_SNAKE strings (`GOODS_RECEIPTS`, `PARTIAL`, `SKIPPED`). The
//! macro keeps their `Display`/`FromStr` pairs in one place so the database
//! column, the log field and the JSON value always agree.
//!
//! # Example
//!
//! ```rust
//! use erpsync_domain::impl_wire_name_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Phase {
//!     Fetching,
//!     Applying,
//! }
//!
//! impl_wire_name_conversions!(Phase {
//!     Fetching => "FETCHING",
//!     Applying => "APPLYING",
//! });
//!
//! assert_eq!(Phase::Applying.to_string(), "APPLYING");
//! assert_eq!("fetching".parse::<Phase>().unwrap(), Phase::Fetching);
//! ```

/// Implements Display and FromStr for enums with upper-case wire names.
///
/// Parsing is case-insensitive; display always yields the wire name.
#[macro_export]
macro_rules! impl_wire_name_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl $enum_name {
            /// Wire name used in JSON, SQL and logs.
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $str,)+
                }
            }
        }

        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_uppercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum TestPhase {
        Fetching,
        Applying,
        Done,
    }

    impl_wire_name_conversions!(TestPhase {
        Fetching => "FETCHING",
        Applying => "APPLYING",
        Done => "DONE",
    });

    #[test]
    fn display_uses_wire_name() {
        assert_eq!(TestPhase::Fetching.to_string(), "FETCHING");
        assert_eq!(TestPhase::Done.as_str(), "DONE");
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(TestPhase::from_str("applying").unwrap(), TestPhase::Applying);
        assert_eq!(TestPhase::from_str("Done").unwrap(), TestPhase::Done);
        assert_eq!(TestPhase::from_str(" FETCHING ").unwrap(), TestPhase::Fetching);
    }

    #[test]
    fn parse_rejects_unknown() {
        let err = TestPhase::from_str("paused").unwrap_err();
        assert!(err.contains("Invalid TestPhase: paused"));
        assert!(TestPhase::from_str("").is_err());
    }
}
