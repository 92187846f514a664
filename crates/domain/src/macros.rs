//! Wire-name conversions for closed enums
//!
//! Enums that travel as strings (mutation domains, HTTP methods, error
//! kinds, environments) get `as_str`, `Display` and a case-insensitive
//! `FromStr` from a single variant table.
//!
//! ```rust
//! use marginalia_domain::impl_wire_str_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Shelf {
//!     Reading,
//!     Finished,
//! }
//!
//! impl_wire_str_conversions!(Shelf {
//!     Reading => "reading",
//!     Finished => "finished",
//! });
//!
//! assert_eq!(Shelf::Reading.as_str(), "reading");
//! assert_eq!("FINISHED".parse::<Shelf>(), Ok(Shelf::Finished));
//! ```

/// Implements `as_str`, `Display` and case-insensitive `FromStr`.
///
/// Wire names may be mixed case (`"authExpired"`); parsing compares
/// ASCII-case-insensitively while `Display` always emits the declared name.
#[macro_export]
macro_rules! impl_wire_str_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl $enum_name {
            /// Wire name of this variant
            #[must_use]
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
                $(
                    if s.eq_ignore_ascii_case($str) {
                        return Ok(Self::$variant);
                    }
                )+
                Err(format!("Invalid {}: {}", stringify!($enum_name), s))
            }
        }
    };
}
