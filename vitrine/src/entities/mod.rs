//! Concrete record types of the storefront and their specialized repositories.

/// Declares a closed set of lowercase string constants stored as [crate::common::Value::String].
///
/// Generates `as_str`, `parse`, `ALL`, [std::fmt::Display], `From<T> for Value` and
/// [crate::common::Convertible].
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }

            /// Parses the stored form, ignoring case and surrounding whitespace.
            pub fn parse(input: &str) -> Option<$name> {
                let input = input.trim();
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(input))
            }

            /// Stored forms of every variant, for schema `one_of` rules.
            pub fn names() -> Vec<&'static str> {
                $name::ALL.iter().map(|v| v.as_str()).collect()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl From<$name> for $crate::common::Value {
            fn from(value: $name) -> Self {
                $crate::common::Value::from(value.as_str())
            }
        }

        impl $crate::common::Convertible for $name {
            type Output = $name;

            fn to_value(&self) -> $crate::errors::VitrineResult<$crate::common::Value> {
                Ok((*self).into())
            }

            fn from_value(value: &$crate::common::Value) -> $crate::errors::VitrineResult<$name> {
                value
                    .as_string()
                    .and_then(|s| $name::parse(s))
                    .ok_or_else(|| {
                        $crate::errors::VitrineError::new(
                            &format!(
                                "Invalid {} value {}",
                                stringify!($name),
                                value
                            ),
                            $crate::errors::ErrorKind::ObjectMappingError,
                        )
                    })
            }
        }
    };
}

mod article;
mod product;
mod publish;
mod submission;
mod taxonomy;

pub use article::*;
pub use product::*;
pub use publish::*;
pub use submission::*;
pub use taxonomy::*;

use crate::common::{Convertible, Value};
use std::collections::BTreeMap;

/// Turns grouped counts into a map holding every variant, zero when absent.
///
/// Groups whose value is not a known variant are logged and skipped.
pub(crate) fn tally<E>(groups: Vec<(Value, u64)>, variants: &[E]) -> BTreeMap<E, u64>
where
    E: Convertible<Output = E> + Ord + Copy,
{
    let mut counts: BTreeMap<E, u64> = variants.iter().map(|v| (*v, 0)).collect();
    for (value, count) in groups {
        match E::from_value(&value) {
            Ok(variant) => *counts.entry(variant).or_default() += count,
            Err(_) => log::warn!("Skipping {} record(s) with unexpected value {}", count, value),
        }
    }
    counts
}

/// Rule shared by every slug field: lowercase words joined by single hyphens.
pub(crate) fn slug_rule() -> crate::repository::FieldRule {
    crate::repository::FieldRule::string()
        .label("Slug")
        .required()
        .lowercase()
        .max_length(200)
        .pattern(
            r"^[a-z0-9]+(?:-[a-z0-9]+)*$",
            "may only contain lowercase letters, numbers and hyphens",
        )
        .unique()
}
