// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Maestro Contributors

//! Declarative macros for reducing boilerplate.
//!
//! - [`simple_display!`] — `Display` impl mapping enum variants to string literals
//! - [`string_id!`] — string newtype ID with the trait surface map keys need
//! - [`record_builder!`] — test-support builder for a record type

/// Generate a `Display` impl mapping each enum variant to a string literal.
///
/// Unit variants match directly; data-carrying variants ignore their fields
/// via `(..)`.
///
/// ```ignore
/// crate::simple_display! {
///     MyEnum {
///         Foo => "foo",
///         Bar(..) => "bar",
///     }
/// }
/// ```
#[macro_export]
macro_rules! simple_display {
    ($enum:ty { $( $variant:ident $(( $($ignore:tt)* ))? => $str:expr ),+ $(,)? }) => {
        impl std::fmt::Display for $enum {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(match self {
                    $( Self::$variant $(( $($ignore)* ))? => $str, )+
                })
            }
        }
    };
}

/// Define a string newtype ID.
///
/// Generates `new()`, `as_str()`, `Display`, `From<String>`, `From<&str>`,
/// `PartialEq<str>`, `PartialEq<&str>`, and `Borrow<str>` so the type can be
/// used directly as a `HashMap<Id, _>` key looked up by `&str`.
///
/// ```ignore
/// crate::string_id! {
///     /// Doc comment for the ID type.
///     pub struct JobId;
/// }
/// ```
#[macro_export]
macro_rules! string_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Create an ID from any string-like value.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the string value of this ID.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

/// Generate a test builder for a record type.
///
/// Everything generated (builder struct, `Default`, setters, `build()`, and
/// the `$target::builder()` shortcut) is gated behind
/// `#[cfg(any(test, feature = "test-support"))]`, so production builds never
/// carry it.
///
/// Fields are declared in four groups, tuned to how maestro records are
/// shaped:
/// - `text { field: Type = default }` — ID- and string-like fields; the
///   setter accepts `impl Into<Type>` and the default converts through
///   `Into` as well, so literals work
/// - `value { field: Type = default }` — plain data; the setter takes the
///   type verbatim
/// - `unset { field: Type }` — optional record fields; the builder starts
///   them at `None` and the setter wraps its argument in `Some`
/// - `fixed { field = expr }` — never settable; the expression is evaluated
///   inside `build()`
///
/// ```ignore
/// crate::record_builder! {
///     /// Test builder for [`Claim`].
///     pub struct ClaimBuilder for Claim {
///         text { task_id: TaskId = "T0001" }
///         value { claimed_at: u64 = 0 }
///         unset { released_at: u64 }
///         fixed { audit = Vec::new() }
///     }
/// }
/// ```
#[macro_export]
macro_rules! record_builder {
    (
        $(#[$meta:meta])*
        pub struct $builder:ident for $target:ident {
            $(text {
                $( $text_field:ident : $text_ty:ty = $text_default:expr ),* $(,)?
            })?
            $(value {
                $( $val_field:ident : $val_ty:ty = $val_default:expr ),* $(,)?
            })?
            $(unset {
                $( $unset_field:ident : $unset_ty:ty ),* $(,)?
            })?
            $(fixed {
                $( $fixed_field:ident = $fixed_expr:expr ),* $(,)?
            })?
        }
    ) => {
        $(#[$meta])*
        #[cfg(any(test, feature = "test-support"))]
        pub struct $builder {
            $($( $text_field: $text_ty, )*)?
            $($( $val_field: $val_ty, )*)?
            $($( $unset_field: Option<$unset_ty>, )*)?
        }

        #[cfg(any(test, feature = "test-support"))]
        impl Default for $builder {
            fn default() -> Self {
                Self {
                    $($( $text_field: ($text_default).into(), )*)?
                    $($( $val_field: $val_default, )*)?
                    $($( $unset_field: None, )*)?
                }
            }
        }

        #[cfg(any(test, feature = "test-support"))]
        impl $builder {
            $($( pub fn $text_field(mut self, v: impl Into<$text_ty>) -> Self {
                self.$text_field = v.into();
                self
            } )*)?

            $($( pub fn $val_field(mut self, v: $val_ty) -> Self {
                self.$val_field = v;
                self
            } )*)?

            $($( pub fn $unset_field(mut self, v: impl Into<$unset_ty>) -> Self {
                self.$unset_field = Some(v.into());
                self
            } )*)?

            /// Finish the record, filling fixed fields.
            pub fn build(self) -> $target {
                $target {
                    $($( $text_field: self.$text_field, )*)?
                    $($( $val_field: self.$val_field, )*)?
                    $($( $unset_field: self.$unset_field, )*)?
                    $($( $fixed_field: $fixed_expr, )*)?
                }
            }
        }

        #[cfg(any(test, feature = "test-support"))]
        impl $target {
            /// Shortcut for [`Default::default`] on the builder.
            pub fn builder() -> $builder {
                $builder::default()
            }
        }
    };
}
