// Copyright (C) 2020-2026  The Blockhouse Technology Limited (TBTL).
//
// This program is free software: you can redistribute it and/or modify it
// under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or (at your
// option) any later version.
//
// This program is distributed in the hope that it will be useful, but
// WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public
// License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Structured error codes, typically found at the root of an error chain.

use std::{any::Any, collections::BTreeMap, sync::Arc};

use serde::Deserialize;

use crate::SharedError;

/// The vendor of an [`ErrorCode`] constructed without [`with_vendor`].
pub const DEFAULT_VENDOR: &str = "errors";

/// The code of an [`ErrorCode`] constructed without [`with_code`].
pub const DEFAULT_CODE: i32 = -1;

// A named attribute.  The optional capability is a type-erased `Arc<dyn Trait>` view of the
// stored value, consulted before the value itself.
struct Attribute {
    value: Box<dyn Any + Send + Sync>,
    capability: Option<Box<dyn Any + Send + Sync>>,
}

impl Attribute {
    fn get<T>(&self) -> Option<T>
    where
        T: Clone + 'static,
    {
        self.capability
            .as_ref()
            .and_then(|capability| (**capability).downcast_ref::<T>())
            .or_else(|| (*self.value).downcast_ref::<T>())
            .cloned()
    }
}

enum OptionKind {
    Code(i32),
    Vendor(String),
    Attr(String, Attribute),
}

/// A configuration option applied by [`ErrorCode::new`].
///
/// Construct it with [`with_code`], [`with_vendor`], [`with_attr`] or [`with_capable_attr`].
pub struct ErrorCodeOption(OptionKind);

/// Sets the numeric code.
pub fn with_code(code: i32) -> ErrorCodeOption {
    ErrorCodeOption(OptionKind::Code(code))
}

/// Sets the vendor, i.e. the identifier of the subsystem owning the code.
pub fn with_vendor<V>(vendor: V) -> ErrorCodeOption
where
    V: Into<String>,
{
    ErrorCodeOption(OptionKind::Vendor(vendor.into()))
}

/// Attaches an attribute under `name`, replacing any attribute previously set under it.
///
/// The attribute is only retrievable by its exact type.
pub fn with_attr<N, V>(name: N, value: V) -> ErrorCodeOption
where
    N: Into<String>,
    V: Any + Send + Sync,
{
    ErrorCodeOption(OptionKind::Attr(
        name.into(),
        Attribute {
            value: Box::new(value),
            capability: None,
        },
    ))
}

/// Attaches a shared attribute under `name` which is also retrievable through a capability.
///
/// The `view` converts the value to the capability, typically by unsizing it to a trait object,
/// e.g. `|value| value as Arc<dyn MyTrait + Send + Sync>`.  Retrieval by the capability type is
/// tried first, then retrieval by the exact type `Arc<V>`.
pub fn with_capable_attr<N, V, C, F>(name: N, value: Arc<V>, view: F) -> ErrorCodeOption
where
    N: Into<String>,
    V: Send + Sync + 'static,
    C: ?Sized + Send + Sync + 'static,
    F: FnOnce(Arc<V>) -> Arc<C>,
{
    let capability = view(Arc::clone(&value));

    ErrorCodeOption(OptionKind::Attr(
        name.into(),
        Attribute {
            value: Box::new(value),
            capability: Some(Box::new(capability)),
        },
    ))
}

/// A structured error carrying a vendor, a numeric code, a message and named attributes.
///
/// The vendor, code and message are fixed at construction.
pub struct ErrorCode {
    vendor: String,
    code: i32,
    message: String,
    // `None` until the first attribute is set.
    attrs: Option<BTreeMap<String, Attribute>>,
}

impl ErrorCode {
    /// Creates an error code with the default vendor and code, then applies the `options` in
    /// order.  Later options override earlier ones touching the same field.
    pub fn new<M, I>(message: M, options: I) -> Self
    where
        M: Into<String>,
        I: IntoIterator<Item = ErrorCodeOption>,
    {
        let mut error_code = Self {
            vendor: DEFAULT_VENDOR.to_owned(),
            code: DEFAULT_CODE,
            message: message.into(),
            attrs: None,
        };

        for ErrorCodeOption(option) in options {
            match option {
                OptionKind::Code(code) => error_code.code = code,
                OptionKind::Vendor(vendor) => error_code.vendor = vendor,
                OptionKind::Attr(name, attribute) => {
                    error_code
                        .attrs
                        .get_or_insert_with(BTreeMap::new)
                        .insert(name, attribute);
                }
            }
        }

        error_code
    }

    /// Decodes an error code from a JSON object with the `vendor`, `code`, `message` and `attrs`
    /// fields.
    ///
    /// Missing fields take the same defaults as in [`ErrorCode::new`].  Attributes are stored as
    /// [`serde_json::Value`]s.  Returns [`None`] if the input can't be decoded.
    pub fn from_json(data: &[u8]) -> Option<Self> {
        let record: ErrorCodeRecord = serde_json::from_slice(data).ok()?;

        let attrs = record.attrs.map(|attrs| {
            attrs
                .into_iter()
                .map(|(name, value)| {
                    let attribute = Attribute {
                        value: Box::new(value),
                        capability: None,
                    };
                    (name, attribute)
                })
                .collect()
        });

        Some(Self {
            vendor: record.vendor,
            code: record.code,
            message: record.message,
            attrs,
        })
    }

    /// The identifier of the subsystem owning this code.
    pub fn vendor(&self) -> &str {
        &self.vendor
    }

    /// The numeric code.
    pub fn code(&self) -> i32 {
        self.code
    }

    /// The human readable message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns `true` if at least one attribute was ever set.
    pub fn has_attrs(&self) -> bool {
        self.attrs.is_some()
    }

    /// Iterates over the attribute names in sorted order.
    pub fn attr_names(&self) -> impl Iterator<Item = &str> {
        self.attrs
            .iter()
            .flat_map(|attrs| attrs.keys().map(String::as_str))
    }

    /// Retrieves a copy of the attribute stored under `name` as a `T`.
    ///
    /// If the attribute was set with [`with_capable_attr`] and `T` is its capability type, the
    /// capability is returned.  Otherwise the attribute matches only if its stored type is
    /// exactly `T`.  Any other shape yields [`None`].
    pub fn attr<T>(&self, name: &str) -> Option<T>
    where
        T: Clone + 'static,
    {
        self.attrs.as_ref()?.get(name)?.get()
    }
}

impl std::error::Error for ErrorCode {}

/// Creates an [`ErrorCode`] and moves it into a [`SharedError`], ready to be wrapped.
pub fn new_error_code<M, I>(message: M, options: I) -> SharedError
where
    M: Into<String>,
    I: IntoIterator<Item = ErrorCodeOption>,
{
    Arc::new(ErrorCode::new(message, options))
}

#[derive(Deserialize)]
struct ErrorCodeRecord {
    #[serde(default = "default_vendor")]
    vendor: String,
    #[serde(default = "default_code")]
    code: i32,
    #[serde(default)]
    message: String,
    #[serde(default)]
    attrs: Option<BTreeMap<String, serde_json::Value>>,
}

fn default_vendor() -> String {
    DEFAULT_VENDOR.to_owned()
}

fn default_code() -> i32 {
    DEFAULT_CODE
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    #[derive(Debug, PartialEq)]
    struct English;

    impl Greeter for English {
        fn greet(&self) -> String {
            "hello".to_owned()
        }
    }

    #[test]
    fn test_defaults() {
        let error_code = ErrorCode::new("base", []);

        assert_eq!(error_code.vendor(), DEFAULT_VENDOR);
        assert_eq!(error_code.code(), DEFAULT_CODE);
        assert_eq!(error_code.message(), "base");
        assert!(!error_code.has_attrs());
        assert_eq!(error_code.attr::<String>("anything"), None);
    }

    #[test]
    fn test_options_apply_in_order() {
        let error_code = ErrorCode::new(
            "m",
            [
                with_code(1),
                with_vendor("first"),
                with_code(7),
                with_vendor("v"),
                with_attr("k", "x".to_owned()),
            ],
        );

        assert_eq!(error_code.vendor(), "v");
        assert_eq!(error_code.code(), 7);
        assert_eq!(error_code.attr::<String>("k"), Some("x".to_owned()));
        assert_eq!(error_code.attr::<String>("missing"), None);
    }

    #[test]
    fn test_attr_last_write_wins() {
        let error_code = ErrorCode::new(
            "m",
            [with_attr("k", "x".to_owned()), with_attr("k", 42_u32)],
        );

        assert_eq!(error_code.attr::<u32>("k"), Some(42));
        assert_eq!(error_code.attr::<String>("k"), None);
        assert_eq!(error_code.attr_names().collect::<Vec<_>>(), ["k"]);
    }

    #[test]
    fn test_attr_exact_type_only() {
        let error_code = ErrorCode::new("m", [with_attr("n", 5_i64)]);

        assert_eq!(error_code.attr::<i64>("n"), Some(5));
        assert_eq!(error_code.attr::<i32>("n"), None);
        assert!(error_code.attr::<Arc<dyn Greeter>>("n").is_none());
    }

    #[test]
    fn test_capable_attr() {
        let english = Arc::new(English);
        let error_code = ErrorCode::new(
            "m",
            [
                with_attr("a", "test".to_owned()),
                with_capable_attr("c", Arc::clone(&english), |value| {
                    value as Arc<dyn Greeter>
                }),
            ],
        );

        let greeter = error_code.attr::<Arc<dyn Greeter>>("c").unwrap();
        assert_eq!(greeter.greet(), "hello");

        let exact = error_code.attr::<Arc<English>>("c").unwrap();
        assert!(Arc::ptr_eq(&exact, &english));

        assert_eq!(error_code.attr::<String>("c"), None);
        assert!(error_code.attr::<Arc<dyn Greeter>>("a").is_none());
    }

    #[test]
    fn test_attr_names_sorted() {
        let error_code = ErrorCode::new(
            "m",
            [with_attr("b", 1_u8), with_attr("a", 2_u8), with_attr("c", 3_u8)],
        );

        assert_eq!(error_code.attr_names().collect::<Vec<_>>(), ["a", "b", "c"]);
    }

    #[test]
    fn test_from_json() {
        let error_code = ErrorCode::from_json(
            br#"{"vendor":"v","code":7,"message":"m","attrs":{"k":"x","n":3}}"#,
        )
        .unwrap();

        assert_eq!(error_code.vendor(), "v");
        assert_eq!(error_code.code(), 7);
        assert_eq!(error_code.message(), "m");
        assert_eq!(
            error_code.attr::<serde_json::Value>("k"),
            Some(serde_json::json!("x"))
        );
        assert_eq!(
            error_code.attr::<serde_json::Value>("n"),
            Some(serde_json::json!(3))
        );
    }

    #[test]
    fn test_from_json_defaults() {
        let error_code = ErrorCode::from_json(br#"{"message":"m"}"#).unwrap();
        assert_eq!(error_code.vendor(), DEFAULT_VENDOR);
        assert_eq!(error_code.code(), DEFAULT_CODE);
        assert!(!error_code.has_attrs());

        let error_code = ErrorCode::from_json(br#"{"message":"m","attrs":{}}"#).unwrap();
        assert!(error_code.has_attrs());
        assert_eq!(error_code.attr_names().count(), 0);
    }

    #[test]
    fn test_from_json_invalid() {
        assert!(ErrorCode::from_json(b"not json").is_none());
        assert!(ErrorCode::from_json(br#"{"code":"seven"}"#).is_none());
    }
}
