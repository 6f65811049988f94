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

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! This crate provides error chains which remember where each of their links was created.
//!
//! An error chain is built bottom-up.  Its root is either an [`ErrorCode`], a structured error
//! with a vendor, a numeric code, a message and named attributes, or any other ("foreign")
//! [`std::error::Error`].  The root is then wrapped zero or more times into [`ChainError`] nodes,
//! each holding a message and the call stack captured at the wrapping site.
//!
//! # Details
//!
//! All errors of a chain are held through [`SharedError`], a reference counted, type-erased
//! error.  The identity of an error is the identity of its allocation, which is what
//! [`is_match`] compares.
//!
//! Wrapping is done with the [`wrap!`] macro (or the [`wrap()`] function), or with the extension
//! traits in the [`traits`] module.  The call stack of every node starts at the code which
//! invoked the wrapping.
//!
//! Chains are queried with [`root_cause`], [`immediate_cause`], [`is_match`], [`as_match`] and,
//! for chains rooted in an [`ErrorCode`], with [`vendor_of`], [`code_of`] and [`attr_of`].
//!
//! The [`Display`][std::fmt::Display] output of a node lists the whole chain.  Call stacks are
//! included only while the process-wide [`set_debug`] flag is enabled (the default).  Use
//! [`ChainError::render`] to render with an explicit [`RenderConfig`] instead.  The
//! [`Debug`][std::fmt::Debug] output is a JSON object of the chain, without call stacks.
//!
//! Code paths which are intentionally left unfinished can call [`todo()`], which panics with the
//! [`TODO`] marker wrapped in a node.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//!
//! use bh_error_chain::{
//!     as_match, code_of, is_match, new_error_code, root_cause, vendor_of, with_code,
//!     with_vendor, wrap, ErrorCode, SharedError,
//! };
//!
//! fn load(id: u32) -> Result<String, SharedError> {
//!     let not_found = new_error_code("record not found", [with_vendor("store"), with_code(404)]);
//!     Err(wrap!(not_found, "loading record {id}"))
//! }
//!
//! let error = load(7).unwrap_err();
//!
//! assert_eq!(vendor_of(&error), Some("store"));
//! assert_eq!(code_of(&error), Some(404));
//! assert_eq!(as_match::<ErrorCode>(&error).map(ErrorCode::message), Some("record not found"));
//!
//! let root = Arc::clone(root_cause(&error));
//! assert!(is_match(&wrap!(error, "handling request"), &root));
//! ```

use std::{panic::Location, sync::Arc};

pub mod callstack;
mod chain;
mod code;
mod display;
mod todo;
pub mod traits;

pub use chain::{debug_enabled, set_debug, ChainError, RenderConfig};
pub use code::{
    new_error_code, with_attr, with_capable_attr, with_code, with_vendor, ErrorCode,
    ErrorCodeOption, DEFAULT_CODE, DEFAULT_VENDOR,
};
pub use todo::{todo, TODO};

use crate::callstack::{CallStack, Frame};

/// A shared, type-erased error.  Every member of an error chain is held through it.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync>;

/// The [`std::result::Result`] with a [`SharedError`] as the error.
pub type Result<T> = std::result::Result<T, SharedError>;

/// Moves an error into a [`SharedError`].
///
/// Use this for foreign errors which become the root of a chain.
pub fn shared<E>(error: E) -> SharedError
where
    E: std::error::Error + Send + Sync + 'static,
{
    Arc::new(error)
}

/// Wraps `cause` into a new [`ChainError`] with the given `message`.
///
/// A `cause` of [`None`] makes the node the origin of a new chain.  The captured call stack
/// starts at the caller of this function.
///
/// The [`wrap!`] macro is usually more convenient, as it formats the message.
#[track_caller]
#[inline(never)]
pub fn wrap<C, M>(cause: C, message: M) -> SharedError
where
    C: Into<Option<SharedError>>,
    M: Into<String>,
{
    Arc::new(ChainError::new(
        message.into(),
        cause.into(),
        Location::caller(),
    ))
}

/// Wraps an error into a new [`ChainError`] with a formatted message.
///
/// The first argument is the cause, either a [`SharedError`] or an `Option<SharedError>`.  The
/// rest are the [`format!`] arguments.
///
/// ```
/// use bh_error_chain::{immediate_cause, new_error_code, wrap};
///
/// let root = new_error_code("timeout", []);
/// let error = wrap!(root.clone(), "connecting to {}:{}", "localhost", 8080);
///
/// assert!(error.to_string().starts_with("error: connecting to localhost:8080\n"));
/// assert!(immediate_cause(&error).cause().is_some());
/// ```
#[macro_export]
macro_rules! wrap {
    ($cause:expr, $($arg:tt)+) => {
        $crate::wrap($cause, ::std::format!($($arg)+))
    };
}

/// One step down an error chain, as returned by [`immediate_cause`].
#[derive(Debug, Clone, Copy)]
pub enum Link<'a> {
    /// The error is not a [`ChainError`], so it can't be unwrapped.
    Terminal,
    /// The error is a [`ChainError`] originating the chain, i.e. without a cause.
    Origin,
    /// The error is a [`ChainError`] wrapping the contained cause.
    Cause(&'a SharedError),
}

impl<'a> Link<'a> {
    /// Returns the cause, if any.
    pub fn cause(self) -> Option<&'a SharedError> {
        match self {
            Link::Cause(cause) => Some(cause),
            Link::Terminal | Link::Origin => None,
        }
    }
}

/// Returns the cause one level down the chain.
pub fn immediate_cause(error: &SharedError) -> Link<'_> {
    match error.downcast_ref::<ChainError>() {
        Some(node) => node.cause().map_or(Link::Origin, Link::Cause),
        None => Link::Terminal,
    }
}

/// Follows the causes down the chain and returns the last error, which has no cause.
///
/// An error which is not a [`ChainError`] is returned unchanged.
pub fn root_cause(error: &SharedError) -> &SharedError {
    let mut current = error;
    while let Some(cause) = immediate_cause(current).cause() {
        current = cause;
    }
    current
}

/// Returns `true` if the root cause of `error` is the very same error as `target`.
///
/// Errors are compared by identity, not by value.
pub fn is_match(error: &SharedError, target: &SharedError) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(root_cause(error)), Arc::as_ptr(target))
}

/// Returns the root cause of `error` if its concrete type is exactly `E`.
///
/// Types merely sharing a trait with `E` don't match.  The target must itself be an error type,
/// which is enforced at compile time.
pub fn as_match<E>(error: &SharedError) -> Option<&E>
where
    E: std::error::Error + 'static,
{
    root_cause(error).downcast_ref::<E>()
}

/// Returns the vendor of the [`ErrorCode`] at the root of the chain.
pub fn vendor_of(error: &SharedError) -> Option<&str> {
    as_match::<ErrorCode>(error).map(ErrorCode::vendor)
}

/// Returns the code of the [`ErrorCode`] at the root of the chain.
pub fn code_of(error: &SharedError) -> Option<i32> {
    as_match::<ErrorCode>(error).map(ErrorCode::code)
}

/// Returns the attribute `name` of the [`ErrorCode`] at the root of the chain.
///
/// See [`ErrorCode::attr`] for the way the type `T` is matched.
pub fn attr_of<T>(error: &SharedError, name: &str) -> Option<T>
where
    T: Clone + 'static,
{
    as_match::<ErrorCode>(error)?.attr(name)
}

/// Walks the call stack of `error` if it is a [`ChainError`].  Otherwise, walks the current call
/// stack, starting at the caller of this function.
#[inline(never)]
pub fn stack_trace<F>(error: &SharedError, visitor: F)
where
    F: FnMut(&Frame),
{
    match error.downcast_ref::<ChainError>() {
        Some(node) => node.stack().walk(visitor),
        None => CallStack::capture(1).walk(visitor),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Boom;

    impl std::fmt::Display for Boom {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "boom")
        }
    }

    impl std::error::Error for Boom {}

    trait Describe {
        fn describe(&self) -> String;
    }

    impl Describe for Boom {
        fn describe(&self) -> String {
            "boom".to_owned()
        }
    }

    #[derive(Debug)]
    struct Bang;

    impl std::fmt::Display for Bang {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "bang")
        }
    }

    impl std::error::Error for Bang {}

    impl Describe for Bang {
        fn describe(&self) -> String {
            "bang".to_owned()
        }
    }

    fn same(a: &SharedError, b: &SharedError) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
    }

    #[test]
    fn test_unwrapped_root() {
        let root = shared(Boom);

        assert!(same(root_cause(&root), &root));
        assert!(matches!(immediate_cause(&root), Link::Terminal));
        assert!(immediate_cause(&root).cause().is_none());
        assert!(is_match(&root, &root));
    }

    #[test]
    fn test_chain_of_wraps() {
        let root = shared(Boom);
        let mut chain = vec![root.clone()];
        for i in 0..5 {
            let next = wrap!(chain[i].clone(), "level {i}");
            chain.push(next);
        }

        for n in 1..chain.len() {
            assert!(same(root_cause(&chain[n]), &root));
            assert!(same(immediate_cause(&chain[n]).cause().unwrap(), &chain[n - 1]));
        }
    }

    #[test]
    fn test_origin_node() {
        let error = wrap(None, "origin");

        assert!(matches!(immediate_cause(&error), Link::Origin));
        assert!(same(root_cause(&error), &error));
        assert!(as_match::<ChainError>(&error).is_some());
    }

    #[test]
    fn test_is_match() {
        let root = shared(Boom);
        let other = shared(Boom);

        assert!(is_match(&wrap!(wrap!(root.clone(), "a"), "b"), &root));
        assert!(!is_match(&wrap!(root.clone(), "a"), &other));
        // The wrapping node itself is not the root.
        let error = wrap!(root, "a");
        assert!(!is_match(&error, &error));
    }

    #[test]
    fn test_as_match() {
        let root = shared(Boom);
        let error = wrap!(wrap!(root.clone(), "a"), "b");

        let found = as_match::<Boom>(&error).unwrap();
        assert!(std::ptr::addr_eq(found as *const Boom, Arc::as_ptr(&root)));
        assert_eq!(found.describe(), "boom");

        // `Bang` shares `Describe` with `Boom`, but it's a different type.
        assert!(as_match::<Bang>(&error).is_none());
        assert!(as_match::<ErrorCode>(&error).is_none());
    }

    #[test]
    fn test_error_code_lookups() {
        let error = new_error_code(
            "m",
            [with_code(7), with_vendor("v"), with_attr("k", "x".to_owned())],
        );
        let wrapped = wrap!(error.clone(), "ctx");

        for error in [&error, &wrapped] {
            assert_eq!(vendor_of(error), Some("v"));
            assert_eq!(code_of(error), Some(7));
            assert_eq!(attr_of::<String>(error, "k"), Some("x".to_owned()));
            assert_eq!(attr_of::<String>(error, "missing"), None);
        }
    }

    #[test]
    fn test_lookups_on_foreign_root() {
        let error = wrap!(shared(Boom), "ctx");

        assert_eq!(vendor_of(&error), None);
        assert_eq!(code_of(&error), None);
        assert_eq!(attr_of::<String>(&error, "k"), None);
    }

    #[test]
    fn test_default_error_code_scenario() {
        let base = new_error_code("base", []);
        let outer = wrap!(base.clone(), "outer");

        assert!(is_match(&outer, &base));
        assert_eq!(vendor_of(&outer), Some("errors"));
        assert_eq!(code_of(&outer), Some(-1));
    }

    #[test]
    fn test_wrap_macro_formats() {
        let error = wrap!(None, "value {} of {}", 1, "two");

        assert_eq!(
            as_match::<ChainError>(&error).map(ChainError::message),
            Some("value 1 of two")
        );
    }

    #[test]
    fn test_stack_trace() {
        let error = wrap!(shared(Boom), "ctx");
        let mut frames = Vec::new();
        stack_trace(&error, |frame| frames.push(frame.clone()));
        assert_eq!(
            frames.len(),
            error.downcast_ref::<ChainError>().unwrap().stack().len()
        );

        let root = shared(Boom);
        let mut frames = Vec::new();
        stack_trace(&root, |frame| frames.push(frame.clone()));
        assert!(!frames.is_empty());
        assert!(frames[0].function.contains("test_stack_trace"));
    }
}
