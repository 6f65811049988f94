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

use std::{panic::Location, sync::Arc};

use crate::ChainError;

/// Trait extending an error chain held in a [`crate::Result`].
pub trait PropagateError<T> {
    /// Wraps the [Err] value into a new [`ChainError`] with the `message`.
    ///
    /// The [Ok] variant is left untouched.
    fn wrap_err<M>(self, message: M) -> crate::Result<T>
    where
        M: Into<String>;

    /// Wraps the [Err] value into a new [`ChainError`] with the message returned by `f`.
    ///
    /// The [Ok] variant is left untouched, and `f` is not called.
    fn wrap_err_with<M, F>(self, f: F) -> crate::Result<T>
    where
        M: Into<String>,
        F: FnOnce() -> M;
}

impl<T> PropagateError<T> for crate::Result<T> {
    #[track_caller]
    #[inline(never)]
    fn wrap_err<M>(self, message: M) -> crate::Result<T>
    where
        M: Into<String>,
    {
        match self {
            Ok(value) => Ok(value),
            Err(cause) => Err(Arc::new(ChainError::new(
                message.into(),
                Some(cause),
                Location::caller(),
            ))),
        }
    }

    #[track_caller]
    #[inline(never)]
    fn wrap_err_with<M, F>(self, f: F) -> crate::Result<T>
    where
        M: Into<String>,
        F: FnOnce() -> M,
    {
        match self {
            Ok(value) => Ok(value),
            Err(cause) => {
                let message = f().into();
                Err(Arc::new(ChainError::new(
                    message,
                    Some(cause),
                    Location::caller(),
                )))
            }
        }
    }
}
