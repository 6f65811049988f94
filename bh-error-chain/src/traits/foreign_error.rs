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

use crate::{ChainError, SharedError};

/// Trait starting an error chain from a foreign error, i.e. any [`std::error::Error`].
pub trait ForeignError<T, S>
where
    S: std::error::Error + Send + Sync + 'static,
{
    /// Maps a `Result<T, S>` to `Result<T, SharedError>`.
    ///
    /// The [Ok] variant is left untouched.
    ///
    /// The [Err] value becomes the root cause, wrapped in a [`ChainError`] with the `message`.
    ///
    /// Do *not* use this to propagate something that is already a `crate::Result<T>`, as the
    /// chain would end at the wrapped [`SharedError`].  Use
    /// [PropagateError][crate::traits::PropagateError] instead.
    fn foreign_err<M>(self, message: M) -> crate::Result<T>
    where
        M: Into<String>;

    /// Maps a `Result<T, S>` to `Result<T, SharedError>`.
    ///
    /// The [Ok] value is left untouched.
    ///
    /// The message is created by applying a function `F` to the [Err] value `S`, which then
    /// becomes the root cause.
    fn match_foreign_err<M, F>(self, f: F) -> crate::Result<T>
    where
        M: Into<String>,
        F: FnOnce(&S) -> M;
}

impl<T, S> ForeignError<T, S> for std::result::Result<T, S>
where
    S: std::error::Error + Send + Sync + 'static,
{
    #[track_caller]
    #[inline(never)]
    fn foreign_err<M>(self, message: M) -> crate::Result<T>
    where
        M: Into<String>,
    {
        match self {
            Ok(value) => Ok(value),
            Err(source) => {
                let source: SharedError = Arc::new(source);
                Err(Arc::new(ChainError::new(
                    message.into(),
                    Some(source),
                    Location::caller(),
                )))
            }
        }
    }

    #[track_caller]
    #[inline(never)]
    fn match_foreign_err<M, F>(self, f: F) -> crate::Result<T>
    where
        M: Into<String>,
        F: FnOnce(&S) -> M,
    {
        match self {
            Ok(value) => Ok(value),
            Err(source) => {
                let message = f(&source).into();
                let source: SharedError = Arc::new(source);
                Err(Arc::new(ChainError::new(
                    message,
                    Some(source),
                    Location::caller(),
                )))
            }
        }
    }
}
