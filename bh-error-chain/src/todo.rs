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

use std::{
    panic::Location,
    sync::{Arc, LazyLock},
};

use crate::{code::new_error_code, ChainError, SharedError};

/// The marker of code paths which are not implemented yet.
///
/// It is an [`ErrorCode`][crate::ErrorCode] with the `"todo"` message, the default vendor and
/// the default code.
pub static TODO: LazyLock<SharedError> = LazyLock::new(|| new_error_code("todo", []));

/// Aborts the current code path because it is not implemented yet.
///
/// The [`TODO`] marker is wrapped with the `note` and logged as an error.  The panic message is
/// the rendered chain, so the note and the marker show up in the panic output.  This is a
/// development-time assertion, never a recoverable error.
#[track_caller]
#[inline(never)]
pub fn todo<N>(note: N) -> !
where
    N: Into<String>,
{
    let location = Location::caller();
    let error: SharedError = Arc::new(ChainError::new(
        note.into(),
        Some(Arc::clone(&TODO)),
        location,
    ));

    log::error!(target: &location.to_string(), "{:?}", error);
    panic!("{error}")
}
