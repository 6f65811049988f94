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

/// Trait making the error variant of a [`crate::Result`] loggable.
pub trait Loggable {
    /// Logs the error if it occured.
    fn log_err(self) -> Self;
}

impl<T> Loggable for crate::Result<T> {
    #[track_caller]
    fn log_err(self) -> Self {
        let location = std::panic::Location::caller();

        self.map_err(|error| {
            log::error!(target: &location.to_string(), "{:?}", error);
            error
        })
    }
}

#[cfg(test)]
mod tests {
    use super::Loggable as _;
    use crate::{is_match, new_error_code};

    #[test]
    fn test_log_err_passes_through() {
        let ok: crate::Result<u8> = Ok(3);
        assert_eq!(ok.log_err().ok(), Some(3));

        let root = new_error_code("m", []);
        let err: crate::Result<u8> = Err(root.clone());
        assert!(is_match(&err.log_err().unwrap_err(), &root));
    }
}
