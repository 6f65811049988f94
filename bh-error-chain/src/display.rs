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

use crate::{chain::RenderConfig, code::ErrorCode, ChainError};

// Writes the whole chain, with the call stacks if the process-wide debug flag is enabled.
impl std::fmt::Display for ChainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render(&RenderConfig::current()))
    }
}

// Goes through the whole error chain and writes all the errors as a JSON object.  Call stacks
// are left out, so that no symbolization happens.
impl std::fmt::Debug for ChainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;

        let error_esc = json_escape(&self.message);
        write!(f, "\"error\":{}", error_esc)?;

        if let Some(cause) = &self.cause {
            write!(f, ",\"source\":")?;
            debug_source(&**cause, f)?;
        }

        write!(f, "}}")
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}:{}) {}", self.vendor(), self.code(), self.message())
    }
}

impl std::fmt::Debug for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;

        write!(f, "\"vendor\":{}", json_escape(self.vendor()))?;
        write!(f, ",\"code\":{}", self.code())?;
        write!(f, ",\"message\":{}", json_escape(self.message()))?;

        // Only the names, attribute values are opaque
        if self.has_attrs() {
            write!(f, ",\"attrs\":[")?;
            for (i, name) in self.attr_names().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                write!(f, "{}", json_escape(name))?;
            }
            write!(f, "]")?;
        }

        write!(f, "}}")
    }
}

fn debug_source(
    error: &(dyn std::error::Error + 'static),
    f: &mut std::fmt::Formatter<'_>,
) -> std::fmt::Result {
    if let Some(node) = error.downcast_ref::<ChainError>() {
        return write!(f, "{:?}", node);
    }
    if let Some(error_code) = error.downcast_ref::<ErrorCode>() {
        return write!(f, "{:?}", error_code);
    }
    debug_foreign_error(error, f)
}

fn debug_foreign_error(
    error: &(dyn std::error::Error + 'static),
    f: &mut std::fmt::Formatter<'_>,
) -> std::fmt::Result {
    write!(f, "{{")?;

    // Write the error debug
    let error_esc = json_escape(&format!(r"{:?}", error));
    write!(f, "\"error\":{}", error_esc)?;

    // Write the source of the error
    if let Some(source) = error.source() {
        write!(f, ",\"source\":")?;

        debug_source(source, f)?;
    }

    write!(f, "}}")
}

fn json_escape(value: &str) -> String {
    serde_json::json!(value).to_string()
}
