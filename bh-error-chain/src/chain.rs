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

//! The error chain node and the configuration of its rendering.

use std::{
    fmt::Write as _,
    panic::Location,
    sync::atomic::{AtomicBool, Ordering},
};

use crate::{callstack::CallStack, SharedError};

// Frames between the capture and the caller of a public wrapping entry point: the node
// constructor and the entry point itself.
const WRAP_SKIP: usize = 2;

static DEBUG: AtomicBool = AtomicBool::new(true);

/// Enables or disables the call stack in the [`Display`][std::fmt::Display] output of every
/// [`ChainError`], including the already constructed ones.
///
/// Enabled by default.  This is process-wide state; set it once at startup.
pub fn set_debug(enabled: bool) {
    DEBUG.store(enabled, Ordering::Relaxed);
}

/// Returns whether call stacks are currently rendered, see [`set_debug`].
pub fn debug_enabled() -> bool {
    DEBUG.load(Ordering::Relaxed)
}

/// Configuration for [`ChainError::render`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderConfig {
    /// Whether the captured call stack of each node is included.
    pub stack: bool,
}

impl RenderConfig {
    /// The configuration corresponding to the process-wide [`debug_enabled`] flag.
    pub fn current() -> Self {
        Self {
            stack: debug_enabled(),
        }
    }
}

/// An error wrapping an optional cause with a message and the call stack of its creation.
///
/// Nodes are constructed with [`wrap()`][crate::wrap()], the [`wrap!`][crate::wrap!] macro, or the
/// extension traits in [`traits`][crate::traits], and are immutable afterwards.
pub struct ChainError {
    pub(crate) message: String,
    pub(crate) stack: CallStack,
    pub(crate) cause: Option<SharedError>,
}

impl ChainError {
    /// Creates a node whose stack starts at the caller of the public entry point calling this.
    ///
    /// Must be called directly from that entry point, which must not be inlined.
    #[inline(never)]
    pub(crate) fn new(
        message: String,
        cause: Option<SharedError>,
        location: &'static Location<'static>,
    ) -> Self {
        let node = Self {
            message,
            stack: CallStack::capture(WRAP_SKIP),
            cause,
        };
        log::debug!(target: &location.to_string(), "{:?}", node);
        node
    }

    /// The message of this node alone.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The call stack captured when this node was created.
    pub fn stack(&self) -> &CallStack {
        &self.stack
    }

    /// The immediate cause, or [`None`] if this node originates the chain.
    pub fn cause(&self) -> Option<&SharedError> {
        self.cause.as_ref()
    }

    /// Renders the diagnostic text of the whole chain starting at this node.
    ///
    /// The text is `error: <message>\n`, followed by the rendered stack if `config.stack` is set,
    /// followed by `caused by <cause>` if there is a cause.  Nested nodes are rendered with the
    /// same `config`.
    pub fn render(&self, config: &RenderConfig) -> String {
        let mut out = format!("error: {}\n", self.message);

        if config.stack {
            out.push_str(&self.stack.render());
        }

        if let Some(cause) = &self.cause {
            out.push_str("caused by ");
            match cause.downcast_ref::<ChainError>() {
                Some(node) => out.push_str(&node.render(config)),
                // Writing into a `String` cannot fail.
                None => {
                    let _ = write!(out, "{cause}");
                }
            }
        }

        out
    }
}

impl std::error::Error for ChainError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause.as_ref().map(|cause| &**cause as _)
    }
}
