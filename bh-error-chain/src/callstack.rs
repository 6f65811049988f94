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

//! Capturing of call stacks and their lazy symbolization.
//!
//! A [`CallStack`] only records raw instruction pointers when it is captured.  Resolving them to
//! function names and source locations is postponed until the stack is walked or rendered.

use std::{
    fmt::Write as _,
    path::{Path, PathBuf},
};

/// The default maximum number of frames held by a [`CallStack`].
pub const DEFAULT_DEPTH: usize = 32;

/// The path segment marking the root of a source tree.
///
/// Resolved file paths are reported relative to the last occurrence of this segment.
pub const SOURCE_ROOT: &str = "src";

// Bound on the raw frames walked while looking for the capture point.
const MAX_WALK: usize = 256;

/// A single symbolized frame of a [`CallStack`].
///
/// Fields which could not be resolved are left empty (or `0` for the line).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    /// The demangled function name.
    pub function: String,
    /// The source file, relative to [`SOURCE_ROOT`] when the marker is present in the path.
    pub file: String,
    /// The source line.
    pub line: u32,
}

impl Frame {
    /// Returns the last component of [`Frame::file`].
    pub fn file_name(&self) -> &str {
        Path::new(&self.file)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(&self.file)
    }
}

impl std::fmt::Display for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "    at {}({}:{})", self.function, self.file_name(), self.line)
    }
}

/// A point-in-time snapshot of the call stack.
///
/// The snapshot is immutable; it is never re-captured after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallStack {
    // Instruction pointers, innermost first.
    ips: Vec<usize>,
}

impl CallStack {
    /// Captures up to [`DEFAULT_DEPTH`] frames of the current call stack.
    ///
    /// The first reported frame is the caller of this function, unless `skip` is non-zero, in
    /// which case that many additional frames closest to the capture point are omitted.
    ///
    /// A caller which ends in a tail call to this function may be optimized out of the stack.
    #[inline(never)]
    pub fn capture(skip: usize) -> Self {
        let anchor = (Self::capture as fn(usize) -> Self) as usize;
        Self::trace_from(anchor, skip, DEFAULT_DEPTH)
    }

    /// Same as [`CallStack::capture`], but holding at most `depth` frames.
    #[inline(never)]
    pub fn capture_with_depth(skip: usize, depth: usize) -> Self {
        let anchor = (Self::capture_with_depth as fn(usize, usize) -> Self) as usize;
        Self::trace_from(anchor, skip, depth)
    }

    fn trace_from(anchor: usize, skip: usize, depth: usize) -> Self {
        let mut raw: Vec<(usize, usize)> = Vec::with_capacity(depth + skip + 16);

        backtrace::trace(|frame| {
            raw.push((frame.ip() as usize, frame.symbol_address() as usize));
            raw.len() < MAX_WALK
        });

        // Everything up to and including the public capture function is internal.  Without the
        // anchor (e.g. no unwind info for symbol addresses) nothing is trimmed.
        let start = raw
            .iter()
            .position(|&(_, symbol)| symbol == anchor)
            .map_or(0, |pos| pos + 1);

        let ips = raw
            .into_iter()
            .skip(start + skip)
            .take(depth)
            .map(|(ip, _)| ip)
            .collect();

        Self { ips }
    }

    /// Returns the number of captured frames.
    pub fn len(&self) -> usize {
        self.ips.len()
    }

    /// Returns `true` if no frames were captured.
    pub fn is_empty(&self) -> bool {
        self.ips.is_empty()
    }

    /// Resolves every captured frame and hands it to the `visitor`, from the innermost frame
    /// (closest to the capture point) to the outermost one.
    ///
    /// The `visitor` is invoked exactly once per captured frame, even if the frame could not be
    /// resolved.
    pub fn walk<F>(&self, mut visitor: F)
    where
        F: FnMut(&Frame),
    {
        for &ip in &self.ips {
            visitor(&resolve(ip));
        }
    }

    /// Renders the stack as one `    at <function>(<file>:<line>)` line per frame.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.walk(|frame| {
            // Writing into a `String` cannot fail.
            let _ = writeln!(out, "{frame}");
        });
        out
    }
}

impl std::fmt::Display for CallStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}

fn resolve(ip: usize) -> Frame {
    let mut frame = Frame::default();
    let mut resolved = false;

    backtrace::resolve(ip as *mut std::ffi::c_void, |symbol| {
        // Inlined calls yield several symbols for one address; keep the innermost.
        if resolved {
            return;
        }
        resolved = true;

        frame.function = symbol
            .name()
            .map(|name| format!("{name:#}"))
            .unwrap_or_default();
        frame.file = symbol
            .filename()
            .map(relative_to_source_root)
            .unwrap_or_default();
        frame.line = symbol.lineno().unwrap_or_default();
    });

    frame
}

fn relative_to_source_root(path: &Path) -> String {
    let components: Vec<_> = path.components().collect();

    match components
        .iter()
        .rposition(|component| component.as_os_str() == SOURCE_ROOT)
    {
        Some(pos) if pos + 1 < components.len() => components[pos + 1..]
            .iter()
            .collect::<PathBuf>()
            .display()
            .to_string(),
        _ => path.display().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[inline(never)]
    fn capture_site() -> CallStack {
        let stack = CallStack::capture(0);
        std::hint::black_box(&stack);
        stack
    }

    #[inline(never)]
    fn skipped_helper() -> CallStack {
        let stack = CallStack::capture(1);
        std::hint::black_box(&stack);
        stack
    }

    fn frames(stack: &CallStack) -> Vec<Frame> {
        let mut frames = Vec::new();
        stack.walk(|frame| frames.push(frame.clone()));
        frames
    }

    #[test]
    fn test_capture_is_bounded() {
        let stack = CallStack::capture(0);
        assert!(!stack.is_empty());
        assert!(stack.len() <= DEFAULT_DEPTH);

        let stack = CallStack::capture_with_depth(0, 3);
        assert!(stack.len() <= 3);

        let stack = CallStack::capture_with_depth(0, 0);
        assert!(stack.is_empty());
        assert_eq!(stack.render(), "");
    }

    #[test]
    fn test_capture_starts_at_caller() {
        let stack = capture_site();
        let frames = frames(&stack);

        assert_eq!(frames.len(), stack.len());
        assert!(frames[0].function.contains("capture_site"));
    }

    #[test]
    fn test_capture_skips_frames() {
        let frames = frames(&skipped_helper());

        assert!(!frames.iter().any(|frame| frame.function.contains("skipped_helper")));
        assert!(frames[0].function.contains("test_capture_skips_frames"));
    }

    #[test]
    fn test_render() {
        let stack = capture_site();
        let rendered = stack.render();

        assert_eq!(rendered.lines().count(), stack.len());
        assert!(rendered.ends_with('\n'));
        assert!(rendered.lines().all(|line| line.starts_with("    at ")));
        assert_eq!(stack.to_string(), rendered);
    }

    #[test]
    fn test_frame_display() {
        let frame = Frame {
            function: "bh_error_chain::chain::wrap".to_owned(),
            file: "chain/mod.rs".to_owned(),
            line: 42,
        };
        assert_eq!(frame.to_string(), "    at bh_error_chain::chain::wrap(mod.rs:42)");
        assert_eq!(Frame::default().to_string(), "    at (:0)");
    }

    #[test]
    fn test_relative_to_source_root() {
        assert_eq!(
            relative_to_source_root(Path::new("/home/dev/project/src/chain.rs")),
            "chain.rs"
        );
        assert_eq!(
            relative_to_source_root(Path::new("/registry/src/index/crate-0.1/src/traits/mod.rs")),
            "traits/mod.rs"
        );
        assert_eq!(
            relative_to_source_root(Path::new("/home/dev/project/lib.rs")),
            "/home/dev/project/lib.rs"
        );
        assert_eq!(relative_to_source_root(Path::new("/opt/src")), "/opt/src");
    }
}
