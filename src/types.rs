// Copyright (C) 2025  Tom Waddington
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Core types for codetyper task lists

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::Error;

type CursorFnInner = dyn Fn(&str, usize) -> Result<usize, Error> + Send + Sync;
type BufferFnInner = dyn Fn(&str) -> Result<String, Error> + Send + Sync;

/// Computes a new cursor position from the buffer text and the current cursor.
#[derive(Clone)]
pub struct CursorFn(Arc<CursorFnInner>);

impl CursorFn {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&str, usize) -> Result<usize, Error> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn call(&self, text: &str, cursor: usize) -> Result<usize, Error> {
        (self.0)(text, cursor)
    }
}

impl fmt::Debug for CursorFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CursorFn(..)")
    }
}

impl PartialEq for CursorFn {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Rewrites the whole buffer text.
#[derive(Clone)]
pub struct BufferFn(Arc<BufferFnInner>);

impl BufferFn {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&str) -> Result<String, Error> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn call(&self, text: &str) -> Result<String, Error> {
        (self.0)(text)
    }
}

impl fmt::Debug for BufferFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BufferFn(..)")
    }
}

impl PartialEq for BufferFn {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// One primitive instruction executed by the interpreter.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Type(String),
    Backspace {
        count: usize,
        // Falls back to the current keystroke time when unset
        inter_char_delay: Option<Duration>,
    },
    Wait(Duration),
    SetInstantMode(bool),
    MarkCursor(String),
    GotoMarker(String),
    RecomputeCursor(CursorFn),
    ChangeTypingSpeed(Duration),
    ChangeJitter(f64),
    ScrollBy {
        offset: i64,
        every: Duration,
        instant: bool,
    },
    SetScrollAbsolute(i64),
    Stop,
    ModifyBuffer(BufferFn),
    // Unknown tag, skipped at runtime
    Unrecognized(String),
}

impl Action {
    /// Short tag used in log output and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Action::Type(_) => "type",
            Action::Backspace { .. } => "backspace",
            Action::Wait(_) => "wait",
            Action::SetInstantMode(_) => "set_instant_mode",
            Action::MarkCursor(_) => "mark_cursor",
            Action::GotoMarker(_) => "goto_marker",
            Action::RecomputeCursor(_) => "recompute_cursor",
            Action::ChangeTypingSpeed(_) => "change_typing_speed",
            Action::ChangeJitter(_) => "change_jitter",
            Action::ScrollBy { .. } => "scroll_by",
            Action::SetScrollAbsolute(_) => "set_scroll_absolute",
            Action::Stop => "stop",
            Action::ModifyBuffer(_) => "modify_buffer",
            Action::Unrecognized(_) => "unrecognized",
        }
    }
}

/// An arbitrarily nested task structure, flattened before execution.
#[derive(Debug, Clone, PartialEq)]
pub enum Task {
    Action(Action),
    Group(Vec<Task>),
}

impl From<Action> for Task {
    fn from(action: Action) -> Self {
        Task::Action(action)
    }
}

impl<T: Into<Task>> From<Vec<T>> for Task {
    fn from(tasks: Vec<T>) -> Self {
        Task::Group(tasks.into_iter().map(Into::into).collect())
    }
}

#[derive(Debug, Clone)]
pub struct TyperConfig {
    // Delay between simulated keystrokes
    pub keystroke: Duration,
    // Jitter as a fraction (0.0 to 1.0) of keystroke
    pub jitter: f64,
    // How long to back off while the host gate is closed
    pub pause_backoff: Duration,
}

impl Default for TyperConfig {
    fn default() -> Self {
        Self {
            keystroke: Duration::from_millis(50),
            jitter: 0.0,
            pause_backoff: Duration::from_millis(100),
        }
    }
}

/// A parsed script, already flattened into execution order.
#[derive(Debug)]
pub struct Script {
    pub actions: Vec<Action>,
}
