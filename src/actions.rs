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

//! Action constructors and derived builders
//!
//! Primitive constructors map one-to-one onto [`Action`] variants. Derived
//! builders compose them: seeking to substrings, relative cursor moves and
//! indentation-aware typing.

use std::time::Duration;

use crate::buffer::{byte_offset, char_index};
use crate::error::{Error, Search};
use crate::types::{Action, BufferFn, CursorFn, Task};

pub fn type_text(text: impl Into<String>) -> Action {
    Action::Type(text.into())
}

pub fn backspace(count: usize) -> Action {
    Action::Backspace {
        count,
        inter_char_delay: None,
    }
}

pub fn backspace_every(count: usize, delay: Duration) -> Action {
    Action::Backspace {
        count,
        inter_char_delay: Some(delay),
    }
}

pub fn wait(duration: Duration) -> Action {
    Action::Wait(duration)
}

pub fn set_instant_mode(enabled: bool) -> Action {
    Action::SetInstantMode(enabled)
}

pub fn mark_cursor(label: impl Into<String>) -> Action {
    Action::MarkCursor(label.into())
}

pub fn goto_marker(label: impl Into<String>) -> Action {
    Action::GotoMarker(label.into())
}

pub fn recompute_cursor<F>(f: F) -> Action
where
    F: Fn(&str, usize) -> Result<usize, Error> + Send + Sync + 'static,
{
    Action::RecomputeCursor(CursorFn::new(f))
}

pub fn change_typing_speed(per_char: Duration) -> Action {
    Action::ChangeTypingSpeed(per_char)
}

pub fn change_jitter(fraction: f64) -> Action {
    Action::ChangeJitter(fraction)
}

pub fn scroll_by(offset: i64, every: Duration) -> Action {
    Action::ScrollBy {
        offset,
        every,
        instant: false,
    }
}

pub fn scroll_by_instant(offset: i64) -> Action {
    Action::ScrollBy {
        offset,
        every: Duration::ZERO,
        instant: true,
    }
}

pub fn set_scroll_absolute(target: i64) -> Action {
    Action::SetScrollAbsolute(target)
}

pub fn stop() -> Action {
    Action::Stop
}

pub fn modify_buffer<F>(f: F) -> Action
where
    F: Fn(&str) -> Result<String, Error> + Send + Sync + 'static,
{
    Action::ModifyBuffer(BufferFn::new(f))
}

/// Moves the cursor just past the first occurrence of `needle` in the buffer.
pub fn seek_first(needle: impl Into<String>) -> Action {
    let needle = needle.into();
    recompute_cursor(move |text, _| match text.find(needle.as_str()) {
        Some(at) => Ok(char_index(text, at + needle.len())),
        None => Err(Error::NotFound {
            search: Search::First,
            needle: needle.clone(),
        }),
    })
}

/// Moves the cursor just past the next occurrence of `needle` at or after it.
pub fn seek_next(needle: impl Into<String>) -> Action {
    let needle = needle.into();
    recompute_cursor(move |text, cursor| {
        let from = byte_offset(text, cursor);
        match text[from..].find(needle.as_str()) {
            Some(at) => Ok(char_index(text, from + at + needle.len())),
            None => Err(Error::NotFound {
                search: Search::Next,
                needle: needle.clone(),
            }),
        }
    })
}

/// Moves the cursor back to just past the nearest occurrence of `needle`
/// that ends at or before it.
pub fn seek_previous(needle: impl Into<String>) -> Action {
    let needle = needle.into();
    recompute_cursor(move |text, cursor| {
        let until = byte_offset(text, cursor);
        match text[..until].rfind(needle.as_str()) {
            Some(at) => Ok(char_index(text, at + needle.len())),
            None => Err(Error::NotFound {
                search: Search::Previous,
                needle: needle.clone(),
            }),
        }
    })
}

/// Chains forward seeks, landing after the last needle.
pub fn seek_sequence<S: Into<String>>(needles: impl IntoIterator<Item = S>) -> Vec<Action> {
    needles.into_iter().map(seek_next).collect()
}

pub fn alter_cursor<F>(f: F) -> Action
where
    F: Fn(usize) -> usize + Send + Sync + 'static,
{
    recompute_cursor(move |_, cursor| Ok(f(cursor)))
}

/// Shifts the cursor by `delta` chars, saturating at the buffer start.
pub fn shift_cursor(delta: isize) -> Action {
    alter_cursor(move |cursor| cursor.saturating_add_signed(delta))
}

pub fn cursor_forward(n: usize) -> Action {
    alter_cursor(move |cursor| cursor.saturating_add(n))
}

pub fn cursor_back(n: usize) -> Action {
    alter_cursor(move |cursor| cursor.saturating_sub(n))
}

/// Types `text` with every line prefixed by `level` copies of `marker`.
pub fn type_indented(text: &str, level: usize, marker: &str) -> Action {
    let indent = marker.repeat(level);
    type_text(format!(
        "{}{}",
        indent,
        text.replace('\n', &format!("\n{}", indent))
    ))
}

pub fn repeat_actions(n: usize, actions: impl Into<Task>) -> Task {
    let actions = actions.into();
    Task::Group(vec![actions; n])
}

/// Flattens nested tasks into the order they execute in.
pub fn task_list(tasks: impl Into<Task>) -> Vec<Action> {
    fn walk(task: Task, out: &mut Vec<Action>) {
        match task {
            Task::Action(action) => out.push(action),
            Task::Group(tasks) => {
                for task in tasks {
                    walk(task, out);
                }
            }
        }
    }

    let mut out = Vec::new();
    walk(tasks.into(), &mut out);
    out
}

/// Builds a nested [`Task`] from a mix of actions, vectors and groups.
#[macro_export]
macro_rules! tasks {
    ($($task:expr),* $(,)?) => {
        $crate::types::Task::Group(vec![$($crate::types::Task::from($task)),*])
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seek(action: &Action, text: &str, cursor: usize) -> Result<usize, Error> {
        match action {
            Action::RecomputeCursor(f) => f.call(text, cursor),
            other => panic!("Expected RecomputeCursor, got {:?}", other),
        }
    }

    #[test]
    fn test_task_list_preserves_order_and_duplicates() {
        let tasks = tasks![
            type_text("a"),
            vec![type_text("b"), type_text("b")],
            tasks![vec![stop()], type_text("c")],
        ];
        let flat = task_list(tasks);
        assert_eq!(
            flat,
            vec![
                type_text("a"),
                type_text("b"),
                type_text("b"),
                stop(),
                type_text("c"),
            ]
        );
    }

    #[test]
    fn test_repeat_actions() {
        let flat = task_list(repeat_actions(3, vec![type_text("x"), backspace(1)]));
        assert_eq!(flat.len(), 6);
        assert_eq!(flat[4], type_text("x"));
    }

    #[test]
    fn test_seek_first() {
        let action = seek_first("hello");
        assert_eq!(seek(&action, "hello hello", 9).unwrap(), 5);
    }

    #[test]
    fn test_seek_next_searches_from_cursor() {
        let action = seek_next("hello");
        assert_eq!(seek(&action, "hello world hello", 1).unwrap(), 17);
        assert_eq!(seek(&action, "hello world hello", 0).unwrap(), 5);
    }

    #[test]
    fn test_seek_previous_searches_before_cursor() {
        let action = seek_previous("hello");
        let text = "hello world stuff hello world";
        assert_eq!(seek(&action, text, 11).unwrap(), 5);
        assert_eq!(seek(&action, text, text.len()).unwrap(), 23);
    }

    #[test]
    fn test_seek_counts_chars() {
        let action = seek_first("ö");
        assert_eq!(seek(&action, "ééö!", 0).unwrap(), 3);
    }

    #[test]
    fn test_seek_not_found_messages() {
        let err = seek(&seek_first("nope"), "hello", 0).unwrap_err();
        assert_eq!(err.to_string(), "unable to find an instance of string \"nope\"");

        let err = seek(&seek_next("hello"), "hello", 5).unwrap_err();
        assert_eq!(
            err.to_string(),
            "unable to find a next instance of string \"hello\""
        );

        let err = seek(&seek_previous("world"), "hello world", 5).unwrap_err();
        assert!(matches!(
            err,
            Error::NotFound {
                search: Search::Previous,
                ..
            }
        ));
    }

    #[test]
    fn test_seek_sequence() {
        let actions = seek_sequence(["fn", "(", ")"]);
        let text = "fn main() {}";
        let cursor = actions
            .iter()
            .try_fold(0, |cursor, action| seek(action, text, cursor))
            .unwrap();
        assert_eq!(cursor, 9);
    }

    #[test]
    fn test_relative_cursor_moves() {
        assert_eq!(seek(&shift_cursor(-3), "abcdef", 5).unwrap(), 2);
        assert_eq!(seek(&shift_cursor(-9), "abcdef", 5).unwrap(), 0);
        assert_eq!(seek(&cursor_forward(2), "abcdef", 1).unwrap(), 3);
        assert_eq!(seek(&cursor_back(2), "abcdef", 1).unwrap(), 0);
    }

    #[test]
    fn test_type_indented() {
        assert_eq!(
            type_indented("a\nb", 2, "  "),
            type_text("    a\n    b")
        );
        assert_eq!(type_indented("a", 0, "\t"), type_text("a"));
    }
}
