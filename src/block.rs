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

//! Block decomposition
//!
//! Turns indented text into actions that type it the way a programmer
//! writes nested code: the opening line of a block, then its closing line,
//! then back inside to fill the body.
//!
//! Lines are scanned with a stack of open frames, one per indentation
//! level. A frame that closes is attached to the parent line it follows.
//! Emission then walks the frames: for a nested frame with a closing line
//! after it, the opener is typed, the insertion point is marked, the closer
//! is typed, the cursor jumps back to the mark, the nested frame is filled
//! and the cursor is shifted past the closer again.
//!
//! Indentation policy:
//! - blank or whitespace-only lines belong to the innermost open frame and
//!   are typed as bare newlines
//! - leftover spaces that do not make a whole indent marker stay in the
//!   line as literal text
//! - a dedent to a level that was never opened snaps to the nearest lower
//!   open frame, keeping the surplus indentation as literal text
//! - a deeper line with nothing before it in its frame joins that frame
//!   verbatim

use crate::actions::{goto_marker, mark_cursor, shift_cursor, type_text};
use crate::types::Action;

#[derive(Debug)]
struct Line {
    text: String,
    block: Option<Frame>,
}

#[derive(Debug)]
struct Frame {
    level: usize,
    id: String,
    lines: Vec<Line>,
}

impl Frame {
    fn new(level: usize, id: String) -> Self {
        Self {
            level,
            id,
            lines: Vec::new(),
        }
    }
}

fn indent_level(line: &str, marker: &str) -> usize {
    if marker.is_empty() {
        return 0;
    }
    let mut level = 0;
    let mut rest = line;
    while let Some(stripped) = rest.strip_prefix(marker) {
        level += 1;
        rest = stripped;
    }
    level
}

fn strip_indent<'a>(line: &'a str, marker: &str, level: usize) -> &'a str {
    &line[marker.len() * level..]
}

fn random_id() -> String {
    format!("block-{:016x}", rand::random::<u64>())
}

fn scan(text: &str, marker: &str, next_id: &mut dyn FnMut() -> String) -> Frame {
    let mut stack = vec![Frame::new(0, next_id())];

    for raw in text.split('\n') {
        if raw.trim().is_empty() {
            if let Some(frame) = stack.last_mut() {
                frame.lines.push(Line {
                    text: String::new(),
                    block: None,
                });
            }
            continue;
        }

        let level = indent_level(raw, marker);

        let mut closed = false;
        while stack.len() > 1 && stack.last().is_some_and(|f| f.level > level) {
            close_frame(&mut stack);
            closed = true;
        }

        let Some(top) = stack.last() else { break };
        if !closed && level > top.level && !top.lines.is_empty() {
            stack.push(Frame::new(level, next_id()));
        }

        if let Some(frame) = stack.last_mut() {
            frame.lines.push(Line {
                text: strip_indent(raw, marker, frame.level).to_string(),
                block: None,
            });
        }
    }

    while stack.len() > 1 {
        close_frame(&mut stack);
    }
    stack.pop().unwrap_or_else(|| Frame::new(0, next_id()))
}

fn close_frame(stack: &mut Vec<Frame>) {
    if let Some(done) = stack.pop() {
        if let Some(line) = stack.last_mut().and_then(|parent| parent.lines.last_mut()) {
            line.block = Some(done);
        }
    }
}

struct Emitter<'a> {
    actions: Vec<Action>,
    pending: String,
    marker: &'a str,
    base_level: usize,
    started: bool,
}

impl Emitter<'_> {
    fn line(&mut self, text: &str, level: usize) -> String {
        let mut out = String::new();
        if self.started {
            out.push('\n');
        }
        self.started = true;
        // Blank lines carry no indentation so nothing invisible gets typed
        if !text.is_empty() {
            out.push_str(&self.marker.repeat(self.base_level + level));
            out.push_str(text);
        }
        out
    }

    fn flush(&mut self) {
        if !self.pending.is_empty() {
            self.actions.push(type_text(std::mem::take(&mut self.pending)));
        }
    }

    fn push(&mut self, action: Action) {
        self.flush();
        self.actions.push(action);
    }

    fn frame(&mut self, frame: &Frame) {
        let mut closer_typed = false;

        for (i, line) in frame.lines.iter().enumerate() {
            if !closer_typed {
                let text = self.line(&line.text, frame.level);
                self.pending.push_str(&text);
            }
            closer_typed = false;

            let Some(child) = &line.block else { continue };
            match frame.lines.get(i + 1) {
                Some(closer) => {
                    self.push(mark_cursor(child.id.as_str()));
                    let text = self.line(&closer.text, frame.level);
                    let width = text.chars().count();
                    self.pending.push_str(&text);
                    self.push(goto_marker(child.id.as_str()));
                    self.frame(child);
                    self.push(shift_cursor(width as isize));
                    closer_typed = true;
                }
                None => self.frame(child),
            }
        }
    }
}

fn decompose(
    text: &str,
    start_level: usize,
    marker: &str,
    next_id: &mut dyn FnMut() -> String,
) -> Vec<Action> {
    let root = scan(text, marker, next_id);
    let mut emitter = Emitter {
        actions: Vec::new(),
        pending: String::new(),
        marker,
        base_level: start_level,
        started: false,
    };
    emitter.frame(&root);
    emitter.flush();
    emitter.actions
}

/// Decomposes indented `text` into actions that type it shell first.
///
/// `marker` is one indentation unit of `text` (usually two spaces). Every
/// typed line is re-indented by `start_level` extra markers. Executing the
/// actions leaves the cursor at the end of the typed block.
pub fn type_indented_block(text: &str, start_level: usize, marker: &str) -> Vec<Action> {
    decompose(text, start_level, marker, &mut random_id)
}
