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

//! Action interpreter
//!
//! Executes a flat task list against a text buffer one tick at a time.
//! [`CodeTyper::step`] never blocks: it performs at most one atomic change
//! and tells the caller when to call it again. The caller owns the clock.

use rand::Rng;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, trace, warn};

use crate::actions::task_list;
use crate::buffer::Buffer;
use crate::error::Error;
use crate::types::{Action, Task, TyperConfig};

/// What the host should do after a call to [`CodeTyper::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Call `step` again straight away.
    Ready,
    /// Call `step` again once the delay has elapsed.
    Sleep(Duration),
    /// The run is over and `on_complete` has fired.
    Done,
}

type ScrollGetter = Box<dyn FnMut() -> i64>;
type ScrollSetter = Box<dyn FnMut(i64)>;
type TextCallback = Box<dyn FnMut(&str)>;

/// Host functions some actions need. Either half may be absent as long as
/// no action in the list requires it.
#[derive(Default)]
pub struct Capabilities {
    get_scroll_y: Option<ScrollGetter>,
    set_scroll_y: Option<ScrollSetter>,
}

impl Capabilities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_get_scroll_y(mut self, f: impl FnMut() -> i64 + 'static) -> Self {
        self.get_scroll_y = Some(Box::new(f));
        self
    }

    pub fn with_set_scroll_y(mut self, f: impl FnMut(i64) + 'static) -> Self {
        self.set_scroll_y = Some(Box::new(f));
        self
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities")
            .field("get_scroll_y", &self.get_scroll_y.is_some())
            .field("set_scroll_y", &self.set_scroll_y.is_some())
            .finish()
    }
}

/// Notifications from the interpreter to the host. Unset callbacks are no-ops.
#[derive(Default)]
pub struct Callbacks {
    on_step_complete: Option<TextCallback>,
    on_task_complete: Option<TextCallback>,
    on_complete: Option<TextCallback>,
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fires after every character-level change inside an action.
    pub fn on_step_complete(mut self, f: impl FnMut(&str) + 'static) -> Self {
        self.on_step_complete = Some(Box::new(f));
        self
    }

    /// Fires once each action has fully completed.
    pub fn on_task_complete(mut self, f: impl FnMut(&str) + 'static) -> Self {
        self.on_task_complete = Some(Box::new(f));
        self
    }

    /// Fires once, when the list runs out or a stop action is reached.
    pub fn on_complete(mut self, f: impl FnMut(&str) + 'static) -> Self {
        self.on_complete = Some(Box::new(f));
        self
    }

    fn step_complete(&mut self, text: &str) {
        if let Some(f) = self.on_step_complete.as_mut() {
            f(text);
        }
    }

    fn task_complete(&mut self, text: &str) {
        if let Some(f) = self.on_task_complete.as_mut() {
            f(text);
        }
    }

    fn complete(&mut self, text: &str) {
        if let Some(f) = self.on_complete.as_mut() {
            f(text);
        }
    }
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_step_complete", &self.on_step_complete.is_some())
            .field("on_task_complete", &self.on_task_complete.is_some())
            .field("on_complete", &self.on_complete.is_some())
            .finish()
    }
}

// Progress inside the action at `task_index`; reset between actions
#[derive(Debug, Default)]
struct Progress {
    // Byte offset into the text being typed, None until armed
    typed: Option<usize>,
    // Deletions still to do, None until armed
    remaining: Option<usize>,
    waiting: bool,
    scroll_target: Option<i64>,
}

#[derive(Debug)]
struct TyperState {
    buffer: Buffer,
    markers: HashMap<String, usize>,
    task_index: usize,
    keystroke: Duration,
    jitter: f64,
    instant_mode: bool,
    progress: Progress,
    finished: bool,
}

pub struct CodeTyper {
    tasks: Rc<[Action]>,
    state: TyperState,
    config: TyperConfig,
    capabilities: Capabilities,
    callbacks: Callbacks,
}

impl fmt::Debug for CodeTyper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodeTyper")
            .field("tasks", &self.tasks.len())
            .field("state", &self.state)
            .field("capabilities", &self.capabilities)
            .finish()
    }
}

/// Builds an interpreter over `tasks` with the given host hooks.
pub fn create_code_typer(
    tasks: impl Into<Task>,
    capabilities: Capabilities,
    callbacks: Callbacks,
) -> CodeTyper {
    CodeTyper::new(tasks)
        .with_capabilities(capabilities)
        .with_callbacks(callbacks)
}

impl CodeTyper {
    pub fn new(tasks: impl Into<Task>) -> Self {
        let config = TyperConfig::default();
        Self {
            tasks: Rc::from(task_list(tasks)),
            state: TyperState {
                buffer: Buffer::new(),
                markers: HashMap::new(),
                task_index: 0,
                keystroke: config.keystroke,
                jitter: config.jitter,
                instant_mode: false,
                progress: Progress::default(),
                finished: false,
            },
            config,
            capabilities: Capabilities::default(),
            callbacks: Callbacks::default(),
        }
    }

    pub fn with_config(mut self, config: TyperConfig) -> Self {
        self.state.keystroke = config.keystroke;
        self.state.jitter = config.jitter;
        self.config = config;
        self
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_callbacks(mut self, callbacks: Callbacks) -> Self {
        self.callbacks = callbacks;
        self
    }

    pub fn text(&self) -> &str {
        self.state.buffer.text()
    }

    pub fn cursor(&self) -> usize {
        self.state.buffer.cursor()
    }

    pub fn task_index(&self) -> usize {
        self.state.task_index
    }

    pub fn tasks(&self) -> &[Action] {
        &self.tasks
    }

    pub fn is_finished(&self) -> bool {
        self.state.finished
    }

    /// Runs to completion, ignoring every delay.
    pub fn fast_forward(&mut self) -> Result<&str, Error> {
        while self.step(true)? != Step::Done {}
        Ok(self.text())
    }

    fn keystroke_delay(&self) -> Duration {
        let base_ms = self.state.keystroke.as_millis() as u64;
        let jitter_ms = (base_ms as f64 * self.state.jitter) as u64;

        if jitter_ms > 0 {
            let mut rng = rand::rng();
            let variation = rng.random_range(0..=jitter_ms.saturating_mul(2));
            let delay = base_ms.saturating_add(variation).saturating_sub(jitter_ms);
            Duration::from_millis(delay)
        } else {
            Duration::from_millis(base_ms)
        }
    }

    fn finish(&mut self) -> Step {
        debug!(text_len = self.state.buffer.len(), "task list complete");
        self.state.finished = true;
        self.callbacks.complete(self.state.buffer.text());
        Step::Done
    }

    fn complete_task(&mut self) -> Step {
        self.state.progress = Progress::default();
        self.state.task_index += 1;
        self.callbacks.task_complete(self.state.buffer.text());
        Step::Ready
    }

    /// Advances the run by one tick.
    ///
    /// `can_proceed` gates progress: when false nothing changes and the
    /// host is asked to come back after the pause backoff.
    pub fn step(&mut self, can_proceed: bool) -> Result<Step, Error> {
        if self.state.finished {
            return Ok(Step::Done);
        }

        if !can_proceed {
            return Ok(Step::Sleep(self.config.pause_backoff));
        }

        let tasks = Rc::clone(&self.tasks);
        let Some(action) = tasks.get(self.state.task_index) else {
            return Ok(self.finish());
        };

        match action {
            Action::Stop => Ok(self.finish()),
            Action::Type(text) => Ok(self.type_text(text)),
            Action::Backspace {
                count,
                inter_char_delay,
            } => Ok(self.backspace(*count, *inter_char_delay)),
            Action::Wait(duration) => {
                if self.state.instant_mode || self.state.progress.waiting {
                    return Ok(self.complete_task());
                }
                self.state.progress.waiting = true;
                Ok(Step::Sleep(*duration))
            }
            Action::SetInstantMode(enabled) => {
                self.state.instant_mode = *enabled;
                Ok(self.complete_task())
            }
            Action::MarkCursor(label) => {
                self.state
                    .markers
                    .insert(label.clone(), self.state.buffer.cursor());
                Ok(self.complete_task())
            }
            Action::GotoMarker(label) => {
                let cursor = *self
                    .state
                    .markers
                    .get(label)
                    .ok_or_else(|| Error::UnknownMarker(label.clone()))?;
                self.state.buffer.set_cursor(cursor);
                Ok(self.complete_task())
            }
            Action::RecomputeCursor(f) => {
                let cursor = f.call(self.state.buffer.text(), self.state.buffer.cursor())?;
                self.state.buffer.set_cursor(cursor);
                Ok(self.complete_task())
            }
            Action::ChangeTypingSpeed(per_char) => {
                self.state.keystroke = *per_char;
                Ok(self.complete_task())
            }
            Action::ChangeJitter(fraction) => {
                self.state.jitter = fraction.clamp(0.0, 1.0);
                Ok(self.complete_task())
            }
            Action::ModifyBuffer(f) => {
                let text = f.call(self.state.buffer.text())?;
                self.state.buffer.replace(text);
                Ok(self.complete_task())
            }
            Action::SetScrollAbsolute(target) => {
                let set = self.capabilities.set_scroll_y.as_mut().ok_or(
                    Error::MissingCapability {
                        action: action.name(),
                        capability: "setScrollY",
                    },
                )?;
                set(*target);
                Ok(self.complete_task())
            }
            Action::ScrollBy {
                offset,
                every,
                instant,
            } => self.scroll_by(*offset, *every, *instant),
            Action::Unrecognized(tag) => {
                warn!(tag = %tag, index = self.state.task_index, "skipping unrecognized action");
                Ok(self.complete_task())
            }
        }
    }

    fn type_text(&mut self, text: &str) -> Step {
        if self.state.instant_mode {
            self.state.buffer.insert(text);
            return self.complete_task();
        }

        let Some(offset) = self.state.progress.typed else {
            if text.is_empty() {
                return self.complete_task();
            }
            debug!(index = self.state.task_index, chars = text.chars().count(), "typing");
            self.state.progress.typed = Some(0);
            return Step::Sleep(self.keystroke_delay());
        };

        let Some(c) = text[offset..].chars().next() else {
            return self.complete_task();
        };
        self.state.buffer.insert_char(c);
        let next = offset + c.len_utf8();
        self.state.progress.typed = Some(next);
        trace!(?c, cursor = self.state.buffer.cursor(), "keystroke");
        self.callbacks.step_complete(self.state.buffer.text());

        if next >= text.len() {
            self.complete_task()
        } else {
            Step::Sleep(self.keystroke_delay())
        }
    }

    fn backspace(&mut self, count: usize, inter_char_delay: Option<Duration>) -> Step {
        if self.state.instant_mode {
            self.state.buffer.delete_before(count);
            return self.complete_task();
        }

        let delay = inter_char_delay.unwrap_or_else(|| self.keystroke_delay());

        let Some(remaining) = self.state.progress.remaining else {
            if count == 0 {
                return self.complete_task();
            }
            self.state.progress.remaining = Some(count);
            return Step::Sleep(delay);
        };

        self.state.buffer.delete_before(1);
        let remaining = remaining.saturating_sub(1);
        self.state.progress.remaining = Some(remaining);

        if remaining == 0 {
            self.complete_task()
        } else {
            self.callbacks.step_complete(self.state.buffer.text());
            Step::Sleep(delay)
        }
    }

    fn scroll_by(&mut self, offset: i64, every: Duration, instant: bool) -> Result<Step, Error> {
        let missing = |capability| Error::MissingCapability {
            action: "scroll_by",
            capability,
        };
        let get = self
            .capabilities
            .get_scroll_y
            .as_mut()
            .ok_or_else(|| missing("getScrollY"))?;
        let set = self
            .capabilities
            .set_scroll_y
            .as_mut()
            .ok_or_else(|| missing("setScrollY"))?;

        if instant || self.state.instant_mode {
            let current = get();
            set(current.saturating_add(offset));
            return Ok(self.complete_task());
        }

        let Some(target) = self.state.progress.scroll_target else {
            let target = get().saturating_add(offset);
            debug!(scroll_target = target, "scrolling");
            self.state.progress.scroll_target = Some(target);
            return Ok(Step::Sleep(every));
        };

        let current = get();
        if current == target {
            return Ok(self.complete_task());
        }

        set(current + target.saturating_sub(current).signum());
        let moved_to = get();

        // Host clamped the position, nothing further to scroll
        if moved_to == current || moved_to == target {
            return Ok(self.complete_task());
        }
        Ok(Step::Sleep(every))
    }
}
