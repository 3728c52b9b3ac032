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

//! codetyper renders the illusion of a person typing code into a buffer.
//!
//! Build a task list from [`actions`] (and [`block::type_indented_block`]
//! for shell-first typing of nested code), hand it to a
//! [`interpreter::CodeTyper`] and drive it with
//! [`interpreter::CodeTyper::step`] or [`playback::PlaybackEngine`].

pub mod actions;
pub mod block;
pub mod buffer;
pub mod error;
pub mod interpreter;
pub mod parser;
pub mod playback;
pub mod terminal;
pub mod types;

pub use error::Error;
pub use interpreter::{Callbacks, Capabilities, CodeTyper, Step, create_code_typer};
pub use types::{Action, Task, TyperConfig};
