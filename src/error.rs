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

//! Errors raised while building or running a task list

use std::fmt;
use thiserror::Error;

/// Which direction a seek searched in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Search {
    First,
    Next,
    Previous,
}

impl fmt::Display for Search {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Search::First => f.write_str("an"),
            Search::Next => f.write_str("a next"),
            Search::Previous => f.write_str("a previous"),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("action '{action}' requires capability \"{capability}\"")]
    MissingCapability {
        action: &'static str,
        capability: &'static str,
    },

    #[error("no cursor marker named \"{0}\"")]
    UnknownMarker(String),

    #[error("unable to find {search} instance of string \"{needle}\"")]
    NotFound { search: Search, needle: String },

    #[error(transparent)]
    Host(#[from] anyhow::Error),
}
