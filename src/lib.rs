// Copyright 2015-2020 Parity Technologies (UK) Ltd.
// This file is part of Parity.

// Parity is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// Parity is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.

// You should have received a copy of the GNU General Public License
// along with Parity.  If not, see <http://www.gnu.org/licenses/>.

//! External-memory data structures and an A* driver for best-first
//! heuristic search over state spaces too large to keep closed/open lists
//! entirely in RAM. See `closed_list` and `open_list` for the storage
//! tiers and `search` for how they're wired into a single search loop.

pub mod closed_list;
pub mod collaborators;
pub mod error;
pub mod hash;
pub mod mapping_table;
pub mod mmap_bucket;
pub mod open_list;
pub mod options;
pub mod pointer_table;
pub mod record;
pub mod search;

#[cfg(test)]
mod test_support;

pub use error::{Error, Result};
