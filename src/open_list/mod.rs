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

mod external_astar;
mod hash_ddd;
mod in_memory;
mod record_file;

pub use external_astar::ExternalAStarOpenList;
pub use hash_ddd::HashDDDOpenList;
pub use in_memory::InMemoryTiebreaking;

use crate::error::Result;
use crate::record::StateRecord;

/// Common surface every open list variant implements, whether it keeps
/// state in RAM or on disk.
pub trait OpenList {
	fn insert(&mut self, entry: StateRecord) -> Result<()>;
	fn remove_min(&mut self) -> Result<StateRecord>;
	fn clear(&mut self) -> Result<()>;
	fn trace_path(&mut self, goal: &StateRecord) -> Result<Vec<i32>>;

	/// Whether `f` marks a proven dead end (heuristic evaluated to `None`).
	fn is_dead_end(&self, f: i32) -> bool {
		f == i32::MAX
	}
}

/// Enum-dispatch wrapper selecting one of the three open-list strategies at
/// runtime (spec section 4, plugins `astar_ddd` / `external_astar` /
/// `regular_astar` and `lazy_astar`).
pub enum OpenListVariant {
	HashDDD(HashDDDOpenList),
	ExternalAStar(ExternalAStarOpenList),
	InMemoryTiebreaking(InMemoryTiebreaking),
}

impl OpenList for OpenListVariant {
	fn insert(&mut self, entry: StateRecord) -> Result<()> {
		match self {
			OpenListVariant::HashDDD(ol) => ol.insert(entry),
			OpenListVariant::ExternalAStar(ol) => ol.insert(entry),
			OpenListVariant::InMemoryTiebreaking(ol) => ol.insert(entry),
		}
	}

	fn remove_min(&mut self) -> Result<StateRecord> {
		match self {
			OpenListVariant::HashDDD(ol) => ol.remove_min(),
			OpenListVariant::ExternalAStar(ol) => ol.remove_min(),
			OpenListVariant::InMemoryTiebreaking(ol) => ol.remove_min(),
		}
	}

	fn clear(&mut self) -> Result<()> {
		match self {
			OpenListVariant::HashDDD(ol) => ol.clear(),
			OpenListVariant::ExternalAStar(ol) => ol.clear(),
			OpenListVariant::InMemoryTiebreaking(ol) => ol.clear(),
		}
	}

	fn trace_path(&mut self, goal: &StateRecord) -> Result<Vec<i32>> {
		match self {
			OpenListVariant::HashDDD(ol) => ol.trace_path(goal),
			OpenListVariant::ExternalAStar(ol) => ol.trace_path(goal),
			OpenListVariant::InMemoryTiebreaking(ol) => ol.trace_path(goal),
		}
	}
}

impl OpenListVariant {
	pub fn is_in_memory_tiebreaking(&self) -> bool {
		matches!(self, OpenListVariant::InMemoryTiebreaking(_))
	}
}
