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

mod compress;
mod regular;

pub use compress::CompressClosedList;
pub use regular::RegularClosedList;

use crate::error::Result;
use crate::record::StateRecord;

/// Capability set exposed by any closed-list implementation (spec section 6).
pub trait ClosedList {
	/// Look the entry up by its `packed_vars`. On a miss, inserts it and
	/// returns `(false, false)`. On a hit with reopening enabled and a
	/// strictly lower incoming `g`, replaces the stored record and returns
	/// `(true, true)`. On any other hit, returns `(true, false)`.
	fn find_insert(&mut self, entry: StateRecord) -> Result<(bool, bool)>;

	/// Walk parent links from `goal` back to the root, returning the
	/// operator sequence root-to-goal.
	fn trace_path(&self, goal: &StateRecord) -> Result<Vec<i32>>;

	/// Release all backing storage (buffers, mmap, bucket file).
	fn clear(&mut self) -> Result<()>;

	/// Log probe/load-factor statistics at `log::info!`.
	fn print_statistics(&self);
}

/// Which concrete closed-list a `SearchDriver` is wired with (spec section 9).
pub enum ClosedListVariant {
	Compress(CompressClosedList),
	Regular(RegularClosedList),
}

impl ClosedList for ClosedListVariant {
	fn find_insert(&mut self, entry: StateRecord) -> Result<(bool, bool)> {
		match self {
			ClosedListVariant::Compress(c) => c.find_insert(entry),
			ClosedListVariant::Regular(r) => r.find_insert(entry),
		}
	}
	fn trace_path(&self, goal: &StateRecord) -> Result<Vec<i32>> {
		match self {
			ClosedListVariant::Compress(c) => c.trace_path(goal),
			ClosedListVariant::Regular(r) => r.trace_path(goal),
		}
	}
	fn clear(&mut self) -> Result<()> {
		match self {
			ClosedListVariant::Compress(c) => c.clear(),
			ClosedListVariant::Regular(r) => r.clear(),
		}
	}
	fn print_statistics(&self) {
		match self {
			ClosedListVariant::Compress(c) => c.print_statistics(),
			ClosedListVariant::Regular(r) => r.print_statistics(),
		}
	}
}
