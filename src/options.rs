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

use crate::error::{Error, Result};

/// Whether duplicate expansion order breaks ties on g after f.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tiebreak {
	/// Layer is defined by `f` alone.
	FOnly,
	/// Layer is defined by `f`, then by maximum `g` within that `f`.
	FThenMaxG,
}

impl Default for Tiebreak {
	fn default() -> Tiebreak {
		Tiebreak::FOnly
	}
}

/// Recognised configuration for [`crate::closed_list::CompressClosedList`].
#[derive(Debug, Clone)]
pub struct ClosedListOptions {
	pub reopen_closed: bool,
	pub enable_partitioning: bool,
	pub double_hashing: bool,
	/// RAM budget for the in-memory phase / external pointer table, in GiB.
	/// `f64::INFINITY` selects the degenerate in-memory-only configuration
	/// (Design Note 9(b)): the closed list never transitions to the
	/// external phase.
	pub internal_closed_gb: f64,
	/// Number of partitions when `enable_partitioning` is set.
	pub partitions: u32,
	/// Byte budget for a single partition's write buffer before flush.
	pub write_buffer_bytes: usize,
}

impl Default for ClosedListOptions {
	fn default() -> ClosedListOptions {
		ClosedListOptions {
			reopen_closed: false,
			enable_partitioning: false,
			double_hashing: false,
			internal_closed_gb: f64::INFINITY,
			partitions: 100,
			write_buffer_bytes: 4096,
		}
	}
}

impl ClosedListOptions {
	pub fn validate(&self) -> Result<()> {
		if self.internal_closed_gb <= 0.0 {
			return Err(Error::InvalidConfig("internal_closed_gb must be positive".into()));
		}
		if self.enable_partitioning && self.partitions == 0 {
			return Err(Error::InvalidConfig("partitions must be nonzero when partitioning is enabled".into()));
		}
		Ok(())
	}

	/// `true` iff the list never transitions out of the in-memory phase.
	pub fn is_in_memory_only(&self) -> bool {
		self.internal_closed_gb.is_infinite()
	}
}

/// Recognised configuration for the hash-DDD and external-A* open lists.
#[derive(Clone)]
pub struct OpenListOptions {
	pub tiebreak: Tiebreak,
	/// Number of hash shards for [`crate::open_list::HashDDDOpenList`].
	pub shards: usize,
	/// Cap on the optional recursive-bucket transposition cache.
	pub transposition_cache_entries: usize,
	/// Assumes unit-cost actions; only meaningful for
	/// [`crate::open_list::ExternalAStarOpenList`].
	pub unit_cost: bool,
}

impl Default for OpenListOptions {
	fn default() -> OpenListOptions {
		OpenListOptions {
			tiebreak: Tiebreak::FOnly,
			shards: 16,
			transposition_cache_entries: 4096,
			unit_cost: true,
		}
	}
}

impl OpenListOptions {
	pub fn validate_external_astar(&self) -> Result<()> {
		if !self.unit_cost {
			return Err(Error::InvalidConfig(
				"ExternalAStarOpenList requires unit-cost actions".into(),
			));
		}
		Ok(())
	}
}

/// Run-formation and merge-buffer sizing for [`crate::open_list::ExternalAStarOpenList`].
pub const MERGE_CHUNK_BYTES: usize = 900 * 1024 * 1024;
pub const MERGE_RUN_BUFFER_BYTES: usize = 4096;

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn rejects_nonpositive_budget() {
		let mut opts = ClosedListOptions::default();
		opts.internal_closed_gb = 0.0;
		assert!(opts.validate().is_err());
		opts.internal_closed_gb = -1.0;
		assert!(opts.validate().is_err());
	}

	#[test]
	fn infinite_budget_is_in_memory_only() {
		let opts = ClosedListOptions::default();
		assert!(opts.validate().is_ok());
		assert!(opts.is_in_memory_only());
	}

	#[test]
	fn external_astar_rejects_non_unit_cost() {
		let mut opts = OpenListOptions::default();
		opts.unit_cost = false;
		assert!(opts.validate_external_astar().is_err());
	}
}
