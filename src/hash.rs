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

// Twisted-tabulation Zobrist hashing over a packed-variable view. The
// table T[variable][value] is filled once from a seeded PRNG; process-wide
// state is fixed by the first constructed hasher (Design Note 9).

use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
	Standard,
	Twisted,
}

struct ZobristTable {
	seed: u64,
	// table[var] holds one u64 per domain value of that variable.
	table: Vec<Vec<u64>>,
}

fn build_table(seed: u64, domain_sizes: &[u32]) -> ZobristTable {
	let mut rng = StdRng::seed_from_u64(seed);
	let table = domain_sizes
		.iter()
		.map(|&domain| (0..domain).map(|_| rng.gen::<u64>()).collect())
		.collect();
	ZobristTable { seed, table }
}

static TABLE: Mutex<Option<ZobristTable>> = Mutex::new(None);

#[cfg(test)]
pub(crate) fn reset_table_for_test() {
	*TABLE.lock().unwrap_or_else(|e| e.into_inner()) = None;
}

/// A Zobrist hasher over a fixed variable-domain schema. The table itself
/// is process-wide and initialised exactly once; constructing additional
/// `ZobristHasher`s with a different schema is a programming error and
/// panics, matching the "first touch wins" contract of Design Note 9.
#[derive(Clone, Copy)]
pub struct ZobristHasher {
	variant: Variant,
}

impl ZobristHasher {
	/// `domain_sizes[i]` is the number of distinct values variable `i` can
	/// take. `seed` seeds the master PRNG exactly once, on first call.
	pub fn new(seed: u64, domain_sizes: &[u32], variant: Variant) -> ZobristHasher {
		let mut guard = TABLE.lock().unwrap_or_else(|e| e.into_inner());
		if guard.is_none() {
			*guard = Some(build_table(seed, domain_sizes));
		}
		let built = guard.as_ref().unwrap();
		assert_eq!(built.seed, seed, "ZobristHasher re-seeded mid-run");
		assert_eq!(built.table.len(), domain_sizes.len(), "ZobristHasher schema changed mid-run");
		ZobristHasher { variant }
	}

	fn with_table<R>(&self, f: impl FnOnce(&[Vec<u64>]) -> R) -> R {
		let guard = TABLE.lock().unwrap_or_else(|e| e.into_inner());
		let table = &guard.as_ref().expect("ZobristHasher constructed without initialising TABLE").table;
		f(table)
	}

	/// Hash a packed-variable view `v[0..V)`, one value per variable.
	pub fn hash(&self, values: &[u32]) -> u64 {
		self.with_table(|table| {
			assert_eq!(table.len(), values.len());
			if values.is_empty() {
				return 0;
			}
			match self.variant {
				Variant::Standard => Self::standard(table, values),
				Variant::Twisted => Self::twisted(table, values),
			}
		})
	}

	fn standard(table: &[Vec<u64>], values: &[u32]) -> u64 {
		let mut h = 0u64;
		for (var, &value) in values.iter().enumerate() {
			h ^= table[var][value as usize];
		}
		h
	}

	fn twisted(table: &[Vec<u64>], values: &[u32]) -> u64 {
		let last = values.len() - 1;
		let mut h = 0u64;
		for (var, &value) in values.iter().enumerate().take(last) {
			h ^= table[var][value as usize];
		}
		let tail_domain = table[last].len() as u32;
		let mixed = (values[last] as u64 ^ h) % tail_domain as u64;
		h ^= table[last][mixed as usize];
		h
	}
}
