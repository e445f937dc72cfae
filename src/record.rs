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

// On disk / in-RAM layout of a single state record, little-endian:
//
// [0        .. P       ) packed_vars      (P bytes)
// [P        .. P+8      ) state_id         u64
// [P+8      .. P+16     ) parent_state_id  u64 (all-ones = NoState)
// [P+16     .. P+20     ) creating_operator i32 (-1 = none)
// [P+20     .. P+24     ) g                i32
// [P+24     .. P+32     ) parent_hash      u64
//
// Total stride R = P + 32, fixed for the lifetime of a run by the first
// StateRecord ever constructed.

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

pub const NO_STATE: u64 = u64::MAX;
pub const NO_OPERATOR: i32 = -1;

const HEADER_SIZE: usize = 8 + 8 + 4 + 4 + 8;

// 0 is never a valid P: it is used as "unset" so first-touch-wins can be
// detected with a single compare-exchange.
static PACKED_LEN: AtomicUsize = AtomicUsize::new(0);

/// Fixes the packed-variable width for the remainder of the process, or
/// asserts it matches an already-fixed width. Mirrors Design Note 9's
/// "one-shot initialisation" of global record-size state.
pub fn fix_packed_len(packed_len: usize) -> usize {
	match PACKED_LEN.compare_exchange(0, packed_len, AtomicOrdering::SeqCst, AtomicOrdering::SeqCst) {
		Ok(_) => packed_len,
		Err(existing) => {
			assert_eq!(
				existing, packed_len,
				"packed_vars width changed mid-run: was {} now {}",
				existing, packed_len
			);
			existing
		}
	}
}

/// The packed-variable width fixed by the first [`StateRecord::new`] call,
/// or `None` if no record has been constructed yet.
pub fn packed_len() -> Option<usize> {
	match PACKED_LEN.load(AtomicOrdering::SeqCst) {
		0 => None,
		p => Some(p),
	}
}

/// Serialised stride `R` for the current run, or `None` before the first
/// record is constructed.
pub fn stride() -> Option<usize> {
	packed_len().map(|p| p + HEADER_SIZE)
}

/// Byte length of everything in a record after `packed_vars`.
pub fn header_size() -> usize {
	HEADER_SIZE
}

#[cfg(test)]
pub(crate) fn reset_packed_len_for_test() {
	PACKED_LEN.store(0, AtomicOrdering::SeqCst);
}

/// An immutable state record. Equality, hashing, and ordering all operate
/// on `packed_vars` only — two records with different ids but equal
/// packed bytes are the same state, which is what makes delayed duplicate
/// detection work.
#[derive(Debug, Clone)]
pub struct StateRecord {
	packed_vars: Vec<u8>,
	state_id: u64,
	parent_state_id: u64,
	creating_operator: i32,
	g: i32,
	parent_hash: u64,
}

impl StateRecord {
	pub fn new(
		packed_vars: Vec<u8>,
		state_id: u64,
		parent_state_id: u64,
		creating_operator: i32,
		g: i32,
		parent_hash: u64,
	) -> StateRecord {
		let fixed = fix_packed_len(packed_vars.len());
		assert_eq!(fixed, packed_vars.len(), "packed_vars length does not match the fixed run width");
		debug_assert_eq!(creating_operator == NO_OPERATOR, parent_state_id == NO_STATE);
		StateRecord { packed_vars, state_id, parent_state_id, creating_operator, g, parent_hash }
	}

	pub fn root(packed_vars: Vec<u8>, state_id: u64, parent_hash: u64) -> StateRecord {
		StateRecord::new(packed_vars, state_id, NO_STATE, NO_OPERATOR, 0, parent_hash)
	}

	pub fn packed_vars(&self) -> &[u8] {
		&self.packed_vars
	}
	pub fn state_id(&self) -> u64 {
		self.state_id
	}
	pub fn parent_state_id(&self) -> u64 {
		self.parent_state_id
	}
	pub fn is_root(&self) -> bool {
		self.parent_state_id == NO_STATE
	}
	pub fn creating_operator(&self) -> i32 {
		self.creating_operator
	}
	pub fn g(&self) -> i32 {
		self.g
	}
	pub fn parent_hash(&self) -> u64 {
		self.parent_hash
	}

	/// Stride of this record given the run's fixed `packed_vars` width.
	pub fn size_in_bytes(&self) -> usize {
		self.packed_vars.len() + HEADER_SIZE
	}

	/// Serialise into exactly `size_in_bytes()` little-endian bytes.
	pub fn write(&self, buf: &mut [u8]) {
		let p = self.packed_vars.len();
		assert_eq!(buf.len(), p + HEADER_SIZE);
		buf[0..p].copy_from_slice(&self.packed_vars);
		buf[p..p + 8].copy_from_slice(&self.state_id.to_le_bytes());
		buf[p + 8..p + 16].copy_from_slice(&self.parent_state_id.to_le_bytes());
		buf[p + 16..p + 20].copy_from_slice(&self.creating_operator.to_le_bytes());
		buf[p + 20..p + 24].copy_from_slice(&self.g.to_le_bytes());
		buf[p + 24..p + 32].copy_from_slice(&self.parent_hash.to_le_bytes());
	}

	/// Deserialise a record whose packed width is `packed_len` bytes.
	pub fn read(buf: &[u8], packed_len: usize) -> StateRecord {
		assert_eq!(buf.len(), packed_len + HEADER_SIZE);
		let p = packed_len;
		let packed_vars = buf[0..p].to_vec();
		let state_id = u64::from_le_bytes(buf[p..p + 8].try_into().unwrap());
		let parent_state_id = u64::from_le_bytes(buf[p + 8..p + 16].try_into().unwrap());
		let creating_operator = i32::from_le_bytes(buf[p + 16..p + 20].try_into().unwrap());
		let g = i32::from_le_bytes(buf[p + 20..p + 24].try_into().unwrap());
		let parent_hash = u64::from_le_bytes(buf[p + 24..p + 32].try_into().unwrap());
		StateRecord { packed_vars, state_id, parent_state_id, creating_operator, g, parent_hash }
	}
}

impl PartialEq for StateRecord {
	fn eq(&self, other: &StateRecord) -> bool {
		self.packed_vars == other.packed_vars
	}
}
impl Eq for StateRecord {}

impl Hash for StateRecord {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.packed_vars.hash(state);
	}
}

impl PartialOrd for StateRecord {
	fn partial_cmp(&self, other: &StateRecord) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}
impl Ord for StateRecord {
	fn cmp(&self, other: &StateRecord) -> Ordering {
		self.packed_vars.cmp(&other.packed_vars)
	}
}
