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

// Pure in-memory closed list, grounded on
// original_source/.../closed_lists/regular_closed_list.cc. This is what
// CompressClosedList's in-memory phase degenerates to when it never spills
// (Design Note 9(b)) — kept as its own thin type because a caller who never
// wants an external tier shouldn't have to carry one unused.

use std::collections::HashMap;

use crate::error::Result;
use crate::record::{StateRecord, NO_STATE};

pub struct RegularClosedList {
	reopen_closed: bool,
	by_state: HashMap<Vec<u8>, StateRecord>,
	by_id: HashMap<u64, Vec<u8>>,
}

impl RegularClosedList {
	pub fn new(reopen_closed: bool) -> RegularClosedList {
		RegularClosedList { reopen_closed, by_state: HashMap::new(), by_id: HashMap::new() }
	}

	pub fn len(&self) -> usize {
		self.by_state.len()
	}
	pub fn is_empty(&self) -> bool {
		self.by_state.is_empty()
	}

	pub fn find_insert(&mut self, entry: StateRecord) -> Result<(bool, bool)> {
		let key = entry.packed_vars().to_vec();
		match self.by_state.get(&key) {
			Some(existing) => {
				if self.reopen_closed && entry.g() < existing.g() {
					self.by_id.remove(&existing.state_id());
					self.by_id.insert(entry.state_id(), key.clone());
					self.by_state.insert(key, entry);
					Ok((true, true))
				} else {
					Ok((true, false))
				}
			}
			None => {
				self.by_id.insert(entry.state_id(), key.clone());
				self.by_state.insert(key, entry);
				Ok((false, false))
			}
		}
	}

	pub fn trace_path(&self, goal: &StateRecord) -> Result<Vec<i32>> {
		let mut ops = Vec::new();
		let mut parent_id = goal.parent_state_id();
		let mut op = goal.creating_operator();
		'walk: loop {
			if parent_id == NO_STATE {
				break 'walk;
			}
			ops.push(op);
			let key = self.by_id.get(&parent_id).ok_or_else(|| {
				crate::error::Error::Corruption(format!("parent state {} not found in closed list", parent_id))
			})?;
			let parent = self.by_state.get(key).expect("by_id and by_state out of sync");
			op = parent.creating_operator();
			parent_id = parent.parent_state_id();
		}
		ops.reverse();
		Ok(ops)
	}

	pub fn clear(&mut self) -> Result<()> {
		self.by_state.clear();
		self.by_id.clear();
		Ok(())
	}

	pub fn print_statistics(&self) {
		log::info!(target: "ext-search", "RegularClosedList: {} entries", self.by_state.len());
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::record::NO_OPERATOR;

	fn rec(vars: &[u8], id: u64, parent: u64, op: i32, g: i32) -> StateRecord {
		StateRecord::new(vars.to_vec(), id, parent, op, g, 0)
	}

	#[test]
	fn idempotent_membership() {
		crate::test_support::with_clean_globals(|| {
			let mut cl = RegularClosedList::new(false);
			assert_eq!(cl.find_insert(rec(&[1], 0, NO_STATE, NO_OPERATOR, 0)).unwrap(), (false, false));
			assert_eq!(cl.find_insert(rec(&[1], 1, NO_STATE, NO_OPERATOR, 0)).unwrap(), (true, false));
			assert_eq!(cl.len(), 1);
		});
	}

	#[test]
	fn reopen_keeps_minimum_g() {
		crate::test_support::with_clean_globals(|| {
			let mut cl = RegularClosedList::new(true);
			cl.find_insert(rec(&[2], 0, NO_STATE, NO_OPERATOR, 5)).unwrap();
			let (found, reopened) = cl.find_insert(rec(&[2], 1, NO_STATE, NO_OPERATOR, 3)).unwrap();
			assert!(found && reopened);
			assert_eq!(cl.by_state.get(&vec![2]).unwrap().g(), 3);
			// higher g than stored does not reopen
			let (found, reopened) = cl.find_insert(rec(&[2], 2, NO_STATE, NO_OPERATOR, 10)).unwrap();
			assert!(found && !reopened);
		});
	}

	#[test]
	fn trace_path_walks_chain() {
		crate::test_support::with_clean_globals(|| {
			let mut cl = RegularClosedList::new(false);
			cl.find_insert(rec(&[0], 0, NO_STATE, NO_OPERATOR, 0)).unwrap();
			cl.find_insert(rec(&[1], 1, 0, 10, 1)).unwrap();
			cl.find_insert(rec(&[2], 2, 1, 20, 2)).unwrap();
			let goal = rec(&[3], 3, 2, 30, 3);
			cl.find_insert(goal.clone()).unwrap();
			assert_eq!(cl.trace_path(&goal).unwrap(), vec![10, 20, 30]);
		});
	}
}
