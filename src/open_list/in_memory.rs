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

// Plain in-memory binary-heap open list, paired with an external closed
// list that owns duplicate detection and path reconstruction ("lazy" and
// "regular" A*, original_source/.../regular_tiebreaking_open_list.cc).

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::collaborators::Evaluator;
use crate::error::{Error, Result};
use crate::options::Tiebreak;
use crate::record::StateRecord;

struct HeapItem {
	f: i32,
	g: i32,
	seq: u64,
	record: StateRecord,
	tiebreak: Tiebreak,
}

impl HeapItem {
	fn key(&self) -> (i32, i32) {
		match self.tiebreak {
			Tiebreak::FOnly => (self.f, 0),
			Tiebreak::FThenMaxG => (self.f, -self.g),
		}
	}
}

impl PartialEq for HeapItem {
	fn eq(&self, other: &HeapItem) -> bool {
		self.key() == other.key() && self.seq == other.seq
	}
}
impl Eq for HeapItem {}

impl PartialOrd for HeapItem {
	fn partial_cmp(&self, other: &HeapItem) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

// `BinaryHeap` is a max-heap; reverse the natural order on `(f, tiebreak)`
// so the smallest key pops first, with insertion order (`seq`) as a final,
// deterministic tiebreaker.
impl Ord for HeapItem {
	fn cmp(&self, other: &HeapItem) -> Ordering {
		other.key().cmp(&self.key()).then_with(|| other.seq.cmp(&self.seq))
	}
}

pub struct InMemoryTiebreaking {
	heap: BinaryHeap<HeapItem>,
	next_seq: u64,
	evaluator: Box<dyn Evaluator>,
	tiebreak: Tiebreak,
}

impl InMemoryTiebreaking {
	pub fn new(evaluator: Box<dyn Evaluator>, tiebreak: Tiebreak) -> InMemoryTiebreaking {
		InMemoryTiebreaking { heap: BinaryHeap::new(), next_seq: 0, evaluator, tiebreak }
	}

	pub fn insert(&mut self, entry: StateRecord) -> Result<()> {
		let f = entry.g() + self.evaluator.eval(&entry).unwrap_or(i32::MAX);
		let seq = self.next_seq;
		self.next_seq += 1;
		self.heap.push(HeapItem { f, g: entry.g(), seq, record: entry, tiebreak: self.tiebreak });
		Ok(())
	}

	pub fn remove_min(&mut self) -> Result<StateRecord> {
		self.heap.pop().map(|item| item.record).ok_or(Error::OpenListEmpty)
	}

	pub fn clear(&mut self) -> Result<()> {
		self.heap.clear();
		self.next_seq = 0;
		Ok(())
	}

	pub fn is_empty(&self) -> bool {
		self.heap.is_empty()
	}

	/// This variant never reconstructs paths itself: it is always paired
	/// with a closed list ([`crate::closed_list::ClosedList::trace_path`])
	/// which owns the parent chain.
	pub fn trace_path(&mut self, _goal: &StateRecord) -> Result<Vec<i32>> {
		Err(Error::Corruption(
			"InMemoryTiebreaking does not reconstruct paths; use the paired closed list".into(),
		))
	}
}
