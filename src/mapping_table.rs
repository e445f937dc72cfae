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

/// Parallel table of per-flush-batch tags (partition ids), indexed by
/// `ptr / batch_size`. Backed by a plain growable vector, matching
/// `parity-db`'s array-of-per-tier-state idiom.
#[derive(Default)]
pub struct MappingTable {
	batch_size: u64,
	tags: Vec<u32>,
}

impl MappingTable {
	pub fn new(batch_size: u64) -> MappingTable {
		assert!(batch_size > 0);
		MappingTable { batch_size, tags: Vec::new() }
	}

	fn batch_of(&self, ptr: u64) -> usize {
		(ptr / self.batch_size) as usize
	}

	/// Record `tag` for the flush batch that `ptr` falls into.
	pub fn set(&mut self, ptr: u64, tag: u32) {
		let batch = self.batch_of(ptr);
		if batch >= self.tags.len() {
			self.tags.resize(batch + 1, 0);
		}
		self.tags[batch] = tag;
	}

	/// Tag of the flush batch that `ptr` falls into, if recorded yet.
	pub fn get(&self, ptr: u64) -> Option<u32> {
		self.tags.get(self.batch_of(ptr)).copied()
	}

	pub fn len(&self) -> usize {
		self.tags.len()
	}
	pub fn is_empty(&self) -> bool {
		self.tags.is_empty()
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn tags_indexed_by_batch() {
		let mut m = MappingTable::new(4);
		m.set(0, 1);
		m.set(7, 2);
		assert_eq!(m.get(0), Some(1));
		assert_eq!(m.get(3), Some(1));
		assert_eq!(m.get(4), Some(2));
		assert_eq!(m.get(7), Some(2));
		assert_eq!(m.get(8), None);
	}
}
