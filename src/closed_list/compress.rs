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

// Hybrid in-memory -> external closed list. The in-memory phase is a plain
// hash set sized from `internal_closed_gb`; once full it transitions to an
// external phase backed by a PointerTable + MmapBucket, with small
// per-partition write buffers in front, mirroring `parity-db`'s
// buffer-then-flush-to-mapped-region shape in `ValueTable::overwrite_chain`.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::mapping_table::MappingTable;
use crate::mmap_bucket::MmapBucket;
use crate::options::ClosedListOptions;
use crate::pointer_table::{PointerTable, INVALID};
use crate::record::StateRecord;

/// Computes a 64-bit hash over `packed_vars` (the closed list's "primary
/// hash"). In a wired-up engine this closes over a `ZobristHasher` and a
/// `StatePacker`; the closed list itself only needs the resulting function.
pub type HashFn = Box<dyn Fn(&[u8]) -> u64 + Send>;

struct ExternalPhase {
	pointer_table: PointerTable,
	mmap: MmapBucket,
	mapping: Option<MappingTable>,
	buffers: Vec<HashMap<Vec<u8>, StateRecord>>,
	next_free_slot: u64,
	good_probes: u64,
	bad_probes: u64,
}

enum Phase {
	/// No record has been inserted yet; stride `R` is unknown (Design Note 9).
	Pending,
	InMemory { set: HashSet<StateRecord>, capacity: usize },
	External(ExternalPhase),
}

pub struct CompressClosedList {
	options: ClosedListOptions,
	hash_fn: HashFn,
	path: PathBuf,
	stride: usize,
	phase: Phase,
}

impl CompressClosedList {
	pub fn new(path: impl Into<PathBuf>, options: ClosedListOptions, hash_fn: HashFn) -> Result<CompressClosedList> {
		options.validate()?;
		Ok(CompressClosedList { options, hash_fn, path: path.into(), stride: 0, phase: Phase::Pending })
	}

	fn packed_len(&self) -> usize {
		crate::record::packed_len().expect("CompressClosedList used before any StateRecord was constructed")
	}

	fn budget_bytes(&self) -> usize {
		debug_assert!(self.options.internal_closed_gb.is_finite());
		(self.options.internal_closed_gb * 1_000_000_000.0) as usize
	}

	fn in_memory_capacity(&self) -> usize {
		if self.options.is_in_memory_only() {
			usize::MAX
		} else {
			(self.budget_bytes() / self.stride).max(1)
		}
	}

	fn max_buffer_entries(&self) -> usize {
		(self.options.write_buffer_bytes / self.stride).max(1)
	}

	fn partition_count(&self) -> usize {
		if self.options.enable_partitioning {
			self.options.partitions as usize
		} else {
			1
		}
	}

	fn partition_of(&self, entry: &StateRecord) -> usize {
		if self.options.enable_partitioning {
			(fnv1a(entry.packed_vars()) % self.options.partitions as u64) as usize
		} else {
			0
		}
	}

	pub fn find_insert(&mut self, entry: StateRecord) -> Result<(bool, bool)> {
		if matches!(self.phase, Phase::Pending) {
			self.stride = entry.size_in_bytes();
			let capacity = self.in_memory_capacity();
			self.phase = Phase::InMemory { set: HashSet::new(), capacity };
		}
		match self.phase {
			Phase::Pending => unreachable!(),
			Phase::InMemory { .. } => self.find_insert_in_memory(entry),
			Phase::External(_) => self.find_insert_external(entry),
		}
	}

	fn find_insert_in_memory(&mut self, entry: StateRecord) -> Result<(bool, bool)> {
		let reopen = self.options.reopen_closed;
		let (set, capacity) = match &mut self.phase {
			Phase::InMemory { set, capacity } => (set, *capacity),
			_ => unreachable!(),
		};
		if let Some(existing) = set.get(&entry) {
			if reopen && entry.g() < existing.g() {
				set.replace(entry);
				return Ok((true, true));
			}
			return Ok((true, false));
		}
		set.insert(entry);
		if set.len() >= capacity {
			self.transition_to_external()?;
		}
		Ok((false, false))
	}

	fn transition_to_external(&mut self) -> Result<()> {
		let old = std::mem::replace(&mut self.phase, Phase::Pending);
		let set = match old {
			Phase::InMemory { set, .. } => set,
			_ => unreachable!(),
		};
		log::info!(target: "ext-search", "CompressClosedList: transitioning {} entries to external storage", set.len());

		let budget = self.budget_bytes();
		let pointer_table = PointerTable::with_budget(budget, self.options.double_hashing);
		let slots = pointer_table.capacity();
		let mmap = MmapBucket::create(&self.path, self.stride, slots.max(1))?;
		let mapping = if self.options.enable_partitioning {
			Some(MappingTable::new(self.max_buffer_entries() as u64))
		} else {
			None
		};
		self.phase = Phase::External(ExternalPhase {
			pointer_table,
			mmap,
			mapping,
			buffers: vec![HashMap::new(); self.partition_count()],
			next_free_slot: 0,
			good_probes: 0,
			bad_probes: 0,
		});

		for rec in set {
			let p = self.partition_of(&rec);
			self.buffer_insert_unconditionally(p, rec)?;
		}
		Ok(())
	}

	fn buffer_insert_unconditionally(&mut self, p: usize, rec: StateRecord) -> Result<()> {
		let key = rec.packed_vars().to_vec();
		let max_buffer = self.max_buffer_entries();
		let ext = match &mut self.phase {
			Phase::External(e) => e,
			_ => unreachable!(),
		};
		ext.buffers[p].insert(key, rec);
		let full = ext.buffers[p].len() >= max_buffer;
		if full {
			self.flush(p)?;
		}
		Ok(())
	}

	fn flush(&mut self, p: usize) -> Result<()> {
		let stride = self.stride;
		let double_hashing = self.options.double_hashing;
		let hash_fn = &self.hash_fn;
		let ext = match &mut self.phase {
			Phase::External(e) => e,
			_ => unreachable!(),
		};
		let drained: Vec<StateRecord> = ext.buffers[p].drain().map(|(_, v)| v).collect();
		for rec in drained {
			if ext.pointer_table.is_full() {
				return Err(Error::CapacityExceeded);
			}
			let slot = ext.next_free_slot;
			ext.next_free_slot += 1;
			let mut buf = vec![0u8; stride];
			rec.write(&mut buf);
			ext.mmap.write(slot, &buf)?;
			let h = hash_fn(rec.packed_vars());
			let step = if double_hashing { ext.pointer_table.double_hash_step(h) } else { PointerTable::linear_step() };
			ext.pointer_table.hash_insert(slot, h, step);
			if let Some(mapping) = &mut ext.mapping {
				mapping.set(slot, p as u32);
			}
		}
		Ok(())
	}

	fn find_insert_external(&mut self, entry: StateRecord) -> Result<(bool, bool)> {
		let p = self.partition_of(&entry);
		let key = entry.packed_vars().to_vec();
		let h = (self.hash_fn)(entry.packed_vars());
		let stride = self.stride;
		let packed_len = self.packed_len();
		let reopen = self.options.reopen_closed;
		let double_hashing = self.options.double_hashing;
		let max_buffer = self.max_buffer_entries();

		let step = match &self.phase {
			Phase::External(ext) => {
				if double_hashing {
					ext.pointer_table.double_hash_step(h)
				} else {
					PointerTable::linear_step()
				}
			}
			_ => unreachable!(),
		};

		let ext = match &mut self.phase {
			Phase::External(e) => e,
			_ => unreachable!("find_insert_external called outside external phase"),
		};

		if let Some(existing) = ext.buffers[p].get(&key) {
			if reopen && entry.g() < existing.g() {
				ext.buffers[p].insert(key, entry);
				return Ok((true, true));
			}
			return Ok((true, false));
		}

		let mut probe = None;
		let mut first = true;
		loop {
			let (found, ptr) = ext.pointer_table.hash_find(h, step, first, probe);
			first = false;
			probe = Some(found);
			if ptr == INVALID {
				break;
			}
			if let Some(mapping) = &ext.mapping {
				if mapping.get(ptr) != Some(p as u32) {
					// Partition tag disagrees: skip the disk read entirely.
					continue;
				}
			}
			let rec = StateRecord::read(ext.mmap.read(ptr), packed_len);
			if rec == entry {
				ext.good_probes += 1;
				if reopen && entry.g() < rec.g() {
					let mut buf = vec![0u8; stride];
					entry.write(&mut buf);
					ext.mmap.write(ptr, &buf)?;
					return Ok((true, true));
				}
				return Ok((true, false));
			}
			ext.bad_probes += 1;
		}

		ext.buffers[p].insert(key, entry);
		let full = ext.buffers[p].len() >= max_buffer;
		if full {
			self.flush(p)?;
		}
		Ok((false, false))
	}

	/// Search every in-memory buffer/set, then the external pointer table
	/// via `hash`, for the record whose `state_id` is `id`.
	fn find_by_id(&self, id: u64, hash: u64) -> Result<StateRecord> {
		match &self.phase {
			Phase::Pending => {}
			Phase::InMemory { set, .. } => {
				if let Some(found) = set.iter().find(|r| r.state_id() == id) {
					return Ok(found.clone());
				}
			}
			Phase::External(ext) => {
				for buffer in &ext.buffers {
					if let Some(found) = buffer.values().find(|r| r.state_id() == id) {
						return Ok(found.clone());
					}
				}
				let step = if self.options.double_hashing { ext.pointer_table.double_hash_step(hash) } else { PointerTable::linear_step() };
				let mut probe = None;
				let mut first = true;
				let packed_len = self.packed_len();
				loop {
					let (p, ptr) = ext.pointer_table.hash_find(hash, step, first, probe);
					first = false;
					probe = Some(p);
					if ptr == INVALID {
						break;
					}
					let rec = StateRecord::read(ext.mmap.read(ptr), packed_len);
					if rec.state_id() == id {
						return Ok(rec);
					}
				}
			}
		}
		Err(Error::Corruption(format!("parent state {} not found in closed list", id)))
	}

	pub fn trace_path(&self, goal: &StateRecord) -> Result<Vec<i32>> {
		let mut ops = Vec::new();
		let mut parent_id = goal.parent_state_id();
		let mut op = goal.creating_operator();
		let mut hash = goal.parent_hash();
		'walk: loop {
			if parent_id == crate::record::NO_STATE {
				break 'walk;
			}
			ops.push(op);
			let parent = self.find_by_id(parent_id, hash)?;
			op = parent.creating_operator();
			parent_id = parent.parent_state_id();
			hash = parent.parent_hash();
		}
		ops.reverse();
		Ok(ops)
	}

	pub fn clear(&mut self) -> Result<()> {
		if let Phase::External(ext) = std::mem::replace(&mut self.phase, Phase::Pending) {
			ext.mmap.destroy()?;
		}
		self.stride = 0;
		Ok(())
	}

	pub fn print_statistics(&self) {
		match &self.phase {
			Phase::Pending => log::info!(target: "ext-search", "CompressClosedList: empty"),
			Phase::InMemory { set, capacity } => {
				log::info!(target: "ext-search", "CompressClosedList: {} / {} in-memory entries", set.len(), capacity);
			}
			Phase::External(ext) => {
				let entries = ext.pointer_table.entries();
				let capacity = ext.pointer_table.capacity().max(1);
				log::info!(
					target: "ext-search",
					"CompressClosedList: {} entries, load factor {:.3}, good_probes={}, bad_probes={}",
					entries,
					entries as f64 / capacity as f64,
					ext.good_probes,
					ext.bad_probes,
				);
			}
		}
	}
}

fn fnv1a(bytes: &[u8]) -> u64 {
	let mut h: u64 = 0xcbf2_9ce4_8422_2325;
	for &b in bytes {
		h ^= b as u64;
		h = h.wrapping_mul(0x0000_0100_0000_01b3);
	}
	h
}
