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

// Hash-sharded delayed duplicate detection open list (A*-DDD). `B` shards
// each own an `open`/`next`/`closed` bucket file plus one shared LIFO
// `recursive` bucket for same-layer states generated while the layer is
// being expanded.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::PathBuf;

use crate::collaborators::Evaluator;
use crate::error::{Error, Result};
use crate::open_list::record_file::RecordFile;
use crate::options::{OpenListOptions, Tiebreak};
use crate::record::StateRecord;

pub type HashFn = Box<dyn Fn(&[u8]) -> u64 + Send>;

/// Bounded FIFO membership cache keyed by hash, consulted before writing to
/// `recursive` to suppress trivially-immediate duplicates. An optimisation
/// only: a miss here never causes incorrect behaviour, since `RemoveDuplicates`
/// is the ground truth for every other bucket (original_source/.../transposition_table.h).
struct TranspositionCache {
	capacity: usize,
	seen: HashSet<u64>,
	order: VecDeque<u64>,
}

impl TranspositionCache {
	fn new(capacity: usize) -> TranspositionCache {
		TranspositionCache { capacity, seen: HashSet::new(), order: VecDeque::new() }
	}

	/// Returns `true` if `h` was not already cached (caller should proceed).
	fn insert_if_new(&mut self, h: u64) -> bool {
		if self.capacity == 0 {
			return true;
		}
		if self.seen.contains(&h) {
			return false;
		}
		if self.order.len() >= self.capacity {
			if let Some(oldest) = self.order.pop_front() {
				self.seen.remove(&oldest);
			}
		}
		self.seen.insert(h);
		self.order.push_back(h);
		true
	}
}

struct Buckets {
	open: Vec<RecordFile>,
	next: Vec<RecordFile>,
	closed: Vec<RecordFile>,
	recursive: RecordFile,
}

pub struct HashDDDOpenList {
	dir: PathBuf,
	hash_fn: HashFn,
	evaluator: Box<dyn Evaluator>,
	shards: usize,
	tiebreak: Tiebreak,
	transposition_cache: TranspositionCache,
	buckets: Option<Buckets>,
	min_f: i32,
	max_g: i32,
	cur: usize,
}

impl HashDDDOpenList {
	pub fn new(
		dir: impl Into<PathBuf>,
		options: &OpenListOptions,
		hash_fn: HashFn,
		evaluator: Box<dyn Evaluator>,
	) -> Result<HashDDDOpenList> {
		let dir = dir.into();
		std::fs::create_dir_all(&dir)?;
		Ok(HashDDDOpenList {
			dir,
			hash_fn,
			evaluator,
			shards: options.shards.max(1),
			tiebreak: options.tiebreak,
			transposition_cache: TranspositionCache::new(options.transposition_cache_entries),
			buckets: None,
			min_f: 0,
			max_g: 0,
			cur: 0,
		})
	}

	fn init_buckets(&mut self) -> Result<Buckets> {
		let stride = crate::record::stride().expect("HashDDDOpenList used before any StateRecord was constructed");
		let mut open = Vec::with_capacity(self.shards);
		let mut next = Vec::with_capacity(self.shards);
		let mut closed = Vec::with_capacity(self.shards);
		for i in 0..self.shards {
			open.push(RecordFile::create(self.dir.join(format!("{}_open.bucket", i)), stride)?);
			next.push(RecordFile::create(self.dir.join(format!("{}_next.bucket", i)), stride)?);
			closed.push(RecordFile::create(self.dir.join(format!("{}_closed.bucket", i)), stride)?);
		}
		let recursive = RecordFile::create(self.dir.join("recursive.bucket"), stride)?;
		Ok(Buckets { open, next, closed, recursive })
	}

	pub fn insert(&mut self, entry: StateRecord) -> Result<()> {
		let f = entry.g() + self.evaluator.eval(&entry).unwrap_or(i32::MAX);
		if self.buckets.is_none() {
			self.buckets = Some(self.init_buckets()?);
			self.min_f = f;
			self.max_g = entry.g();
		}
		let h = (self.hash_fn)(entry.packed_vars());
		let shard = (h % self.shards as u64) as usize;
		let is_current_layer = f == self.min_f && (self.tiebreak != Tiebreak::FThenMaxG || entry.g() == self.max_g);
		let buckets = self.buckets.as_mut().unwrap();
		if is_current_layer {
			if self.transposition_cache.insert_if_new(h) {
				buckets.recursive.append(&entry)?;
			}
		} else {
			buckets.next[shard].append(&entry)?;
		}
		Ok(())
	}

	pub fn remove_min(&mut self) -> Result<StateRecord> {
		loop {
			if self.buckets.is_none() {
				return Err(Error::OpenListEmpty);
			}
			if !self.buckets.as_mut().unwrap().recursive.is_empty()? {
				let rec = self.buckets.as_mut().unwrap().recursive.pop_last()?.expect("checked non-empty above");
				let h = (self.hash_fn)(rec.packed_vars());
				let shard = (h % self.shards as u64) as usize;
				self.buckets.as_mut().unwrap().closed[shard].append(&rec)?;
				return Ok(rec);
			}
			if self.cur >= self.shards {
				self.remove_duplicates()?;
				self.cur = 0;
				continue;
			}
			let min_f = self.min_f;
			let max_g = self.max_g;
			let tiebreak = self.tiebreak;
			let evaluator = &self.evaluator;
			let shard = self.cur;
			let buckets = self.buckets.as_mut().unwrap();
			match buckets.open[shard].read_next()? {
				Some(rec) => {
					let f = rec.g() + evaluator.eval(&rec).unwrap_or(i32::MAX);
					let at_layer = f == min_f && (tiebreak != Tiebreak::FThenMaxG || rec.g() == max_g);
					if at_layer {
						buckets.closed[shard].append(&rec)?;
						return Ok(rec);
					}
					buckets.next[shard].append(&rec)?;
				}
				None => self.cur += 1,
			}
		}
	}

	/// Layer-boundary duplicate removal over every shard (spec section 4.3).
	fn remove_duplicates(&mut self) -> Result<()> {
		let evaluator = &self.evaluator;
		let shards = self.shards;
		let buckets = self.buckets.as_mut().unwrap();
		let mut new_min_f = i32::MAX;
		let mut new_max_g = i32::MIN;
		for shard in 0..shards {
			buckets.next[shard].rewind_read();
			let mut survivors: HashMap<Vec<u8>, StateRecord> = HashMap::new();
			while let Some(rec) = buckets.next[shard].read_next()? {
				let keep = match survivors.get(rec.packed_vars()) {
					Some(existing) => rec.g() < existing.g(),
					None => true,
				};
				if keep {
					survivors.insert(rec.packed_vars().to_vec(), rec);
				}
			}
			buckets.closed[shard].rewind_read();
			while let Some(rec) = buckets.closed[shard].read_next()? {
				survivors.remove(rec.packed_vars());
			}
			buckets.open[shard].clear()?;
			for rec in survivors.values() {
				buckets.open[shard].append(rec)?;
				let f = rec.g() + evaluator.eval(rec).unwrap_or(i32::MAX);
				if f < new_min_f {
					new_min_f = f;
					new_max_g = rec.g();
				} else if f == new_min_f && rec.g() > new_max_g {
					new_max_g = rec.g();
				}
			}
			buckets.next[shard].clear()?;
		}
		self.min_f = new_min_f;
		self.max_g = new_max_g;
		if self.min_f == i32::MAX {
			return Err(Error::OpenListEmpty);
		}
		let stride = crate::record::stride().unwrap();
		let recursive_path = self.dir.join("recursive.bucket");
		self.buckets.as_mut().unwrap().recursive = RecordFile::create(recursive_path, stride)?;
		Ok(())
	}

	/// Consults only `closed[parent_hash mod B]`, since every closed state
	/// was routed there (spec section 4.3).
	pub fn trace_path(&mut self, goal: &StateRecord) -> Result<Vec<i32>> {
		let mut ops = Vec::new();
		let mut parent_id = goal.parent_state_id();
		let mut op = goal.creating_operator();
		let mut hash = goal.parent_hash();
		'walk: loop {
			if parent_id == crate::record::NO_STATE {
				break 'walk;
			}
			ops.push(op);
			let shard = (hash % self.shards as u64) as usize;
			let buckets =
				self.buckets.as_mut().ok_or_else(|| Error::Corruption("hash-DDD open list never initialised".into()))?;
			buckets.closed[shard].rewind_read();
			let mut found = None;
			while let Some(rec) = buckets.closed[shard].read_next()? {
				if rec.state_id() == parent_id {
					found = Some(rec);
					break;
				}
			}
			let parent = found
				.ok_or_else(|| Error::Corruption(format!("parent state {} not found in closed list", parent_id)))?;
			op = parent.creating_operator();
			parent_id = parent.parent_state_id();
			hash = parent.parent_hash();
		}
		ops.reverse();
		Ok(ops)
	}

	pub fn clear(&mut self) -> Result<()> {
		if let Some(buckets) = self.buckets.take() {
			for f in buckets.open {
				f.destroy()?;
			}
			for f in buckets.next {
				f.destroy()?;
			}
			for f in buckets.closed {
				f.destroy()?;
			}
			buckets.recursive.destroy()?;
		}
		self.min_f = 0;
		self.max_g = 0;
		self.cur = 0;
		Ok(())
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::record::{NO_OPERATOR, NO_STATE};

	struct TempDir(PathBuf);
	impl TempDir {
		fn new(name: &'static str) -> TempDir {
			let mut path = std::env::temp_dir();
			path.push("ext-search-test");
			path.push("hash_ddd_open_list");
			path.push(name);
			let _ = std::fs::remove_dir_all(&path);
			std::fs::create_dir_all(&path).unwrap();
			TempDir(path)
		}
	}
	impl Drop for TempDir {
		fn drop(&mut self) {
			let _ = std::fs::remove_dir_all(&self.0);
		}
	}

	struct ZeroHeuristic;
	impl Evaluator for ZeroHeuristic {
		fn eval(&self, _state: &StateRecord) -> Option<i32> {
			Some(0)
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

	fn hash_fn() -> HashFn {
		Box::new(fnv1a)
	}

	fn rec(vars: &[u8], id: u64, parent: u64, op: i32, g: i32, parent_hash: u64) -> StateRecord {
		StateRecord::new(vars.to_vec(), id, parent, op, g, parent_hash)
	}

	#[test]
	fn single_state_round_trip() {
		crate::test_support::with_clean_globals(|| {
			let dir = TempDir::new("single_state_round_trip");
			let mut opts = OpenListOptions::default();
			opts.shards = 4;
			let mut ol = HashDDDOpenList::new(dir.0, &opts, hash_fn(), Box::new(ZeroHeuristic)).unwrap();
			let root = rec(&[0], 0, NO_STATE, NO_OPERATOR, 0, 0);
			ol.insert(root.clone()).unwrap();
			let back = ol.remove_min().unwrap();
			assert_eq!(back, root);
			assert_eq!(ol.trace_path(&back).unwrap(), Vec::<i32>::new());
		});
	}

	#[test]
	fn linear_chain_expands_in_order() {
		crate::test_support::with_clean_globals(|| {
			let dir = TempDir::new("linear_chain_expands_in_order");
			let mut opts = OpenListOptions::default();
			opts.shards = 3;
			let mut ol = HashDDDOpenList::new(dir.0, &opts, hash_fn(), Box::new(ZeroHeuristic)).unwrap();

			let root = rec(&[0], 0, NO_STATE, NO_OPERATOR, 0, 0);
			ol.insert(root.clone()).unwrap();
			assert_eq!(ol.remove_min().unwrap(), root);

			let s1 = rec(&[1], 1, 0, 10, 1, fnv1a(&[0]));
			ol.insert(s1.clone()).unwrap();
			let s2 = rec(&[2], 2, 1, 20, 2, fnv1a(&[1]));
			// s2 belongs to a later layer (f=2 > min_f=1), so it must wait
			// for remove_min to drive the layer forward before it surfaces.
			ol.insert(s2.clone()).unwrap();

			assert_eq!(ol.remove_min().unwrap(), s1);
			assert_eq!(ol.remove_min().unwrap(), s2);
			assert_eq!(ol.trace_path(&s2).unwrap(), vec![10, 20]);
		});
	}

	#[test]
	fn diamond_graph_deduplicates_at_layer_boundary() {
		crate::test_support::with_clean_globals(|| {
			let dir = TempDir::new("diamond_graph_deduplicates_at_layer_boundary");
			let mut opts = OpenListOptions::default();
			opts.shards = 2;
			let mut ol = HashDDDOpenList::new(dir.0, &opts, hash_fn(), Box::new(ZeroHeuristic)).unwrap();

			let root = rec(&[0], 0, NO_STATE, NO_OPERATOR, 0, 0);
			ol.insert(root.clone()).unwrap();
			assert_eq!(ol.remove_min().unwrap(), root);

			let a = rec(&[1], 1, 0, 10, 1, fnv1a(&[0]));
			let b = rec(&[2], 2, 0, 11, 1, fnv1a(&[0]));
			ol.insert(a.clone()).unwrap();
			ol.insert(b.clone()).unwrap();
			assert_eq!(ol.remove_min().unwrap(), a);
			assert_eq!(ol.remove_min().unwrap(), b);

			// Both a and b generate the same successor s3, at different ops.
			let s3_via_a = rec(&[3], 3, 1, 30, 2, fnv1a(&[1]));
			let s3_via_b = rec(&[3], 3, 2, 31, 2, fnv1a(&[2]));
			ol.insert(s3_via_a.clone()).unwrap();
			ol.insert(s3_via_b).unwrap();

			let goal = ol.remove_min().unwrap();
			assert_eq!(goal.packed_vars(), &[3]);
			assert_eq!(ol.trace_path(&goal).unwrap().len(), 2);
			// The open list must not yield a second copy of the same state.
			assert!(ol.remove_min().is_err());
		});
	}
}
