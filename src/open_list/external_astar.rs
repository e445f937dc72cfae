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

// External-memory open list bucketed by `(f, g)`, after Edelkamp's External
// A*. Buckets are visited in lexicographic `(f, g)` order; a bucket is
// sorted and deduplicated against its two predecessor diagonals only once,
// the moment it is first about to be read from.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::collaborators::Evaluator;
use crate::error::{Error, Result};
use crate::open_list::record_file::RecordFile;
use crate::options::{MERGE_CHUNK_BYTES, MERGE_RUN_BUFFER_BYTES, OpenListOptions};
use crate::record::StateRecord;

type BucketKey = (i32, i32);

pub struct ExternalAStarOpenList {
	dir: PathBuf,
	evaluator: Box<dyn Evaluator>,
	buckets: BTreeMap<BucketKey, RecordFile>,
	sorted: HashSet<BucketKey>,
	current: Option<BucketKey>,
}

impl ExternalAStarOpenList {
	pub fn new(
		dir: impl Into<PathBuf>,
		options: &OpenListOptions,
		evaluator: Box<dyn Evaluator>,
	) -> Result<ExternalAStarOpenList> {
		options.validate_external_astar()?;
		let dir = dir.into();
		std::fs::create_dir_all(&dir)?;
		Ok(ExternalAStarOpenList { dir, evaluator, buckets: BTreeMap::new(), sorted: HashSet::new(), current: None })
	}

	fn bucket_path(&self, key: BucketKey) -> PathBuf {
		self.dir.join(format!("f{}_g{}.bucket", key.0, key.1))
	}

	fn bucket_mut(&mut self, key: BucketKey) -> Result<&mut RecordFile> {
		if !self.buckets.contains_key(&key) {
			let stride = crate::record::stride().expect("ExternalAStarOpenList used before any StateRecord was constructed");
			let file = RecordFile::create(self.bucket_path(key), stride)?;
			self.buckets.insert(key, file);
		}
		Ok(self.buckets.get_mut(&key).unwrap())
	}

	pub fn insert(&mut self, entry: StateRecord) -> Result<()> {
		let f = entry.g() + self.evaluator.eval(&entry).unwrap_or(i32::MAX);
		let key = (f, entry.g());
		self.sorted.remove(&key);
		self.bucket_mut(key)?.append(&entry)?;
		Ok(())
	}

	fn next_non_empty_unsorted_bucket(&mut self) -> Result<Option<BucketKey>> {
		let keys: Vec<BucketKey> = self.buckets.keys().copied().collect();
		for key in keys {
			if self.sorted.contains(&key) {
				continue;
			}
			let empty = self.buckets.get_mut(&key).unwrap().is_empty()?;
			if !empty {
				return Ok(Some(key));
			}
		}
		Ok(None)
	}

	pub fn remove_min(&mut self) -> Result<StateRecord> {
		loop {
			if let Some(key) = self.current {
				if let Some(rec) = self.buckets.get_mut(&key).unwrap().read_next()? {
					return Ok(rec);
				}
				self.current = None;
			}
			match self.next_non_empty_unsorted_bucket()? {
				Some(key) => {
					self.sort_and_dedup(key)?;
					self.buckets.get_mut(&key).unwrap().rewind_read();
					self.current = Some(key);
				}
				None => return Err(Error::OpenListEmpty),
			}
		}
	}

	/// Bounded-memory k-way external merge sort over `key`'s bucket: forms
	/// sorted runs of at most `MERGE_CHUNK_BYTES` worth of records, spills
	/// them to a shared `temp.bucket` file, then merges the runs back
	/// through small refillable buffers (`MERGE_RUN_BUFFER_BYTES` each),
	/// dropping records already seen earlier in the merge or present on the
	/// `(f-1,g-1)`/`(f-2,g-2)` diagonals -- the only other buckets an
	/// admissible unit-cost successor could have come from. At no point is
	/// the whole bucket, or either diagonal, held in memory at once.
	fn sort_and_dedup(&mut self, key: BucketKey) -> Result<()> {
		let stride = crate::record::stride().unwrap();
		let run_entries = (MERGE_CHUNK_BYTES / stride).max(1);
		let buffer_entries = (MERGE_RUN_BUFFER_BYTES / stride).max(1);

		let temp_path = self.dir.join("temp.bucket");
		let run_bounds = {
			let mut temp = File::create(&temp_path)?;
			let source = self.buckets.get_mut(&key).unwrap();
			source.rewind_read();
			form_sorted_runs(source, &mut temp, run_entries, stride)?
		};

		let diag1_path = self.bucket_path((key.0 - 1, key.1 - 1));
		let diag2_path = self.bucket_path((key.0 - 2, key.1 - 2));
		let mut diag1 = DiagonalStream::open(&diag1_path, stride)?;
		let mut diag2 = DiagonalStream::open(&diag2_path, stride)?;

		let out_path = self.bucket_path(key);
		let mut out = RecordFile::create(&out_path, stride)?;

		if !run_bounds.is_empty() {
			let temp_file = File::open(&temp_path)?;
			let mut runs: Vec<RunCursor> = run_bounds
				.into_iter()
				.map(|(start, end)| RunCursor::new(temp_file.try_clone().expect("dup temp.bucket handle"), start, end))
				.collect();
			for run in &mut runs {
				run.refill(buffer_entries, stride)?;
			}

			let mut previous: Option<StateRecord> = None;
			loop {
				let mut best: Option<usize> = None;
				for (i, run) in runs.iter().enumerate() {
					if run.buffer.is_empty() {
						continue;
					}
					let better = match best {
						None => true,
						Some(b) => run.buffer.front().unwrap() < runs[b].buffer.front().unwrap(),
					};
					if better {
						best = Some(i);
					}
				}
				let i = match best {
					Some(i) => i,
					None => break,
				};
				let rec = runs[i].buffer.pop_front().unwrap();
				if runs[i].buffer.is_empty() {
					runs[i].refill(buffer_entries, stride)?;
				}

				if previous.as_ref() == Some(&rec) {
					continue;
				}
				if diag1.matches(&rec)? || diag2.matches(&rec)? {
					continue;
				}
				out.append(&rec)?;
				previous = Some(rec);
			}
		}

		self.buckets.insert(key, out);
		self.sorted.insert(key);
		let _ = std::fs::remove_file(&temp_path);
		Ok(())
	}

	/// Searches every bucket at `g = goal.g() - 1` for `goal`'s parent,
	/// since External A* tracks no shard for `parent_hash` the way hash-DDD
	/// does.
	pub fn trace_path(&mut self, goal: &StateRecord) -> Result<Vec<i32>> {
		let mut ops = Vec::new();
		let mut parent_id = goal.parent_state_id();
		let mut op = goal.creating_operator();
		let mut expected_g = goal.g() - 1;
		'walk: loop {
			if parent_id == crate::record::NO_STATE {
				break 'walk;
			}
			ops.push(op);
			let keys: Vec<BucketKey> = self.buckets.keys().copied().filter(|k| k.1 == expected_g).collect();
			let mut found = None;
			'search: for key in keys {
				let file = self.buckets.get_mut(&key).unwrap();
				for rec in file.read_all()? {
					if rec.state_id() == parent_id {
						found = Some(rec);
						break 'search;
					}
				}
			}
			let parent = found
				.ok_or_else(|| Error::Corruption(format!("parent state {} not found in any (f,g) bucket", parent_id)))?;
			op = parent.creating_operator();
			parent_id = parent.parent_state_id();
			expected_g -= 1;
		}
		ops.reverse();
		Ok(ops)
	}

	pub fn clear(&mut self) -> Result<()> {
		for (_, file) in self.buckets.drain() {
			file.destroy()?;
		}
		self.sorted.clear();
		self.current = None;
		let _ = std::fs::remove_file(self.dir.join("temp.bucket"));
		Ok(())
	}
}

/// Reads `source` in chunks of at most `run_entries` records, sorts each
/// chunk in memory, and appends it to `temp`, returning each run's
/// `(start, end)` record-index bounds within `temp`.
fn form_sorted_runs(source: &mut RecordFile, temp: &mut File, run_entries: usize, stride: usize) -> Result<Vec<(u64, u64)>> {
	let mut run_bounds = Vec::new();
	let mut written: u64 = 0;
	loop {
		let mut chunk = Vec::with_capacity(run_entries);
		for _ in 0..run_entries {
			match source.read_next()? {
				Some(rec) => chunk.push(rec),
				None => break,
			}
		}
		if chunk.is_empty() {
			break;
		}
		chunk.sort();
		let start = written;
		let mut buf = vec![0u8; stride];
		for rec in &chunk {
			rec.write(&mut buf);
			temp.write_all(&buf)?;
			written += 1;
		}
		run_bounds.push((start, written));
	}
	Ok(run_bounds)
}

/// One sorted run living inside the shared `temp.bucket` file, read through
/// its own file handle so refilling one run's buffer never disturbs another
/// run's position. Holds only `buffer_entries` records at a time.
struct RunCursor {
	file: File,
	next: u64,
	end: u64,
	buffer: VecDeque<StateRecord>,
}

impl RunCursor {
	fn new(file: File, start: u64, end: u64) -> RunCursor {
		RunCursor { file, next: start, end, buffer: VecDeque::new() }
	}

	fn refill(&mut self, buffer_entries: usize, stride: usize) -> Result<()> {
		if self.next >= self.end {
			return Ok(());
		}
		self.file.seek(SeekFrom::Start(self.next * stride as u64))?;
		let packed_len = stride - crate::record::header_size();
		let to_read = buffer_entries.min((self.end - self.next) as usize);
		let mut buf = vec![0u8; stride];
		for _ in 0..to_read {
			self.file.read_exact(&mut buf)?;
			self.buffer.push_back(StateRecord::read(&buf, packed_len));
			self.next += 1;
		}
		Ok(())
	}
}

/// Streaming read over an already-sorted `(f,g)` bucket file, used only to
/// test diagonal membership during a merge. Advances monotonically; never
/// loads more than one record at a time.
struct DiagonalStream {
	file: Option<File>,
	stride: usize,
	current: Option<StateRecord>,
}

impl DiagonalStream {
	fn open(path: &Path, stride: usize) -> Result<DiagonalStream> {
		let file = File::open(path).ok();
		let mut stream = DiagonalStream { file, stride, current: None };
		stream.advance()?;
		Ok(stream)
	}

	fn advance(&mut self) -> Result<()> {
		self.current = match self.file.as_mut() {
			Some(f) => {
				let mut buf = vec![0u8; self.stride];
				match f.read_exact(&mut buf) {
					Ok(()) => Some(StateRecord::read(&buf, self.stride - crate::record::header_size())),
					Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
						self.file = None;
						None
					}
					Err(e) => return Err(e.into()),
				}
			}
			None => None,
		};
		Ok(())
	}

	/// Advances past records ordered before `target` (the stream is sorted,
	/// as is the merge driving this call), then reports whether it is now
	/// positioned exactly on `target`.
	fn matches(&mut self, target: &StateRecord) -> Result<bool> {
		while let Some(rec) = self.current.clone() {
			if &rec < target {
				self.advance()?;
			} else {
				break;
			}
		}
		Ok(self.current.as_ref() == Some(target))
	}
}
