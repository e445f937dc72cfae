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

// A memory-mapped, fixed-stride record array. Grown in fixed chunks like
// `parity-db`'s `ValueTable::grow`, but mapped rather than pread/pwrite'd
// since the closed list's access pattern (random index reads across the
// whole capacity) benefits from mapped pages. madvise(RANDOM) discourages
// the kernel from wasting readahead on what is, by construction, random
// access (spec section 5).

use memmap2::MmapMut;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use crate::error::Result;

const GROW_SLOTS: u64 = 4096;

pub struct MmapBucket {
	path: PathBuf,
	file: File,
	mmap: MmapMut,
	stride: usize,
	capacity: u64,
}

impl MmapBucket {
	/// Create (or reopen) a `O_CREAT|O_TRUNC|O_RDWR`, mode 0600 bucket file
	/// at `path` sized for at least `initial_slots` records of `stride`
	/// bytes each.
	pub fn create(path: &Path, stride: usize, initial_slots: u64) -> Result<MmapBucket> {
		assert!(stride > 0);
		let file = open_truncated(path)?;
		let capacity = initial_slots.max(1);
		file.set_len(capacity * stride as u64)?;
		let mmap = unsafe { MmapMut::map_mut(&file)? };
		disable_readahead(&mmap);
        Ok(MmapBucket { path: path.to_path_buf(), file, mmap, stride, capacity })
	}

	pub fn stride(&self) -> usize {
		self.stride
	}
	pub fn capacity(&self) -> u64 {
		self.capacity
	}

	fn ensure_capacity(&mut self, slot: u64) -> Result<()> {
		if slot < self.capacity {
			return Ok(());
		}
		let mut capacity = self.capacity;
		while slot >= capacity {
			capacity += GROW_SLOTS;
		}
		self.file.set_len(capacity * self.stride as u64)?;
		self.mmap = unsafe { MmapMut::map_mut(&self.file)? };
		disable_readahead(&self.mmap);
		self.capacity = capacity;
		log::debug!(target: "ext-search", "grew bucket {} to {} slots", self.path.display(), capacity);
		Ok(())
	}

	/// Read the bytes stored at `slot`.
	pub fn read(&self, slot: u64) -> &[u8] {
		assert!(slot < self.capacity, "read past bucket capacity");
		let start = slot as usize * self.stride;
		&self.mmap[start..start + self.stride]
	}

	/// Overwrite the bytes at `slot`, growing the backing file first if
	/// needed.
	pub fn write(&mut self, slot: u64, bytes: &[u8]) -> Result<()> {
		assert_eq!(bytes.len(), self.stride);
		self.ensure_capacity(slot)?;
		let start = slot as usize * self.stride;
		self.mmap[start..start + self.stride].copy_from_slice(bytes);
		Ok(())
	}

	pub fn flush(&self) -> Result<()> {
		self.mmap.flush()?;
		Ok(())
	}

	/// Unmap, close, and unlink the backing file. Idempotent: a bucket
	/// whose file has already been removed does not error.
	pub fn destroy(self) -> Result<()> {
		let path = self.path.clone();
		drop(self);
		let _ = std::fs::remove_file(&path);
		Ok(())
	}
}

impl Drop for MmapBucket {
	fn drop(&mut self) {
		let _ = self.mmap.flush();
	}
}

#[cfg(unix)]
fn disable_readahead(mmap: &MmapMut) {
	// madvise(RANDOM): the closed list's access pattern is hash-addressed,
	// not sequential, so readahead just wastes page cache (spec section 5).
	let _ = mmap.advise(memmap2::Advice::Random);
}

#[cfg(not(unix))]
fn disable_readahead(_mmap: &MmapMut) {}

fn open_truncated(path: &Path) -> Result<File> {
	let file = OpenOptions::new().create(true).truncate(true).read(true).write(true).open(path)?;
	set_owner_only_permissions(&file)?;
	Ok(file)
}

#[cfg(unix)]
fn set_owner_only_permissions(file: &File) -> Result<()> {
	use std::os::unix::fs::PermissionsExt;
	let mut perms = file.metadata()?.permissions();
	perms.set_mode(0o600);
	file.set_permissions(perms)?;
	Ok(())
}

#[cfg(not(unix))]
fn set_owner_only_permissions(_file: &File) -> Result<()> {
	Ok(())
}

#[cfg(test)]
mod test {
	use super::*;

	struct TempDir(PathBuf);
	impl TempDir {
		fn new(name: &'static str) -> TempDir {
			let mut path = std::env::temp_dir();
			path.push("ext-search-test");
			path.push("mmap_bucket");
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

	#[test]
	fn write_then_read_back() {
		let dir = TempDir::new("write_then_read_back");
		let path = dir.0.join("b.bucket");
		let mut bucket = MmapBucket::create(&path, 8, 4).unwrap();
		bucket.write(0, &[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
		bucket.write(3, &[9; 8]).unwrap();
		assert_eq!(bucket.read(0), &[1, 2, 3, 4, 5, 6, 7, 8]);
		assert_eq!(bucket.read(3), &[9; 8]);
	}

	#[test]
	fn grows_past_initial_capacity() {
		let dir = TempDir::new("grows_past_initial_capacity");
		let path = dir.0.join("b.bucket");
		let mut bucket = MmapBucket::create(&path, 4, 1).unwrap();
		bucket.write(10_000, &[7, 7, 7, 7]).unwrap();
		assert!(bucket.capacity() > 10_000);
		assert_eq!(bucket.read(10_000), &[7, 7, 7, 7]);
	}

	#[test]
	fn destroy_unlinks_file() {
		let dir = TempDir::new("destroy_unlinks_file");
		let path = dir.0.join("b.bucket");
		let bucket = MmapBucket::create(&path, 4, 1).unwrap();
		assert!(path.exists());
		bucket.destroy().unwrap();
		assert!(!path.exists());
	}
}
