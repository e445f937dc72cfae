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

// Sequential, append-only, file-backed record store used by the open
// list's hash-sharded and (f,g) buckets. Unlike `MmapBucket` these files
// are scanned front-to-back or popped from the back, never indexed
// randomly, so a plain buffered file is the right tool here -- `parity-db`
// itself only reaches for `mmap` where the access pattern is actually
// random (`table.rs`), and uses plain `File` elsewhere (`log.rs`).

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::record::StateRecord;

pub struct RecordFile {
	path: PathBuf,
	file: File,
	stride: usize,
	read_pos: u64,
}

impl RecordFile {
	/// Create (or truncate) a bucket file at `path`, `O_CREAT|O_TRUNC|O_RDWR`
	/// mode 0600, per spec section 6.
	pub fn create(path: impl Into<PathBuf>, stride: usize) -> Result<RecordFile> {
		assert!(stride > 0);
		let path = path.into();
		if let Some(parent) = path.parent() {
			std::fs::create_dir_all(parent)?;
		}
		let file = open_truncated(&path)?;
		Ok(RecordFile { path, file, stride, read_pos: 0 })
	}

	pub fn len_records(&self) -> Result<u64> {
		Ok(self.file.metadata()?.len() / self.stride as u64)
	}

	pub fn is_empty(&self) -> Result<bool> {
		Ok(self.len_records()? == 0)
	}

	/// Records not yet consumed by `read_next` since the last `rewind_read`.
	pub fn remaining_records(&self) -> Result<u64> {
		let len = self.file.metadata()?.len();
		Ok((len.saturating_sub(self.read_pos)) / self.stride as u64)
	}

	pub fn append(&mut self, record: &StateRecord) -> Result<()> {
		self.file.seek(SeekFrom::End(0))?;
		let mut buf = vec![0u8; self.stride];
		record.write(&mut buf);
		self.file.write_all(&buf)?;
		Ok(())
	}

	/// Pop the last record written: seek back one stride, read it, then
	/// truncate the file to drop it. Backs the LIFO `recursive` bucket.
	pub fn pop_last(&mut self) -> Result<Option<StateRecord>> {
		let len = self.file.metadata()?.len();
		if len < self.stride as u64 {
			return Ok(None);
		}
		let offset = len - self.stride as u64;
		self.file.seek(SeekFrom::Start(offset))?;
		let mut buf = vec![0u8; self.stride];
		self.file.read_exact(&mut buf)?;
		self.file.set_len(offset)?;
		Ok(Some(StateRecord::read(&buf, self.stride - crate::record::header_size())))
	}

	/// Read the next not-yet-consumed record, advancing the read cursor.
	/// `None` at end of file. The cursor persists across calls so a caller
	/// can resume a partial scan (spec section 4.3's per-shard `open` scan).
	pub fn read_next(&mut self) -> Result<Option<StateRecord>> {
		self.file.seek(SeekFrom::Start(self.read_pos))?;
		let mut buf = vec![0u8; self.stride];
		match self.file.read_exact(&mut buf) {
			Ok(()) => {
				self.read_pos += self.stride as u64;
				Ok(Some(StateRecord::read(&buf, self.stride - crate::record::header_size())))
			}
			Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
			Err(e) => Err(e.into()),
		}
	}

	pub fn rewind_read(&mut self) {
		self.read_pos = 0;
	}

	/// Read every record currently stored, ignoring the read cursor.
	pub fn read_all(&mut self) -> Result<Vec<StateRecord>> {
		self.file.seek(SeekFrom::Start(0))?;
		let mut bytes = Vec::new();
		self.file.read_to_end(&mut bytes)?;
		let packed_len = self.stride - crate::record::header_size();
		Ok(bytes.chunks_exact(self.stride).map(|c| StateRecord::read(c, packed_len)).collect())
	}

	/// Truncate to empty, keeping the file and path, and reset the read
	/// cursor.
	pub fn clear(&mut self) -> Result<()> {
		self.file.set_len(0)?;
		self.read_pos = 0;
		Ok(())
	}

	/// Close and unlink the backing file. Idempotent.
	pub fn destroy(self) -> Result<()> {
		let path = self.path.clone();
		drop(self);
		let _ = std::fs::remove_file(&path);
		Ok(())
	}
}

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
	use crate::record::{NO_OPERATOR, NO_STATE};

	struct TempDir(PathBuf);
	impl TempDir {
		fn new(name: &'static str) -> TempDir {
			let mut path = std::env::temp_dir();
			path.push("ext-search-test");
			path.push("record_file");
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

	fn rec(vars: &[u8], id: u64) -> StateRecord {
		StateRecord::new(vars.to_vec(), id, NO_STATE, NO_OPERATOR, 0, 0)
	}

	#[test]
	fn append_then_read_all_preserves_order() {
		crate::test_support::with_clean_globals(|| {
			let dir = TempDir::new("append_then_read_all_preserves_order");
			let stride = rec(&[0], 0).size_in_bytes();
			let mut f = RecordFile::create(dir.0.join("a.bucket"), stride).unwrap();
			f.append(&rec(&[1], 0)).unwrap();
			f.append(&rec(&[2], 1)).unwrap();
			let all = f.read_all().unwrap();
			assert_eq!(all.len(), 2);
			assert_eq!(all[0].packed_vars(), &[1]);
			assert_eq!(all[1].packed_vars(), &[2]);
		});
	}

	#[test]
	fn pop_last_is_lifo() {
		crate::test_support::with_clean_globals(|| {
			let dir = TempDir::new("pop_last_is_lifo");
			let stride = rec(&[0], 0).size_in_bytes();
			let mut f = RecordFile::create(dir.0.join("r.bucket"), stride).unwrap();
			f.append(&rec(&[1], 0)).unwrap();
			f.append(&rec(&[2], 1)).unwrap();
			assert_eq!(f.pop_last().unwrap().unwrap().packed_vars(), &[2]);
			assert_eq!(f.pop_last().unwrap().unwrap().packed_vars(), &[1]);
			assert!(f.pop_last().unwrap().is_none());
		});
	}

	#[test]
	fn read_next_persists_cursor_across_calls() {
		crate::test_support::with_clean_globals(|| {
			let dir = TempDir::new("read_next_persists_cursor_across_calls");
			let stride = rec(&[0], 0).size_in_bytes();
			let mut f = RecordFile::create(dir.0.join("n.bucket"), stride).unwrap();
			f.append(&rec(&[1], 0)).unwrap();
			f.append(&rec(&[2], 1)).unwrap();
			assert_eq!(f.remaining_records().unwrap(), 2);
			assert_eq!(f.read_next().unwrap().unwrap().packed_vars(), &[1]);
			assert_eq!(f.remaining_records().unwrap(), 1);
			assert_eq!(f.read_next().unwrap().unwrap().packed_vars(), &[2]);
			assert!(f.read_next().unwrap().is_none());
			f.rewind_read();
			assert_eq!(f.remaining_records().unwrap(), 2);
		});
	}

	#[test]
	fn clear_truncates_and_resets_cursor() {
		crate::test_support::with_clean_globals(|| {
			let dir = TempDir::new("clear_truncates_and_resets_cursor");
			let stride = rec(&[0], 0).size_in_bytes();
			let mut f = RecordFile::create(dir.0.join("c.bucket"), stride).unwrap();
			f.append(&rec(&[1], 0)).unwrap();
			f.clear().unwrap();
			assert!(f.is_empty().unwrap());
			assert!(f.read_next().unwrap().is_none());
		});
	}
}
