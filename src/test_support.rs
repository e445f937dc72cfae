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

// `record::PACKED_LEN` and `hash::TABLE` are process-wide by design (spec
// section 9). `cargo test` runs a crate's unit tests in one process across
// many threads, so any test that fixes a schema must hold this lock for its
// whole body and reset both globals on the way out.

#![cfg(test)]

use std::sync::Mutex;

pub(crate) static GLOBAL_STATE_LOCK: Mutex<()> = Mutex::new(());

pub(crate) fn with_clean_globals<F: FnOnce()>(f: F) {
	let _ = env_logger::try_init();
	let _guard = GLOBAL_STATE_LOCK.lock().unwrap_or_else(|e| e.into_inner());
	crate::record::reset_packed_len_for_test();
	crate::hash::reset_table_for_test();
	f();
	crate::record::reset_packed_len_for_test();
	crate::hash::reset_table_for_test();
}
