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

// Thin collaborator interfaces the engine consumes. State-variable packing,
// successor generation, operator application, and heuristic evaluation are
// all external to this crate (spec section 6) -- only the traits live here.

use crate::record::StateRecord;

pub trait SuccessorGen {
	/// Operator ids applicable in `state`, in the order they should be tried.
	fn successors(&self, state: &StateRecord) -> Vec<i32>;
}

pub trait Apply {
	/// Pure application of `op` to `state`: the result carries an updated
	/// `g`, `parent_hash`, ids, and `packed_vars`.
	fn apply(&self, state: &StateRecord, op: i32) -> StateRecord;
}

pub trait Evaluator {
	/// Heuristic value for `state`, or `None` for a dead end (`h = ∞`).
	fn eval(&self, state: &StateRecord) -> Option<i32>;
}

pub trait StatePacker {
	/// Domain size of each packed variable, in declaration order.
	fn schema(&self) -> &[u32];

	/// Value of variable `var_idx` as packed into `bytes`.
	fn get(&self, bytes: &[u8], var_idx: usize) -> u32;
}
