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

// Top-level A* loop, wired to whichever open/closed list pairing the
// caller picked. `HashDDD` and `ExternalAStar` own their own duplicate
// detection and path reconstruction; only the in-memory tiebreaking open
// list needs a paired closed list for either (original_source/ names four
// distinct search plugins for exactly this split).

use crate::closed_list::{ClosedList, ClosedListVariant};
use crate::collaborators::{Apply, Evaluator, SuccessorGen};
use crate::error::Result;
use crate::open_list::{OpenList, OpenListVariant};
use crate::record::StateRecord;

#[derive(Debug, Default, Clone, Copy)]
pub struct SearchStatistics {
	pub expanded: u64,
	pub generated: u64,
	pub evaluated: u64,
	pub reopened: u64,
}

impl SearchStatistics {
	pub fn log(&self) {
		log::info!(
			target: "ext-search",
			"search finished: expanded={} generated={} evaluated={} reopened={}",
			self.expanded,
			self.generated,
			self.evaluated,
			self.reopened,
		);
	}
}

pub struct SearchDriver<S, A, E> {
	open: OpenListVariant,
	closed: Option<ClosedListVariant>,
	successors: S,
	apply: A,
	evaluator: E,
	stats: SearchStatistics,
}

impl<S: SuccessorGen, A: Apply, E: Evaluator> SearchDriver<S, A, E> {
	pub fn new(
		open: OpenListVariant,
		closed: Option<ClosedListVariant>,
		successors: S,
		apply: A,
		evaluator: E,
	) -> SearchDriver<S, A, E> {
		SearchDriver { open, closed, successors, apply, evaluator, stats: SearchStatistics::default() }
	}

	pub fn statistics(&self) -> SearchStatistics {
		self.stats
	}

	/// Runs A* from `root` until `is_goal` accepts an expanded state, and
	/// returns the root-to-goal operator sequence.
	pub fn search(&mut self, root: StateRecord, is_goal: impl Fn(&StateRecord) -> bool) -> Result<Vec<i32>> {
		self.open.insert(root)?;

		loop {
			let state = self.open.remove_min()?;
			self.stats.expanded += 1;

			if is_goal(&state) {
				let ops = match &self.closed {
					Some(closed) => closed.trace_path(&state)?,
					None => self.open.trace_path(&state)?,
				};
				return Ok(ops);
			}

			if let Some(closed) = &mut self.closed {
				let (found, reopened) = closed.find_insert(state.clone())?;
				if reopened {
					self.stats.reopened += 1;
				}
				if found && !reopened {
					continue;
				}
			}

			for op in self.successors.successors(&state) {
				let child = self.apply.apply(&state, op);
				self.stats.generated += 1;

				self.stats.evaluated += 1;
				if self.evaluator.eval(&child).is_none() {
					continue;
				}

				self.open.insert(child)?;
			}
		}
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::closed_list::RegularClosedList;
	use crate::open_list::InMemoryTiebreaking;
	use crate::options::Tiebreak;
	use crate::record::{NO_OPERATOR, NO_STATE};

	// A tiny unweighted chain: state value N has one successor, N+1, up to
	// GOAL. h(state) = GOAL - value, admissible and consistent.
	const GOAL: u8 = 5;

	struct ChainSuccessors;
	impl SuccessorGen for ChainSuccessors {
		fn successors(&self, state: &StateRecord) -> Vec<i32> {
			if state.packed_vars()[0] < GOAL {
				vec![0]
			} else {
				vec![]
			}
		}
	}

	struct ChainApply;
	impl Apply for ChainApply {
		fn apply(&self, state: &StateRecord, _op: i32) -> StateRecord {
			let next = state.packed_vars()[0] + 1;
			StateRecord::new(vec![next], next as u64, state.state_id(), 0, state.g() + 1, 0)
		}
	}

	struct ChainEvaluator;
	impl Evaluator for ChainEvaluator {
		fn eval(&self, state: &StateRecord) -> Option<i32> {
			Some((GOAL - state.packed_vars()[0]) as i32)
		}
	}

	#[test]
	fn finds_shortest_chain_via_in_memory_open_with_closed_list() {
		crate::test_support::with_clean_globals(|| {
			let open = OpenListVariant::InMemoryTiebreaking(InMemoryTiebreaking::new(Box::new(ChainEvaluator), Tiebreak::FOnly));
			let closed = ClosedListVariant::Regular(RegularClosedList::new(false));
			let mut driver = SearchDriver::new(open, Some(closed), ChainSuccessors, ChainApply, ChainEvaluator);

			let root = StateRecord::new(vec![0], 0, NO_STATE, NO_OPERATOR, 0, 0);
			let ops = driver.search(root, |s| s.packed_vars()[0] == GOAL).unwrap();

			assert_eq!(ops, vec![0, 0, 0, 0, 0]);
			assert_eq!(driver.statistics().expanded, (GOAL + 1) as u64);
		});
	}
}
