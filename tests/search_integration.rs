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

// End-to-end coverage of the "concrete end-to-end scenarios" driving
// SearchDriver with each open-list strategy in turn, over a tiny
// diamond-shaped grid graph with a unit-cost consistent heuristic:
//
//     s0(0,0) -> s1(1,0) -> s3(2,0) -> goal(3,0)
//       \-----> s2(0,1) -----/
//
// Both s1 and s2 generate s3 with equal g, so every variant must
// deduplicate it before the goal is reached.

use ext_search_core::closed_list::{ClosedListVariant, RegularClosedList};
use ext_search_core::collaborators::{Apply, Evaluator, SuccessorGen};
use ext_search_core::open_list::{ExternalAStarOpenList, HashDDDOpenList, InMemoryTiebreaking, OpenListVariant};
use ext_search_core::options::{OpenListOptions, Tiebreak};
use ext_search_core::record::{StateRecord, NO_OPERATOR, NO_STATE};
use ext_search_core::search::SearchDriver;

// Packed state is [x, y]. Operators: 0 = move +x, 1 = move +y.
const GOAL_X: u8 = 3;
const GOAL_Y: u8 = 0;

struct GridSuccessors;
impl SuccessorGen for GridSuccessors {
	fn successors(&self, state: &StateRecord) -> Vec<i32> {
		let v = state.packed_vars();
		let (x, y) = (v[0], v[1]);
		match (x, y) {
			(0, 0) => vec![0, 1],
			(1, 0) => vec![0],
			(0, 1) => vec![2], // diagonal shortcut straight to s3's column
			(2, 0) => vec![0],
			_ => vec![],
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

struct GridApply;
impl Apply for GridApply {
	fn apply(&self, state: &StateRecord, op: i32) -> StateRecord {
		let v = state.packed_vars();
		let (x, y) = (v[0], v[1]);
		let (nx, ny, id) = match (x, y, op) {
			(0, 0, 0) => (1, 0, 1u64),
			(0, 0, 1) => (0, 1, 2u64),
			(1, 0, 0) => (2, 0, 3u64),
			(0, 1, 2) => (2, 0, 3u64),
			(2, 0, 0) => (3, 0, 4u64),
			_ => unreachable!(),
		};
		let parent_hash = fnv1a(state.packed_vars());
		StateRecord::new(vec![nx, ny], id, state.state_id(), op, state.g() + 1, parent_hash)
	}
}

struct ManhattanHeuristic;
impl Evaluator for ManhattanHeuristic {
	fn eval(&self, state: &StateRecord) -> Option<i32> {
		let v = state.packed_vars();
		let dx = (GOAL_X as i32 - v[0] as i32).abs();
		let dy = (GOAL_Y as i32 - v[1] as i32).abs();
		Some(dx + dy)
	}
}

fn root() -> StateRecord {
	StateRecord::new(vec![0, 0], 0, NO_STATE, NO_OPERATOR, 0, 0)
}

fn is_goal(state: &StateRecord) -> bool {
	let v = state.packed_vars();
	v[0] == GOAL_X && v[1] == GOAL_Y
}

fn scratch_dir(name: &str) -> std::path::PathBuf {
	let mut dir = std::env::temp_dir();
	dir.push("ext-search-test");
	dir.push("search_integration");
	dir.push(name);
	let _ = std::fs::remove_dir_all(&dir);
	std::fs::create_dir_all(&dir).unwrap();
	dir
}

#[test]
fn in_memory_tiebreaking_with_regular_closed_list_dedups_diamond() {
	let _ = env_logger::try_init();
	let open = OpenListVariant::InMemoryTiebreaking(InMemoryTiebreaking::new(Box::new(ManhattanHeuristic), Tiebreak::FOnly));
	let closed = ClosedListVariant::Regular(RegularClosedList::new(false));
	let mut driver = SearchDriver::new(open, Some(closed), GridSuccessors, GridApply, ManhattanHeuristic);

	let ops = driver.search(root(), is_goal).unwrap();
	assert_eq!(ops.len(), 3);
	assert_eq!(driver.statistics().expanded, 4); // s0, and whichever of {s1,s2} reaches s3 first, s3, goal
}

#[test]
fn hash_ddd_open_list_dedups_diamond_without_closed_list() {
	let _ = env_logger::try_init();
	let dir = scratch_dir("hash_ddd_dedups_diamond");
	let opts = OpenListOptions { shards: 4, ..OpenListOptions::default() };
	let hash_fn: Box<dyn Fn(&[u8]) -> u64 + Send> = Box::new(fnv1a);
	let open = OpenListVariant::HashDDD(HashDDDOpenList::new(dir, &opts, hash_fn, Box::new(ManhattanHeuristic)).unwrap());
	let mut driver = SearchDriver::new(open, None, GridSuccessors, GridApply, ManhattanHeuristic);

	let ops = driver.search(root(), is_goal).unwrap();
	assert_eq!(ops.len(), 3);
}

#[test]
fn external_astar_open_list_dedups_diamond_without_closed_list() {
	let _ = env_logger::try_init();
	let dir = scratch_dir("external_astar_dedups_diamond");
	let opts = OpenListOptions::default();
	let open =
		OpenListVariant::ExternalAStar(ExternalAStarOpenList::new(dir, &opts, Box::new(ManhattanHeuristic)).unwrap());
	let mut driver = SearchDriver::new(open, None, GridSuccessors, GridApply, ManhattanHeuristic);

	let ops = driver.search(root(), is_goal).unwrap();
	assert_eq!(ops.len(), 3);
}
