//! Sorted set with Redis ordering rules: by score, then by member.

use std::collections::{BTreeSet, HashMap};

use kments::counter_adapter::{ScoreBound, ScoredMember};

#[derive(Debug, Default)]
pub(crate) struct ZSet {
	scores: HashMap<Box<str>, i64>,
	ordered: BTreeSet<(i64, Box<str>)>,
}

impl ZSet {
	pub fn len(&self) -> usize {
		self.ordered.len()
	}

	pub fn is_empty(&self) -> bool {
		self.ordered.is_empty()
	}

	/// Returns true if the member is new. Existing members get the new score.
	pub fn add(&mut self, score: i64, member: &str) -> bool {
		match self.scores.insert(member.into(), score) {
			Some(old) => {
				self.ordered.remove(&(old, member.into()));
				self.ordered.insert((score, member.into()));
				false
			}
			None => {
				self.ordered.insert((score, member.into()));
				true
			}
		}
	}

	pub fn remove(&mut self, member: &str) -> bool {
		match self.scores.remove(member) {
			Some(score) => self.ordered.remove(&(score, member.into())),
			None => false,
		}
	}

	pub fn remove_range_by_score(&mut self, min: ScoreBound, max: ScoreBound) -> usize {
		let doomed: Vec<(i64, Box<str>)> = self
			.ordered
			.iter()
			.filter(|(score, _)| min.admits_from_below(*score) && max.admits_from_above(*score))
			.cloned()
			.collect();
		for (_, member) in &doomed {
			self.remove(member);
		}
		doomed.len()
	}

	/// Removes ascending ranks `start..=stop`, negative ranks count from the end
	pub fn remove_range_by_rank(&mut self, start: i64, stop: i64) -> usize {
		let Some((start, stop)) = normalize_range(start, stop, self.len()) else {
			return 0;
		};
		let doomed: Vec<Box<str>> =
			self.ordered.iter().skip(start).take(stop - start + 1).map(|(_, m)| m.clone()).collect();
		for member in &doomed {
			self.remove(member);
		}
		doomed.len()
	}

	/// Descending ranks `start..=stop` with scores
	pub fn rev_range(&self, start: i64, stop: i64) -> Vec<ScoredMember> {
		let Some((start, stop)) = normalize_range(start, stop, self.len()) else {
			return Vec::new();
		};
		self.ordered
			.iter()
			.rev()
			.skip(start)
			.take(stop - start + 1)
			.map(|(score, member)| ScoredMember { member: member.clone(), score: *score })
			.collect()
	}
}

fn normalize_range(start: i64, stop: i64, len: usize) -> Option<(usize, usize)> {
	let len = len as i64;
	let start = if start < 0 { (start + len).max(0) } else { start };
	let stop = if stop < 0 { stop + len } else { stop.min(len - 1) };
	if len == 0 || start > stop || start >= len {
		return None;
	}
	Some((start as usize, stop as usize))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn members(set: &ZSet) -> Vec<String> {
		set.rev_range(0, -1).into_iter().map(|sm| sm.member.to_string()).collect()
	}

	#[test]
	fn test_rank_ranges() {
		let mut set = ZSet::default();
		for i in 1..=5 {
			set.add(i, &format!("m{}", i));
		}
		assert_eq!(members(&set), vec!["m5", "m4", "m3", "m2", "m1"]);
		assert_eq!(set.rev_range(0, 1).len(), 2);
		assert!(set.rev_range(7, 9).is_empty());

		// keep the 3 highest
		assert_eq!(set.remove_range_by_rank(0, -4), 2);
		assert_eq!(members(&set), vec!["m5", "m4", "m3"]);
		assert_eq!(set.remove_range_by_rank(0, -4), 0);
	}

	#[test]
	fn test_score_ranges() {
		let mut set = ZSet::default();
		for i in [0, 500, 1000] {
			set.add(i, &i.to_string());
		}
		assert_eq!(set.remove_range_by_score(ScoreBound::NegInf, ScoreBound::Exclusive(500)), 1);
		assert_eq!(set.remove_range_by_score(ScoreBound::NegInf, ScoreBound::Inclusive(500)), 1);
		assert_eq!(set.len(), 1);
		assert_eq!(set.remove_range_by_score(ScoreBound::NegInf, ScoreBound::PosInf), 1);
		assert!(set.is_empty());
	}

	#[test]
	fn test_rescore_and_ties() {
		let mut set = ZSet::default();
		assert!(set.add(10, "b"));
		assert!(set.add(10, "a"));
		assert!(!set.add(5, "b"));
		assert_eq!(members(&set), vec!["a", "b"]);
		assert!(set.remove("a"));
		assert!(!set.remove("a"));
	}
}

// vim: ts=4
