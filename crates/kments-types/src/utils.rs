//! Utility functions

use rand::RngExt;
use sha2::{Digest, Sha256};

use crate::prelude::*;

pub const TIE_BREAKER_LENGTH: usize = 8;
pub const SAFE: [char; 62] = [
	'0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i',
	'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z', 'A', 'B',
	'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R', 'S', 'T', 'U',
	'V', 'W', 'X', 'Y', 'Z',
];

/// Random alphanumeric string of `len` characters
pub fn random_id(len: usize) -> String {
	let mut rng = rand::rng();
	let mut result = String::with_capacity(len);

	for _ in 0..len {
		result.push(SAFE[rng.random_range(0..SAFE.len())]);
	}
	result
}

/// Derive the stable page id of a page pathname.
///
/// The query string and fragment are ignored, trailing slashes are trimmed
/// so `/post/1/` and `/post/1` share one comment partition.
pub fn page_id(pathname: &str) -> ClResult<PageId> {
	let path = pathname.split(['?', '#']).next().unwrap_or(pathname);
	let path = path.trim().trim_end_matches('/');
	let path = if path.is_empty() { "/" } else { path };

	let digest = Sha256::digest(path.as_bytes());
	let hex: String = digest.iter().take(16).map(|b| format!("{:02x}", b)).collect();
	PageId::new(&hex)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_random_id() {
		let a = random_id(TIE_BREAKER_LENGTH);
		let b = random_id(TIE_BREAKER_LENGTH);
		assert_eq!(a.len(), TIE_BREAKER_LENGTH);
		assert!(a.chars().all(|c| SAFE.contains(&c)));
		assert_ne!(a, b);
	}

	#[test]
	fn test_page_id_is_stable() {
		let a = page_id("/posts/hello/").unwrap();
		let b = page_id("/posts/hello?utm=1#comments").unwrap();
		assert_eq!(a, b);
		assert_eq!(a.as_str().len(), 32);
		assert_ne!(a, page_id("/posts/other").unwrap());
	}

	#[test]
	fn test_page_id_root() {
		assert_eq!(page_id("").unwrap(), page_id("/").unwrap());
	}
}

// vim: ts=4
