//! Content verification for downloaded and cached archives.
//!
//! Every archive the store serves carries a declared SHA-384. The client
//! feeds each downloaded chunk to a [`Verifier`] as it arrives, so a
//! mismatch is reported before anything touches the cache.

use std::fs::File;
use std::io;
use std::path::Path;

use charm_schema::Sha384Hash;
use sha2::{Digest, Sha384};

use crate::error::{RepoError, Result};

/// Incremental SHA-384 check against a declared hash.
#[derive(Debug)]
pub struct Verifier {
    expected: Sha384Hash,
    hasher: Sha384,
}

impl Verifier {
    /// Start verifying a stream expected to hash to `expected`.
    pub fn new(expected: Sha384Hash) -> Self {
        Self {
            expected,
            hasher: Sha384::new(),
        }
    }

    /// Feed the next chunk of data.
    pub fn update(&mut self, chunk: &[u8]) {
        self.hasher.update(chunk);
    }

    /// Finish hashing and compare.
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::HashMismatch`] when the digests differ.
    pub fn finish(self) -> Result<Sha384Hash> {
        let actual = Sha384Hash::new(hex::encode(self.hasher.finalize()));
        if actual != self.expected {
            return Err(RepoError::HashMismatch {
                expected: self.expected,
                actual,
            });
        }
        Ok(actual)
    }
}

/// Check an in-memory buffer against a declared hash.
///
/// # Errors
///
/// Returns [`RepoError::HashMismatch`] when the digests differ.
pub fn verify(data: &[u8], expected: &Sha384Hash) -> Result<()> {
    let mut verifier = Verifier::new(expected.clone());
    verifier.update(data);
    verifier.finish().map(|_| ())
}

/// Hash a file on disk without loading it whole.
pub fn hash_file(path: &Path) -> io::Result<Sha384Hash> {
    Sha384Hash::compute_reader(File::open(path)?)
}
