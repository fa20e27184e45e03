//! Hex digests declared by the charm store.
//!
//! Archives are verified with SHA-384. SHA-256 only shows up in batch
//! revision lookups.

use std::fmt;
use std::io::Read;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha384};

macro_rules! hex_digest {
    ($(#[$meta:meta])* $name:ident, $algo:ty) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a hex digest as declared by the store. Not validated.
            ///
            /// Lowercased so that comparisons ignore case.
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into().to_ascii_lowercase())
            }

            /// Digest of an in-memory buffer.
            pub fn compute(data: &[u8]) -> Self {
                Self(hex::encode(<$algo>::digest(data)))
            }

            /// The lowercase hex string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

hex_digest!(
    /// SHA-384 of a charm archive (96 hex characters).
    ///
    /// Declared in the `hash` metadata and the `Content-Sha384` header. Used
    /// to verify downloads and to validate cached archives.
    Sha384Hash,
    Sha384
);

hex_digest!(
    /// SHA-256 of a charm archive (64 hex characters), from `hash256` metadata.
    Sha256Hash,
    Sha256
);

impl Sha384Hash {
    /// Digest of everything readable from `reader`, read in 64KB chunks.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if reading fails part way through.
    pub fn compute_reader(mut reader: impl Read) -> std::io::Result<Self> {
        let mut hasher = Sha384::new();
        let mut buffer = [0u8; 65536];
        loop {
            let n = reader.read(&mut buffer)?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
        }
        Ok(Self(hex::encode(hasher.finalize())))
    }
}
