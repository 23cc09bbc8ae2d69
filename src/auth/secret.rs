//! Configured secrets.
//!
//! A secret is classified exactly once, when configuration loads. Anything
//! carrying a bcrypt prefix (`$2a$`, `$2b$`, `$2x$`, `$2y$`) must be a
//! well-formed bcrypt hash; everything else is plaintext.
//!
//! # Hash layout
//! ```text
//! $2a$04$Q.CgCP2Sl9pkcTXEZHazaeMwPaAkSHk7AI51HkyMt5iJQQyUA4qxq
//! └┬─┘└┬┘└──────────────────────┬──────────────────────────┘
//! prefix cost     22 chars salt + 31 chars digest (bcrypt base64)
//! ```

use std::fmt;

use subtle::ConstantTimeEq;
use thiserror::Error;

const BCRYPT_MIN_COST: u32 = 4;
const BCRYPT_MAX_COST: u32 = 31;
/// Salt plus digest, in bcrypt's base64 alphabet.
const BCRYPT_ENCODED_LEN: usize = 53;
/// `$2a$` + two cost digits + `$`.
const BCRYPT_HEADER_LEN: usize = 7;

/// Error raised for a secret that claims to be a hash but is not one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SecretError {
    #[error("bcrypt hash is missing its cost field")]
    MissingCost,

    #[error("bcrypt cost field '{0}' is not a two-digit number")]
    InvalidCost(String),

    #[error("bcrypt cost {0} is outside the supported range 4..=31")]
    CostOutOfRange(u32),

    #[error("bcrypt salt and digest must be 53 characters, found {0}")]
    DigestLength(usize),

    #[error("bcrypt salt and digest contain characters outside the bcrypt alphabet")]
    DigestAlphabet,
}

/// Hash algorithm tag carried by a hashed secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Bcrypt2a,
    Bcrypt2b,
    Bcrypt2x,
    Bcrypt2y,
}

impl HashAlgorithm {
    const ALL: [HashAlgorithm; 4] = [
        HashAlgorithm::Bcrypt2a,
        HashAlgorithm::Bcrypt2b,
        HashAlgorithm::Bcrypt2x,
        HashAlgorithm::Bcrypt2y,
    ];

    /// Prefix identifying this algorithm in an encoded hash.
    pub fn prefix(self) -> &'static str {
        match self {
            HashAlgorithm::Bcrypt2a => "$2a$",
            HashAlgorithm::Bcrypt2b => "$2b$",
            HashAlgorithm::Bcrypt2x => "$2x$",
            HashAlgorithm::Bcrypt2y => "$2y$",
        }
    }

    fn detect(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|alg| raw.starts_with(alg.prefix()))
    }
}

/// A pre-hashed secret with its algorithm and cost already extracted.
#[derive(Clone, PartialEq, Eq)]
pub struct HashedSecret {
    algorithm: HashAlgorithm,
    cost: u32,
    encoded: String,
}

impl HashedSecret {
    fn parse(raw: &str, algorithm: HashAlgorithm) -> Result<Self, SecretError> {
        let rest = &raw[algorithm.prefix().len()..];
        let (cost, digest) = rest.split_once('$').ok_or(SecretError::MissingCost)?;

        if cost.len() != 2 || !cost.bytes().all(|b| b.is_ascii_digit()) {
            return Err(SecretError::InvalidCost(cost.to_string()));
        }
        let cost: u32 = cost
            .parse()
            .map_err(|_| SecretError::InvalidCost(cost.to_string()))?;
        if !(BCRYPT_MIN_COST..=BCRYPT_MAX_COST).contains(&cost) {
            return Err(SecretError::CostOutOfRange(cost));
        }

        if digest.len() != BCRYPT_ENCODED_LEN {
            return Err(SecretError::DigestLength(digest.len()));
        }
        if !digest.bytes().all(is_bcrypt_base64) {
            return Err(SecretError::DigestAlphabet);
        }

        Ok(Self {
            algorithm,
            cost,
            encoded: raw.to_string(),
        })
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Salt and digest, without the algorithm/cost header.
    pub fn digest(&self) -> &str {
        &self.encoded[BCRYPT_HEADER_LEN..]
    }

    /// Hash `presented` with the stored salt and cost and compare.
    ///
    /// Presenting the encoded hash itself never matches: it is hashed like
    /// any other input.
    fn matches(&self, presented: &str) -> bool {
        match bcrypt::verify(presented, &self.encoded) {
            Ok(matched) => matched,
            Err(e) => {
                tracing::warn!(error = %e, "bcrypt verification failed");
                false
            }
        }
    }
}

fn is_bcrypt_base64(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'.' || b == b'/'
}

/// A configured secret: a token or a password.
#[derive(Clone, PartialEq, Eq)]
pub enum Secret {
    Plaintext(String),
    Hashed(HashedSecret),
}

impl Secret {
    /// Classify a raw configured value.
    ///
    /// # Errors
    ///
    /// Returns a [`SecretError`] if the value carries a bcrypt prefix but is
    /// not a valid bcrypt hash.
    pub fn parse(raw: &str) -> Result<Self, SecretError> {
        match HashAlgorithm::detect(raw) {
            Some(algorithm) => HashedSecret::parse(raw, algorithm).map(Secret::Hashed),
            None => Ok(Secret::Plaintext(raw.to_string())),
        }
    }

    pub fn is_hashed(&self) -> bool {
        matches!(self, Secret::Hashed(_))
    }

    /// Check a presented credential against this secret.
    pub fn verify(&self, presented: &str) -> bool {
        match self {
            Secret::Plaintext(expected) => expected.as_bytes().ct_eq(presented.as_bytes()).into(),
            Secret::Hashed(hash) => hash.matches(presented),
        }
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Secret::Plaintext(_) => write!(f, "Secret::Plaintext([REDACTED])"),
            Secret::Hashed(hash) => write!(
                f,
                "Secret::Hashed({:?}, cost={})",
                hash.algorithm, hash.cost
            ),
        }
    }
}

impl fmt::Debug for HashedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashedSecret")
            .field("algorithm", &self.algorithm)
            .field("cost", &self.cost)
            .finish_non_exhaustive()
    }
}
