//! Affine hash families over a prime field.
//!
//! Every hash function here has the form \(h(x) = (a \cdot x + b) \bmod p\) with `p` prime
//! and `0 <= a, b < p`. A [`HashFamily`] is `k` such functions with pairwise-distinct
//! coefficient pairs, drawn from a seeded RNG so that a family is reproducible.
//!
//! The same family type serves two roles:
//! - term hashing for MinHash, over a prime at least as large as the term universe
//! - band hashing for LSH, over a prime sized from the document count

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{Error, Result};

/// Smallest modulus used for term hashing, regardless of corpus size.
pub const MIN_TERM_MODULUS: u64 = 1 << 16;

/// A single affine hash function `(a·x + b) mod p`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HashFunction {
    a: u64,
    b: u64,
    p: u64,
}

impl HashFunction {
    /// Create a hash function, checking `p` is prime and `a, b < p`.
    pub fn new(a: u64, b: u64, p: u64) -> Result<Self> {
        if !is_prime(p) {
            return Err(Error::invalid(format!("modulus {p} is not prime")));
        }
        if a >= p || b >= p {
            return Err(Error::invalid(format!(
                "coefficients ({a}, {b}) must be below the modulus {p}"
            )));
        }
        Ok(Self { a, b, p })
    }

    /// Multiplicative coefficient.
    pub fn a(&self) -> u64 {
        self.a
    }

    /// Additive coefficient.
    pub fn b(&self) -> u64 {
        self.b
    }

    /// Prime modulus.
    pub fn modulus(&self) -> u64 {
        self.p
    }

    /// Apply the function to a single integer.
    pub fn apply(&self, x: u64) -> u64 {
        ((self.a as u128 * x as u128 + self.b as u128) % self.p as u128) as u64
    }

    /// Rolling hash of a token: for each char `c`, `h = (a + b·(h XOR c)) mod p`.
    ///
    /// The result is always `< p`.
    pub fn hash_token(&self, token: &str) -> u64 {
        let p = self.p as u128;
        let mut h = 0u64;
        for c in token.chars() {
            let x = (h ^ c as u64) as u128;
            h = ((self.a as u128 + self.b as u128 * x) % p) as u64;
        }
        h
    }

    /// One step of the band accumulator: `(acc + a·value + b) mod p`.
    pub fn accumulate(&self, acc: u64, value: u64) -> u64 {
        let p = self.p as u128;
        let term = (self.a as u128 * value as u128 + self.b as u128) % p;
        ((acc as u128 + term) % p) as u64
    }
}

/// `k` affine hash functions sharing one prime modulus, with distinct `(a, b)` pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashFamily {
    functions: Vec<HashFunction>,
    modulus: u64,
}

impl HashFamily {
    /// Draw `k` functions modulo `p` from an RNG seeded with `seed`.
    ///
    /// Fails if `p` is not prime, `k == 0`, or `k` exceeds the `p²` available pairs.
    pub fn generate(k: usize, p: u64, seed: u64) -> Result<Self> {
        if !is_prime(p) {
            return Err(Error::invalid(format!("modulus {p} is not prime")));
        }
        if k == 0 {
            return Err(Error::invalid("hash family size must be >= 1"));
        }
        let available = p as u128 * p as u128;
        if k as u128 > available {
            return Err(Error::invalid(format!(
                "cannot draw {k} distinct coefficient pairs modulo {p} ({available} available)"
            )));
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let mut seen: HashSet<(u64, u64)> = HashSet::with_capacity(k);
        let mut functions = Vec::with_capacity(k);
        while functions.len() < k {
            let a = rng.gen_range(0..p);
            let b = rng.gen_range(0..p);
            if seen.insert((a, b)) {
                functions.push(HashFunction { a, b, p });
            }
        }

        tracing::debug!(k, modulus = p, seed, "generated hash family");
        Ok(Self {
            functions,
            modulus: p,
        })
    }

    /// Number of functions (`k`).
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// True if the family has no functions. Never true for a generated family.
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Shared prime modulus.
    pub fn modulus(&self) -> u64 {
        self.modulus
    }

    /// The functions in draw order.
    pub fn functions(&self) -> &[HashFunction] {
        &self.functions
    }

    /// Function at position `i`.
    pub fn get(&self, i: usize) -> Option<&HashFunction> {
        self.functions.get(i)
    }
}

/// Primality by 6k±1 trial division.
pub fn is_prime(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    if n < 4 {
        return true;
    }
    if n % 2 == 0 || n % 3 == 0 {
        return false;
    }
    let mut i = 5u64;
    while (i as u128) * (i as u128) <= n as u128 {
        if n % i == 0 || n % (i + 2) == 0 {
            return false;
        }
        i += 6;
    }
    true
}

/// Smallest prime strictly greater than `n`, or `None` if it does not fit in a `u64`.
pub fn next_prime(n: u64) -> Option<u64> {
    let mut m = n.checked_add(1)?;
    while !is_prime(m) {
        m = m.checked_add(1)?;
    }
    Some(m)
}

/// Modulus for hashing a term universe of `distinct_terms` terms.
pub fn term_modulus(distinct_terms: usize) -> Result<u64> {
    let floor = (distinct_terms as u64).max(MIN_TERM_MODULUS);
    next_prime(floor).ok_or_else(|| Error::invalid("term universe too large for a u64 modulus"))
}

/// Modulus for the LSH bucket table over `num_docs` documents: `next_prime(5·n)`.
pub fn table_modulus(num_docs: usize) -> Result<u64> {
    (num_docs as u64)
        .checked_mul(5)
        .and_then(next_prime)
        .ok_or_else(|| Error::invalid("document count too large for a u64 table modulus"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_primes() {
        let primes: Vec<u64> = (0..30).filter(|&n| is_prime(n)).collect();
        assert_eq!(primes, vec![2, 3, 5, 7, 11, 13, 17, 19, 23, 29]);
        assert!(is_prime(65_537));
        assert!(!is_prime(65_536));
        assert!(!is_prime(25));
        assert!(!is_prime(49));
    }

    #[test]
    fn next_prime_is_strictly_greater() {
        assert_eq!(next_prime(0), Some(2));
        assert_eq!(next_prime(2), Some(3));
        assert_eq!(next_prime(7), Some(11));
        assert_eq!(next_prime(10), Some(11));
        assert_eq!(next_prime(u64::MAX), None);
    }

    #[test]
    fn table_modulus_is_next_prime_of_five_n() {
        assert_eq!(table_modulus(0).unwrap(), 2);
        assert_eq!(table_modulus(2).unwrap(), 11);
        assert_eq!(table_modulus(20).unwrap(), 101);
    }

    #[test]
    fn term_modulus_has_floor() {
        assert_eq!(term_modulus(3).unwrap(), 65_537);
        assert!(term_modulus(100_000).unwrap() > 100_000);
    }

    #[test]
    fn family_is_deterministic_for_seed() {
        let f1 = HashFamily::generate(64, 65_537, 7).unwrap();
        let f2 = HashFamily::generate(64, 65_537, 7).unwrap();
        let f3 = HashFamily::generate(64, 65_537, 8).unwrap();
        assert_eq!(f1, f2);
        assert_ne!(f1, f3);
        assert_eq!(f1.len(), 64);
        assert_eq!(f1.modulus(), 65_537);
    }

    #[test]
    fn family_pairs_are_distinct_and_in_range() {
        // 5² = 25 pairs available; ask for all of them.
        let fam = HashFamily::generate(25, 5, 1).unwrap();
        let pairs: HashSet<(u64, u64)> = fam.functions().iter().map(|f| (f.a(), f.b())).collect();
        assert_eq!(pairs.len(), 25);
        assert!(fam.functions().iter().all(|f| f.a() < 5 && f.b() < 5));
    }

    #[test]
    fn family_rejects_bad_parameters() {
        assert!(matches!(
            HashFamily::generate(4, 10, 0),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            HashFamily::generate(0, 11, 0),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            HashFamily::generate(26, 5, 0),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn hash_function_arithmetic() {
        let h = HashFunction::new(3, 4, 7).unwrap();
        // (6 + 4) mod 7
        assert_eq!(h.apply(2), 3);
        // (1 + 10) mod 7
        assert_eq!(h.accumulate(1, 2), 4);
        // 'a' = 97: (3 + 4·97) mod 7 = 391 mod 7 = 6
        assert_eq!(h.hash_token("a"), 6);
        assert_eq!(h.hash_token(""), 0);
        assert!(HashFunction::new(7, 0, 7).is_err());
        assert!(HashFunction::new(1, 1, 8).is_err());
    }

    #[test]
    fn arithmetic_does_not_overflow_near_u64_max() {
        // Largest prime below 2^64.
        let p = 18_446_744_073_709_551_557u64;
        let h = HashFunction {
            a: p - 1,
            b: p - 2,
            p,
        };
        assert!(h.apply(u64::MAX) < p);
        assert!(h.accumulate(p - 1, u64::MAX) < p);
        assert!(h.hash_token("overflow") < p);
    }
}
