use num::Integer;
use num_bigint::BigInt;
use num_traits::{One, Signed, Zero};

/// Greatest common divisor of `|a|` and `|b|`, zero only when both are zero.
pub fn euclidean_gcd(a: &BigInt, b: &BigInt) -> BigInt {
    let (mut a, mut b) = (a.abs(), b.abs());
    if a < b { std::mem::swap(&mut a, &mut b); }
    // a is the dividend from here on
    while !b.is_zero() {
        let r = a.mod_floor(&b);
        a = b;
        b = r;
    }
    a
}

/// Returns `(gcd, s, t)` with `|a| * s + |b| * t == gcd`.
///
/// Both inputs are normalized to their absolute value first, so callers that
/// need coefficients for signed inputs have to flip the sign of `s`/`t` back.
pub fn extended_euclidean(a: &BigInt, b: &BigInt) -> (BigInt, BigInt, BigInt) {
    let (mut a, mut b) = (a.abs(), b.abs());
    let (mut s, mut s1) = (BigInt::one(), BigInt::zero());
    let (mut t, mut t1) = (BigInt::zero(), BigInt::one());
    while !b.is_zero() {
        let (q, r) = a.div_mod_floor(&b);
        a = std::mem::replace(&mut b, r);
        let s2 = &s - &q * &s1;
        s = std::mem::replace(&mut s1, s2);
        let t2 = &t - &q * &t1;
        t = std::mem::replace(&mut t1, t2);
    }
    (a, s, t)
}

/// `(p - 1)(q - 1) / gcd(p - 1, q - 1)`
pub fn lcm(a: &BigInt, b: &BigInt) -> BigInt {
    let g = euclidean_gcd(a, b);
    if g.is_zero() { return BigInt::zero(); }
    (a * b).abs() / g
}

/// Inverse of `a` modulo `m` normalized into `[0, m)`, `None` when `gcd(a, m) != 1`.
pub fn mod_inverse(a: &BigInt, m: &BigInt) -> Option<BigInt> {
    let (g, mut s, _) = extended_euclidean(a, m);
    if !g.is_one() { return None; }
    if a.is_negative() { s = -s; }
    while s.is_negative() { s += m; }
    Some(s)
}
