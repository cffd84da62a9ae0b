// Integer helpers for lens space parameters.

pub fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let r = a % b;
        a = b;
        b = r;
    }
    a
}

/// Inverse of `k` modulo `n`, in `0..n`. `None` when `n == 0` or `gcd(n, k) != 1`.
pub fn modular_inverse(n: u64, k: u64) -> Option<u64> {
    if n == 0 {
        return None;
    }
    if n == 1 {
        return Some(0);
    }
    let (mut old_r, mut r) = (i128::from(k % n), i128::from(n));
    let (mut old_s, mut s) = (1i128, 0i128);
    while r != 0 {
        let quotient = old_r / r;
        (old_r, r) = (r, old_r - quotient * r);
        (old_s, s) = (s, old_s - quotient * s);
    }
    if old_r != 1 {
        return None;
    }
    let n = i128::from(n);
    u64::try_from(old_s.rem_euclid(n)).ok()
}
