// The lens space manifold L(p,q) up to homeomorphism.
use std::fmt;

use crate::core::error::{Error, ErrorKind};
use crate::core::number_theory::{gcd, modular_inverse};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct LensSpace {
    p: u64,
    q: u64,
}

impl LensSpace {
    /// L(p,q) in canonical form. Requires `gcd(p, q) == 1`.
    pub fn new(p: u64, q: u64) -> Result<Self, Error> {
        if gcd(p, q) != 1 {
            return Err(Error::new(ErrorKind::Usage)
                .with_message(format!("lens space parameters ({p},{q}) are not coprime"))
                .with_hint("L(p,q) needs gcd(p,q) = 1; L(0,1) is the only case with p = 0."));
        }
        let q = match p {
            0 => 1,
            1 => 0,
            _ => {
                let q = q % p;
                let inverse = modular_inverse(p, q).unwrap_or(q);
                [q, p - q, inverse, p - inverse]
                    .into_iter()
                    .min()
                    .unwrap_or(q)
            }
        };
        Ok(Self { p, q })
    }

    pub fn p(&self) -> u64 {
        self.p
    }

    pub fn q(&self) -> u64 {
        self.q
    }

    pub fn is_homeomorphic(&self, other: &LensSpace) -> bool {
        self == other
    }

    pub fn name(&self) -> String {
        match (self.p, self.q) {
            (0, _) => "S2 x S1".to_string(),
            (1, _) => "S3".to_string(),
            (2, _) => "RP3".to_string(),
            (p, q) => format!("L({p},{q})"),
        }
    }

    pub fn tex_name(&self) -> String {
        match (self.p, self.q) {
            (0, _) => "S^2 \\times S^1".to_string(),
            (1, _) => "S^3".to_string(),
            (2, _) => "\\mathbb{R}P^3".to_string(),
            (p, q) => format!("L_{{{p},{q}}}"),
        }
    }

    /// First homology group, written `Z`, `0` or `Z_p`.
    pub fn homology_h1(&self) -> String {
        Self::homology_of_order(self.p)
    }

    /// H1 of any lens space with fundamental group of order `p`.
    pub(crate) fn homology_of_order(p: u64) -> String {
        match p {
            0 => "Z".to_string(),
            1 => "0".to_string(),
            p => format!("Z_{p}"),
        }
    }
}

impl fmt::Display for LensSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}
