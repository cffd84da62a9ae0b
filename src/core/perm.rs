//! Purpose: Permutations of the four vertices of a tetrahedron.
//! Exports: `Perm4`, `EDGE_VERTICES`, `edge_number`, `face_vertices`, `face_edges`.
//! Role: Gluing maps between tetrahedron faces; shared by the triangulation and the
//! layered structure builders.
//! Invariants: A `Perm4` is always a bijection of {0,1,2,3}; its code indexes `S4`.
//! Invariants: Face `i` is opposite vertex `i`; edge `5 - e` is opposite edge `e`.
use std::fmt;
use std::ops::Mul;

use serde::{Deserialize, Serialize};

use crate::core::error::{Error, ErrorKind};

/// All 24 permutations in lexicographic order of their image arrays.
const S4: [[u8; 4]; 24] = [
    [0, 1, 2, 3],
    [0, 1, 3, 2],
    [0, 2, 1, 3],
    [0, 2, 3, 1],
    [0, 3, 1, 2],
    [0, 3, 2, 1],
    [1, 0, 2, 3],
    [1, 0, 3, 2],
    [1, 2, 0, 3],
    [1, 2, 3, 0],
    [1, 3, 0, 2],
    [1, 3, 2, 0],
    [2, 0, 1, 3],
    [2, 0, 3, 1],
    [2, 1, 0, 3],
    [2, 1, 3, 0],
    [2, 3, 0, 1],
    [2, 3, 1, 0],
    [3, 0, 1, 2],
    [3, 0, 2, 1],
    [3, 1, 0, 2],
    [3, 1, 2, 0],
    [3, 2, 0, 1],
    [3, 2, 1, 0],
];

/// Vertex pairs for each edge number.
pub const EDGE_VERTICES: [[usize; 2]; 6] = [[0, 1], [0, 2], [0, 3], [1, 2], [1, 3], [2, 3]];

/// Edge number joining vertices `a` and `b` (`a != b`, both below 4).
pub fn edge_number(a: usize, b: usize) -> usize {
    debug_assert!(a != b && a < 4 && b < 4);
    let (lo, hi) = if a < b { (a, b) } else { (b, a) };
    match (lo, hi) {
        (0, 1) => 0,
        (0, 2) => 1,
        (0, 3) => 2,
        (1, 2) => 3,
        (1, 3) => 4,
        _ => 5,
    }
}

/// Vertices of face `face`, ascending.
pub fn face_vertices(face: usize) -> [usize; 3] {
    let mut out = [0usize; 3];
    let mut idx = 0;
    for v in (0..4).filter(|&v| v != face) {
        out[idx] = v;
        idx += 1;
    }
    out
}

/// Edge numbers lying in face `face`.
pub fn face_edges(face: usize) -> [usize; 3] {
    let [a, b, c] = face_vertices(face);
    [edge_number(a, b), edge_number(a, c), edge_number(b, c)]
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(try_from = "[u8; 4]", into = "[u8; 4]")]
pub struct Perm4 {
    code: u8,
}

impl Perm4 {
    pub const IDENTITY: Perm4 = Perm4 { code: 0 };

    /// Permutation sending `i` to `images[i]`.
    pub fn from_images(images: [u8; 4]) -> Result<Self, Error> {
        S4.iter()
            .position(|candidate| *candidate == images)
            .map(|code| Perm4 { code: code as u8 })
            .ok_or_else(|| {
                Error::new(ErrorKind::Corrupt)
                    .with_message(format!("{images:?} is not a permutation of 0..4"))
            })
    }

    /// Transposition of `a` and `b`; identity when they coincide.
    pub fn transposition(a: usize, b: usize) -> Self {
        let mut images = [0u8, 1, 2, 3];
        images.swap(a, b);
        Self::from_table(images)
    }

    pub fn from_code(code: u8) -> Option<Self> {
        ((code as usize) < S4.len()).then_some(Perm4 { code })
    }

    pub fn code(&self) -> u8 {
        self.code
    }

    pub fn images(&self) -> [u8; 4] {
        S4[self.code as usize]
    }

    pub fn image(&self, source: usize) -> usize {
        S4[self.code as usize][source] as usize
    }

    pub fn pre_image_of(&self, image: usize) -> usize {
        S4[self.code as usize]
            .iter()
            .position(|&value| value as usize == image)
            .unwrap_or(image)
    }

    pub fn inverse(&self) -> Self {
        let mut images = [0u8; 4];
        for (source, &image) in self.images().iter().enumerate() {
            images[image as usize] = source as u8;
        }
        Self::from_table(images)
    }

    /// 1 for even permutations, -1 for odd ones.
    pub fn sign(&self) -> i8 {
        let images = self.images();
        let mut inversions = 0;
        for i in 0..4 {
            for j in (i + 1)..4 {
                if images[i] > images[j] {
                    inversions += 1;
                }
            }
        }
        if inversions % 2 == 0 { 1 } else { -1 }
    }

    pub fn is_odd(&self) -> bool {
        self.sign() < 0
    }

    /// True when the permutation is a single 4-cycle.
    pub fn is_four_cycle(&self) -> bool {
        (0..4).all(|x| self.image(x) != x && self.image(self.image(x)) != x)
    }

    // Only called with arrays already known to be bijections.
    fn from_table(images: [u8; 4]) -> Self {
        let code = S4
            .iter()
            .position(|candidate| *candidate == images)
            .unwrap_or(0);
        Perm4 { code: code as u8 }
    }
}

impl Default for Perm4 {
    fn default() -> Self {
        Perm4::IDENTITY
    }
}

impl Mul for Perm4 {
    type Output = Perm4;

    /// `(p * q).image(x) == p.image(q.image(x))`.
    fn mul(self, rhs: Perm4) -> Perm4 {
        let mut images = [0u8; 4];
        for (x, slot) in images.iter_mut().enumerate() {
            *slot = self.image(rhs.image(x)) as u8;
        }
        Perm4::from_table(images)
    }
}

impl TryFrom<[u8; 4]> for Perm4 {
    type Error = Error;

    fn try_from(images: [u8; 4]) -> Result<Self, Self::Error> {
        Perm4::from_images(images)
    }
}

impl From<Perm4> for [u8; 4] {
    fn from(perm: Perm4) -> Self {
        perm.images()
    }
}

impl fmt::Display for Perm4 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for image in self.images() {
            write!(f, "{image}")?;
        }
        Ok(())
    }
}
