//! Purpose: Layered solid tori: construction by layering and recognition from a base tetrahedron.
//! Exports: `LayeredSolidTorus`.
//! Role: The solid torus underneath every layered lens space.
//! Invariants: Meridinal cuts are sorted, `cuts[0] <= cuts[1] <= cuts[2]`, and
//! `cuts[2] == cuts[0] + cuts[1]`.
//! Invariants: Five top edges carry a group (sizes 2, 2, 1); the edge joining the two
//! top-face vertices is interior and has none.
use std::collections::HashSet;

use tracing::trace;

use crate::core::error::{Error, ErrorKind};
use crate::core::number_theory::gcd;
use crate::core::perm::{EDGE_VERTICES, Perm4, edge_number, face_edges, face_vertices};
use crate::core::triangulation::Triangulation;

/// Self-gluing of face 0 onto face 1 that turns one tetrahedron into the (1,2,3) torus.
const BASE_GLUING: [u8; 4] = [1, 2, 3, 0];

/// Tetrahedron budget used by `insert` when the caller does not pass one.
pub const DEFAULT_MAX_TETRAHEDRA: u64 = 1 << 20;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LayeredSolidTorus {
    tetrahedra: Vec<usize>,
    top_faces: [usize; 2],
    top_edge_group: [Option<usize>; 6],
    meridinal_cuts: [u64; 3],
}

impl LayeredSolidTorus {
    /// Builds the layered solid torus with meridinal cuts `(a, b, a + b)`.
    ///
    /// The cuts may be given in either order but must be coprime, so `(0, 1)` is the
    /// only pair containing zero. New tetrahedra are appended to `tri`; the base comes first.
    pub fn insert(tri: &mut Triangulation, cuts0: u64, cuts1: u64) -> Result<Self, Error> {
        Self::insert_within(tri, cuts0, cuts1, DEFAULT_MAX_TETRAHEDRA)
    }

    /// Like `insert`, but fails with `AllocationFailed` before touching `tri` when the
    /// torus would need more than `max_tetrahedra` tetrahedra.
    pub fn insert_within(
        tri: &mut Triangulation,
        cuts0: u64,
        cuts1: u64,
        max_tetrahedra: u64,
    ) -> Result<Self, Error> {
        let (a, b) = if cuts0 <= cuts1 {
            (cuts0, cuts1)
        } else {
            (cuts1, cuts0)
        };
        if gcd(a, b) != 1 {
            return Err(Error::new(ErrorKind::Usage)
                .with_message(format!("meridinal cuts ({a},{b}) are not coprime"))
                .with_hint("Pick cuts like 3,4 whose greatest common divisor is 1."));
        }
        b.checked_add(a).ok_or_else(|| {
            Error::new(ErrorKind::Usage).with_message("meridinal cuts overflow 64 bits")
        })?;
        let needed = Self::tetrahedra_needed(a, b);
        if needed > max_tetrahedra {
            return Err(Error::new(ErrorKind::AllocationFailed)
                .with_message(format!(
                    "meridinal cuts ({a},{b}) need {needed} tetrahedra (limit {max_tetrahedra})"
                ))
                .with_hint("Raise --max-tetrahedra or pick smaller parameters."));
        }

        let base = tri.add_tetrahedron();
        let gluing = Perm4::from_images(BASE_GLUING)?;
        tri.join(base, 0, base, gluing)?;
        let mut layering = Layering::base(base, 0, gluing);

        match (a, b) {
            (0, 1) => {
                layering.layer_over_weight(tri, 3)?;
                layering.layer_over_weight(tri, 2)?;
            }
            (1, 1) => layering.layer_over_weight(tri, 3)?,
            _ => {
                // Each pair (x, y) is reached from {y - x, x} by layering over weight y - x.
                let mut pairs = Vec::new();
                let (mut x, mut y) = (a, b);
                while (x, y) != (1, 2) {
                    if x == 0 || x == y {
                        return Err(Error::new(ErrorKind::Internal)
                            .with_message(format!("cannot reduce cuts ({a},{b})")));
                    }
                    pairs.push((x, y));
                    let smaller = y - x;
                    (x, y) = if smaller <= x { (smaller, x) } else { (x, smaller) };
                }
                for (x, y) in pairs.into_iter().rev() {
                    layering.layer_over_weight(tri, y - x)?;
                }
            }
        }
        Ok(layering.into_torus())
    }

    /// Number of tetrahedra `insert` uses for coprime cuts `a <= b`.
    ///
    /// Every layer undoes one subtraction of the Euclidean algorithm, so the count is the
    /// sum of its quotients less one, apart from the degenerate tori layered backwards.
    pub fn tetrahedra_needed(a: u64, b: u64) -> u64 {
        match (a, b) {
            (0, 1) => 3,
            (1, 1) => 2,
            _ => {
                let (mut x, mut y) = (a, b);
                let mut quotients = 0u64;
                while x != 0 {
                    quotients = quotients.saturating_add(y / x);
                    (x, y) = (y % x, x);
                }
                quotients.saturating_sub(1)
            }
        }
    }

    /// Recognizes the maximal layered solid torus whose base is `tet`.
    ///
    /// The base must have two faces glued to each other by a 4-cycle. When both face
    /// pairs qualify, the pair containing the lower face wins.
    pub fn recognize_from_base(tri: &Triangulation, tet: usize) -> Option<Self> {
        Self::base_readings(tri, tet).into_iter().next()
    }

    /// Every maximal torus obtainable from `tet` as a base, one per qualifying face pair.
    pub(crate) fn base_readings(tri: &Triangulation, tet: usize) -> Vec<Self> {
        let mut out = Vec::new();
        for face in 0..4 {
            let Some(gluing) = tri.adjacent(tet, face) else {
                continue;
            };
            if gluing.tet != tet || gluing.perm.image(face) < face || !gluing.perm.is_four_cycle() {
                continue;
            }
            let mut layering = Layering::base(tet, face, gluing.perm);
            while let Some(layer) = layering.next_layer(tri) {
                layering.advance(layer);
            }
            out.push(layering.into_torus());
        }
        out
    }

    pub fn size(&self) -> usize {
        self.tetrahedra.len()
    }

    /// Tetrahedra from the base up to the top level.
    pub fn tetrahedra(&self) -> &[usize] {
        &self.tetrahedra
    }

    pub fn base(&self) -> usize {
        self.tetrahedra[0]
    }

    pub fn top_level(&self) -> usize {
        self.tetrahedra[self.tetrahedra.len() - 1]
    }

    /// The two boundary faces of the top level tetrahedron, ascending.
    pub fn top_faces(&self) -> [usize; 2] {
        self.top_faces
    }

    pub fn top_face(&self, index: usize) -> Option<usize> {
        self.top_faces.get(index).copied()
    }

    pub fn meridinal_cuts(&self, group: usize) -> Option<u64> {
        self.meridinal_cuts.get(group).copied()
    }

    pub fn cuts(&self) -> [u64; 3] {
        self.meridinal_cuts
    }

    /// Group of a top level edge, or `None` for the interior edge.
    pub fn top_edge_group(&self, edge: usize) -> Option<usize> {
        self.top_edge_group.get(edge).copied().flatten()
    }

    /// The `index`-th top level edge (ascending edge number) in `group`.
    pub fn top_edge(&self, group: usize, index: usize) -> Option<usize> {
        (0..6)
            .filter(|&edge| self.top_edge_group[edge] == Some(group))
            .nth(index)
    }

    /// The edge shared by both top faces.
    pub fn hinge(&self) -> usize {
        5 - edge_number(self.top_faces[0], self.top_faces[1])
    }
}

/// Walk state while layering; class ids are unsorted until `into_torus`.
#[derive(Clone, Debug)]
struct Layering {
    tetrahedra: Vec<usize>,
    members: HashSet<usize>,
    top: usize,
    top_faces: [usize; 2],
    class_of: [Option<usize>; 6],
    cuts: [u64; 3],
}

#[derive(Clone, Copy, Debug)]
struct Layer {
    tet: usize,
    top_faces: [usize; 2],
    class_of: [Option<usize>; 6],
    cuts: [u64; 3],
}

impl Layering {
    /// One-tetrahedron torus where face `a` is glued to face `perm[a]` by the 4-cycle `perm`.
    fn base(tet: usize, a: usize, perm: Perm4) -> Self {
        let b = perm.image(a);
        let c = perm.image(b);
        let d = perm.image(c);
        let mut class_of = [None; 6];
        class_of[edge_number(b, c)] = Some(0);
        class_of[edge_number(a, d)] = Some(0);
        class_of[edge_number(b, d)] = Some(1);
        class_of[edge_number(a, c)] = Some(1);
        class_of[edge_number(a, b)] = Some(2);
        Self {
            tetrahedra: vec![tet],
            members: HashSet::from([tet]),
            top: tet,
            top_faces: if c < d { [c, d] } else { [d, c] },
            class_of,
            cuts: [1, 2, 3],
        }
    }

    /// The tetrahedron layered onto both top faces, if there is one.
    fn next_layer(&self, tri: &Triangulation) -> Option<Layer> {
        let [f0, f1] = self.top_faces;
        let g0 = tri.adjacent(self.top, f0)?;
        let g1 = tri.adjacent(self.top, f1)?;
        let next = g0.tet;
        if g1.tet != next || self.members.contains(&next) {
            return None;
        }
        let (h0, h1) = (g0.perm.image(f0), g1.perm.image(f1));
        if h0 == h1 {
            return None;
        }

        let mut class_of = [None; 6];
        for (face, gluing) in [(f0, g0), (f1, g1)] {
            for edge in face_edges(face) {
                let [a, b] = EDGE_VERTICES[edge];
                let image = edge_number(gluing.perm.image(a), gluing.perm.image(b));
                let class = self.class_of[edge]?;
                match class_of[image] {
                    None => class_of[image] = Some(class),
                    Some(existing) if existing == class => {}
                    Some(_) => return None,
                }
            }
        }

        let [x, y] = other_two(h0, h1);
        let layered = class_of[edge_number(x, y)]?;
        let u = class_of[edge_number(h1, x)]?;
        let v = class_of[edge_number(h1, y)]?;
        if class_of[edge_number(h0, y)] != Some(u) || class_of[edge_number(h0, x)] != Some(v) {
            return None;
        }
        if u == v || u == layered || v == layered {
            return None;
        }

        let mut cuts = self.cuts;
        cuts[layered] = layered_weight(self.cuts[layered], self.cuts[u], self.cuts[v])?;
        class_of[edge_number(h0, h1)] = Some(layered);
        class_of[edge_number(x, y)] = None;

        Some(Layer {
            tet: next,
            top_faces: [x, y],
            class_of,
            cuts,
        })
    }

    fn advance(&mut self, layer: Layer) {
        trace!(tet = layer.tet, cuts = ?layer.cuts, "layered tetrahedron");
        self.tetrahedra.push(layer.tet);
        self.members.insert(layer.tet);
        self.top = layer.tet;
        self.top_faces = layer.top_faces;
        self.class_of = layer.class_of;
        self.cuts = layer.cuts;
    }

    /// Appends a tetrahedron layered over the boundary edge currently cut `weight` times.
    fn layer_over_weight(&mut self, tri: &mut Triangulation, weight: u64) -> Result<(), Error> {
        let class = (0..3).find(|&c| self.cuts[c] == weight).ok_or_else(|| {
            Error::new(ErrorKind::Internal)
                .with_message(format!("no boundary edge with {weight} cuts in {:?}", self.cuts))
        })?;
        let [f0, f1] = self.top_faces;

        // In face f0 the layered edge is {s, t} and r is the third vertex. The new
        // tetrahedron takes {s, t} to its edge {2, 3}, r to 0 and f0 to 1.
        let (s, t, r) = self.split_face(f0, class)?;
        let u_class = self.class_of[edge_number(r, s)];
        let (s1, t1, r1) = self.split_face(f1, class)?;
        // Opposite edges of the new tetrahedron ({0,2} and {1,3}) must meet the same class.
        let (u_vert, w_vert) = if self.class_of[edge_number(r1, s1)] == u_class {
            (s1, t1)
        } else {
            (t1, s1)
        };

        let lower = perm_from_pairs([(s, 2), (t, 3), (r, 0), (f0, 1)])?;
        let upper = perm_from_pairs([(w_vert, 2), (u_vert, 3), (r1, 1), (f1, 0)])?;
        let next = tri.add_tetrahedron();
        tri.join(self.top, f0, next, lower)?;
        tri.join(self.top, f1, next, upper)?;

        let layer = self.next_layer(tri).ok_or_else(|| {
            Error::new(ErrorKind::Internal)
                .with_message(format!("tetrahedron {next} did not layer onto {}", self.top))
        })?;
        self.advance(layer);
        Ok(())
    }

    fn split_face(&self, face: usize, class: usize) -> Result<(usize, usize, usize), Error> {
        let edge = face_edges(face)
            .into_iter()
            .find(|&edge| self.class_of[edge] == Some(class))
            .ok_or_else(|| {
                Error::new(ErrorKind::Internal)
                    .with_message(format!("face {face} has no edge in group {class}"))
            })?;
        let [s, t] = EDGE_VERTICES[edge];
        let r = face_vertices(face)
            .into_iter()
            .find(|&v| v != s && v != t)
            .unwrap_or(face);
        Ok((s, t, r))
    }

    fn into_torus(self) -> LayeredSolidTorus {
        let mut order = [0usize, 1, 2];
        order.sort_by_key(|&class| (self.cuts[class], class));
        let mut remap = [0usize; 3];
        for (group, &class) in order.iter().enumerate() {
            remap[class] = group;
        }
        LayeredSolidTorus {
            tetrahedra: self.tetrahedra,
            top_faces: self.top_faces,
            top_edge_group: self.class_of.map(|class| class.map(|c| remap[c])),
            meridinal_cuts: order.map(|class| self.cuts[class]),
        }
    }
}

/// Weight of the new diagonal when layering over an edge of weight `w` whose
/// neighbouring boundary edges have weights `u` and `v`. `None` on overflow.
fn layered_weight(w: u64, u: u64, v: u64) -> Option<u64> {
    let sum = u.checked_add(v)?;
    Some(if w == sum { u.abs_diff(v) } else { sum })
}

fn other_two(a: usize, b: usize) -> [usize; 2] {
    let mut out = [0usize; 2];
    let mut idx = 0;
    for v in (0..4).filter(|&v| v != a && v != b) {
        out[idx] = v;
        idx += 1;
    }
    out
}

fn perm_from_pairs(pairs: [(usize, u8); 4]) -> Result<Perm4, Error> {
    let mut images = [u8::MAX; 4];
    for (source, image) in pairs {
        images[source] = image;
    }
    Perm4::from_images(images).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("layering produced an invalid gluing")
            .with_source(err)
    })
}
