//! Purpose: 3-manifold triangulations built from tetrahedra glued along faces.
//! Exports: `Triangulation`, `Tetrahedron`, `Gluing`, `Skeleton`, `Component`.
//! Role: Arena owning every tetrahedron; layered structures refer to tetrahedra by index.
//! Invariants: Gluings are symmetric; if face `f` of A meets face `g[f]` of B through `g`,
//! then face `g[f]` of B meets face `f` of A through `g⁻¹`.
//! Invariants: No face is glued to itself.
use serde::{Deserialize, Serialize};

use crate::core::error::{Error, ErrorKind};
use crate::core::perm::{EDGE_VERTICES, Perm4, edge_number, face_edges};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Gluing {
    pub tet: usize,
    pub perm: Perm4,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Tetrahedron {
    gluings: [Option<Gluing>; 4],
}

impl Tetrahedron {
    pub fn adjacent(&self, face: usize) -> Option<Gluing> {
        self.gluings.get(face).copied().flatten()
    }

    pub fn is_free(&self, face: usize) -> bool {
        self.adjacent(face).is_none()
    }

    pub fn gluings(&self) -> &[Option<Gluing>; 4] {
        &self.gluings
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TriangulationData", into = "TriangulationData")]
pub struct Triangulation {
    tets: Vec<Tetrahedron>,
}

#[derive(Serialize, Deserialize)]
struct TriangulationData {
    tetrahedra: Vec<[Option<Gluing>; 4]>,
}

impl Triangulation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn size(&self) -> usize {
        self.tets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tets.is_empty()
    }

    pub fn add_tetrahedron(&mut self) -> usize {
        self.tets.push(Tetrahedron::default());
        self.tets.len() - 1
    }

    pub fn tetrahedron(&self, tet: usize) -> Option<&Tetrahedron> {
        self.tets.get(tet)
    }

    pub fn tetrahedra(&self) -> &[Tetrahedron] {
        &self.tets
    }

    pub fn adjacent(&self, tet: usize, face: usize) -> Option<Gluing> {
        self.tets.get(tet).and_then(|t| t.adjacent(face))
    }

    /// Glues face `face` of `tet` to face `perm[face]` of `other`.
    pub fn join(&mut self, tet: usize, face: usize, other: usize, perm: Perm4) -> Result<(), Error> {
        if tet >= self.tets.len() || other >= self.tets.len() {
            return Err(Error::new(ErrorKind::Usage).with_message(format!(
                "tetrahedron index out of range (size {})",
                self.tets.len()
            )));
        }
        if face >= 4 {
            return Err(Error::new(ErrorKind::Usage).with_message(format!("no face {face}")));
        }
        let target = perm.image(face);
        if tet == other && target == face {
            return Err(Error::new(ErrorKind::Usage)
                .with_message(format!("face {face} of tetrahedron {tet} cannot meet itself")));
        }
        if !self.tets[tet].is_free(face) || !self.tets[other].is_free(target) {
            return Err(Error::new(ErrorKind::Usage).with_message(format!(
                "face {face} of tetrahedron {tet} or face {target} of tetrahedron {other} is already glued"
            )));
        }
        self.tets[tet].gluings[face] = Some(Gluing { tet: other, perm });
        self.tets[other].gluings[target] = Some(Gluing {
            tet,
            perm: perm.inverse(),
        });
        Ok(())
    }

    /// Frees face `face` of `tet` and its partner, returning the old gluing.
    pub fn unjoin(&mut self, tet: usize, face: usize) -> Result<Option<Gluing>, Error> {
        let Some(gluing) = self.adjacent(tet, face) else {
            if tet >= self.tets.len() || face >= 4 {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message(format!("no face {face} on tetrahedron {tet}")));
            }
            return Ok(None);
        };
        self.tets[tet].gluings[face] = None;
        self.tets[gluing.tet].gluings[gluing.perm.image(face)] = None;
        Ok(Some(gluing))
    }

    pub fn is_closed(&self) -> bool {
        self.tets
            .iter()
            .all(|tet| tet.gluings.iter().all(Option::is_some))
    }

    pub fn skeleton(&self) -> Skeleton {
        Skeleton::compute(self)
    }
}

impl TryFrom<TriangulationData> for Triangulation {
    type Error = Error;

    fn try_from(data: TriangulationData) -> Result<Self, Self::Error> {
        let size = data.tetrahedra.len();
        for (tet, gluings) in data.tetrahedra.iter().enumerate() {
            for (face, gluing) in gluings.iter().enumerate() {
                let Some(gluing) = gluing else {
                    continue;
                };
                if gluing.tet >= size {
                    return Err(Error::new(ErrorKind::Corrupt).with_message(format!(
                        "tetrahedron {tet} face {face} refers to missing tetrahedron {}",
                        gluing.tet
                    )));
                }
                let target = gluing.perm.image(face);
                if gluing.tet == tet && target == face {
                    return Err(Error::new(ErrorKind::Corrupt).with_message(format!(
                        "tetrahedron {tet} face {face} is glued to itself"
                    )));
                }
                let expected = Gluing {
                    tet,
                    perm: gluing.perm.inverse(),
                };
                if data.tetrahedra[gluing.tet][target] != Some(expected) {
                    return Err(Error::new(ErrorKind::Corrupt).with_message(format!(
                        "gluing of tetrahedron {tet} face {face} is not matched by tetrahedron {} face {target}",
                        gluing.tet
                    )));
                }
            }
        }
        Ok(Triangulation {
            tets: data
                .tetrahedra
                .into_iter()
                .map(|gluings| Tetrahedron { gluings })
                .collect(),
        })
    }
}

impl From<Triangulation> for TriangulationData {
    fn from(tri: Triangulation) -> Self {
        TriangulationData {
            tetrahedra: tri.tets.into_iter().map(|tet| tet.gluings).collect(),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Component {
    pub tetrahedra: Vec<usize>,
    pub closed: bool,
    pub orientable: bool,
    pub valid: bool,
    pub vertices: usize,
    pub edges: usize,
}

/// Vertex, edge and component classes induced by the gluings.
#[derive(Clone, Debug)]
pub struct Skeleton {
    vertex_class: Vec<[usize; 4]>,
    edge_class: Vec<[usize; 6]>,
    num_vertices: usize,
    num_edges: usize,
    component_of: Vec<usize>,
    components: Vec<Component>,
}

impl Skeleton {
    fn compute(tri: &Triangulation) -> Self {
        let size = tri.size();
        let mut vertices = ParitySets::new(size * 4);
        let mut edges = ParitySets::new(size * 6);
        let mut reversed_edge = vec![false; size * 6];

        for (tet, data) in tri.tets.iter().enumerate() {
            for (face, gluing) in data.gluings.iter().enumerate() {
                let Some(gluing) = gluing else {
                    continue;
                };
                for v in (0..4).filter(|&v| v != face) {
                    vertices.union(tet * 4 + v, gluing.tet * 4 + gluing.perm.image(v), false);
                }
                for edge in face_edges(face) {
                    let [a, b] = EDGE_VERTICES[edge];
                    let (ia, ib) = (gluing.perm.image(a), gluing.perm.image(b));
                    let flip = ia > ib;
                    let consistent =
                        edges.union(tet * 6 + edge, gluing.tet * 6 + edge_number(ia, ib), flip);
                    if !consistent {
                        reversed_edge[tet * 6 + edge] = true;
                    }
                }
            }
        }

        let (vertex_class, num_vertices) = label_classes::<4>(&mut vertices, size);
        let (edge_class, num_edges) = label_classes::<6>(&mut edges, size);
        let mut invalid_class = vec![false; num_edges];
        for (slot, reversed) in reversed_edge.iter().enumerate() {
            if *reversed {
                invalid_class[edge_class[slot / 6][slot % 6]] = true;
            }
        }

        let mut component_of = vec![usize::MAX; size];
        let mut components = Vec::new();
        let mut orientation = vec![0i8; size];
        for start in 0..size {
            if component_of[start] != usize::MAX {
                continue;
            }
            let id = components.len();
            let mut members = vec![start];
            let mut stack = vec![start];
            let mut orientable = true;
            let mut closed = true;
            component_of[start] = id;
            orientation[start] = 1;
            while let Some(tet) = stack.pop() {
                for gluing in tri.tets[tet].gluings.iter() {
                    let Some(gluing) = gluing else {
                        closed = false;
                        continue;
                    };
                    let expected = if gluing.perm.is_odd() {
                        orientation[tet]
                    } else {
                        -orientation[tet]
                    };
                    if component_of[gluing.tet] == usize::MAX {
                        component_of[gluing.tet] = id;
                        orientation[gluing.tet] = expected;
                        members.push(gluing.tet);
                        stack.push(gluing.tet);
                    } else if orientation[gluing.tet] != expected {
                        orientable = false;
                    }
                }
            }
            members.sort_unstable();
            let mut vertex_ids: Vec<usize> =
                members.iter().flat_map(|&t| vertex_class[t]).collect();
            vertex_ids.sort_unstable();
            vertex_ids.dedup();
            let mut edge_ids: Vec<usize> = members.iter().flat_map(|&t| edge_class[t]).collect();
            edge_ids.sort_unstable();
            edge_ids.dedup();
            let valid = edge_ids.iter().all(|&class| !invalid_class[class]);
            components.push(Component {
                tetrahedra: members,
                closed,
                orientable,
                valid,
                vertices: vertex_ids.len(),
                edges: edge_ids.len(),
            });
        }

        Skeleton {
            vertex_class,
            edge_class,
            num_vertices,
            num_edges,
            component_of,
            components,
        }
    }

    pub fn num_vertices(&self) -> usize {
        self.num_vertices
    }

    pub fn num_edges(&self) -> usize {
        self.num_edges
    }

    pub fn vertex_class(&self, tet: usize, vertex: usize) -> Option<usize> {
        self.vertex_class.get(tet).and_then(|row| row.get(vertex)).copied()
    }

    pub fn edge_class(&self, tet: usize, edge: usize) -> Option<usize> {
        self.edge_class.get(tet).and_then(|row| row.get(edge)).copied()
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn component_of(&self, tet: usize) -> Option<&Component> {
        self.component_of
            .get(tet)
            .and_then(|&id| self.components.get(id))
    }

    pub fn is_connected(&self) -> bool {
        self.components.len() <= 1
    }

    pub fn is_valid(&self) -> bool {
        self.components.iter().all(|c| c.valid)
    }

    pub fn is_orientable(&self) -> bool {
        self.components.iter().all(|c| c.orientable)
    }
}

/// Union-find where each element carries a parity relative to its root.
struct ParitySets {
    parent: Vec<usize>,
    parity: Vec<bool>,
}

impl ParitySets {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
            parity: vec![false; len],
        }
    }

    fn find(&mut self, x: usize) -> (usize, bool) {
        let mut path = Vec::new();
        let mut cur = x;
        while self.parent[cur] != cur {
            path.push(cur);
            cur = self.parent[cur];
        }
        let root = cur;
        for &node in path.iter().rev() {
            let up = self.parent[node];
            if up != root {
                self.parity[node] ^= self.parity[up];
            }
            self.parent[node] = root;
        }
        (root, x != root && self.parity[x])
    }

    /// Records `parity(a) ^ parity(b) == flip`; false if that contradicts earlier unions.
    fn union(&mut self, a: usize, b: usize, flip: bool) -> bool {
        let (ra, pa) = self.find(a);
        let (rb, pb) = self.find(b);
        if ra == rb {
            return (pa ^ pb) == flip;
        }
        self.parent[ra] = rb;
        self.parity[ra] = pa ^ pb ^ flip;
        true
    }
}

fn label_classes<const N: usize>(sets: &mut ParitySets, size: usize) -> (Vec<[usize; N]>, usize) {
    let mut label = vec![usize::MAX; size * N];
    let mut out = vec![[0usize; N]; size];
    let mut next = 0;
    for slot in 0..size * N {
        let (root, _) = sets.find(slot);
        if label[root] == usize::MAX {
            label[root] = next;
            next += 1;
        }
        out[slot / N][slot % N] = label[root];
    }
    (out, next)
}

#[cfg(test)]
mod tests {
    use super::{Gluing, Triangulation};
    use crate::core::error::ErrorKind;
    use crate::core::perm::Perm4;

    fn perm(images: [u8; 4]) -> Perm4 {
        Perm4::from_images(images).expect("perm")
    }

    #[test]
    fn join_is_symmetric_and_unjoin_frees_both_sides() {
        let mut tri = Triangulation::new();
        let a = tri.add_tetrahedron();
        let b = tri.add_tetrahedron();
        let g = perm([1, 0, 3, 2]);
        tri.join(a, 2, b, g).expect("join");

        assert_eq!(tri.adjacent(a, 2), Some(Gluing { tet: b, perm: g }));
        assert_eq!(
            tri.adjacent(b, 3),
            Some(Gluing {
                tet: a,
                perm: g.inverse()
            })
        );

        let old = tri.unjoin(b, 3).expect("unjoin");
        assert_eq!(old.map(|g| g.tet), Some(a));
        assert!(tri.adjacent(a, 2).is_none());
        assert!(tri.adjacent(b, 3).is_none());
    }

    #[test]
    fn join_rejects_busy_faces_and_self_faces() {
        let mut tri = Triangulation::new();
        let a = tri.add_tetrahedron();
        tri.join(a, 0, a, perm([1, 2, 3, 0])).expect("self gluing");

        let busy = tri.join(a, 1, a, perm([0, 2, 1, 3])).expect_err("busy");
        assert_eq!(busy.kind(), ErrorKind::Usage);
        let own = tri.join(a, 2, a, Perm4::IDENTITY).expect_err("own face");
        assert_eq!(own.kind(), ErrorKind::Usage);
        let missing = tri.join(a, 2, 5, Perm4::IDENTITY).expect_err("range");
        assert_eq!(missing.kind(), ErrorKind::Usage);
    }

    #[test]
    fn one_tetrahedron_solid_torus_skeleton() {
        let mut tri = Triangulation::new();
        let t = tri.add_tetrahedron();
        tri.join(t, 0, t, perm([1, 2, 3, 0])).expect("join");

        let skeleton = tri.skeleton();
        assert_eq!(skeleton.num_vertices(), 1);
        // Edge classes {12,23,03}, {13,02}, {01}.
        assert_eq!(skeleton.num_edges(), 3);
        assert_eq!(skeleton.edge_class(t, 3), skeleton.edge_class(t, 5));
        assert_eq!(skeleton.edge_class(t, 2), skeleton.edge_class(t, 3));
        assert_eq!(skeleton.edge_class(t, 1), skeleton.edge_class(t, 4));
        assert_ne!(skeleton.edge_class(t, 0), skeleton.edge_class(t, 1));

        let component = &skeleton.components()[0];
        assert!(!component.closed);
        assert!(component.orientable);
        assert!(component.valid);
        assert!(!tri.is_closed());
    }

    #[test]
    fn even_self_gluing_is_non_orientable() {
        let mut tri = Triangulation::new();
        let t = tri.add_tetrahedron();
        tri.join(t, 0, t, perm([1, 0, 3, 2])).expect("join");
        assert!(!tri.skeleton().is_orientable());
    }

    #[test]
    fn reversed_edge_is_invalid() {
        // Folding face 0 onto face 1 with 2 and 3 swapped sends edge 23 onto itself reversed.
        let mut tri = Triangulation::new();
        let t = tri.add_tetrahedron();
        tri.join(t, 0, t, perm([1, 0, 3, 2])).expect("join");
        assert!(!tri.skeleton().is_valid());
    }

    #[test]
    fn components_are_separated() {
        let mut tri = Triangulation::new();
        let a = tri.add_tetrahedron();
        let b = tri.add_tetrahedron();
        let c = tri.add_tetrahedron();
        tri.join(a, 0, b, Perm4::transposition(0, 1)).expect("join");

        let skeleton = tri.skeleton();
        assert!(!skeleton.is_connected());
        assert_eq!(skeleton.components().len(), 2);
        assert_eq!(skeleton.component_of(b).map(|c| c.tetrahedra.clone()), Some(vec![a, b]));
        assert_eq!(skeleton.component_of(c).map(|c| c.tetrahedra.clone()), Some(vec![c]));
    }

    #[test]
    fn json_round_trip_and_validation() {
        let mut tri = Triangulation::new();
        let a = tri.add_tetrahedron();
        let b = tri.add_tetrahedron();
        tri.join(a, 1, b, perm([0, 2, 1, 3])).expect("join");

        let text = serde_json::to_string(&tri).expect("encode");
        let back: Triangulation = serde_json::from_str(&text).expect("decode");
        assert_eq!(back, tri);

        let one_sided = r#"{"tetrahedra":[[null,{"tet":1,"perm":[0,1,2,3]},null,null],[null,null,null,null]]}"#;
        let err = serde_json::from_str::<Triangulation>(one_sided).expect_err("unmatched");
        assert!(err.to_string().contains("not matched"));

        let dangling = r#"{"tetrahedra":[[{"tet":4,"perm":[0,1,2,3]},null,null,null]]}"#;
        assert!(serde_json::from_str::<Triangulation>(dangling).is_err());
    }
}
