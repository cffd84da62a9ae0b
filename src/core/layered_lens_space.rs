//! Purpose: Layered lens spaces: a layered solid torus whose two top faces are glued together.
//! Exports: `LayeredLensSpace`, `LensSpaceQueries`.
//! Role: Construction of L(p,q) triangulations and recognition inside closed components.
//! Invariants: `q` is normalized (`q = 1` when `p = 0`, else `q <= p / 2`) and `gcd(p, q) == 1`.
//! Invariants: Exactly one of snapped and twisted holds.
use tracing::debug;

use crate::core::error::{Error, ErrorKind};
use crate::core::layered_solid_torus::{DEFAULT_MAX_TETRAHEDRA, LayeredSolidTorus};
use crate::core::lens_space::LensSpace;
use crate::core::number_theory::gcd;
use crate::core::perm::{EDGE_VERTICES, Perm4, edge_number, face_edges};
use crate::core::triangulation::{Component, Triangulation};

/// Read-only queries shared by owned lens spaces and engine handles.
pub trait LensSpaceQueries {
    fn p(&self) -> u64;

    fn q(&self) -> u64;

    /// The layered solid torus the lens space is built from.
    fn torus(&self) -> Result<&LayeredSolidTorus, Error>;

    /// Top edge group (0, 1 or 2) that bounds the Möbius band formed by the fold.
    fn mobius_boundary_group(&self) -> usize;

    fn is_snapped(&self) -> bool;

    fn is_twisted(&self) -> bool {
        !self.is_snapped()
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LayeredLensSpace {
    p: u64,
    q: u64,
    torus: LayeredSolidTorus,
    mobius_boundary_group: usize,
    snapped: bool,
}

impl LayeredLensSpace {
    /// Appends a layered triangulation of L(p,q) to `tri`.
    ///
    /// `q` is normalized first, so `insert(tri, 7, 5)` builds L(7,2). Nothing is added to
    /// `tri` when the parameters are rejected.
    pub fn insert(tri: &mut Triangulation, p: u64, q: u64) -> Result<Self, Error> {
        Self::insert_within(tri, p, q, DEFAULT_MAX_TETRAHEDRA)
    }

    /// Like `insert`, with `AllocationFailed` when L(p,q) needs more than `max_tetrahedra`.
    pub fn insert_within(
        tri: &mut Triangulation,
        p: u64,
        q: u64,
        max_tetrahedra: u64,
    ) -> Result<Self, Error> {
        if gcd(p, q) != 1 {
            return Err(Error::new(ErrorKind::Usage)
                .with_message(format!("lens space parameters ({p},{q}) are not coprime"))
                .with_hint("Use coprime p and q, e.g. `5 2`; `0 1` gives S2 x S1."));
        }
        let q = normalize(p, q);
        let (cuts, weight) = match p {
            0 => ((1, 1), 2),
            1 => ((1, 2), 3),
            2 => ((1, 3), 4),
            _ => ((p - 2 * q, q), p - 2 * q),
        };

        let first = tri.size();
        let torus = LayeredSolidTorus::insert_within(tri, cuts.0, cuts.1, max_tetrahedra)?;
        let group = fold_group_for_weight(&torus, weight).ok_or_else(|| {
            Error::new(ErrorKind::Internal)
                .with_message(format!("torus {:?} has no edge of weight {weight}", torus.cuts()))
        })?;
        let top = torus.top_level();
        tri.join(top, torus.top_faces()[0], top, fold_gluing(&torus, group))?;

        let built = Self::from_closed_torus(tri, torus).ok_or_else(|| {
            Error::new(ErrorKind::Internal).with_message("folded torus is not a layered lens space")
        })?;
        if (built.p, built.q) != (p, q) {
            return Err(Error::new(ErrorKind::Internal).with_message(format!(
                "built L({},{}) while asked for L({p},{q})",
                built.p, built.q
            )));
        }
        debug!(
            p,
            q,
            tetrahedra = tri.size() - first,
            snapped = built.snapped,
            "inserted layered lens space"
        );
        Ok(built)
    }

    /// Recognizes the component as a layered lens space.
    ///
    /// The component must be closed, orientable and have a single vertex. Tetrahedra are
    /// tried as bases in index order; the first successful reading is returned.
    pub fn recognize_component(tri: &Triangulation, component: &Component) -> Option<Self> {
        if !component.closed || !component.orientable || !component.valid || component.vertices != 1
        {
            return None;
        }
        let found = component.tetrahedra.iter().find_map(|&tet| {
            LayeredSolidTorus::base_readings(tri, tet)
                .into_iter()
                .filter(|torus| torus.size() == component.tetrahedra.len())
                .find_map(|torus| Self::from_closed_torus(tri, torus))
        });
        match &found {
            Some(lens) => debug!(p = lens.p, q = lens.q, "recognized layered lens space"),
            None => debug!(size = component.tetrahedra.len(), "component is not a layered lens space"),
        }
        found
    }

    /// Recognizes a connected triangulation as a layered lens space.
    pub fn recognize(tri: &Triangulation) -> Option<Self> {
        let skeleton = tri.skeleton();
        match skeleton.components() {
            [component] => Self::recognize_component(tri, component),
            _ => None,
        }
    }

    /// Reads off the lens space when the torus's top faces are glued to each other.
    fn from_closed_torus(tri: &Triangulation, torus: LayeredSolidTorus) -> Option<Self> {
        let top = torus.top_level();
        let [f0, f1] = torus.top_faces();
        let gluing = tri.adjacent(top, f0)?;
        if gluing.tet != top || gluing.perm.image(f0) != f1 {
            return None;
        }
        let fold = gluing.perm;

        // Exactly one group of the lower face is carried onto itself by the fold.
        let fixed: Vec<usize> = face_edges(f0)
            .into_iter()
            .filter_map(|edge| {
                let [a, b] = EDGE_VERTICES[edge];
                let group = torus.top_edge_group(edge)?;
                let image = edge_number(fold.image(a), fold.image(b));
                (torus.top_edge_group(image) == Some(group)).then_some(group)
            })
            .collect();
        let &[group] = fixed.as_slice() else {
            return None;
        };

        let [x, y, _] = torus.cuts();
        let (p, q) = match group {
            0 => (x.checked_add(y.checked_mul(2)?)?, y),
            1 => (x.checked_mul(2)?.checked_add(y)?, x),
            _ => (y - x, x),
        };
        Some(Self {
            p,
            q: normalize(p, q),
            torus,
            mobius_boundary_group: group,
            snapped: fold.image(f1) == f0,
        })
    }

    pub fn manifold(&self) -> Result<LensSpace, Error> {
        LensSpace::new(self.p, self.q)
    }

    pub fn homology_h1(&self) -> String {
        LensSpace::homology_of_order(self.p)
    }

    pub fn name(&self) -> String {
        self.manifold()
            .map(|lens| lens.name())
            .unwrap_or_else(|_| format!("L({},{})", self.p, self.q))
    }
}

impl LensSpaceQueries for LayeredLensSpace {
    fn p(&self) -> u64 {
        self.p
    }

    fn q(&self) -> u64 {
        self.q
    }

    fn torus(&self) -> Result<&LayeredSolidTorus, Error> {
        Ok(&self.torus)
    }

    fn mobius_boundary_group(&self) -> usize {
        self.mobius_boundary_group
    }

    fn is_snapped(&self) -> bool {
        self.snapped
    }
}

/// `q` reduced into `0..=p/2`; `q = 1` when `p = 0`.
fn normalize(p: u64, q: u64) -> u64 {
    if p == 0 {
        return 1;
    }
    let q = q % p;
    if q > p - q { p - q } else { q }
}

/// A group with the given cut count, preferring one other than the hinge's.
fn fold_group_for_weight(torus: &LayeredSolidTorus, weight: u64) -> Option<usize> {
    let hinge = torus.top_edge_group(torus.hinge());
    let mut candidates = (0..3).filter(|&g| torus.meridinal_cuts(g) == Some(weight));
    let first = candidates.next()?;
    Some(match candidates.next() {
        Some(second) if hinge == Some(first) => second,
        _ => first,
    })
}

/// Gluing of the lower top face onto the upper one that maps `group` to itself.
///
/// Folding on the hinge group is the snap `(f0 f1)`. Any other group is folded by the
/// 4-cycle `f0 -> f1 -> h -> h' -> f0`, where `{f0, h}` lies in that group.
fn fold_gluing(torus: &LayeredSolidTorus, group: usize) -> Perm4 {
    let [f0, f1] = torus.top_faces();
    if torus.top_edge_group(torus.hinge()) == Some(group) {
        return Perm4::transposition(f0, f1);
    }
    let [h0, h1] = EDGE_VERTICES[torus.hinge()];
    let (h, h_next) = if torus.top_edge_group(edge_number(f0, h0)) == Some(group) {
        (h0, h1)
    } else {
        (h1, h0)
    };
    let mut images = [0u8; 4];
    images[f0] = f1 as u8;
    images[f1] = h as u8;
    images[h] = h_next as u8;
    images[h_next] = f0 as u8;
    Perm4::from_images(images).unwrap_or(Perm4::transposition(f0, f1))
}

#[cfg(test)]
mod tests {
    use super::{LayeredLensSpace, LensSpaceQueries, normalize};
    use crate::core::error::ErrorKind;
    use crate::core::number_theory::gcd;
    use crate::core::perm::Perm4;
    use crate::core::triangulation::Triangulation;

    fn perm(images: [u8; 4]) -> Perm4 {
        Perm4::from_images(images).expect("perm")
    }

    fn build(p: u64, q: u64) -> (Triangulation, LayeredLensSpace) {
        let mut tri = Triangulation::new();
        let lens = LayeredLensSpace::insert(&mut tri, p, q).expect("insert");
        (tri, lens)
    }

    #[test]
    fn normalization_keeps_q_in_lower_half() {
        assert_eq!(normalize(0, 1), 1);
        assert_eq!(normalize(1, 7), 0);
        assert_eq!(normalize(7, 5), 2);
        assert_eq!(normalize(8, 3), 3);
        assert_eq!(normalize(9, 13), 4);
    }

    #[test]
    fn builds_l52_from_a_single_tetrahedron() {
        let (tri, lens) = build(5, 2);
        assert_eq!(tri.size(), 1);
        assert_eq!((lens.p(), lens.q()), (5, 2));
        assert!(lens.is_twisted());
        assert!(!lens.is_snapped());
        assert_eq!(lens.mobius_boundary_group(), 0);
        assert_eq!(lens.torus().expect("torus").cuts(), [1, 2, 3]);
        assert_eq!(lens.name(), "L(5,2)");
        assert_eq!(lens.homology_h1(), "Z_5");
    }

    #[test]
    fn small_cases() {
        let (tri, s3) = build(1, 0);
        assert_eq!(tri.size(), 1);
        assert!(s3.is_snapped());
        assert_eq!(s3.mobius_boundary_group(), 2);
        assert_eq!(s3.name(), "S3");

        let (tri, rp3) = build(2, 1);
        assert_eq!(tri.size(), 2);
        assert!(rp3.is_snapped());
        assert_eq!(rp3.name(), "RP3");

        let (tri, l41) = build(4, 1);
        assert_eq!(tri.size(), 1);
        assert!(l41.is_twisted());
        assert_eq!(l41.mobius_boundary_group(), 1);

        let (_, s2s1) = build(0, 1);
        assert_eq!((s2s1.p(), s2s1.q()), (0, 1));
        assert_eq!(s2s1.name(), "S2 x S1");
        assert_eq!(s2s1.homology_h1(), "Z");
    }

    #[test]
    fn construction_is_closed_orientable_one_vertex() {
        for p in 0..25u64 {
            for q in 0..=p.max(1) {
                if gcd(p, q) != 1 {
                    continue;
                }
                let (tri, lens) = build(p, q);
                let skeleton = tri.skeleton();
                assert!(tri.is_closed(), "L({p},{q}) closed");
                assert!(skeleton.is_valid(), "L({p},{q}) valid");
                assert!(skeleton.is_orientable(), "L({p},{q}) orientable");
                assert_eq!(skeleton.num_vertices(), 1, "L({p},{q}) vertices");
                assert_eq!(lens.torus().expect("torus").size(), tri.size());
                assert_ne!(lens.is_snapped(), lens.is_twisted());
            }
        }
    }

    #[test]
    fn recognition_recovers_constructed_parameters() {
        for p in 0..30u64 {
            for q in 0..=p.max(1) {
                if gcd(p, q) != 1 {
                    continue;
                }
                let (tri, built) = build(p, q);
                let found = LayeredLensSpace::recognize(&tri).expect("recognized");
                assert_eq!((found.p(), found.q()), (built.p(), built.q()), "L({p},{q})");
                let manifold = found.manifold().expect("manifold");
                assert!(manifold.is_homeomorphic(&built.manifold().expect("manifold")));
            }
        }
    }

    #[test]
    fn one_tetrahedron_closures() {
        // Base torus plus each orientable fold of faces 2 and 3.
        let folds = [
            ([0, 1, 3, 2], 1, true),
            ([2, 0, 3, 1], 5, false),
            ([1, 2, 3, 0], 4, false),
        ];
        for (fold, p, snapped) in folds {
            let mut tri = Triangulation::new();
            let t = tri.add_tetrahedron();
            tri.join(t, 0, t, perm([1, 2, 3, 0])).expect("base");
            tri.join(t, 2, t, perm(fold)).expect("fold");
            let lens = LayeredLensSpace::recognize(&tri).expect("lens space");
            assert_eq!(lens.p(), p, "fold {fold:?}");
            assert_eq!(lens.is_snapped(), snapped, "fold {fold:?}");
        }
    }

    #[test]
    fn rejects_non_coprime_parameters_without_touching_the_triangulation() {
        let mut tri = Triangulation::new();
        let err = LayeredLensSpace::insert(&mut tri, 6, 4).expect_err("gcd");
        assert_eq!(err.kind(), ErrorKind::Usage);
        let err = LayeredLensSpace::insert(&mut tri, 0, 3).expect_err("gcd");
        assert_eq!(err.kind(), ErrorKind::Usage);
        assert!(tri.is_empty());
    }

    #[test]
    fn large_parameters_fail_before_building() {
        let mut tri = Triangulation::new();
        let err = LayeredLensSpace::insert(&mut tri, 1_000_000_000_000, 1).expect_err("too large");
        assert_eq!(err.kind(), ErrorKind::AllocationFailed);
        assert!(tri.is_empty());

        // L(13,5) layers over cuts (3,5), which takes three tetrahedra.
        let err = LayeredLensSpace::insert_within(&mut tri, 13, 5, 2).expect_err("budget");
        assert_eq!(err.kind(), ErrorKind::AllocationFailed);
        let lens = LayeredLensSpace::insert_within(&mut tri, 13, 5, 3).expect("fits");
        assert_eq!((lens.p(), lens.q()), (13, 5));
        assert_eq!(tri.size(), 3);
    }

    #[test]
    fn open_or_disconnected_triangulations_are_not_lens_spaces() {
        let mut tri = Triangulation::new();
        let t = tri.add_tetrahedron();
        tri.join(t, 0, t, perm([1, 2, 3, 0])).expect("base");
        assert!(LayeredLensSpace::recognize(&tri).is_none());

        // Closed with one vertex, but the even fold reverses orientation.
        tri.join(t, 2, t, perm([1, 0, 3, 2])).expect("fold");
        let skeleton = tri.skeleton();
        assert!(tri.is_closed());
        assert_eq!(skeleton.num_vertices(), 1);
        assert!(!skeleton.is_orientable());
        assert!(LayeredLensSpace::recognize(&tri).is_none());

        let (mut tri, _) = build(5, 2);
        LayeredLensSpace::insert(&mut tri, 7, 3).expect("second");
        assert!(LayeredLensSpace::recognize(&tri).is_none());
        let skeleton = tri.skeleton();
        let found: Vec<u64> = skeleton
            .components()
            .iter()
            .filter_map(|c| LayeredLensSpace::recognize_component(&tri, c))
            .map(|lens| lens.p())
            .collect();
        assert_eq!(found, vec![5, 7]);
    }

    #[test]
    fn clone_is_independent_and_equal() {
        let (_, lens) = build(11, 3);
        let copy = lens.clone();
        drop(lens);
        assert_eq!((copy.p(), copy.q()), (11, 3));
        assert!(copy.torus().is_ok());
    }
}
