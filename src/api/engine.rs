//! Purpose: Handle-based arena owning triangulations and the lens spaces found in them.
//! Exports: `Engine`, `EngineOptions`, `TriangulationHandle`, `LensSpaceHandle`, `LensSpaceRef`.
//! Role: Opaque-handle boundary for callers that should not hold structures directly.
//! Invariants: Handles are never reused; a released handle stays invalid.
//! Invariants: Live structures (triangulations plus lens spaces) never exceed `max_structures`.
//! Invariants: A built triangulation never exceeds `max_tetrahedra`; the bound is checked
//! before any tetrahedron is allocated.
#![allow(clippy::result_large_err)]

use std::collections::BTreeMap;
use std::fmt;

use tracing::debug;

use crate::core::error::{Error, ErrorKind};
use crate::core::layered_lens_space::{LayeredLensSpace, LensSpaceQueries};
use crate::core::layered_solid_torus::{DEFAULT_MAX_TETRAHEDRA, LayeredSolidTorus};
use crate::core::triangulation::Triangulation;

pub type ApiResult<T> = Result<T, Error>;

pub const DEFAULT_MAX_STRUCTURES: usize = 4096;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct EngineOptions {
    max_structures: usize,
    max_tetrahedra: u64,
}

impl EngineOptions {
    pub fn new() -> Self {
        Self {
            max_structures: DEFAULT_MAX_STRUCTURES,
            max_tetrahedra: DEFAULT_MAX_TETRAHEDRA,
        }
    }

    pub fn with_max_structures(mut self, max_structures: usize) -> Self {
        self.max_structures = max_structures;
        self
    }

    pub fn with_max_tetrahedra(mut self, max_tetrahedra: u64) -> Self {
        self.max_tetrahedra = max_tetrahedra;
        self
    }

    pub fn max_structures(&self) -> usize {
        self.max_structures
    }

    pub fn max_tetrahedra(&self) -> u64 {
        self.max_tetrahedra
    }
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct TriangulationHandle(u64);

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct LensSpaceHandle(u64);

impl TriangulationHandle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

impl LensSpaceHandle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TriangulationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tri#{}", self.0)
    }
}

impl fmt::Display for LensSpaceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lens#{}", self.0)
    }
}

#[derive(Clone, Debug)]
struct LensEntry {
    value: LayeredLensSpace,
    parent: Option<TriangulationHandle>,
}

#[derive(Debug)]
pub struct Engine {
    options: EngineOptions,
    next_id: u64,
    triangulations: BTreeMap<u64, Triangulation>,
    lens_spaces: BTreeMap<u64, LensEntry>,
}

impl Engine {
    pub fn new() -> Self {
        Self::with_options(EngineOptions::default())
    }

    pub fn with_options(options: EngineOptions) -> Self {
        Self {
            options,
            next_id: 1,
            triangulations: BTreeMap::new(),
            lens_spaces: BTreeMap::new(),
        }
    }

    pub fn options(&self) -> EngineOptions {
        self.options
    }

    pub fn live_structures(&self) -> usize {
        self.triangulations.len() + self.lens_spaces.len()
    }

    pub fn insert_triangulation(&mut self, tri: Triangulation) -> ApiResult<TriangulationHandle> {
        self.reserve(1)?;
        let handle = TriangulationHandle(self.allocate_id());
        debug!(handle = handle.0, size = tri.size(), "stored triangulation");
        self.triangulations.insert(handle.0, tri);
        Ok(handle)
    }

    pub fn triangulation(&self, handle: TriangulationHandle) -> ApiResult<&Triangulation> {
        self.triangulations
            .get(&handle.0)
            .ok_or_else(|| invalid_handle("triangulation", handle.0))
    }

    /// Removes a triangulation and every lens space that lives inside it.
    pub fn remove_triangulation(&mut self, handle: TriangulationHandle) -> ApiResult<Triangulation> {
        let tri = self
            .triangulations
            .remove(&handle.0)
            .ok_or_else(|| invalid_handle("triangulation", handle.0))?;
        let before = self.lens_spaces.len();
        self.lens_spaces
            .retain(|_, entry| entry.parent != Some(handle));
        debug!(
            handle = handle.0,
            dropped_lens_spaces = before - self.lens_spaces.len(),
            "removed triangulation"
        );
        Ok(tri)
    }

    /// Builds a fresh triangulation of L(p,q) and the lens space structure inside it.
    pub fn build_layered_lens_space(
        &mut self,
        p: u64,
        q: u64,
    ) -> ApiResult<(TriangulationHandle, LensSpaceHandle)> {
        self.reserve(2)?;
        let mut tri = Triangulation::new();
        let lens =
            LayeredLensSpace::insert_within(&mut tri, p, q, self.options.max_tetrahedra)?;
        let tri_handle = self.insert_triangulation(tri)?;
        let lens_handle = self.store_lens_space(lens, Some(tri_handle))?;
        Ok((tri_handle, lens_handle))
    }

    /// Recognizes a layered lens space in every component of a stored triangulation.
    ///
    /// Returns one handle per recognized component, in component order, or `NotFound`
    /// when no component is a layered lens space.
    pub fn recognize(&mut self, handle: TriangulationHandle) -> ApiResult<Vec<LensSpaceHandle>> {
        let tri = self.triangulation(handle)?;
        let skeleton = tri.skeleton();
        let found: Vec<LayeredLensSpace> = skeleton
            .components()
            .iter()
            .filter_map(|component| LayeredLensSpace::recognize_component(tri, component))
            .collect();
        if found.is_empty() {
            return Err(Error::new(ErrorKind::NotFound)
                .with_message("no layered lens space found")
                .with_handle(handle.0));
        }
        self.reserve(found.len())?;
        found
            .into_iter()
            .map(|lens| self.store_lens_space(lens, Some(handle)))
            .collect()
    }

    /// Registers a lens space built outside the engine. It has no stored triangulation,
    /// so its torus is not reachable through `queries`.
    pub fn adopt_lens_space(&mut self, lens: LayeredLensSpace) -> ApiResult<LensSpaceHandle> {
        self.store_lens_space(lens, None)
    }

    pub fn lens_space(&self, handle: LensSpaceHandle) -> ApiResult<&LayeredLensSpace> {
        self.entry(handle).map(|entry| &entry.value)
    }

    pub fn parent(&self, handle: LensSpaceHandle) -> ApiResult<Option<TriangulationHandle>> {
        self.entry(handle).map(|entry| entry.parent)
    }

    /// Deep copy under a new handle; the copy shares the parent triangulation.
    pub fn clone_lens_space(&mut self, handle: LensSpaceHandle) -> ApiResult<LensSpaceHandle> {
        let entry = self.entry(handle)?.clone();
        let copy = self.store_lens_space(entry.value, entry.parent)?;
        debug!(source = handle.0, handle = copy.0, "cloned lens space");
        Ok(copy)
    }

    pub fn release(&mut self, handle: LensSpaceHandle) -> ApiResult<()> {
        self.lens_spaces
            .remove(&handle.0)
            .ok_or_else(|| invalid_handle("lens space", handle.0))?;
        debug!(handle = handle.0, "released lens space");
        Ok(())
    }

    pub fn queries(&self, handle: LensSpaceHandle) -> ApiResult<LensSpaceRef<'_>> {
        let entry = self.entry(handle)?;
        Ok(LensSpaceRef {
            engine: self,
            handle,
            entry,
        })
    }

    fn entry(&self, handle: LensSpaceHandle) -> ApiResult<&LensEntry> {
        self.lens_spaces
            .get(&handle.0)
            .ok_or_else(|| invalid_handle("lens space", handle.0))
    }

    fn store_lens_space(
        &mut self,
        value: LayeredLensSpace,
        parent: Option<TriangulationHandle>,
    ) -> ApiResult<LensSpaceHandle> {
        self.reserve(1)?;
        let handle = LensSpaceHandle(self.allocate_id());
        debug!(
            handle = handle.0,
            p = value.p(),
            q = value.q(),
            "stored lens space"
        );
        self.lens_spaces
            .insert(handle.0, LensEntry { value, parent });
        Ok(handle)
    }

    fn reserve(&self, count: usize) -> ApiResult<()> {
        let live = self.live_structures();
        if live.saturating_add(count) > self.options.max_structures {
            return Err(Error::new(ErrorKind::AllocationFailed)
                .with_message(format!(
                    "engine holds {live} structures (limit {})",
                    self.options.max_structures
                ))
                .with_hint("Release unused handles or raise --max-structures."));
        }
        Ok(())
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

fn invalid_handle(what: &str, id: u64) -> Error {
    Error::new(ErrorKind::InvalidHandle)
        .with_message(format!("{what} handle is not live"))
        .with_handle(id)
}

/// Borrowed view of a live lens space; the handle cannot be released while it exists.
#[derive(Clone, Copy, Debug)]
pub struct LensSpaceRef<'a> {
    engine: &'a Engine,
    handle: LensSpaceHandle,
    entry: &'a LensEntry,
}

impl<'a> LensSpaceRef<'a> {
    pub fn handle(&self) -> LensSpaceHandle {
        self.handle
    }

    pub fn value(&self) -> &'a LayeredLensSpace {
        &self.entry.value
    }

    pub fn triangulation(&self) -> ApiResult<&'a Triangulation> {
        let parent = self.entry.parent.ok_or_else(|| {
            Error::new(ErrorKind::NotFound)
                .with_message("lens space has no triangulation in this engine")
                .with_handle(self.handle.0)
        })?;
        self.engine.triangulation(parent)
    }
}

impl LensSpaceQueries for LensSpaceRef<'_> {
    fn p(&self) -> u64 {
        self.entry.value.p()
    }

    fn q(&self) -> u64 {
        self.entry.value.q()
    }

    fn torus(&self) -> Result<&LayeredSolidTorus, Error> {
        self.triangulation()?;
        self.entry.value.torus()
    }

    fn mobius_boundary_group(&self) -> usize {
        self.entry.value.mobius_boundary_group()
    }

    fn is_snapped(&self) -> bool {
        self.entry.value.is_snapped()
    }
}
