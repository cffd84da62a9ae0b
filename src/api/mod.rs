//! Purpose: Define the public Rust API boundary for layerlens.
//! Exports: The handle engine plus the core types callers need to use it.
//! Role: Stable surface for the CLI and library users; additive only.
//! Invariants: Structures reached through handles are only mutated by the engine.

mod engine;

#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::layered_lens_space::{LayeredLensSpace, LensSpaceQueries};
pub use crate::core::layered_solid_torus::{DEFAULT_MAX_TETRAHEDRA, LayeredSolidTorus};
pub use crate::core::lens_space::LensSpace;
pub use crate::core::perm::Perm4;
pub use crate::core::triangulation::{Component, Gluing, Skeleton, Triangulation};
pub use engine::{
    ApiResult, DEFAULT_MAX_STRUCTURES, Engine, EngineOptions, LensSpaceHandle, LensSpaceRef,
    TriangulationHandle,
};
