// Core modules: triangulations, layered structures, lens spaces and errors.
pub mod error;
pub mod layered_lens_space;
pub mod layered_solid_torus;
pub mod lens_space;
pub mod number_theory;
pub mod perm;
pub mod triangulation;
