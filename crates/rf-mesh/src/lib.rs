//! rf-mesh: finite-volume mesh layer for rotaflow.
//!
//! Provides:
//! - Owner/neighbour face addressing with internal faces first and
//!   boundary faces grouped per patch
//! - Derived geometry (interpolation weights, delta coefficients,
//!   non-orthogonal correction vectors)
//! - An incremental builder with validation, and a structured block generator
//!
//! # Example
//!
//! ```
//! use rf_mesh::{BlockSpec, block_mesh};
//!
//! let mesh = block_mesh(&BlockSpec::unit_cube([4, 3, 2])).unwrap();
//! assert_eq!(mesh.n_cells(), 24);
//! assert_eq!(mesh.patches().len(), 6);
//! ```

pub mod block;
pub mod builder;
pub mod error;
pub mod geometry;
pub mod mesh;
pub(crate) mod validate;

pub use block::{BlockPatches, BlockSide, BlockSpec, block_mesh};
pub use builder::MeshBuilder;
pub use error::{MeshError, MeshResult};
pub use geometry::Geometry;
pub use mesh::{Mesh, Patch, PatchKind};
