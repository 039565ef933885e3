//! Structured hexahedral (optionally sheared) block generator.

use rf_core::Vec3;

use crate::builder::MeshBuilder;
use crate::error::{MeshError, MeshResult};
use crate::mesh::{Mesh, PatchKind};

/// One of the six sides of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockSide {
    XMin,
    XMax,
    YMin,
    YMax,
    ZMin,
    ZMax,
}

impl BlockSide {
    pub const ALL: [BlockSide; 6] = [
        BlockSide::XMin,
        BlockSide::XMax,
        BlockSide::YMin,
        BlockSide::YMax,
        BlockSide::ZMin,
        BlockSide::ZMax,
    ];

    pub fn default_name(self) -> &'static str {
        match self {
            BlockSide::XMin => "xmin",
            BlockSide::XMax => "xmax",
            BlockSide::YMin => "ymin",
            BlockSide::YMax => "ymax",
            BlockSide::ZMin => "zmin",
            BlockSide::ZMax => "zmax",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Patch name and kind for each side. Sides sharing a name merge into
/// one patch.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockPatches {
    sides: [(String, PatchKind); 6],
}

impl Default for BlockPatches {
    fn default() -> Self {
        Self {
            sides: BlockSide::ALL.map(|s| (s.default_name().to_string(), PatchKind::Wall)),
        }
    }
}

impl BlockPatches {
    pub fn set(&mut self, side: BlockSide, name: impl Into<String>, kind: PatchKind) -> &mut Self {
        self.sides[side.index()] = (name.into(), kind);
        self
    }

    pub fn get(&self, side: BlockSide) -> (&str, PatchKind) {
        let (name, kind) = &self.sides[side.index()];
        (name.as_str(), *kind)
    }

    /// Walls on four sides and empty front/back, the usual 2-D layout.
    pub fn two_dimensional(walls: &str, front_and_back: &str) -> Self {
        let mut p = Self::default();
        for side in [BlockSide::XMin, BlockSide::XMax, BlockSide::YMin, BlockSide::YMax] {
            p.set(side, walls, PatchKind::Wall);
        }
        p.set(BlockSide::ZMin, front_and_back, PatchKind::Empty);
        p.set(BlockSide::ZMax, front_and_back, PatchKind::Empty);
        p
    }
}

/// Block generator input.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockSpec {
    pub cells: [usize; 3],
    pub lengths: [f64; 3],
    pub origin: Vec3,
    /// x-offset per unit y; non-zero makes the x-faces non-orthogonal.
    pub shear: f64,
    pub patches: BlockPatches,
}

impl BlockSpec {
    pub fn unit_cube(cells: [usize; 3]) -> Self {
        Self {
            cells,
            lengths: [1.0, 1.0, 1.0],
            origin: Vec3::zeros(),
            shear: 0.0,
            patches: BlockPatches::default(),
        }
    }
}

/// Generate a block of parallelepiped cells.
///
/// Cell `(i, j, k)` has index `i + nx * (j + ny * k)`. Edge vectors are
/// `a = (dx, 0, 0)`, `b = (shear * dy, dy, 0)`, `c = (0, 0, dz)`.
pub fn block_mesh(spec: &BlockSpec) -> MeshResult<Mesh> {
    let [nx, ny, nz] = spec.cells;
    if nx == 0 || ny == 0 || nz == 0 {
        return Err(MeshError::InvalidBlock {
            what: "cell counts must be positive",
        });
    }
    if spec.lengths.iter().any(|l| !(l.is_finite() && *l > 0.0)) {
        return Err(MeshError::InvalidBlock {
            what: "lengths must be positive",
        });
    }
    if !spec.shear.is_finite() {
        return Err(MeshError::InvalidBlock {
            what: "shear must be finite",
        });
    }

    let dx = spec.lengths[0] / nx as f64;
    let dy = spec.lengths[1] / ny as f64;
    let dz = spec.lengths[2] / nz as f64;
    let a = Vec3::new(dx, 0.0, 0.0);
    let b = Vec3::new(spec.shear * dy, dy, 0.0);
    let c = Vec3::new(0.0, 0.0, dz);
    let sx = b.cross(&c);
    let sy = c.cross(&a);
    let sz = a.cross(&b);
    let volume = a.dot(&sx);

    let at = |i: f64, j: f64, k: f64| spec.origin + a * i + b * j + c * k;
    let cell = |i: usize, j: usize, k: usize| i + nx * (j + ny * k);

    let mut builder = MeshBuilder::new();
    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                builder.add_cell(at(i as f64 + 0.5, j as f64 + 0.5, k as f64 + 0.5), volume);
            }
        }
    }

    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                let (fi, fj, fk) = (i as f64, j as f64, k as f64);
                let here = cell(i, j, k);
                if i + 1 < nx {
                    let centre = at(fi + 1.0, fj + 0.5, fk + 0.5);
                    builder.add_internal_face(here, cell(i + 1, j, k), centre, sx);
                }
                if j + 1 < ny {
                    let centre = at(fi + 0.5, fj + 1.0, fk + 0.5);
                    builder.add_internal_face(here, cell(i, j + 1, k), centre, sy);
                }
                if k + 1 < nz {
                    let centre = at(fi + 0.5, fj + 0.5, fk + 1.0);
                    builder.add_internal_face(here, cell(i, j, k + 1), centre, sz);
                }
            }
        }
    }

    let mut ids = Vec::with_capacity(6);
    for side in BlockSide::ALL {
        let (name, kind) = spec.patches.get(side);
        ids.push(builder.add_patch(name, kind)?);
    }

    for k in 0..nz {
        for j in 0..ny {
            let (fj, fk) = (j as f64, k as f64);
            builder.add_boundary_face(ids[0], cell(0, j, k), at(0.0, fj + 0.5, fk + 0.5), -sx);
            builder.add_boundary_face(
                ids[1],
                cell(nx - 1, j, k),
                at(nx as f64, fj + 0.5, fk + 0.5),
                sx,
            );
        }
    }
    for k in 0..nz {
        for i in 0..nx {
            let (fi, fk) = (i as f64, k as f64);
            builder.add_boundary_face(ids[2], cell(i, 0, k), at(fi + 0.5, 0.0, fk + 0.5), -sy);
            builder.add_boundary_face(
                ids[3],
                cell(i, ny - 1, k),
                at(fi + 0.5, ny as f64, fk + 0.5),
                sy,
            );
        }
    }
    for j in 0..ny {
        for i in 0..nx {
            let (fi, fj) = (i as f64, j as f64);
            builder.add_boundary_face(ids[4], cell(i, j, 0), at(fi + 0.5, fj + 0.5, 0.0), -sz);
            builder.add_boundary_face(
                ids[5],
                cell(i, j, nz - 1),
                at(fi + 0.5, fj + 0.5, nz as f64),
                sz,
            );
        }
    }

    builder.build()
}
