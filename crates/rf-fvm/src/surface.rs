//! Face flux field.

use rf_mesh::Mesh;

use crate::error::{FvmError, FvmResult};

/// One scalar per face, internal faces first (volumetric flux `phi`).
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceScalarField {
    name: String,
    values: Vec<f64>,
}

impl SurfaceScalarField {
    pub fn new(name: impl Into<String>, mesh: &Mesh, values: Vec<f64>) -> FvmResult<Self> {
        let name = name.into();
        if values.len() != mesh.n_faces() {
            return Err(FvmError::SizeMismatch {
                what: format!("{} face values", name),
                expected: mesh.n_faces(),
                got: values.len(),
            });
        }
        Ok(Self { name, values })
    }

    pub fn zeros(name: impl Into<String>, mesh: &Mesh) -> Self {
        Self {
            name: name.into(),
            values: vec![0.0; mesh.n_faces()],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [f64] {
        &mut self.values
    }

    /// `phi -= other`, face by face.
    pub fn sub_assign(&mut self, other: &[f64]) {
        for (a, b) in self.values.iter_mut().zip(other) {
            *a -= b;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rf_mesh::{BlockSpec, block_mesh};

    #[test]
    fn size_is_checked() {
        let mesh = block_mesh(&BlockSpec::unit_cube([2, 1, 1])).unwrap();
        assert!(SurfaceScalarField::new("phi", &mesh, vec![0.0; 3]).is_err());
        let mut phi = SurfaceScalarField::zeros("phi", &mesh);
        assert_eq!(phi.values().len(), mesh.n_faces());
        phi.values_mut()[1] = 2.0;
        phi.sub_assign(&vec![1.0; mesh.n_faces()]);
        assert_eq!(phi.values()[1], 1.0);
        assert_eq!(phi.values()[0], -1.0);
    }
}
