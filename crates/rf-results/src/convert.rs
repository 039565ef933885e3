//! Conversion between solver fields and stored records.

use rf_core::Vec3;
use rf_fvm::{FieldValue, PatchField, PatchFieldKind, SurfaceScalarField, VolField};
use rf_mesh::Mesh;

use crate::types::{FieldClass, FieldData, FieldFile, PatchKindRecord, PatchRecord};
use crate::{ResultsError, ResultsResult};

/// Cell values that can be written to and read from [`FieldData`].
pub trait StoredValue: FieldValue {
    const CLASS: FieldClass;

    fn to_data(values: &[Self]) -> FieldData;
    fn from_data(data: &FieldData) -> Option<Vec<Self>>;
}

impl StoredValue for f64 {
    const CLASS: FieldClass = FieldClass::VolScalarField;

    fn to_data(values: &[Self]) -> FieldData {
        FieldData::Scalar(values.to_vec())
    }

    fn from_data(data: &FieldData) -> Option<Vec<Self>> {
        match data {
            FieldData::Scalar(v) => Some(v.clone()),
            FieldData::Vector(_) => None,
        }
    }
}

impl StoredValue for Vec3 {
    const CLASS: FieldClass = FieldClass::VolVectorField;

    fn to_data(values: &[Self]) -> FieldData {
        FieldData::Vector(values.iter().map(|v| [v.x, v.y, v.z]).collect())
    }

    fn from_data(data: &FieldData) -> Option<Vec<Self>> {
        match data {
            FieldData::Vector(v) => Some(v.iter().map(|c| Vec3::new(c[0], c[1], c[2])).collect()),
            // an empty list deserialises as scalar data
            FieldData::Scalar(v) if v.is_empty() => Some(Vec::new()),
            FieldData::Scalar(_) => None,
        }
    }
}

impl FieldFile {
    pub fn from_vol<T: StoredValue>(field: &VolField<T>, mesh: &Mesh, time: &str) -> Self {
        let boundary = mesh
            .patches()
            .iter()
            .zip(field.boundary())
            .map(|(patch, pf)| {
                let (kind, gradient) = match &pf.kind {
                    PatchFieldKind::FixedValue => (PatchKindRecord::FixedValue, None),
                    PatchFieldKind::ZeroGradient => (PatchKindRecord::ZeroGradient, None),
                    PatchFieldKind::FixedGradient(g) => {
                        (PatchKindRecord::FixedGradient, Some(T::to_data(g)))
                    }
                    PatchFieldKind::Calculated => (PatchKindRecord::Calculated, None),
                    PatchFieldKind::Empty => (PatchKindRecord::Empty, None),
                };
                PatchRecord {
                    patch: patch.name.clone(),
                    kind,
                    values: T::to_data(&pf.values),
                    gradient,
                }
            })
            .collect();
        Self {
            name: field.name().to_string(),
            class: T::CLASS,
            time: time.to_string(),
            internal: T::to_data(field.internal()),
            boundary,
        }
    }

    /// Rebuild a cell field; patches must match the mesh by name and order.
    pub fn to_vol<T: StoredValue>(&self, mesh: &Mesh) -> ResultsResult<VolField<T>> {
        if self.class != T::CLASS {
            return Err(self.mismatch(format!("stored as {:?}", self.class)));
        }
        let internal = T::from_data(&self.internal)
            .ok_or_else(|| self.mismatch("internal values of the wrong rank".to_string()))?;
        if self.boundary.len() != mesh.patches().len() {
            return Err(self.mismatch(format!(
                "{} patches stored, mesh has {}",
                self.boundary.len(),
                mesh.patches().len()
            )));
        }

        let mut boundary = Vec::with_capacity(self.boundary.len());
        for (patch, rec) in mesh.patches().iter().zip(&self.boundary) {
            if rec.patch != patch.name {
                return Err(self.mismatch(format!(
                    "patch {} stored where the mesh has {}",
                    rec.patch, patch.name
                )));
            }
            let values = T::from_data(&rec.values)
                .ok_or_else(|| self.mismatch(format!("patch {} values", rec.patch)))?;
            let kind = match rec.kind {
                PatchKindRecord::FixedValue => PatchFieldKind::FixedValue,
                PatchKindRecord::ZeroGradient => PatchFieldKind::ZeroGradient,
                PatchKindRecord::FixedGradient => {
                    let g = rec
                        .gradient
                        .as_ref()
                        .and_then(T::from_data)
                        .ok_or_else(|| {
                            self.mismatch(format!("patch {} has no gradient", rec.patch))
                        })?;
                    PatchFieldKind::FixedGradient(g)
                }
                PatchKindRecord::Calculated => PatchFieldKind::Calculated,
                PatchKindRecord::Empty => PatchFieldKind::Empty,
            };
            boundary.push(PatchField { kind, values });
        }
        Ok(VolField::new(self.name.clone(), mesh, internal, boundary)?)
    }

    pub fn from_surface(phi: &SurfaceScalarField, time: &str) -> Self {
        Self {
            name: phi.name().to_string(),
            class: FieldClass::SurfaceScalarField,
            time: time.to_string(),
            internal: FieldData::Scalar(phi.values().to_vec()),
            boundary: Vec::new(),
        }
    }

    pub fn to_surface(&self, mesh: &Mesh) -> ResultsResult<SurfaceScalarField> {
        match (&self.class, &self.internal) {
            (FieldClass::SurfaceScalarField, FieldData::Scalar(values)) => Ok(
                SurfaceScalarField::new(self.name.clone(), mesh, values.clone())?,
            ),
            _ => Err(self.mismatch("not a face flux".to_string())),
        }
    }

    fn mismatch(&self, what: String) -> ResultsError {
        ResultsError::Mismatch {
            field: self.name.clone(),
            what,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rf_mesh::{BlockPatches, BlockSpec, block_mesh};

    fn mesh() -> Mesh {
        let mut spec = BlockSpec::unit_cube([3, 2, 1]);
        spec.patches = BlockPatches::two_dimensional("walls", "frontAndBack");
        block_mesh(&spec).unwrap()
    }

    #[test]
    fn vector_field_keeps_boundary_kinds() {
        let mesh = mesh();
        let u = VolField::uniform("Urel", &mesh, Vec3::new(1.0, 2.0, 0.0), |p| {
            PatchField::fixed_gradient(vec![Vec3::new(0.5, 0.0, 0.0); p.size])
        })
        .unwrap();
        let file = FieldFile::from_vol(&u, &mesh, "0.1");
        assert_eq!(file.class, FieldClass::VolVectorField);
        assert_eq!(file.boundary[0].kind, PatchKindRecord::FixedGradient);
        assert_eq!(file.boundary[1].kind, PatchKindRecord::Empty);

        let back: VolField<Vec3> = file.to_vol(&mesh).unwrap();
        assert_eq!(back.internal(), u.internal());
        assert_eq!(back.boundary(), u.boundary());
    }

    #[test]
    fn wrong_rank_is_rejected() {
        let mesh = mesh();
        let p = VolField::uniform("p", &mesh, 1.0, |p| PatchField::zero_gradient(p.size)).unwrap();
        let file = FieldFile::from_vol(&p, &mesh, "0");
        assert!(matches!(
            file.to_vol::<Vec3>(&mesh),
            Err(ResultsError::Mismatch { .. })
        ));
    }

    #[test]
    fn renamed_patch_is_rejected() {
        let mesh = mesh();
        let p = VolField::uniform("p", &mesh, 1.0, |p| PatchField::zero_gradient(p.size)).unwrap();
        let mut file = FieldFile::from_vol(&p, &mesh, "0");
        file.boundary[0].patch = "inlet".to_string();
        assert!(file.to_vol::<f64>(&mesh).is_err());
    }

    #[test]
    fn flux_round_trip() {
        let mesh = mesh();
        let values: Vec<f64> = (0..mesh.n_faces()).map(|f| f as f64 * 0.1).collect();
        let phi = SurfaceScalarField::new("phi", &mesh, values).unwrap();
        let file = FieldFile::from_surface(&phi, "0");
        let back = file.to_surface(&mesh).unwrap();
        assert_eq!(back.values(), phi.values());
        assert!(file.to_vol::<f64>(&mesh).is_err());
    }
}
