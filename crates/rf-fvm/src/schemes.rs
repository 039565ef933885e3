//! Interpolation scheme selection.

/// Face interpolation used by the convection operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConvectionScheme {
    /// Bounded first-order upwind.
    #[default]
    Upwind,
    /// Central differencing with geometric weights.
    Linear,
}

impl ConvectionScheme {
    /// Owner-side weight on an internal face.
    pub fn weight(self, flux: f64, geometric: f64) -> f64 {
        match self {
            ConvectionScheme::Upwind => {
                if flux >= 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            ConvectionScheme::Linear => geometric,
        }
    }
}
