//! Noise variants and their 2D/3D classification.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One noise family crossed with an output dimensionality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoiseVariant {
    #[serde(rename = "PERLIN_2D")]
    Perlin2d,
    #[serde(rename = "PERLIN_3D")]
    Perlin3d,
    #[serde(rename = "SIMPLEX_2D")]
    Simplex2d,
    #[serde(rename = "SIMPLEX_3D")]
    Simplex3d,
    #[serde(rename = "SIMPLEX_2D_GRADIENT")]
    Simplex2dGradient,
    #[serde(rename = "SIMPLEX_3D_GRADIENT")]
    Simplex3dGradient,
    #[serde(rename = "VORONOI_2D")]
    Voronoi2d,
    #[serde(rename = "VORONOI_3D")]
    Voronoi3d,
    #[serde(rename = "VORONOI_2D_CELLS")]
    Voronoi2dCells,
    #[serde(rename = "VORONOI_3D_CELLS")]
    Voronoi3dCells,
    #[serde(rename = "VORONOI_2D_PERIODIC")]
    Voronoi2dPeriodic,
    #[serde(rename = "VORONOI_3D_PERIODIC")]
    Voronoi3dPeriodic,
    #[serde(rename = "VORONOI_2D_PERIODIC_CELLS")]
    Voronoi2dPeriodicCells,
    #[serde(rename = "VORONOI_3D_PERIODIC_CELLS")]
    Voronoi3dPeriodicCells,
}

impl NoiseVariant {
    /// All fourteen variants in declaration order.
    pub fn all() -> [NoiseVariant; 14] {
        use NoiseVariant::*;
        [
            Perlin2d,
            Perlin3d,
            Simplex2d,
            Simplex3d,
            Simplex2dGradient,
            Simplex3dGradient,
            Voronoi2d,
            Voronoi3d,
            Voronoi2dCells,
            Voronoi3dCells,
            Voronoi2dPeriodic,
            Voronoi3dPeriodic,
            Voronoi2dPeriodicCells,
            Voronoi3dPeriodicCells,
        ]
    }

    /// Canonical upper-case name, e.g. `VORONOI_3D_CELLS`.
    pub fn name(&self) -> &'static str {
        match self {
            NoiseVariant::Perlin2d => "PERLIN_2D",
            NoiseVariant::Perlin3d => "PERLIN_3D",
            NoiseVariant::Simplex2d => "SIMPLEX_2D",
            NoiseVariant::Simplex3d => "SIMPLEX_3D",
            NoiseVariant::Simplex2dGradient => "SIMPLEX_2D_GRADIENT",
            NoiseVariant::Simplex3dGradient => "SIMPLEX_3D_GRADIENT",
            NoiseVariant::Voronoi2d => "VORONOI_2D",
            NoiseVariant::Voronoi3d => "VORONOI_3D",
            NoiseVariant::Voronoi2dCells => "VORONOI_2D_CELLS",
            NoiseVariant::Voronoi3dCells => "VORONOI_3D_CELLS",
            NoiseVariant::Voronoi2dPeriodic => "VORONOI_2D_PERIODIC",
            NoiseVariant::Voronoi3dPeriodic => "VORONOI_3D_PERIODIC",
            NoiseVariant::Voronoi2dPeriodicCells => "VORONOI_2D_PERIODIC_CELLS",
            NoiseVariant::Voronoi3dPeriodicCells => "VORONOI_3D_PERIODIC_CELLS",
        }
    }
}

impl fmt::Display for NoiseVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error)]
#[error("Unknown noise variant '{0}'")]
pub struct ParseVariantError(pub String);

impl FromStr for NoiseVariant {
    type Err = ParseVariantError;

    /// Accepts the canonical name case-insensitively, with `-` in place of `_`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        NoiseVariant::all()
            .into_iter()
            .find(|v| v.name() == normalized)
            .ok_or_else(|| ParseVariantError(s.to_string()))
    }
}

/// Output dimensionality of a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DimensionClass {
    D2,
    D3,
}

impl DimensionClass {
    /// Numeric tag used in the texture asset header.
    pub fn tag(&self) -> u8 {
        match self {
            DimensionClass::D2 => 2,
            DimensionClass::D3 => 3,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            2 => Some(DimensionClass::D2),
            3 => Some(DimensionClass::D3),
            _ => None,
        }
    }
}

/// Table deciding which variants produce 2D and which produce 3D output.
///
/// The table is data, not derived from variant names. A variant listed in
/// neither set is unclassified and cannot be generated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantClasses {
    pub two_d: Vec<NoiseVariant>,
    pub three_d: Vec<NoiseVariant>,
}

impl Default for VariantClasses {
    fn default() -> Self {
        use NoiseVariant::*;
        Self {
            two_d: vec![
                Perlin2d,
                Simplex2d,
                Simplex2dGradient,
                Voronoi2d,
                Voronoi2dCells,
                Voronoi2dPeriodic,
                Voronoi2dPeriodicCells,
            ],
            three_d: vec![
                Perlin3d,
                Simplex3d,
                Simplex3dGradient,
                Voronoi3d,
                Voronoi3dCells,
                Voronoi3dPeriodic,
                Voronoi3dPeriodicCells,
            ],
        }
    }
}

impl VariantClasses {
    /// Classifies a variant. The 2D table is consulted first.
    pub fn classify(&self, variant: NoiseVariant) -> Option<DimensionClass> {
        if self.two_d.contains(&variant) {
            Some(DimensionClass::D2)
        } else if self.three_d.contains(&variant) {
            Some(DimensionClass::D3)
        } else {
            None
        }
    }
}
