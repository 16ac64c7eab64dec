//! Parameters of the two backdrop point clouds.

use crate::Rgb;

/// Which of the two point clouds a spec describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloudKind {
    /// Sparse far-reaching starfield.
    Stars,
    /// Denser, shorter-range dust.
    Dust,
}

/// Generation and appearance parameters of a point cloud.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CloudSpec {
    pub kind: CloudKind,
    /// Number of points generated.
    pub count: usize,
    /// Side length of the cube the points are spread over, centred at the origin.
    pub extent: f32,
    /// Point size in world units, attenuated by view depth.
    pub point_size: f32,
    pub color: Rgb,
    /// Rotation about the vertical axis applied every frame, in radians.
    pub spin: f32,
}

impl CloudSpec {
    pub const STARS: Self = Self {
        kind: CloudKind::Stars,
        count: 40_000,
        extent: 3000.0,
        point_size: 0.25,
        color: Rgb::from_hex(0x6c757d),
        spin: -0.00025,
    };

    pub const DUST: Self = Self {
        kind: CloudKind::Dust,
        count: 20_000,
        extent: 2500.0,
        point_size: 0.3,
        color: Rgb::from_hex(0x495057),
        spin: -0.00032,
    };

    /// Half the cube side: every coordinate lies within `[-half, half]`.
    pub fn half_extent(&self) -> f32 {
        self.extent / 2.0
    }

    /// Same spec with a different point count.
    pub fn with_count(self, count: usize) -> Self {
        Self { count, ..self }
    }
}

impl CloudKind {
    /// Default spec for this cloud.
    pub fn spec(self) -> CloudSpec {
        match self {
            CloudKind::Stars => CloudSpec::STARS,
            CloudKind::Dust => CloudSpec::DUST,
        }
    }
}
