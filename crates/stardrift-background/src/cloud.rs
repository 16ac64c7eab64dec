//! Procedurally generated point clouds and the scene that holds them.

use glam::{Mat4, Vec3};
use rand::Rng;
use stardrift_core::{CloudKind, CloudSpec};

/// A fixed set of points that can only be rotated as a whole.
#[derive(Debug, Clone)]
pub struct PointCloud {
    spec: CloudSpec,
    positions: Vec<Vec3>,
    /// Accumulated rotation about the Y axis, in radians.
    rotation_y: f32,
}

impl PointCloud {
    /// Scatter `spec.count` points uniformly through the spec's cube.
    pub fn generate<R: Rng>(spec: CloudSpec, rng: &mut R) -> Self {
        let positions = (0..spec.count)
            .map(|_| {
                Vec3::new(
                    spread(rng, spec.extent),
                    spread(rng, spec.extent),
                    spread(rng, spec.extent),
                )
            })
            .collect();
        Self {
            spec,
            positions,
            rotation_y: 0.0,
        }
    }

    /// A cloud with explicit positions; `spec.count` is ignored.
    pub fn from_positions(spec: CloudSpec, positions: Vec<Vec3>) -> Self {
        Self {
            spec: CloudSpec {
                count: positions.len(),
                ..spec
            },
            positions,
            rotation_y: 0.0,
        }
    }

    pub fn spec(&self) -> &CloudSpec {
        &self.spec
    }

    pub fn kind(&self) -> CloudKind {
        self.spec.kind
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn rotation(&self) -> f32 {
        self.rotation_y
    }

    /// Advance the rotation by one frame's worth of spin.
    pub fn spin(&mut self) {
        self.rotation_y += self.spec.spin;
    }

    /// Object-to-world transform.
    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_rotation_y(self.rotation_y)
    }
}

/// Uniform value in `(-range / 2, range / 2]`.
fn spread<R: Rng>(rng: &mut R, range: f32) -> f32 {
    range * (0.5 - rng.random::<f32>())
}

/// The drawable objects of the backdrop.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    objects: Vec<PointCloud>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, cloud: PointCloud) {
        self.objects.push(cloud);
    }

    pub fn objects(&self) -> &[PointCloud] {
        &self.objects
    }

    pub fn objects_mut(&mut self) -> &mut [PointCloud] {
        &mut self.objects
    }

    /// First cloud of the given kind.
    pub fn cloud(&self, kind: CloudKind) -> Option<&PointCloud> {
        self.objects.iter().find(|cloud| cloud.kind() == kind)
    }
}
