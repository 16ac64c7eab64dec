//! Core types shared by the stardrift crates.
//!
//! Colours, the terminal viewport, normalized pointer coordinates and the
//! fixed parameters of the two point clouds and the parallax camera.

mod cloud;
mod color;
mod viewport;

pub use cloud::{CloudKind, CloudSpec};
pub use color::{ParseColorError, Rgb};
pub use viewport::{CELL_ASPECT, PointerState, Viewport};

/// Page background painted by the layout owner behind the backdrop.
pub const PAGE_BACKGROUND: Rgb = Rgb::from_hex(0x01020a);

/// Vertical field of view of the backdrop camera, in degrees.
pub const CAMERA_FOV_DEG: f32 = 75.0;

/// Near clipping plane of the backdrop camera.
pub const CAMERA_NEAR: f32 = 0.1;

/// Far clipping plane of the backdrop camera.
pub const CAMERA_FAR: f32 = 2000.0;

/// Initial distance of the camera from the origin along +Z.
pub const CAMERA_DISTANCE: f32 = 70.0;

/// Camera displacement for a pointer at the edge of the viewport.
pub const PARALLAX_RANGE: f32 = 4.0;

/// Fraction of the remaining distance the camera covers each frame.
pub const EASE_FACTOR: f32 = 0.06;
