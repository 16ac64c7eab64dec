//! Starfield backdrop rendering for stardrift.
//!
//! This crate provides the animated star and dust clouds drawn behind the
//! terminal UI: a shared load-once engine loader, a perspective camera with
//! pointer parallax, a point rasteriser that writes glyphs into a drawing
//! surface, and the [`Backdrop`] controller that ties them to a window's
//! listeners and animation frames.

mod backdrop;
mod camera;
mod chars;
mod cloud;
mod engine;
mod loader;
mod renderer;
mod surface;
mod window;

pub use backdrop::{Backdrop, BackdropSettings, BackdropStatus, SceneSnapshot};
pub use camera::PerspectiveCamera;
pub use cloud::{PointCloud, Scene};
pub use engine::{BundledEngine, Engine, RampStep, RemoteEngine};
pub use loader::{Acquire, AssetLoader, AssetSource, LoadError, LoadOutcome, LoadPhase, Subscription};
pub use renderer::{Renderer, RendererOptions};
pub use surface::{DrawingSurface, SurfaceCell, SurfaceClaim};
pub use window::{FrameId, ListenerGuard, PointerMove, Window, WeakWindow};
