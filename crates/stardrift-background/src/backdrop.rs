//! The background animation controller.
//!
//! A [`Backdrop`] is mounted onto a [`DrawingSurface`] inside a [`Window`].
//! It obtains the rendering [`Engine`] through a shared [`AssetLoader`],
//! builds the star and dust clouds once the engine is available, and then
//! animates them one step per animation frame until it is dropped.
//!
//! Everything a running backdrop acquires (the surface claim, window
//! listeners, the pending frame, the renderer) is owned by a runtime value
//! whose drop releases it, so teardown happens on every exit path.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;

use glam::{Vec2, Vec3};
use rand::SeedableRng;
use rand::rngs::StdRng;
use stardrift_core::{
    CloudKind, CloudSpec, EASE_FACTOR, PARALLAX_RANGE, PointerState, Viewport,
};

use crate::camera::PerspectiveCamera;
use crate::cloud::{PointCloud, Scene};
use crate::engine::Engine;
use crate::loader::{Acquire, AssetLoader, AssetSource, LoadError, Subscription};
use crate::renderer::{Renderer, RendererOptions};
use crate::surface::{DrawingSurface, SurfaceClaim};
use crate::window::{FrameId, ListenerGuard, Window};

/// Tunables for a backdrop instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackdropSettings {
    pub stars: CloudSpec,
    pub dust: CloudSpec,
    /// Fixed seed for point generation; OS entropy when `None`.
    pub seed: Option<u64>,
    pub renderer: RendererOptions,
}

impl Default for BackdropSettings {
    fn default() -> Self {
        Self {
            stars: CloudSpec::STARS,
            dust: CloudSpec::DUST,
            seed: None,
            renderer: RendererOptions::default(),
        }
    }
}

/// Externally visible lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackdropStatus {
    /// Waiting for the engine to load.
    Waiting,
    /// Animating.
    Running,
    /// The surface was already owned by another backdrop.
    Skipped,
    /// The engine is unavailable; nothing is drawn.
    Inert(LoadError),
}

/// Read-only view of a running backdrop.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneSnapshot {
    pub camera_position: Vec3,
    pub pointer: PointerState,
    pub star_rotation: f32,
    pub dust_rotation: f32,
    pub star_count: usize,
    pub dust_count: usize,
    pub frames_rendered: u64,
    pub surface_size: (u16, u16),
    pub engine_version: String,
}

/// Mutable state shared by the frame loop and the resize listener.
struct SceneState {
    camera: PerspectiveCamera,
    scene: Scene,
    renderer: Renderer,
    engine_version: String,
}

impl SceneState {
    /// One animation step followed by a render.
    fn advance(&mut self, pointer: PointerState) {
        let target = Vec2::new(pointer.x, pointer.y) * PARALLAX_RANGE;
        self.camera.ease_toward(target, EASE_FACTOR);
        self.camera.look_at(Vec3::ZERO);
        for cloud in self.scene.objects_mut() {
            cloud.spin();
        }
        self.renderer.render(&self.scene, &self.camera);
    }

    fn resize(&mut self, viewport: Viewport) {
        self.camera.set_aspect(viewport.aspect());
        self.renderer.set_size(viewport.columns, viewport.rows);
    }

    fn rotation(&self, kind: CloudKind) -> f32 {
        self.scene.cloud(kind).map_or(0.0, PointCloud::rotation)
    }

    fn count(&self, kind: CloudKind) -> usize {
        self.scene.cloud(kind).map_or(0, PointCloud::len)
    }
}

/// Re-arming frame loop; cancels its pending frame on drop.
struct FrameLoop {
    window: Window,
    pending: Rc<Cell<Option<FrameId>>>,
}

impl FrameLoop {
    fn start(
        window: &Window,
        state: &Rc<RefCell<SceneState>>,
        pointer: &Rc<Cell<PointerState>>,
    ) -> Self {
        let pending = Rc::new(Cell::new(None));
        schedule_frame(window, state, pointer, &pending);
        Self {
            window: window.clone(),
            pending,
        }
    }
}

fn schedule_frame(
    window: &Window,
    state: &Rc<RefCell<SceneState>>,
    pointer: &Rc<Cell<PointerState>>,
    pending: &Rc<Cell<Option<FrameId>>>,
) {
    let handle = window.downgrade();
    let state = Rc::clone(state);
    let pointer = Rc::clone(pointer);
    let next = Rc::clone(pending);
    let id = window.request_animation_frame(move |_| {
        if let Some(window) = handle.upgrade() {
            schedule_frame(&window, &state, &pointer, &next);
        }
        state.borrow_mut().advance(pointer.get());
    });
    pending.set(Some(id));
}

impl Drop for FrameLoop {
    fn drop(&mut self) {
        if let Some(id) = self.pending.take() {
            self.window.cancel_animation_frame(id);
        }
    }
}

/// Everything owned by an initialized backdrop. Fields drop in declaration order.
struct Runtime {
    _frame_loop: FrameLoop,
    _pointer_listener: ListenerGuard,
    _resize_listener: ListenerGuard,
    pointer: Rc<Cell<PointerState>>,
    state: Rc<RefCell<SceneState>>,
    _claim: SurfaceClaim,
}

impl Runtime {
    fn start(
        surface: &DrawingSurface,
        window: &Window,
        engine: Arc<Engine>,
        settings: &BackdropSettings,
        claim: SurfaceClaim,
    ) -> Self {
        let viewport = window.viewport();
        let camera = PerspectiveCamera::backdrop(viewport.aspect());

        let engine_version = engine.version.clone();
        let mut renderer = Renderer::new(surface.clone(), engine, settings.renderer);
        renderer.set_viewport(viewport);

        let mut rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let mut scene = Scene::new();
        scene.add(PointCloud::generate(settings.stars, &mut rng));
        scene.add(PointCloud::generate(settings.dust, &mut rng));

        let state = Rc::new(RefCell::new(SceneState {
            camera,
            scene,
            renderer,
            engine_version,
        }));

        let pointer = Rc::new(Cell::new(PointerState::default()));
        let sink = Rc::clone(&pointer);
        let pointer_listener = window.add_pointer_listener(move |event| {
            sink.set(PointerState::from_cell(event.column, event.row, event.viewport));
        });

        let frame_loop = FrameLoop::start(window, &state, &pointer);

        let resized = Rc::clone(&state);
        let resize_listener = window.add_resize_listener(move |viewport| {
            resized.borrow_mut().resize(viewport);
        });

        Self {
            _frame_loop: frame_loop,
            _pointer_listener: pointer_listener,
            _resize_listener: resize_listener,
            pointer,
            state,
            _claim: claim,
        }
    }

    fn snapshot(&self) -> SceneSnapshot {
        let state = self.state.borrow();
        SceneSnapshot {
            camera_position: state.camera.position,
            pointer: self.pointer.get(),
            star_rotation: state.rotation(CloudKind::Stars),
            dust_rotation: state.rotation(CloudKind::Dust),
            star_count: state.count(CloudKind::Stars),
            dust_count: state.count(CloudKind::Dust),
            frames_rendered: state.renderer.frames_rendered(),
            surface_size: state.renderer.size(),
            engine_version: state.engine_version.clone(),
        }
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        self.state.borrow_mut().renderer.dispose();
    }
}

enum Status {
    Waiting(Subscription<Engine>),
    Running(Box<Runtime>),
    Skipped,
    Inert(LoadError),
}

/// The background animation controller.
pub struct Backdrop {
    surface: DrawingSurface,
    window: Window,
    settings: BackdropSettings,
    status: Status,
}

impl Backdrop {
    /// Mount onto `surface`, obtaining the engine through `loader`.
    ///
    /// If the engine is already loaded the backdrop starts immediately.
    /// If a load is in flight it attaches to it; otherwise it starts one
    /// from `source`. A previously failed load leaves the backdrop inert.
    pub fn mount<S>(
        surface: DrawingSurface,
        window: Window,
        loader: &AssetLoader<Engine>,
        source: S,
        settings: BackdropSettings,
    ) -> Self
    where
        S: AssetSource<Asset = Engine>,
    {
        let status = match loader.acquire(source) {
            Acquire::Ready(engine) => {
                return Self::running(surface, window, settings, engine);
            }
            Acquire::Pending(subscription) => Status::Waiting(subscription),
            Acquire::Unavailable(err) => {
                log::warn!("backdrop disabled, engine unavailable: {err}");
                Status::Inert(err)
            }
        };
        Self {
            surface,
            window,
            settings,
            status,
        }
    }

    fn running(
        surface: DrawingSurface,
        window: Window,
        settings: BackdropSettings,
        engine: Arc<Engine>,
    ) -> Self {
        let mut backdrop = Self {
            surface,
            window,
            settings,
            status: Status::Skipped,
        };
        backdrop.initialize(engine);
        backdrop
    }

    /// Deliver a finished engine load, if any. Returns `true` when the status changed.
    pub fn poll(&mut self) -> bool {
        let Status::Waiting(subscription) = &self.status else {
            return false;
        };
        match subscription.try_take() {
            None => false,
            Some(Ok(engine)) => {
                self.initialize(engine);
                true
            }
            Some(Err(err)) => {
                log::warn!("backdrop disabled, engine unavailable: {err}");
                self.status = Status::Inert(err);
                true
            }
        }
    }

    fn initialize(&mut self, engine: Arc<Engine>) {
        let Some(claim) = self.surface.claim() else {
            log::debug!("drawing surface already initialized, skipping backdrop");
            self.status = Status::Skipped;
            return;
        };
        let version = engine.version.clone();
        let runtime = Runtime::start(&self.surface, &self.window, engine, &self.settings, claim);
        log::info!(
            "backdrop running with engine {version}: {} stars, {} dust",
            self.settings.stars.count,
            self.settings.dust.count
        );
        self.status = Status::Running(Box::new(runtime));
    }

    pub fn status(&self) -> BackdropStatus {
        match &self.status {
            Status::Waiting(_) => BackdropStatus::Waiting,
            Status::Running(_) => BackdropStatus::Running,
            Status::Skipped => BackdropStatus::Skipped,
            Status::Inert(err) => BackdropStatus::Inert(err.clone()),
        }
    }

    /// Current animation state, if the backdrop is running.
    pub fn snapshot(&self) -> Option<SceneSnapshot> {
        match &self.status {
            Status::Running(runtime) => Some(runtime.snapshot()),
            _ => None,
        }
    }

    pub fn surface(&self) -> &DrawingSurface {
        &self.surface
    }

    /// Tear down explicitly. Dropping the backdrop does the same.
    pub fn unmount(self) {}
}

impl Drop for Backdrop {
    fn drop(&mut self) {
        if matches!(self.status, Status::Running(_)) {
            log::debug!("tearing down backdrop");
        }
    }
}
