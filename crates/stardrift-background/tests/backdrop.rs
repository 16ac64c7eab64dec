use std::thread;
use std::time::{Duration, Instant};

use stardrift_background::{
    AssetLoader, Backdrop, BackdropSettings, BackdropStatus, BundledEngine, DrawingSurface, Engine,
    Window,
};
use stardrift_core::{CloudSpec, Viewport};

fn settle(backdrop: &mut Backdrop) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !backdrop.poll() {
        assert!(Instant::now() < deadline, "engine load never settled");
        thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn test_pointer_parallax_end_to_end() {
    let window = Window::new(Viewport::new(80, 24, 2));
    let surface = DrawingSurface::new();
    let loader: AssetLoader<Engine> = AssetLoader::new();
    let settings = BackdropSettings {
        stars: CloudSpec::STARS.with_count(2_000),
        dust: CloudSpec::DUST.with_count(1_000),
        seed: Some(42),
        ..Default::default()
    };

    let mut backdrop = Backdrop::mount(surface.clone(), window.clone(), &loader, BundledEngine, settings);
    assert_eq!(backdrop.status(), BackdropStatus::Waiting);
    settle(&mut backdrop);
    assert_eq!(backdrop.status(), BackdropStatus::Running);
    assert_eq!(surface.size(), (80, 24));

    // Bottom-right corner: pointer (1, -1).
    window.dispatch_pointer_move(80, 24);
    for _ in 0..200 {
        window.run_animation_frame();
        let position = backdrop.snapshot().unwrap().camera_position;
        assert!(position.x <= 4.0 && position.y >= -4.0);
    }

    let snap = backdrop.snapshot().unwrap();
    assert!((snap.camera_position.x - 4.0).abs() < 1e-3);
    assert!((snap.camera_position.y + 4.0).abs() < 1e-3);
    assert!(snap.star_rotation < 0.0 && snap.dust_rotation < snap.star_rotation);
    assert_eq!(snap.frames_rendered, 200);
    assert!(surface.lit_cells() > 0);

    backdrop.unmount();
    assert_eq!(window.listener_count(), 0);
    assert_eq!(window.pending_frames(), 0);
    assert!(!surface.is_initialized());
}

#[test]
fn test_engine_loads_once_across_mounts() {
    let window = Window::new(Viewport::default());
    let loader: AssetLoader<Engine> = AssetLoader::new();

    let mut first = Backdrop::mount(
        DrawingSurface::new(),
        window.clone(),
        &loader,
        BundledEngine,
        BackdropSettings::default(),
    );
    settle(&mut first);
    drop(first);

    let second = Backdrop::mount(
        DrawingSurface::new(),
        window.clone(),
        &loader,
        BundledEngine,
        BackdropSettings {
            stars: CloudSpec::STARS.with_count(10),
            dust: CloudSpec::DUST.with_count(10),
            ..Default::default()
        },
    );
    assert_eq!(second.status(), BackdropStatus::Running);
    assert_eq!(second.snapshot().unwrap().engine_version, "r128");
}

#[test]
fn test_default_backdrop_fills_the_terminal() {
    let window = Window::new(Viewport::new(80, 24, 2));
    let surface = DrawingSurface::new();
    let loader = AssetLoader::preloaded(Engine::bundled());
    let settings = BackdropSettings {
        seed: Some(42),
        ..Default::default()
    };
    let backdrop = Backdrop::mount(surface.clone(), window.clone(), &loader, BundledEngine, settings);
    assert_eq!(window.run_animation_frame(), 1);

    assert_eq!(backdrop.snapshot().unwrap().frames_rendered, 1);
    let lit = surface.lit_cells();
    assert!(lit > 80 * 24 / 2, "only {lit} of {} cells lit", 80 * 24);
}
