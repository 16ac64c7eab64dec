//! Point-cloud rasteriser writing glyphs into a drawing surface.

use std::sync::Arc;

use glam::Vec3;
use stardrift_core::{Rgb, Viewport};

use crate::camera::PerspectiveCamera;
use crate::cloud::Scene;
use crate::engine::Engine;
use crate::surface::{DrawingSurface, SurfaceCell};

/// Clear colour used when transparency is off.
const OPAQUE_CLEAR: Rgb = Rgb::from_hex(0x000000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RendererOptions {
    /// Leave empty cells untouched so the host background shows through.
    pub alpha: bool,
    /// Spread each point over neighbouring samples instead of snapping it.
    pub antialias: bool,
}

impl Default for RendererOptions {
    fn default() -> Self {
        Self {
            alpha: true,
            antialias: true,
        }
    }
}

/// Accumulated light in one sub-cell sample.
#[derive(Debug, Clone, Copy, Default)]
struct Sample {
    luminance: f32,
    /// Lower bound on brightness: set where a point's centre lands.
    floor: f32,
    /// Largest single contribution, which decides the colour.
    peak: f32,
    color: Option<Rgb>,
}

impl Sample {
    fn add(&mut self, amount: f32, color: Rgb) {
        self.luminance += amount;
        if amount > self.peak {
            self.peak = amount;
            self.color = Some(color);
        }
    }

    fn mark(&mut self, floor: f32, color: Rgb) {
        self.floor = self.floor.max(floor);
        if self.color.is_none() {
            self.color = Some(color);
        }
    }
}

#[derive(Debug)]
pub struct Renderer {
    surface: DrawingSurface,
    engine: Arc<Engine>,
    options: RendererOptions,
    columns: u16,
    rows: u16,
    pixel_ratio: u8,
    samples: Vec<Sample>,
    frames: u64,
    disposed: bool,
}

impl Renderer {
    /// A renderer bound to `surface`, initially zero-sized.
    pub fn new(surface: DrawingSurface, engine: Arc<Engine>, options: RendererOptions) -> Self {
        Self {
            surface,
            engine,
            options,
            columns: 0,
            rows: 0,
            pixel_ratio: 1,
            samples: Vec::new(),
            frames: 0,
            disposed: false,
        }
    }

    pub fn options(&self) -> RendererOptions {
        self.options
    }

    pub fn set_pixel_ratio(&mut self, pixel_ratio: u8) {
        self.pixel_ratio = pixel_ratio.max(1);
    }

    pub fn pixel_ratio(&self) -> u8 {
        self.pixel_ratio
    }

    /// Resize the output surface to exactly `columns × rows` cells.
    pub fn set_size(&mut self, columns: u16, rows: u16) {
        if self.disposed {
            return;
        }
        self.columns = columns;
        self.rows = rows;
        self.surface.resize(columns, rows);
    }

    /// Apply both size and pixel ratio from a viewport.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.set_pixel_ratio(viewport.pixel_ratio);
        self.set_size(viewport.columns, viewport.rows);
    }

    /// Output size in cells.
    pub fn size(&self) -> (u16, u16) {
        (self.columns, self.rows)
    }

    /// Completed renders.
    pub fn frames_rendered(&self) -> u64 {
        self.frames
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Project, splat and resolve every point of `scene` as seen from `camera`.
    pub fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) {
        if self.disposed || self.columns == 0 || self.rows == 0 {
            return;
        }

        let ratio = self.pixel_ratio as usize;
        let width = self.columns as usize * ratio;
        let height = self.rows as usize * ratio;
        self.samples.clear();
        self.samples.resize(width * height, Sample::default());

        // Apparent size in cells of a unit point at unit depth.
        let scale = self.rows as f32 * 0.5;
        let view = camera.view_matrix();
        let projection = camera.projection_matrix();

        for cloud in scene.objects() {
            let model_view = view * cloud.model_matrix();
            let spec = cloud.spec();
            for &point in cloud.positions() {
                let eye = model_view.transform_point3(point);
                let depth = -eye.z;
                if depth < camera.near || depth > camera.far {
                    continue;
                }
                let clip = projection * eye.extend(1.0);
                let ndc: Vec3 = clip.truncate() / clip.w;
                if ndc.x.abs() > 1.0 || ndc.y.abs() > 1.0 {
                    continue;
                }
                let x = (ndc.x * 0.5 + 0.5) * width as f32;
                let y = (0.5 - ndc.y * 0.5) * height as f32;
                let intensity = spec.point_size * scale / depth;
                self.splat(x, y, intensity, spec.color, width, height);
            }
        }

        self.resolve(width);
        self.frames += 1;
    }

    /// Every projected point lights at least its own sample with the
    /// faintest glyph; depth attenuation only makes it brighter.
    fn splat(&mut self, x: f32, y: f32, amount: f32, color: Rgb, width: usize, height: usize) {
        let sx = (x as usize).min(width - 1);
        let sy = (y as usize).min(height - 1);
        let center = sy * width + sx;
        self.samples[center].mark(self.engine.faintest(), color);
        if !self.options.antialias {
            self.samples[center].add(amount, color);
            return;
        }

        let fx = x - 0.5;
        let fy = y - 0.5;
        let x0 = fx.floor();
        let y0 = fy.floor();
        let tx = fx - x0;
        let ty = fy - y0;
        let taps = [
            (x0, y0, (1.0 - tx) * (1.0 - ty)),
            (x0 + 1.0, y0, tx * (1.0 - ty)),
            (x0, y0 + 1.0, (1.0 - tx) * ty),
            (x0 + 1.0, y0 + 1.0, tx * ty),
        ];
        for (sx, sy, weight) in taps {
            if sx < 0.0 || sy < 0.0 || weight <= 0.0 {
                continue;
            }
            let (sx, sy) = (sx as usize, sy as usize);
            if sx < width && sy < height {
                self.samples[sy * width + sx].add(amount * weight, color);
            }
        }
    }

    /// Collapse samples into cells: a cell's brightness is the light of all
    /// its samples, never less than any floor among them.
    fn resolve(&self, width: usize) {
        let ratio = self.pixel_ratio as usize;
        let cells = (0..self.rows as usize).flat_map(|row| {
            (0..self.columns as usize).map(move |column| {
                let mut cell = Sample::default();
                for sy in row * ratio..(row + 1) * ratio {
                    for sx in column * ratio..(column + 1) * ratio {
                        let sample = self.samples[sy * width + sx];
                        cell.luminance += sample.luminance;
                        cell.floor = cell.floor.max(sample.floor);
                        let brighter = cell.color.is_none() || sample.peak > cell.peak;
                        if sample.color.is_some() && brighter {
                            cell.peak = sample.peak;
                            cell.color = sample.color;
                        }
                    }
                }
                self.shade(cell.luminance.max(cell.floor), cell.color)
            })
        });
        self.surface.write(cells);
    }

    fn shade(&self, brightness: f32, color: Option<Rgb>) -> Option<SurfaceCell> {
        let lit = self
            .engine
            .glyph_for(brightness)
            .zip(color)
            .map(|(glyph, fg)| SurfaceCell {
                glyph,
                fg,
                bg: (!self.options.alpha).then_some(OPAQUE_CLEAR),
            });
        match lit {
            Some(cell) => Some(cell),
            None if self.options.alpha => None,
            None => Some(SurfaceCell {
                glyph: ' ',
                fg: OPAQUE_CLEAR,
                bg: Some(OPAQUE_CLEAR),
            }),
        }
    }

    /// Release sample memory and blank the surface. Later calls do nothing.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.samples = Vec::new();
        self.surface.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::PointCloud;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use stardrift_core::CloudSpec;
    use std::collections::HashSet;

    fn renderer(options: RendererOptions) -> (Renderer, DrawingSurface) {
        let surface = DrawingSurface::new();
        let mut renderer = Renderer::new(surface.clone(), Arc::new(Engine::bundled()), options);
        renderer.set_viewport(Viewport::new(40, 20, 2));
        (renderer, surface)
    }

    fn star_scene(position: Vec3) -> Scene {
        let mut scene = Scene::new();
        scene.add(PointCloud::from_positions(CloudSpec::STARS, vec![position]));
        scene
    }

    fn lit_positions(surface: &DrawingSurface) -> Vec<(u16, u16)> {
        let (columns, rows) = surface.size();
        (0..rows)
            .flat_map(|y| (0..columns).map(move |x| (x, y)))
            .filter(|&(x, y)| surface.cell(x, y).is_some())
            .collect()
    }

    #[test]
    fn test_size_matches_viewport() {
        let (mut renderer, surface) = renderer(RendererOptions::default());
        assert_eq!(surface.size(), (40, 20));
        renderer.set_size(100, 30);
        assert_eq!(renderer.size(), (100, 30));
        assert_eq!(surface.size(), (100, 30));
        assert_eq!(renderer.pixel_ratio(), 2);
    }

    #[test]
    fn test_near_star_lights_center() {
        let (mut renderer, surface) = renderer(RendererOptions::default());
        let camera = PerspectiveCamera::backdrop(Viewport::new(40, 20, 2).aspect());
        // Ten units in front of the camera, on the view axis.
        renderer.render(&star_scene(Vec3::new(0.0, 0.0, 60.0)), &camera);

        assert_eq!(renderer.frames_rendered(), 1);
        let lit = lit_positions(&surface);
        assert!(!lit.is_empty());
        for &(x, y) in &lit {
            assert!((19..=20).contains(&x) && (9..=10).contains(&y), "{x},{y}");
            let cell = surface.cell(x, y).unwrap();
            assert_eq!(cell.fg, CloudSpec::STARS.color);
            assert_eq!(cell.bg, None);
        }
    }

    #[test]
    fn test_distant_star_keeps_faintest_glyph() {
        let (mut renderer, surface) = renderer(RendererOptions::default());
        let camera = PerspectiveCamera::backdrop(Viewport::new(40, 20, 2).aspect());
        // Near the far side of the star cube.
        renderer.render(&star_scene(Vec3::new(0.0, 0.0, -1400.0)), &camera);

        assert_eq!(lit_positions(&surface), vec![(20, 10)]);
        assert_eq!(surface.cell(20, 10).map(|cell| cell.glyph), Some('.'));
    }

    #[test]
    fn test_every_visible_star_lights_its_cell() {
        let viewport = Viewport::new(80, 24, 2);
        let surface = DrawingSurface::new();
        let mut renderer =
            Renderer::new(surface.clone(), Arc::new(Engine::bundled()), RendererOptions::default());
        renderer.set_viewport(viewport);
        let camera = PerspectiveCamera::backdrop(viewport.aspect());
        let mut scene = Scene::new();
        scene.add(PointCloud::generate(CloudSpec::STARS, &mut StdRng::seed_from_u64(42)));

        let view = camera.view_matrix() * scene.objects()[0].model_matrix();
        let projection = camera.projection_matrix();
        let mut visible = HashSet::new();
        for &point in scene.objects()[0].positions() {
            let eye = view.transform_point3(point);
            let depth = -eye.z;
            if depth < camera.near || depth > camera.far {
                continue;
            }
            let clip = projection * eye.extend(1.0);
            let ndc: Vec3 = clip.truncate() / clip.w;
            if ndc.x.abs() > 1.0 || ndc.y.abs() > 1.0 {
                continue;
            }
            let column = (((ndc.x * 0.5 + 0.5) * 160.0) as u16).min(159) / 2;
            let row = (((0.5 - ndc.y * 0.5) * 48.0) as u16).min(47) / 2;
            visible.insert((column, row));
        }

        renderer.render(&scene, &camera);
        assert!(visible.len() > 1_000, "{} visible cells", visible.len());
        for &(column, row) in &visible {
            assert!(surface.cell(column, row).is_some(), "{column},{row} dark");
        }
        assert!(surface.lit_cells() >= visible.len());
    }

    #[test]
    fn test_point_behind_camera_is_culled() {
        let (mut renderer, surface) = renderer(RendererOptions::default());
        let camera = PerspectiveCamera::backdrop(2.0);
        renderer.render(&star_scene(Vec3::new(0.0, 0.0, 200.0)), &camera);
        assert_eq!(surface.lit_cells(), 0);
    }

    #[test]
    fn test_opaque_renderer_fills_every_cell() {
        let options = RendererOptions {
            alpha: false,
            antialias: false,
        };
        let (mut renderer, surface) = renderer(options);
        renderer.render(&Scene::new(), &PerspectiveCamera::backdrop(2.0));
        assert_eq!(surface.lit_cells(), 40 * 20);
        assert_eq!(surface.cell(0, 0).and_then(|cell| cell.bg), Some(OPAQUE_CLEAR));
    }

    #[test]
    fn test_dispose_releases_surface_and_stops_rendering() {
        let (mut renderer, surface) = renderer(RendererOptions::default());
        renderer.dispose();
        assert!(renderer.is_disposed());
        assert_eq!(surface.size(), (0, 0));
        renderer.render(&star_scene(Vec3::new(0.0, 0.0, 60.0)), &PerspectiveCamera::backdrop(2.0));
        assert_eq!(renderer.frames_rendered(), 0);
        renderer.dispose();
    }
}
