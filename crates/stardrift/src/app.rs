use std::time::{Duration, Instant};

use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEvent, MouseEventKind,
};
use ratatui::{
    DefaultTerminal, Frame,
    layout::{Constraint, Layout},
    style::{Color, Style, Stylize},
    text::Line,
    widgets::Block,
};
use stardrift_background::{
    AssetLoader, Backdrop, BackdropSettings, BackdropStatus, BundledEngine, DrawingSurface, Engine,
    RemoteEngine, RendererOptions, Window,
};
use stardrift_config::{Config, EngineSource};
use stardrift_core::{CloudSpec, Viewport};

/// The main application: owns the page layout and drives the backdrop.
pub struct App {
    /// Is the application running?
    running: bool,
    config: Config,
    window: Window,
    surface: DrawingSurface,
    /// Shared by every backdrop mounted during this run.
    loader: AssetLoader<Engine>,
    backdrop: Option<Backdrop>,
}

impl App {
    /// Construct a new instance of [`App`]. Nothing is mounted until [`App::run`].
    pub fn new(config: Config) -> Self {
        let window = Window::new(Viewport::new(0, 0, config.pixel_ratio));
        Self {
            running: false,
            config,
            window,
            surface: DrawingSurface::new(),
            loader: AssetLoader::new(),
            backdrop: None,
        }
    }

    /// Run the application's main loop, one tick per animation frame.
    pub fn run(mut self, mut terminal: DefaultTerminal) -> color_eyre::Result<()> {
        let size = terminal.size()?;
        self.window.resize(size.width, size.height);
        self.remount();

        let interval = frame_interval(self.config.frame_rate);
        let mut deadline = Instant::now();
        self.running = true;
        while self.running {
            let timeout = deadline.saturating_duration_since(Instant::now());
            if event::poll(timeout)? {
                self.handle_event(event::read()?);
                continue;
            }
            self.tick();
            terminal.draw(|frame| self.render(frame))?;
            deadline = next_deadline(deadline, interval, Instant::now());
        }
        self.unmount();
        Ok(())
    }

    /// Deliver any finished engine load, then advance the animation.
    fn tick(&mut self) {
        if let Some(backdrop) = self.backdrop.as_mut() {
            backdrop.poll();
        }
        self.window.run_animation_frame();
    }

    /// Renders the page: background, backdrop, then the overlay.
    fn render(&self, frame: &mut Frame) {
        let area = frame.area();
        frame.render_widget(
            Block::new().style(Style::new().bg(self.config.background.into())),
            area,
        );
        frame.render_widget(&self.surface, area);

        let chunks = Layout::vertical([
            Constraint::Fill(1),   // Top padding
            Constraint::Length(1), // Title
            Constraint::Length(1), // Engine status
            Constraint::Fill(1),   // Bottom padding
            Constraint::Length(1), // Help text
        ])
        .split(area);

        let title = Line::from("s t a r d r i f t".bold().fg(Color::Gray)).centered();
        frame.render_widget(title, chunks[1]);

        let status = Line::from(self.status_line().dark_gray()).centered();
        frame.render_widget(status, chunks[2]);

        let help = Line::from(vec![
            "q".bold().fg(Color::Gray),
            " quit  ".dark_gray(),
            "r".bold().fg(Color::Gray),
            " remount".dark_gray(),
        ])
        .centered();
        frame.render_widget(help, chunks[4]);
    }

    fn status_line(&self) -> String {
        let Some(backdrop) = &self.backdrop else {
            return String::new();
        };
        match backdrop.status() {
            BackdropStatus::Waiting => "loading engine...".to_string(),
            BackdropStatus::Running => backdrop
                .snapshot()
                .map(|snap| {
                    format!(
                        "engine {} | {} stars | {} dust",
                        snap.engine_version, snap.star_count, snap.dust_count
                    )
                })
                .unwrap_or_default(),
            BackdropStatus::Skipped => "surface busy".to_string(),
            BackdropStatus::Inert(err) => format!("backdrop unavailable: {err}"),
        }
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => self.on_key_event(key),
            Event::Mouse(mouse) => self.on_mouse_event(mouse),
            Event::Resize(columns, rows) => self.window.resize(columns, rows),
            _ => {}
        }
    }

    /// Handles the key events and updates the state of [`App`].
    fn on_key_event(&mut self, key: KeyEvent) {
        match (key.modifiers, key.code) {
            (_, KeyCode::Esc | KeyCode::Char('q'))
            | (KeyModifiers::CONTROL, KeyCode::Char('c') | KeyCode::Char('C')) => self.quit(),
            (_, KeyCode::Char('r')) => self.remount(),
            _ => {}
        }
    }

    fn on_mouse_event(&mut self, mouse: MouseEvent) {
        if let MouseEventKind::Moved | MouseEventKind::Drag(_) = mouse.kind {
            self.window.dispatch_pointer_move(mouse.column, mouse.row);
        }
    }

    /// Tear down the current backdrop and mount a fresh one on the same surface.
    fn remount(&mut self) {
        self.unmount();
        self.backdrop = Some(self.mount());
    }

    fn unmount(&mut self) {
        if let Some(backdrop) = self.backdrop.take() {
            backdrop.unmount();
        }
    }

    fn mount(&self) -> Backdrop {
        let settings = self.backdrop_settings();
        let surface = self.surface.clone();
        let window = self.window.clone();
        let engine = &self.config.engine;
        match (engine.source, &engine.url) {
            (EngineSource::Remote, Some(url)) => {
                let source = RemoteEngine::new(url.clone(), Duration::from_secs(engine.timeout_secs));
                Backdrop::mount(surface, window, &self.loader, source, settings)
            }
            _ => Backdrop::mount(surface, window, &self.loader, BundledEngine, settings),
        }
    }

    fn backdrop_settings(&self) -> BackdropSettings {
        let backdrop = &self.config.backdrop;
        BackdropSettings {
            stars: CloudSpec::STARS.with_count(backdrop.star_count),
            dust: CloudSpec::DUST.with_count(backdrop.dust_count),
            seed: backdrop.seed,
            renderer: RendererOptions::default(),
        }
    }

    /// Set running to false to quit the application.
    fn quit(&mut self) {
        self.running = false;
    }
}

/// Time between ticks for a frame rate.
fn frame_interval(frame_rate: u32) -> Duration {
    Duration::from_secs(1) / frame_rate.max(1)
}

/// The tick after `deadline`, skipping ahead if the loop fell behind.
fn next_deadline(deadline: Instant, interval: Duration, now: Instant) -> Instant {
    let next = deadline + interval;
    if next < now { now + interval } else { next }
}
