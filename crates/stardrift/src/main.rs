mod app;
mod logging;
mod session;

use std::io::stdout;

use stardrift_config::Config;

use crate::app::App;

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let (config, source) = Config::load()?;
    let log_path = logging::init(&config)?;
    log::info!("stardrift starting, logging to {}", log_path.display());
    log::info!("using {source}");

    let terminal = ratatui::init();
    let result = session::with_mouse_capture(&mut stdout(), || App::new(config).run(terminal));
    ratatui::restore();
    result
}
