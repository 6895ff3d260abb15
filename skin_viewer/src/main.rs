//! Headless skin viewer
//!
//! Loads a skin, activates one of its windows and drives a number of frames
//! into a recording render target, then prints what was drawn and how the
//! texture cache was used.
//!
//! Usage: `skin_viewer [config.toml|config.ron] [Window.xml] [frames]`

use skin_gui::foundation::logging;
use skin_gui::prelude::*;
use skin_gui::render::RenderError;
use std::time::Duration;

const VIEWER_WINDOW: i32 = 10000;

#[derive(Debug, thiserror::Error)]
enum ViewerError {
    #[error("Config error: {0}")]
    Config(#[from] skin_gui::config::ConfigError),

    #[error("Window '{0}' could not be shown")]
    Window(String),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Invalid frame count '{0}'")]
    Frames(String),
}

struct Args {
    config: Option<String>,
    window: String,
    frames: u32,
}

fn parse_args() -> Result<Args, ViewerError> {
    let mut args = std::env::args().skip(1);
    let config = args.next().filter(|arg| arg != "-");
    let window = args.next().unwrap_or_else(|| "Home.xml".to_string());
    let frames = match args.next() {
        Some(text) => text.parse().map_err(|_| ViewerError::Frames(text))?,
        None => 60,
    };
    Ok(Args { config, window, frames })
}

fn run() -> Result<(), ViewerError> {
    let args = parse_args()?;
    let config = match &args.config {
        Some(path) => {
            log::info!("Loading configuration from {}", path);
            GuiConfig::load_from_file(path)?
        }
        None => GuiConfig::default(),
    };

    let context = GuiContext::new(config);
    let mut windows = WindowManager::new(context.clone());
    windows.register(VIEWER_WINDOW, &args.window);
    windows.initialize();
    if !windows.activate_window(VIEWER_WINDOW) {
        return Err(ViewerError::Window(args.window));
    }

    let mut clock = FrameClock::new();
    let mut frame = DrawList::new();
    let mut textures_drawn = 0;
    let mut text_drawn = 0;
    for _ in 0..args.frames {
        let now = clock.tick();
        windows.process(now);
        frame.clear();
        windows.render(&mut frame)?;
        textures_drawn += frame.texture_draws();
        text_drawn += frame.text_draws();
        for event in windows.take_events() {
            log::info!("Unhandled {:?} from control {}", event.id, event.control_id);
        }
        std::thread::sleep(Duration::from_millis(16));
    }

    if let Some(window) = windows.window(VIEWER_WINDOW) {
        let tree = window.tree();
        let allocated = tree
            .keys()
            .into_iter()
            .filter(|key| tree.get(*key).is_some_and(|c| c.base().is_allocated()))
            .count();
        println!("Window:            {} ({})", args.window, VIEWER_WINDOW);
        println!("Controls:          {} ({} allocated)", tree.len(), allocated);
        println!("Focused control:   {:?}", window.focused_control_id());
    }
    println!("Frames:            {}", clock.frame_count());
    println!("Texture draws:     {}", textures_drawn);
    println!("Text draws:        {}", text_drawn);
    println!("Cached textures:   {}", context.textures.entry_count());
    println!("Texture decodes:   {}", context.textures.decode_count());

    windows.shutdown();
    Ok(())
}

fn main() {
    logging::init_with_level(logging::LevelFilter::Info);
    if let Err(err) = run() {
        log::error!("{}", err);
        std::process::exit(1);
    }
}
