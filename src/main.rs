use ::rand as external_rand;
use clap::Parser;
use external_rand::rngs::StdRng;
use external_rand::SeedableRng;
use tracing_subscriber::EnvFilter;

mod config;
mod driver;
mod error;
mod field;
mod particle;
mod surface;
mod types;

use config::FieldConfig;
use field::ParticleField;
use types::Bounds;

#[cfg(feature = "ui")]
mod controls;
#[cfg(feature = "ui")]
mod visualization;

mod api;

#[cfg(feature = "ui")]
use macroquad::prelude::*;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Run in headless mode (HTTP API server)
    #[arg(long)]
    headless: bool,

    /// Port for headless API server
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Configuration file path (YAML or JSON). If not specified, searches for config.yaml, config.yml, or config.json in current directory.
    #[arg(short, long)]
    config: Option<String>,

    /// Seed for particle placement and turbulence
    #[arg(long)]
    seed: Option<u64>,

    /// Loop forever instead of stopping after the configured duration
    #[arg(long = "loop")]
    looping: bool,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

#[cfg(not(feature = "ui"))]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Headless mode only
    init_tracing();
    let args = Args::parse();
    let config = load_config(&args)?;
    headless_main(args.port, args.seed, config).await
}

#[cfg(feature = "ui")]
#[macroquad::main(window_conf)]
async fn main() {
    init_tracing();
    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("error loading config: {}", e);
            std::process::exit(1);
        }
    };

    if args.headless {
        // Run headless mode even with UI feature enabled
        let rt = match tokio::runtime::Runtime::new() {
            Ok(rt) => rt,
            Err(e) => {
                tracing::error!("failed to start runtime: {}", e);
                std::process::exit(1);
            }
        };
        rt.block_on(async {
            if let Err(e) = headless_main(args.port, args.seed, config).await {
                tracing::error!("error running headless mode: {}", e);
                std::process::exit(1);
            }
        });
    } else if let Err(e) = ui_main(config, args.seed).await {
        tracing::error!("error running window: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from file or use default, then apply CLI overrides
fn load_config(args: &Args) -> Result<FieldConfig, Box<dyn std::error::Error>> {
    let mut config = match args.config.as_deref() {
        Some(path) => FieldConfig::from_file(path)?,
        None => FieldConfig::from_default_paths(),
    };
    if args.looping {
        config.play_once = false;
    }
    Ok(config)
}

#[cfg(feature = "ui")]
async fn ui_main(config: FieldConfig, seed: Option<u64>) -> Result<(), Box<dyn std::error::Error>> {
    use controls::{handle_controls, UiState};
    use driver::FrameLoop;
    use visualization::{draw_hint, draw_stats, MacroquadSurface};

    let mut rng = make_rng(seed);
    let looping = !config.play_once;

    // A window without area cannot host the field
    let bounds = Bounds::new(screen_width(), screen_height())?;
    let mut field = ParticleField::new(config, bounds)?;
    let mut surface = MacroquadSurface::new(bounds.width as u32, bounds.height as u32);
    let mut frame_loop = FrameLoop::new();
    let mut ui = UiState::new(looping);

    surface.begin();
    frame_loop.start(&mut field, &mut rng, &mut surface);

    loop {
        // Follow window resizes; positions stay, only future frames see new bounds
        let (w, h) = (screen_width(), screen_height());
        if (w as u32, h as u32) != surface.size() {
            if let Ok(bounds) = Bounds::new(w, h) {
                field.resize(bounds);
                surface.resize(w as u32, h as u32);
            }
        }

        handle_controls(&mut ui, &mut field, &mut frame_loop, &mut surface, &mut rng);
        if ui.quit {
            break;
        }

        surface.begin();
        frame_loop.tick(&mut field, get_time() * 1000.0, &mut surface, &mut rng);
        surface.present();

        if ui.stats_visible {
            draw_stats(&field, &frame_loop, ui.looping);
        } else {
            draw_hint();
        }

        if ui.take_screenshot {
            ui.take_screenshot = false;
            let timestamp = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default();
            let filename = format!("particlefield_{}.png", timestamp);

            match capture_screenshot(&filename) {
                Ok(_) => tracing::info!("screenshot saved: {}", filename),
                Err(e) => tracing::warn!("failed to save screenshot {}: {}", filename, e),
            }
        }

        next_frame().await;
    }

    Ok(())
}

#[cfg(feature = "ui")]
fn window_conf() -> Conf {
    // Window size comes from the config when one is found, defaults otherwise
    let config = FieldConfig::from_default_paths();

    Conf {
        window_title: "Particle Field".to_owned(),
        window_width: config.window_width as i32,
        window_height: config.window_height as i32,
        window_resizable: true,
        ..Default::default()
    }
}

#[cfg(feature = "ui")]
/// Capture a screenshot of the current screen
fn capture_screenshot(filename: &str) -> Result<(), Box<dyn std::error::Error>> {
    let screen_image = get_screen_data();

    let width = screen_image.width as u32;
    let height = screen_image.height as u32;
    let bytes = &screen_image.bytes;

    let mut img = image::RgbaImage::new(width, height);

    // OpenGL origin is bottom-left, image origin is top-left
    for y in 0..height {
        for x in 0..width {
            let idx = (y * width + x) as usize * 4;
            if idx + 3 < bytes.len() {
                let img_y = height - 1 - y;
                img.put_pixel(
                    x,
                    img_y,
                    image::Rgba([bytes[idx], bytes[idx + 1], bytes[idx + 2], bytes[idx + 3]]),
                );
            }
        }
    }

    img.save(filename)?;

    Ok(())
}

/// Headless mode - runs HTTP API server
async fn headless_main(
    port: u16,
    seed: Option<u64>,
    config: FieldConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    use api::{run_server, ApiState, Headless};

    let bounds = Bounds::new(config.window_width as f32, config.window_height as f32)?;
    let field = ParticleField::new(config, bounds)?;
    let api_state = ApiState::new(Headless::new(field, make_rng(seed)));

    run_server(api_state, port).await?;

    Ok(())
}
