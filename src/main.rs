mod window;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use winit::event_loop::{ControlFlow, EventLoop};

use physarum::diagnostics::derive_seed;
use physarum::palette::PaletteHex;
use physarum::{
    AgentLayerConfig, Diagnostics, GpuContext, LandscapePattern, Palette, Physarum,
    SimulationConfig, SpawnContext, SpawnShape,
};

/// Deterministic multi-species slime mold on the GPU.
#[derive(Debug, Parser)]
#[command(name = "physarum", version, about, long_about = None)]
struct Args {
    /// JSON run description. Other flags override its fields.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Master seed string.
    #[arg(long)]
    seed: Option<String>,
    /// Domain size expressed as WIDTHxHEIGHT (for example 512x512).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size)]
    size: Option<(u32, u32)>,
    /// Preset index or four hyphenated hex colors, background first.
    #[arg(long, value_name = "INDEX|HEX-HEX-HEX-HEX", value_parser = parse_palette)]
    palette: Option<PaletteHex>,
    /// Steps to run before exporting in headless mode.
    #[arg(long, value_name = "N", default_value_t = 500)]
    steps: u64,
    /// Run without a window and save one image.
    #[arg(long)]
    headless: bool,
    /// Image path for headless and S-key exports.
    #[arg(long, value_name = "FILE", default_value = "physarum.png")]
    out: PathBuf,
}

fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let (w, h) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| "expected format WIDTHxHEIGHT".to_string())?;
    let parse = |v: &str, what: &str| match v.trim().parse::<u32>() {
        Ok(0) | Err(_) => Err(format!("invalid {}: {}", what, v)),
        Ok(n) => Ok(n),
    };
    Ok((parse(w, "width")?, parse(h, "height")?))
}

fn parse_palette(value: &str) -> Result<PaletteHex, String> {
    if let Ok(index) = value.parse::<usize>() {
        return Ok(PaletteHex::preset(index));
    }
    value.parse::<Palette>().map_err(|e| e.to_string())?;
    let mut colors = value.split('-').map(|c| c.trim().to_string());
    Ok(PaletteHex(std::array::from_fn(|_| colors.next().unwrap_or_default())))
}

/// Two competing species on a ring landscape, scaled to the domain.
fn default_config(seed: &str, width: u32, height: u32) -> SimulationConfig {
    let count = (width as usize * height as usize / 12).max(1);
    let mut spawn = SpawnContext::new(width, height, derive_seed(seed, "spawn"));
    let ring = SpawnShape::Ring { radius: 0.3 }.spawn(&mut spawn, count);
    let scattered = SpawnShape::Distributed.spawn(&mut spawn, count / 2);

    SimulationConfig::new(seed, width, height)
        .with_landscape(LandscapePattern::CentralCircle {
            radius: 0.35,
            line_width: 0.08,
        })
        .with_layer(
            AgentLayerConfig::new(ring)
                .with_sensor(9.0, std::f32::consts::PI / 4.0)
                .with_tex_scale([1.0, -0.5, 0.0])
                .with_land_scale(-0.5),
        )
        .with_layer(
            AgentLayerConfig::new(scattered)
                .with_sensor(18.0, std::f32::consts::PI / 6.0)
                .with_rotation_amount(std::f32::consts::PI / 4.0)
                .with_tex_scale([-0.5, 1.0, 0.0]),
        )
}

fn load_config(args: &Args) -> Result<SimulationConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => SimulationConfig::from_json(&std::fs::read_to_string(path)?)?,
        None => {
            let seed = args.seed.as_deref().unwrap_or("physarum");
            let (w, h) = args.size.unwrap_or((512, 512));
            default_config(seed, w, h)
        }
    };
    if let Some(palette) = &args.palette {
        config.palette = palette.clone();
    }
    // Flags override a loaded file.
    if args.config.is_some() {
        if let Some(seed) = &args.seed {
            config.seed = seed.clone();
        }
        if let Some((w, h)) = args.size {
            config.width = w;
            config.height = h;
        }
    }
    Ok(config)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let args = Args::parse();
    let config = load_config(&args)?;
    let out = args.out.clone();

    if args.headless {
        let ctx = Arc::new(GpuContext::headless()?);
        let mut sim = Physarum::new(ctx, &config, Diagnostics::disabled())?;
        sim.run(args.steps);
        sim.draw()?.save(&out)?;
        tracing::info!(path = %out.display(), frame = sim.frame(), "saved image");
        return Ok(());
    }

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = window::App::new(config, out);
    event_loop.run_app(&mut app)?;
    Ok(())
}
