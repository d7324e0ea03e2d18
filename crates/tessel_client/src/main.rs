use std::env;
use std::path::PathBuf;

use glam::Vec3;
use tessel_client::app::App;
use tessel_client::config::ClientConfig;
use tracing::info;

struct Options {
    config_path: PathBuf,
    ticks: u32,
    speed: f32,
}

fn parse_args() -> Options {
    let mut options = Options {
        config_path: PathBuf::from("tessel.toml"),
        ticks: 120,
        speed: 0.5,
    };

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let Some(value) = args.next() else {
                    eprintln!("--config expects a path argument");
                    std::process::exit(2);
                };
                options.config_path = PathBuf::from(value);
            }
            "--ticks" => {
                let Some(value) = args.next() else {
                    eprintln!("--ticks expects a numeric argument");
                    std::process::exit(2);
                };
                match value.parse::<u32>() {
                    Ok(parsed) => options.ticks = parsed,
                    Err(err) => {
                        eprintln!("invalid tick count '{value}': {err}");
                        std::process::exit(2);
                    }
                }
            }
            "--speed" => {
                let Some(value) = args.next() else {
                    eprintln!("--speed expects a numeric argument");
                    std::process::exit(2);
                };
                match value.parse::<f32>() {
                    Ok(parsed) if parsed.is_finite() => options.speed = parsed,
                    Ok(_) => {
                        eprintln!("invalid speed '{value}': must be finite");
                        std::process::exit(2);
                    }
                    Err(err) => {
                        eprintln!("invalid speed '{value}': {err}");
                        std::process::exit(2);
                    }
                }
            }
            "--help" | "-h" => {
                println!("Usage: tessel_client [--config <path>] [--ticks <n>] [--speed <blocks/tick>]");
                std::process::exit(0);
            }
            other => {
                eprintln!("unknown argument: {other}");
                std::process::exit(2);
            }
        }
    }

    options
}

fn main() {
    let _ = tracing_subscriber::fmt().with_target(false).try_init();
    let options = parse_args();

    let config = ClientConfig::load_or_create(&options.config_path);
    let mut app = match App::new(&config) {
        Ok(app) => app,
        Err(err) => {
            eprintln!("failed to start worker pool: {err}");
            std::process::exit(1);
        }
    };

    let step = Vec3::new(options.speed, 0.0, 0.0);
    let mut loaded = 0usize;
    let mut unloaded = 0usize;
    let mut picks = 0usize;
    for _ in 0..options.ticks {
        let summary = app.tick(step);
        loaded += summary.stream.added.len();
        unloaded += summary.stream.removed.len();
        picks += usize::from(summary.pick.is_some());
    }

    let (vertices, indices) = app.chunks().mesh_totals();
    info!(
        "Flew {} ticks to {}: {loaded} chunks loaded, {unloaded} unloaded, {} live",
        options.ticks,
        app.viewer(),
        app.chunks().len()
    );
    info!(
        "Live geometry: {vertices} vertices, {indices} indices, {} bytes uploaded; {picks} picks hit",
        app.uploads().total_bytes()
    );
}
