// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "gsplat-render")]
#[command(about = "Headless Gaussian splat renderer")]
#[command(version = env!("GIT_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a synthetic splat sphere to a PNG
    Render {
        /// Number of Gaussians in the sphere
        #[arg(short, long, default_value = "20000")]
        points: u32,

        /// Output width (default: from config)
        #[arg(long)]
        width: Option<u32>,

        /// Output height (default: from config)
        #[arg(long)]
        height: Option<u32>,

        /// Gaussian scale multiplier (default: from config)
        #[arg(short, long)]
        scale: Option<f32>,

        /// Output file path
        #[arg(short, long, default_value = "splats.png")]
        output: PathBuf,

        /// Config file (default: <config dir>/gsplat-renderer/config.json)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print the GPU adapter the renderer would use
    Info,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=gsplat_renderer=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render {
            points,
            width,
            height,
            scale,
            output,
            config,
        } => cli::render(cli::RenderArgs {
            points,
            width,
            height,
            scale,
            output,
            config,
        }),
        Commands::Info => cli::info(),
    }
}
