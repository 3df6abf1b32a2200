//! Configuration file CLI commands.
//!
//! Provides `config path` and `config show` for locating the config file and
//! printing the layer settings it resolves to.

use std::path::Path;

use clap::Subcommand;
use nontiled::config::default_config_path;
use nontiled::provider::ResourceUrlProvider;

use super::common::load_settings;
use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show the default configuration file path
    Path,

    /// Print the effective layer settings
    Show,
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands, config_path: Option<&Path>) -> Result<(), CliError> {
    match command {
        ConfigCommands::Path => run_path(),
        ConfigCommands::Show => run_show(config_path),
    }
}

fn run_path() -> Result<(), CliError> {
    match default_config_path() {
        Some(path) => {
            let status = if path.exists() { "" } else { " (not created)" };
            println!("{}{}", path.display(), status);
        }
        None => println!("(no configuration directory on this platform)"),
    }
    Ok(())
}

fn run_show(config_path: Option<&Path>) -> Result<(), CliError> {
    let settings = load_settings(config_path)?;
    let layer = &settings.layer;

    println!("[layer]");
    println!("opacity = {}", layer.opacity);
    println!("min_zoom = {}", layer.min_zoom);
    println!("max_zoom = {}", layer.max_zoom);
    println!(
        "bounds = {},{},{},{}",
        layer.bounds.south, layer.bounds.west, layer.bounds.north, layer.bounds.east
    );
    match layer.z_index {
        Some(z) => println!("z_index = {}", z),
        None => println!("z_index = (host default)"),
    }
    match layer.use_canvas {
        Some(canvas) => println!("use_canvas = {}", canvas),
        None => println!("use_canvas = auto"),
    }
    println!("detect_retina = {}", layer.detect_retina);
    if let Some(cross_origin) = layer.cross_origin {
        println!("cross_origin = {}", cross_origin.as_str());
    }
    if !layer.attribution.is_empty() {
        println!("attribution = {}", layer.attribution);
    }

    println!();
    match settings.wms {
        Some(wms) => {
            println!("[wms]");
            println!("provider = {}", wms.name());
            println!("crs = {}", wms.crs().code());
            if let Some(layers) = wms.param("layers") {
                println!("layers = {}", layers);
            }
        }
        None => println!("(no [wms] section)"),
    }
    Ok(())
}
