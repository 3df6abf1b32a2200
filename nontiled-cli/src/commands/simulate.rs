//! `simulate` command: drive a headless overlay through scripted map moves.
//!
//! The script is a `;`-separated list of steps:
//!
//! - `pan:DX,DY` - pan by a pixel offset, then settle
//! - `zoom:LEVEL` - animate to a zoom level over `--frames` frames, then settle
//! - `resize:WxH` - resize the container, then settle
//! - `redraw` - force a refresh
//!
//! With `--async-delays`, URLs are resolved on a Tokio runtime with the given
//! per-request delays, so completions can arrive out of order.

use std::cell::Cell;
use std::fmt;
use std::path::Path;
use std::rc::Rc;
use std::str::FromStr;
use std::time::Duration;

use clap::Args;
use tokio::runtime::{Builder, Runtime};
use tracing::{info, warn};

use nontiled::host::{HostEvent, MapHost, WebMercatorHost};
use nontiled::non_tiled_layer;
use nontiled::overlay::{EventKind, NonTiledOverlay, OverlayEvent, RefreshPhase};
use nontiled::provider::{FetchProvider, SpawnedProvider};
use nontiled::surface::LoadState;

use super::common::{
    build_host, load_settings, parse_size, resolve_provider, ProviderArgs, Settings, ViewArgs,
};
use crate::error::CliError;

/// Extra time allowed beyond the longest delay before giving up on a URL.
const DRAIN_GRACE: Duration = Duration::from_secs(1);

/// Arguments for `nontiled simulate`.
#[derive(Debug, Args)]
pub struct SimulateArgs {
    #[command(flatten)]
    pub view: ViewArgs,

    #[command(flatten)]
    pub provider: ProviderArgs,

    /// Steps separated by ';' (pan:DX,DY  zoom:LEVEL  resize:WxH  redraw)
    #[arg(long, default_value = "pan:200,0;zoom:11;pan:-100,50", allow_hyphen_values = true)]
    pub script: String,

    /// Animation frames per zoom step
    #[arg(long, default_value_t = 4)]
    pub frames: u32,

    /// Resolve URLs asynchronously, delaying the n-th request by the n-th value (ms, cycled)
    #[arg(long, value_delimiter = ',')]
    pub async_delays: Vec<u64>,

    /// Wait this long (ms) after each step before applying delivered URLs
    #[arg(long, default_value_t = 0)]
    pub step_interval: u64,

    /// Resources whose URL contains this text fail to load
    #[arg(long)]
    pub fail_matching: Option<String>,

    /// Only print the summary
    #[arg(short, long)]
    pub quiet: bool,
}

/// One scripted host action.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    Pan { dx: f64, dy: f64 },
    Zoom(f64),
    Resize { width: f64, height: f64 },
    Redraw,
}

impl FromStr for Step {
    type Err = CliError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CliError::InvalidArgument {
            name: "script",
            value: s.to_string(),
        };
        let s = s.trim();
        let (op, arg) = match s.split_once(':') {
            Some((op, arg)) => (op.trim(), Some(arg.trim())),
            None => (s, None),
        };

        match (op, arg) {
            ("redraw", None) => Ok(Step::Redraw),
            ("pan", Some(arg)) => {
                let (dx, dy) = arg.split_once(',').ok_or_else(invalid)?;
                Ok(Step::Pan {
                    dx: dx.trim().parse().map_err(|_| invalid())?,
                    dy: dy.trim().parse().map_err(|_| invalid())?,
                })
            }
            ("zoom", Some(arg)) => {
                let level: f64 = arg.parse().map_err(|_| invalid())?;
                if !level.is_finite() {
                    return Err(invalid());
                }
                Ok(Step::Zoom(level))
            }
            ("resize", Some(arg)) => {
                let size = parse_size(arg).map_err(|_| invalid())?;
                Ok(Step::Resize {
                    width: size.width,
                    height: size.height,
                })
            }
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Pan { dx, dy } => write!(f, "pan by ({}, {})", dx, dy),
            Step::Zoom(level) => write!(f, "zoom to {}", level),
            Step::Resize { width, height } => write!(f, "resize to {}x{}", width, height),
            Step::Redraw => write!(f, "redraw"),
        }
    }
}

/// Parse a `;`-separated script. Empty entries are skipped.
pub fn parse_script(script: &str) -> Result<Vec<Step>, CliError> {
    script
        .split(';')
        .filter(|s| !s.trim().is_empty())
        .map(str::parse)
        .collect()
}

/// Outcome of a simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub requests: usize,
    pub swaps: usize,
    pub errors: usize,
    pub phase: RefreshPhase,
    pub latest_key: Option<String>,
    pub shown_key: Option<String>,
    pub visible: bool,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Requests issued: {}", self.requests)?;
        writeln!(f, "Slots swapped:   {}", self.swaps)?;
        writeln!(f, "Errors:          {}", self.errors)?;
        writeln!(f, "Phase:           {:?}", self.phase)?;
        writeln!(f, "Visible:         {}", self.visible)?;
        writeln!(
            f,
            "Latest key:      {}",
            self.latest_key.as_deref().unwrap_or("(none)")
        )?;
        write!(
            f,
            "Shown key:       {}",
            self.shown_key.as_deref().unwrap_or("(none)")
        )
    }
}

/// Event counters shared with the overlay's listeners.
#[derive(Debug, Clone, Default)]
struct Counters {
    loading: Rc<Cell<usize>>,
    load: Rc<Cell<usize>>,
    error: Rc<Cell<usize>>,
}

impl Counters {
    fn register(overlay: &mut NonTiledOverlay, quiet: bool) -> Self {
        let counters = Self::default();

        let loading = Rc::clone(&counters.loading);
        overlay.on(EventKind::Loading, move |event| {
            loading.set(loading.get() + 1);
            if let (false, OverlayEvent::Loading { key }) = (quiet, event) {
                println!("  loading  {}", key);
            }
        });

        let load = Rc::clone(&counters.load);
        overlay.on(EventKind::Load, move |event| {
            load.set(load.get() + 1);
            if let (false, OverlayEvent::Load { slot, key, .. }) = (quiet, event) {
                println!("  load     {:?} {}", slot, key);
            }
        });

        let error = Rc::clone(&counters.error);
        overlay.on(EventKind::Error, move |event| {
            error.set(error.get() + 1);
            if let (false, OverlayEvent::Error { slot, url }) = (quiet, event) {
                match url {
                    Some(url) => println!("  error    {:?} {}", slot, url),
                    None => println!("  error    {:?} (provider)", slot),
                }
            }
        });

        counters
    }
}

/// Run the simulate command.
pub fn run(args: SimulateArgs, config_path: Option<&Path>) -> Result<(), CliError> {
    let settings = load_settings(config_path)?;
    let summary = execute(&args, settings)?;
    if !args.quiet {
        println!();
    }
    println!("{}", summary);
    Ok(())
}

/// Run the script against a headless host and summarize the result.
pub fn execute(args: &SimulateArgs, settings: Settings) -> Result<Summary, CliError> {
    let provider = resolve_provider(&args.provider, settings.wms)?;
    let steps = parse_script(&args.script)?;

    let fail = args.fail_matching.clone();
    let mut host = build_host(&args.view).with_resolver(move |url: &str| match &fail {
        Some(pattern) if url.contains(pattern.as_str()) => LoadState::Failed,
        _ => LoadState::Loaded,
    });

    let runtime = if args.async_delays.is_empty() {
        None
    } else {
        Some(
            Builder::new_current_thread()
                .enable_time()
                .build()
                .map_err(CliError::Runtime)?,
        )
    };

    let fetch = match &runtime {
        Some(runtime) => {
            let delays = args
                .async_delays
                .iter()
                .map(|ms| Duration::from_millis(*ms))
                .collect();
            FetchProvider::from_async(
                SpawnedProvider::new(provider, runtime.handle().clone()).with_delays(delays),
            )
        }
        None => FetchProvider::sync(provider),
    };

    let mut overlay = non_tiled_layer(settings.layer, fetch)?;
    let counters = Counters::register(&mut overlay, args.quiet);

    info!(
        steps = steps.len(),
        provider = overlay.provider().name(),
        "Starting simulation"
    );
    overlay.attach(&mut host)?;

    let mut delivered = 0;
    for (index, step) in steps.iter().enumerate() {
        if !args.quiet {
            println!("step {}: {}", index + 1, step);
        }
        apply_step(*step, &mut host, &mut overlay, args.frames);

        if let Some(runtime) = &runtime {
            if args.step_interval > 0 {
                runtime.block_on(tokio::time::sleep(Duration::from_millis(args.step_interval)));
            }
            delivered += overlay.process_completions();
        }
    }

    if let Some(runtime) = &runtime {
        let longest = args.async_delays.iter().copied().max().unwrap_or(0);
        let outstanding = counters.loading.get().saturating_sub(delivered);
        drain(
            runtime,
            &mut overlay,
            outstanding,
            Duration::from_millis(longest) + DRAIN_GRACE,
        );
    }

    let summary = Summary {
        requests: counters.loading.get(),
        swaps: counters.load.get(),
        errors: counters.error.get(),
        phase: overlay.phase(),
        latest_key: overlay.latest_key().map(|k| k.to_string()),
        shown_key: overlay.slots().and_then(|slots| {
            slots
                .get(slots.current_id())
                .key()
                .map(|k| k.to_string())
        }),
        visible: overlay.is_visible(),
    };

    overlay.detach(&mut host)?;
    Ok(summary)
}

fn apply_step(step: Step, host: &mut WebMercatorHost, overlay: &mut NonTiledOverlay, frames: u32) {
    match step {
        Step::Pan { dx, dy } => {
            host.pan_by(dx, dy);
            overlay.handle_event(&*host, HostEvent::ViewportSettled);
        }
        Step::Zoom(level) => {
            let from = host.zoom();
            let center = host.center();
            let frames = frames.max(1);
            for frame in 1..=frames {
                let zoom = from + (level - from) * f64::from(frame) / f64::from(frames);
                overlay.handle_event(&*host, HostEvent::ZoomFrame { zoom, center });
            }
            host.set_view(center, level);
            overlay.handle_event(&*host, HostEvent::ZoomChanged);
            overlay.handle_event(&*host, HostEvent::ViewportSettled);
        }
        Step::Resize { width, height } => {
            host.resize(width, height);
            overlay.handle_event(&*host, HostEvent::ViewportSettled);
        }
        Step::Redraw => overlay.redraw(&*host),
    }
}

/// Wait for up to `outstanding` completions, each within `limit`.
fn drain(runtime: &Runtime, overlay: &mut NonTiledOverlay, outstanding: usize, limit: Duration) {
    runtime.block_on(async {
        for received in 0..outstanding {
            if tokio::time::timeout(limit, overlay.wait_for_completion())
                .await
                .is_err()
            {
                warn!(
                    missing = outstanding - received,
                    "Gave up waiting for resource URLs"
                );
                break;
            }
        }
    });
}
