//! `url` command: print the request a viewport would issue.

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use clap::Args;
use nontiled::non_tiled_layer;
use nontiled::overlay::{EventKind, OverlayEvent, RefreshPhase};
use nontiled::provider::FetchProvider;
use nontiled::surface::headless::NeverSettle;

use super::common::{build_host, load_settings, resolve_provider, ProviderArgs, ViewArgs};
use crate::error::CliError;

/// Arguments for `nontiled url`.
#[derive(Debug, Args)]
pub struct UrlArgs {
    #[command(flatten)]
    pub view: ViewArgs,

    #[command(flatten)]
    pub provider: ProviderArgs,
}

/// What a single refresh produced.
#[derive(Debug, Clone, PartialEq)]
pub struct UrlReport {
    pub phase: RefreshPhase,
    pub key: Option<String>,
    pub url: Option<String>,
    pub provider_failed: bool,
}

/// Run the url command.
pub fn run(args: UrlArgs, config_path: Option<&Path>) -> Result<(), CliError> {
    let report = resolve(&args, config_path)?;

    match report.phase {
        RefreshPhase::Hidden => {
            println!("Viewport is outside the zoom range or too small; nothing is requested.");
        }
        _ if report.provider_failed => {
            println!("Provider could not build a URL for this viewport.");
            if let Some(key) = &report.key {
                println!("Key: {}", key);
            }
        }
        _ => {
            if let Some(key) = &report.key {
                println!("Key: {}", key);
            }
            if let Some(url) = &report.url {
                println!("URL: {}", url);
            }
        }
    }
    Ok(())
}

/// Attach an overlay to a headless host, refresh once and report the request.
pub fn resolve(args: &UrlArgs, config_path: Option<&Path>) -> Result<UrlReport, CliError> {
    let settings = load_settings(config_path)?;
    let provider = resolve_provider(&args.provider, settings.wms)?;

    let mut host = build_host(&args.view).with_resolver(NeverSettle);
    let mut overlay = non_tiled_layer(settings.layer, FetchProvider::sync(provider))?;

    let failed = Rc::new(RefCell::new(false));
    let flag = Rc::clone(&failed);
    overlay.on(EventKind::Error, move |event| {
        if let OverlayEvent::Error { url: None, .. } = event {
            *flag.borrow_mut() = true;
        }
    });

    overlay.attach(&mut host)?;

    let url = overlay
        .slots()
        .and_then(|slots| slots.get(slots.buffer_id()).src().map(str::to_string));
    let report = UrlReport {
        phase: overlay.phase(),
        key: overlay.latest_key().map(|k| k.to_string()),
        url,
        provider_failed: *failed.borrow(),
    };

    overlay.detach(&mut host)?;
    Ok(report)
}
