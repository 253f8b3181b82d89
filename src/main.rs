//! Demo harness: runs the lazy loading engine against a simulated
//! page, scrolling it from top to bottom and reporting lifecycle
//! events.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use serde::Deserialize;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use sightload::application::{LazyLoadEvent, LazyLoadManager, LazyLoadOverrides};
use sightload::domain::ports::{
    ImageProbePort, IntersectionObserverPort, LazyLoadHost,
};
use sightload::infrastructure::{
    HttpImageProbe, ScriptedProbe, SimDocument, SimIntersectionObserver,
};

#[derive(Debug, Parser)]
#[command(name = sightload::NAME, version = sightload::VERSION)]
struct Args {
    /// Page description TOML; a built-in sample page is used if omitted.
    #[arg(long)]
    page: Option<PathBuf>,

    /// Engine overrides TOML.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log filter (e.g. "info" or "sightload=debug").
    #[arg(long, default_value = "info", env = "SIGHTLOAD_LOG")]
    log_level: String,

    /// Probe image URLs over HTTP instead of simulating success.
    #[arg(long)]
    network: bool,

    /// Disable the intersection capability to force the polling fallback.
    #[arg(long)]
    force_polling: bool,

    /// Scroll distance per tick, in pixels.
    #[arg(long, default_value_t = 300.0)]
    scroll_step: f64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PageSpec {
    #[serde(default = "default_viewport_height")]
    viewport_height: f64,
    #[serde(default)]
    images: Vec<ImageSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ImageSpec {
    top: f64,
    #[serde(default = "default_image_height")]
    height: f64,
    data_src: Option<String>,
    src: Option<String>,
    srcset: Option<String>,
}

const fn default_viewport_height() -> f64 {
    800.0
}

const fn default_image_height() -> f64 {
    200.0
}

fn sample_page() -> PageSpec {
    PageSpec {
        viewport_height: 800.0,
        images: (0..8)
            .map(|i| ImageSpec {
                top: f64::from(i) * 600.0 + 100.0,
                height: 200.0,
                data_src: Some(format!("https://example.com/grill-{i}.jpg")),
                src: None,
                srcset: None,
            })
            .collect(),
    }
}

fn init_logging(filter: &str) -> Result<()> {
    let filter = EnvFilter::try_new(filter).wrap_err("invalid log filter")?;
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .init();
    Ok(())
}

fn build_document(page: &PageSpec) -> Arc<SimDocument> {
    let doc = SimDocument::new(page.viewport_height);
    for image in &page.images {
        let mut attrs: Vec<(&str, &str)> = vec![("loading", "lazy")];
        if let Some(src) = &image.data_src {
            attrs.push(("data-src", src));
        }
        if let Some(src) = &image.src {
            attrs.push(("src", src));
        }
        if let Some(srcset) = &image.srcset {
            attrs.push(("data-srcset", srcset));
        }
        doc.add_element("img", None, image.top, image.height, &attrs);
    }
    doc
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    init_logging(&args.log_level)?;
    info!(version = sightload::VERSION, "starting sightload demo");

    let page: PageSpec = match &args.page {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .wrap_err_with(|| format!("reading page file {}", path.display()))?;
            toml::from_str(&raw).wrap_err("parsing page file")?
        }
        None => sample_page(),
    };

    let overrides = match &args.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .wrap_err_with(|| format!("reading config file {}", path.display()))?;
            Some(LazyLoadOverrides::from_toml_str(&raw).wrap_err("parsing config file")?)
        }
        None => None,
    };

    let doc = build_document(&page);
    let probe: Arc<dyn ImageProbePort> = if args.network {
        Arc::new(HttpImageProbe::new(Duration::from_secs(10))?)
    } else {
        Arc::new(ScriptedProbe::succeeding())
    };
    let observer = if args.force_polling {
        None
    } else {
        Some(SimIntersectionObserver::new(doc.clone()))
    };

    let host = LazyLoadHost {
        document: doc.clone(),
        probe,
        intersection: observer
            .clone()
            .map(|o| -> Arc<dyn IntersectionObserverPort> { o }),
        signals: doc.clone(),
    };

    let Some(manager) = LazyLoadManager::init(host, overrides).await else {
        info!("lazy loading disabled; nothing to demo");
        return Ok(());
    };
    let mut events = manager.subscribe();

    let page_bottom = page
        .images
        .iter()
        .map(|i| i.top + i.height)
        .fold(0.0_f64, f64::max);

    let mut loaded = 0_u32;
    let mut failed = 0_u32;
    let mut scroll = 0.0;
    while scroll < page_bottom {
        tokio::time::sleep(Duration::from_millis(250)).await;
        scroll += args.scroll_step;
        doc.set_scroll(scroll);
        if let Some(observer) = &observer {
            observer.evaluate();
        }
        drain_events(&mut events, &mut loaded, &mut failed);
    }

    // Let trailing retries settle before teardown.
    tokio::time::sleep(Duration::from_secs(2)).await;
    drain_events(&mut events, &mut loaded, &mut failed);
    manager.destroy();

    info!(loaded, failed, total = page.images.len(), "demo finished");
    Ok(())
}

fn drain_events(
    events: &mut tokio::sync::mpsc::UnboundedReceiver<LazyLoadEvent>,
    loaded: &mut u32,
    failed: &mut u32,
) {
    while let Ok(event) = events.try_recv() {
        match event {
            LazyLoadEvent::Loaded { element, url } => {
                info!(%element, url = %url, "loaded");
                *loaded += 1;
            }
            LazyLoadEvent::LoadError {
                element,
                error,
                attempts,
            } => {
                info!(%element, error = %error, attempts, "failed");
                *failed += 1;
            }
        }
    }
}
