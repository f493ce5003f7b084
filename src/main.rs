//! Slit-scan renderer driven by a synthetic frame source

use std::sync::Arc;

use color_eyre::Result;
use flume::bounded;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use slitscan::capture::{Frame, PixelFormat, SyntheticSource};
use slitscan::output::PngSink;
use slitscan::{utils, Config, SlitScan, CONFIG};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling and logging
    color_eyre::install()?;
    let registry = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("slitscan=info")))
        .with(fmt::layer().with_timer(fmt::time::uptime()));
    #[cfg(feature = "profiling")]
    let registry = registry.with(tracing_tracy::TracyLayer::default());
    registry.init();

    info!("Slitscan launching...");

    // Load configuration
    let config_path = utils::config_path(std::env::args_os().nth(1));
    let config = Config::load(config_path.as_deref())?;
    CONFIG.store(Arc::new(config.clone()));
    #[cfg(unix)]
    spawn_reload_on_hangup(config_path);

    let effect = &config.effect;
    let mut scan = SlitScan::new();
    scan.apply_settings(effect)?;
    let sink = PngSink::new(&config.output.directory)?;

    // Set up tx/rx
    let (tx, rx) = bounded::<Frame>(config.pipeline.channel_capacity);

    // Spawn capture task
    let mut source = SyntheticSource::new(&config.source, effect.width, effect.height, effect.format);
    let limit = config.source.frames;
    let capture_handle = tokio::spawn(async move {
        let mut produced = 0u64;
        while limit == 0 || produced < limit {
            let frame = source.capture_frame().await;
            if let Err(e) = tx.send_async(frame).await {
                error!("Failed to send frame: {}", e);
                break;
            }
            produced += 1;
        }
        debug!("source stopped after {} frames", produced);
    });

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    let mut active = CONFIG.load_full();

    loop {
        let frame = tokio::select! {
            _ = &mut shutdown => {
                info!("Interrupted");
                break;
            }
            received = rx.recv_async() => match received {
                Ok(frame) => frame,
                Err(_) => break,
            },
        };

        let latest = CONFIG.load_full();
        if !Arc::ptr_eq(&latest, &active) {
            // The source keeps producing the size it started with.
            let mut effect = latest.effect.clone();
            effect.width = scan.frame_width();
            effect.height = scan.frame_height();
            effect.format = scan.format().unwrap_or(effect.format);
            match scan.apply_settings(&effect) {
                Ok(()) => info!(
                    capacity = scan.capacity(),
                    delay = scan.delay(),
                    width = scan.width(),
                    blending = scan.is_blending(),
                    "settings applied"
                ),
                Err(e) => error!("Failed to apply settings: {}", e),
            }
            active = latest;
        }

        if let Err(e) = scan.push_frame(&frame) {
            warn!("Dropping frame {}: {}", frame.meta.sequence, e);
            continue;
        }
        metrics::histogram!("frame_latency_ms")
            .record(frame.timestamp.elapsed().as_secs_f64() * 1000.0);

        if frame.meta.sequence % active.output.every == 0 {
            let (width, height) = (scan.frame_width(), scan.frame_height());
            let format = frame.meta.format;
            let name = utils::frame_file_name("output", frame.meta.sequence);
            let output = scan.output()?;
            if let Err(e) = sink.write_frame(&name, output, width, height, format) {
                warn!("Failed to write {}: {}", name, e);
            }
        }
    }
    capture_handle.abort();

    write_summary(&mut scan, &sink, &active)?;
    info!(stats = ?scan.stats(), directory = %sink.directory().display(), "Slitscan shutting down");
    Ok(())
}

/// Delay map preview and history filmstrip written once the run ends
fn write_summary(scan: &mut SlitScan, sink: &PngSink, config: &Config) -> Result<()> {
    let (width, height) = (scan.frame_width(), scan.frame_height());
    let Some(format) = scan.format() else {
        return Ok(());
    };

    if config.output.delay_map {
        let view = scan.delay_map_visualization()?;
        sink.write_frame("delay_map.png", view, width, height, PixelFormat::Gray)?;
    }
    if config.output.filmstrip > 0 {
        let frames = scan.filmstrip(config.output.filmstrip)?;
        let path = sink.write_filmstrip("filmstrip.png", &frames, width, height, format)?;
        info!("Filmstrip of {} frames at {}", frames.len(), path.display());
    }
    Ok(())
}

#[cfg(unix)]
fn spawn_reload_on_hangup(path: Option<std::path::PathBuf>) {
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async move {
        let mut hangup = match signal(SignalKind::hangup()) {
            Ok(hangup) => hangup,
            Err(e) => {
                warn!("SIGHUP reload unavailable: {}", e);
                return;
            }
        };
        while hangup.recv().await.is_some() {
            match Config::load(path.as_deref()) {
                Ok(config) => {
                    CONFIG.store(Arc::new(config));
                    info!("Configuration reloaded");
                }
                Err(e) => error!("Keeping previous configuration: {}", e),
            }
        }
    });
}
