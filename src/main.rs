/*
 *  main.rs
 *
 *  spotmatrix - Spotify now-playing on an RGB LED matrix
 *
 *  Startup, configuration, and the single-threaded poll/render loop
 */

use std::time::{Duration, Instant};

use clap::Parser;
use env_logger::Env;
use log::{error, info, warn};
use tokio::signal::unix::{SignalKind, signal};

use spotmatrix::artwork::ImageError;
use spotmatrix::config::Config;
use spotmatrix::panel::{MockPanel, PanelDriver};
use spotmatrix::screen::Screen;
use spotmatrix::spotify::SpotifyClient;

/// Render tick. The panel driver targets 5 fps; the loop paces itself the
/// same so marquee motion stays even.
const FRAME_TICK: Duration = Duration::from_millis(200);

#[derive(Debug, Parser)]
#[command(name = env!("CARGO_PKG_NAME"), version, about = env!("CARGO_PKG_DESCRIPTION"))]
struct Cli {
    /// Enable debug log level
    #[arg(short = 'v', long, alias = "verbose")]
    debug: bool,
}

/// Waits for SIGINT, SIGTERM, or SIGHUP so the loop can shut down cleanly.
async fn signal_handler() -> anyhow::Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sighup = signal(SignalKind::hangup())?;

    tokio::select! {
        _ = sigint.recv() => info!("SIGINT received. Shutting down."),
        _ = sigterm.recv() => info!("SIGTERM received. Shutting down."),
        _ = sighup.recv() => info!("SIGHUP received. Shutting down."),
    }
    Ok(())
}

/// One unbounded loop alternating a timer-gated poll step with an always-run
/// render/scroll step. Network calls block the loop for their duration; a
/// single-purpose device has no competing work.
async fn run_loop<D: PanelDriver>(
    http: reqwest::Client,
    mut client: Option<(SpotifyClient, Duration)>,
    mut screen: Screen<D>,
) -> anyhow::Result<()> {
    let mut last_poll: Option<Instant> = None;

    loop {
        if !screen.has_error()
            && let Some((spotify, interval)) = client.as_mut()
            && last_poll.is_none_or(|at| at.elapsed() >= *interval)
        {
            match spotify.poll().await {
                Ok(None) => screen.disable(),
                Ok(Some(playing)) => {
                    screen.enable();
                    screen.set_progress(playing.progress_ms as f32 / playing.duration_ms as f32);
                    if screen.needs_track_refresh(&playing.id) {
                        info!("track changed: {} - {}", playing.track, playing.artists);
                        if playing.cover_url.is_empty() {
                            warn!("no 64x64 cover in playback response");
                            screen.set_track(&playing.track, &playing.artists, &playing.id);
                        } else {
                            match screen.cover_mut().load(&http, &playing.cover_url).await {
                                Ok(()) => {
                                    screen.set_track(&playing.track, &playing.artists, &playing.id);
                                }
                                Err(ImageError::Resource(e)) => {
                                    // allocation pressure: abandon this cycle,
                                    // leave the display mode untouched
                                    warn!("failed to allocate cover buffer, skipping cycle: {e}");
                                }
                                Err(e) => {
                                    error!("cover load failed: {e}");
                                    screen.show_error(&e.to_string());
                                }
                            }
                        }
                    }
                }
                Err(e) => {
                    error!("poll failed: {e}");
                    screen.show_error(&e.to_string());
                }
            }
            last_poll = Some(Instant::now());
        }

        screen
            .update()
            .unwrap_or_else(|e| error!("panel refresh failed: {e}"));
        tokio::time::sleep(FRAME_TICK).await;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(
        Env::default().default_filter_or(if cli.debug { "debug" } else { "info" }),
    )
    .format_timestamp_secs()
    .init();

    info!("{} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()?;

    // The matrix driver is platform hardware; without one compiled in, the
    // mock panel stands in so the loop still runs end to end.
    let panel = MockPanel::new();
    let mut screen = Screen::new(panel);

    let client = match Config::from_env() {
        Ok(config) => {
            info!(
                "polling every {}s",
                config.poll_interval.as_secs()
            );
            Some((
                SpotifyClient::new(http.clone(), config.credentials.clone()),
                config.poll_interval,
            ))
        }
        Err(e) => {
            // Fatal-to-render: latch before the loop starts. The loop still
            // runs and keeps the message on the panel; no poll is attempted.
            error!("{e}");
            screen.show_error("Missing spotify credentials");
            None
        }
    };

    tokio::select! {
        _ = signal_handler() => {}
        result = run_loop(http, client, screen) => result?,
    }

    info!("Main application exiting.");
    Ok(())
}
