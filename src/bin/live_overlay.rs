//! live_overlay - Run the live skeleton overlay over a video feed.
//!
//! Each drawn frame is printed to stdout as one JSON skeleton per line.
//! The loop runs until the feed ends, `--max-frames` is reached or Ctrl-C.

use anyhow::{anyhow, Result};
use clap::Parser;
use std::io::{self, Write};
use std::sync::Arc;

use movement_scorer::live::{LiveOverlay, OverlaySink, Skeleton, StopHandle};
use movement_scorer::{media, pose::factory_for, ScorerConfig, SharedDetector};

#[derive(Parser, Debug)]
#[command(name = "live_overlay", about = "Stream skeleton overlays for a video feed")]
struct Args {
    /// Feed to overlay (local file or stub:// source)
    #[arg(default_value = "stub://live?duration=0")]
    url: String,

    /// Stop after this many frames
    #[arg(long, value_name = "N")]
    max_frames: Option<u64>,
}

struct JsonLinesSink<W: Write> {
    out: W,
}

impl<W: Write> OverlaySink for JsonLinesSink<W> {
    fn draw(&mut self, skeleton: &Skeleton) -> Result<()> {
        serde_json::to_writer(&mut self.out, skeleton)?;
        self.out.write_all(b"\n")?;
        Ok(())
    }

    fn clear(&mut self) {
        if let Err(err) = self.out.flush() {
            log::warn!("failed to flush overlay output: {}", err);
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = ScorerConfig::load()?;
    let detector = Arc::new(SharedDetector::new(factory_for(&config.backend)?));
    detector.warm_up()?;

    let mut overlay = LiveOverlay::new(detector, &config.overlay);
    if let Some(max) = args.max_frames {
        overlay = overlay.with_max_frames(max);
    }

    let stop = StopHandle::new();
    let on_signal = stop.clone();
    ctrlc::set_handler(move || on_signal.stop())
        .map_err(|e| anyhow!("error setting Ctrl-C handler: {}", e))?;

    let mut feed = media::open_video(&args.url, &config.video)?;
    let mut sink = JsonLinesSink {
        out: io::stdout().lock(),
    };
    log::info!("live_overlay running on {} (Ctrl-C to stop)", args.url);
    let stats = overlay.run(feed.as_mut(), &mut sink, &stop)?;
    log::info!(
        "live_overlay finished: {} ticks, {} draws, {} skipped, {} detection errors",
        stats.ticks,
        stats.draws,
        stats.skipped_empty,
        stats.detection_errors
    );
    Ok(())
}
