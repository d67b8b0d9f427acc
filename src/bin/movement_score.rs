//! movement_score - Score an exercise movement from an image or a clip.
//!
//! Loads `ScorerConfig` (JSON file named by MOVEMENT_SCORER_CONFIG plus env
//! overrides), warms up the pose detector, analyzes one media resource and
//! prints the result as JSON on stdout.

use anyhow::Result;
use clap::Parser;
use std::io::IsTerminal;

use movement_scorer::{Analyzer, MediaDescriptor, ScorerConfig};

#[path = "../ui.rs"]
mod ui;

#[derive(Parser, Debug)]
#[command(
    name = "movement_score",
    about = "Score an exercise movement from a still image or a video clip"
)]
struct Args {
    /// Local path, file:// URL or stub:// source
    url: String,

    /// Movement name, e.g. "plank", "squat", "side bend"
    #[arg(short, long, default_value = "generic")]
    movement: String,

    /// Declared media type (e.g. image/png, video/mp4); the extension decides otherwise
    #[arg(long, value_name = "TYPE")]
    mime: Option<String>,

    /// Pretty-print the JSON result
    #[arg(long)]
    pretty: bool,

    /// UI mode for stderr progress
    #[arg(long, value_enum, default_value = "auto", value_name = "MODE")]
    ui: ui::UiMode,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let ui = ui::Ui::new(
        args.ui,
        std::io::stderr().is_terminal(),
        std::io::stdout().is_terminal(),
    );

    let analyzer = {
        let stage = ui.stage("Load configuration");
        let analyzer = Analyzer::from_config(ScorerConfig::load()?)?;
        stage.done();
        analyzer
    };

    {
        let stage = ui.stage("Warm up pose detector");
        analyzer.warm_up()?;
        stage.done();
    }

    let mut media = MediaDescriptor::new(args.url.clone());
    if let Some(mime) = args.mime {
        media = media.with_type(mime);
    }

    let result = {
        let stage = ui.stage("Analyze movement");
        let result = analyzer.analyze_media(&media, &args.movement)?;
        stage.done();
        result
    };

    let json = if args.pretty {
        serde_json::to_string_pretty(&result)?
    } else {
        serde_json::to_string(&result)?
    };
    println!("{}", json);
    Ok(())
}
