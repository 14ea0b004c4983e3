//! flashcam replay entrypoint
//!
//! Drives the controller with a script of UI events against simulated
//! devices and prints the resulting state after every step.

use clap::Parser;
use flashcam::device::simulated::SimulatedRig;
use flashcam::{
    AppConfig, AppEvent, AppSnapshot, CameraApp, CameraFacing, Error, PermissionKind, Result,
    logging,
};
use serde_json::json;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "flashcam",
    version,
    about = "Replay camera UI events against simulated devices"
)]
struct Cli {
    /// Optional configuration file (toml/yaml). Defaults to flashcam.{toml,yaml} in cwd/XDG config.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Script with one event per line (`flash`, `torch`, `flip`, `photo`,
    /// `record`, `stop`, `swipe-left`, `swipe-right`, `qr <data>`,
    /// `open-link`, `ready`, `wait <ms>`). Lines starting with `#` are comments.
    #[arg(long, value_name = "PATH")]
    script: Option<PathBuf>,

    /// Sensor active at launch (overrides configuration)
    #[arg(long, value_name = "back|front")]
    facing: Option<String>,

    /// Simulate the user refusing a permission prompt (repeatable)
    #[arg(long, value_name = "KIND")]
    deny: Vec<String>,

    /// Simulate a platform without a brightness API
    #[arg(long)]
    no_brightness: bool,

    /// Output snapshots as formatted JSON instead of human-readable text
    #[arg(long)]
    json: bool,

    /// Events given inline, applied after the script
    events: Vec<String>,
}

#[derive(Debug)]
enum Step {
    Event(AppEvent),
    Wait(Duration),
}

fn parse_step(line: &str) -> Result<Option<Step>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    if let Some(ms) = line.strip_prefix("wait") {
        let ms = ms
            .trim()
            .parse::<u64>()
            .map_err(|_| Error::InvalidEvent(line.to_string()))?;
        return Ok(Some(Step::Wait(Duration::from_millis(ms))));
    }
    line.parse::<AppEvent>().map(|event| Some(Step::Event(event)))
}

fn load_steps(cli: &Cli) -> Result<Vec<Step>> {
    let mut lines: Vec<String> = Vec::new();
    if let Some(path) = &cli.script {
        let contents = std::fs::read_to_string(path)?;
        lines.extend(contents.lines().map(str::to_string));
    }
    lines.extend(cli.events.iter().cloned());

    let mut steps = Vec::new();
    for line in &lines {
        if let Some(step) = parse_step(line)? {
            steps.push(step);
        }
    }
    Ok(steps)
}

fn print_snapshot(
    label: &str,
    snapshot: &AppSnapshot,
    error: Option<&Error>,
    as_json: bool,
) -> Result<()> {
    if as_json {
        let payload = json!({
            "step": label,
            "error": error.map(|e| e.to_string()),
            "state": snapshot,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    let mut line = format!(
        "{label:<16} facing={} flash={} icon={} recording={}",
        snapshot.facing, snapshot.flash, snapshot.flash_icon.name, snapshot.recording
    );
    if let Some(opacity) = snapshot.screen_flash.overlay_opacity {
        line.push_str(&format!(" screen-flash={opacity:.2}"));
    }
    if let Some(ratio) = &snapshot.ratio {
        line.push_str(&format!(" ratio={ratio}"));
    }
    if let Some(overlay) = &snapshot.ratio_overlay {
        line.push_str(&format!(" overlay={overlay}"));
    }
    if let Some(link) = &snapshot.barcode_link {
        line.push_str(&format!(" link={link}"));
    }
    if let Some(media) = &snapshot.last_media {
        line.push_str(&format!(" last={media}"));
    }
    if let Some(err) = error {
        line.push_str(&format!(" error=\"{err}\""));
    }
    println!("{line}");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(ref facing) = cli.facing {
        config.camera.facing = CameraFacing::parse(facing).ok_or_else(|| {
            Error::Config(format!("Unknown facing '{facing}', expected back/front"))
        })?;
    }

    logging::init(&config.logging)?;

    let rig = SimulatedRig::new();
    for kind in &cli.deny {
        let kind = PermissionKind::parse(kind)
            .ok_or_else(|| Error::Config(format!("Unknown permission kind '{kind}'")))?;
        rig.permissions.deny(kind);
    }
    if cli.no_brightness {
        rig.brightness.set_available(false);
    }

    let steps = load_steps(&cli)?;
    info!(steps = steps.len(), facing = %config.camera.facing, "starting replay");

    let mut app = CameraApp::new(rig.devices(), &config);
    let started = app.start().await;
    print_snapshot("start", &app.snapshot().await, started.as_ref().err(), cli.json)?;

    for step in steps {
        match step {
            Step::Wait(duration) => {
                tokio::time::sleep(duration).await;
                let label = format!("wait {}", duration.as_millis());
                print_snapshot(&label, &app.snapshot().await, None, cli.json)?;
            }
            Step::Event(event) => {
                let label = event.to_string();
                let outcome = app.dispatch(event).await;
                print_snapshot(&label, &app.snapshot().await, outcome.as_ref().err(), cli.json)?;
            }
        }
    }

    Ok(())
}
