//! Types payloads into an already running virtual keyboard
//!
//! The target event node is given on the command line or discovered by
//! device name. Payloads come from the command line or from stdin, one
//! per line.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(
    name = "virtusdev-writer",
    version,
    about = "Type barcodes into a running virtual keyboard",
    after_help = "Examples:\n  virtusdev-writer /dev/input/event25\n  echo '1234567890' | virtusdev-writer /dev/input/event25\n  virtusdev-writer /dev/input/event25 'ABC123XYZ'\n  virtusdev-writer 'ABC123XYZ'"
)]
struct Args {
    /// Event node such as /dev/input/event25, or the payload when it does
    /// not start with /dev/
    target: Option<String>,

    /// Payload to send once
    payload: Option<String>,

    /// Device name substring used for discovery
    #[arg(short, long)]
    name: Option<String>,

    /// Config file to use instead of the default location
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print a JSON report per payload
    #[arg(long)]
    json: bool,
}

impl Args {
    /// Split the positionals into a device path and a payload
    fn device_and_payload(&self) -> (Option<PathBuf>, Option<String>) {
        match &self.target {
            Some(target) if target.starts_with("/dev/") => {
                (Some(PathBuf::from(target)), self.payload.clone())
            }
            Some(target) => {
                if let Some(extra) = &self.payload {
                    log::warn!("ignoring extra argument '{}'", extra);
                }
                (None, Some(target.clone()))
            }
            None => (None, self.payload.clone()),
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(not(target_os = "linux"))]
fn run(_args: Args) -> Result<()> {
    anyhow::bail!("writing input events requires Linux evdev")
}

#[cfg(target_os = "linux")]
fn run(args: Args) -> Result<()> {
    use anyhow::Context;
    use crossterm::tty::IsTty;
    use std::io::Write;
    use virtusdev::device::discovery::EventNode;
    use virtusdev::input::{LineReader, NextLine};
    use virtusdev::keyboard::Injector;
    use virtusdev::{CancelToken, Config, TransmitReport};

    let config = match &args.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => Config::load().unwrap_or_else(|e| {
            log::warn!("ignoring config: {}", e);
            Config::default()
        }),
    };
    let timing = config.timing_profile()?;

    let (device_path, payload) = args.device_and_payload();
    let node = match device_path {
        Some(path) => EventNode::open(&path)?,
        None => {
            let pattern = args.name.as_deref().unwrap_or(&config.writer.device_name);
            EventNode::find(pattern).context("is the virtusdev daemon running?")?
        }
    };

    log::info!("using input device {}", node.path().display());

    let cancel = CancelToken::install().context("installing signal handler")?;
    let mut injector = Injector::new(node, timing).with_cancel(cancel.clone());

    let report = |report: &TransmitReport| -> Result<()> {
        if args.json {
            println!("{}", serde_json::to_string(report)?);
        }
        Ok(())
    };

    if let Some(payload) = payload {
        report(&injector.transmit(&payload))?;
        return Ok(());
    }

    let interactive = std::io::stdin().is_tty();
    let mut lines = LineReader::stdin().context("starting input reader")?;
    loop {
        if interactive {
            print!("SCAN> ");
            std::io::stdout().flush()?;
        }
        match lines.next_line(&cancel) {
            NextLine::Payload(payload) => report(&injector.transmit(&payload))?,
            NextLine::Eof | NextLine::Cancelled => break,
        }
    }
    Ok(())
}
