//! VirtusDev - virtual HID device daemon
//!
//! Creates one virtual device for the selected profile, then either types
//! payloads read from stdin (or `--payload`) or jiggles the pointer until
//! terminated.

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(
    name = "virtusdev",
    version,
    about = "Virtual HID device emulator over Linux uinput"
)]
struct Args {
    /// Device profile: barcode, usb_keyboard, mouse_jiggle or rs232
    profile: Option<String>,

    /// Transmit this payload once, then tear down and exit
    #[arg(short, long)]
    payload: Option<String>,

    /// Config file to use instead of the default location
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// File with a DEVICE=<profile> line
    #[arg(long, default_value = "device.conf")]
    device_conf: PathBuf,

    /// List available profiles and exit
    #[arg(short, long)]
    list: bool,
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
fn run(args: Args) -> Result<()> {
    if args.list {
        print_profiles();
        return Ok(());
    }
    bail!("virtual devices require Linux uinput")
}

#[cfg(target_os = "linux")]
fn run(args: Args) -> Result<()> {
    use log::{info, warn};
    use virtusdev::device::uinput::{UinputHandle, UINPUT_PATH};
    use crossterm::style::Stylize;
    use virtusdev::device::discovery::find_device_by_name;
    use virtusdev::device::SETTLE_DELAY;
    use virtusdev::input::{LineReader, NextLine};
    use virtusdev::keyboard::{Injector, ThreadSleep};
    use virtusdev::{CancelToken, VirtualDevice};

    if args.list {
        print_profiles();
        return Ok(());
    }

    let config = match &args.config {
        Some(path) => virtusdev::Config::load_from(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => virtusdev::Config::load().unwrap_or_else(|e| {
            warn!("ignoring config: {}", e);
            virtusdev::Config::default()
        }),
    };

    let profile = resolve_profile(&args, &config)?;
    if args.payload.is_some() && !profile.accepts_payloads() {
        bail!("profile '{}' does not accept payloads", profile);
    }
    let timing = config.timing_profile()?;
    let jiggler = if profile.accepts_payloads() {
        None
    } else {
        Some(config.jiggler()?)
    };
    let identity = config.identity_for(profile)?;
    let cancel = CancelToken::install().context("installing signal handler")?;

    let path = std::path::Path::new(UINPUT_PATH);
    let mut device = VirtualDevice::bring_up(profile, identity, path, || UinputHandle::open(path))
        .map_err(|e| {
            if let Some(hint) = e.remediation() {
                warn!("{}", hint);
            }
            e
        })
        .context("device setup failed")?;

    std::thread::sleep(SETTLE_DELAY);
    print_banner(&profile.describe(device.identity(), &timing));
    match find_device_by_name(device.identity().name()) {
        Ok(node) => println!("{} Event node: {}\n", "[DEVICE]".blue(), node.display()),
        Err(e) => warn!("could not locate the event node: {}", e),
    }

    let sink = device.sink().context("device is not available")?;

    if let Some(jiggler) = jiggler {
        let moves = jiggler.run(sink, &mut ThreadSleep, &cancel);
        info!("jiggler stopped after {} movement(s)", moves);
        device.teardown();
        return Ok(());
    }

    let mut injector = Injector::new(sink, timing).with_cancel(cancel.clone());

    if let Some(payload) = &args.payload {
        injector.transmit(payload);
        drop(injector);
        device.teardown();
        return Ok(());
    }

    let interactive = is_tty();
    let mut lines = LineReader::stdin().context("starting input reader")?;
    loop {
        if interactive {
            prompt();
        }
        match lines.next_line(&cancel) {
            NextLine::Payload(payload) => {
                injector.transmit(&payload);
            }
            NextLine::Cancelled => break,
            NextLine::Eof => {
                info!("input closed, holding device until terminated");
                hold(&cancel);
                break;
            }
        }
    }

    drop(injector);
    device.teardown();
    Ok(())
}

/// Pick the profile from the command line, device.conf, the config file
/// or, on a terminal, an interactive menu.
#[cfg(target_os = "linux")]
fn resolve_profile(
    args: &Args,
    config: &virtusdev::Config,
) -> Result<virtusdev::DeviceProfile> {
    use log::{debug, warn};
    use virtusdev::config::load_device_conf;
    use virtusdev::DeviceProfile;

    if let Some(name) = &args.profile {
        match DeviceProfile::find_by_name(name) {
            Ok(profile) => return Ok(profile),
            Err(e) => warn!("{}", e),
        }
    }

    if args.device_conf.exists() {
        match load_device_conf(&args.device_conf) {
            Ok(Some(name)) => match DeviceProfile::find_by_name(&name) {
                Ok(profile) => return Ok(profile),
                Err(e) => warn!("{}: {}", args.device_conf.display(), e),
            },
            Ok(None) => debug!("no DEVICE entry in {}", args.device_conf.display()),
            Err(e) => warn!("{}: {}", args.device_conf.display(), e),
        }
    }

    match config.profile() {
        Some(Ok(profile)) => return Ok(profile),
        Some(Err(e)) => warn!("config file: {}", e),
        None => {}
    }

    if !is_tty() {
        bail!("no device profile selected");
    }
    select_interactively()
}

#[cfg(target_os = "linux")]
fn select_interactively() -> Result<virtusdev::DeviceProfile> {
    use std::io::{self, Write};
    use virtusdev::DeviceProfile;

    let profiles = DeviceProfile::list();
    println!("Select a device to emulate:");
    for (i, profile) in profiles.iter().enumerate() {
        println!("  {}) {:<13} {}", i + 1, profile.name(), profile.description());
    }
    print!("Choice [1-{}]: ", profiles.len());
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;
    let answer = answer.trim();

    let chosen = answer
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| profiles.get(i).copied())
        .or_else(|| DeviceProfile::find_by_name(answer).ok());
    match chosen {
        Some(profile) => Ok(profile),
        None => bail!("invalid selection '{}'", answer),
    }
}

fn print_profiles() {
    for profile in virtusdev::DeviceProfile::list() {
        println!("{:<13} {}", profile.name(), profile.description());
    }
}

#[cfg(target_os = "linux")]
fn print_banner(info: &virtusdev::device::DeviceInfo) {
    use crossterm::style::Stylize;

    let rule = "═".repeat(55);
    println!("{}", rule.as_str().cyan());
    println!("  {}", info.title.bold().green());
    println!("{}", rule.as_str().cyan());
    for (label, value) in &info.rows {
        println!("  {:<12} : {}", label, value);
    }
    println!();
    println!("{} Check device location with:", "[INFO]".blue());
    println!("       {}", info.locate_hint);
    println!("{} Press Ctrl+C to destroy the device", "[INFO]".blue());
    println!();
    println!("{} {}", "[STATUS]".green(), info.status);
    println!();
}

#[cfg(target_os = "linux")]
fn prompt() {
    use std::io::Write;

    print!("SCAN> ");
    let _ = std::io::stdout().flush();
}

#[cfg(target_os = "linux")]
fn is_tty() -> bool {
    use crossterm::tty::IsTty;

    std::io::stdin().is_tty()
}

/// Keep the device alive until a termination request
#[cfg(target_os = "linux")]
fn hold(cancel: &virtusdev::CancelToken) {
    use virtusdev::device::jiggle::SLEEP_SLICE;

    while !cancel.is_cancelled() {
        std::thread::sleep(SLEEP_SLICE);
    }
}
