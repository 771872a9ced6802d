use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;

use mdsctl::{DeckProfile, Session, transport::SerialTransport};

#[derive(clap::Parser)]
#[command(
    name = "mdsctl",
    about = "Remote control for Sony MDS studio MiniDisc decks over RS-232"
)]
struct Cli {
    /// Serial port the deck is connected to, e.g. /dev/ttyUSB0 or COM4
    #[arg(short, long, global = true)]
    port: Option<String>,
    /// Deck profile YAML replacing the bundled MDS-E12 profile
    #[arg(long, global = true)]
    profile: Option<PathBuf>,
    /// More output, repeat for trace
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    /// Only print warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,
    #[command(subcommand)]
    command: Cmd,
}

#[derive(clap::Subcommand)]
enum Cmd {
    /// Model, status, disc data, disc and track names, and remaining time
    Info {},
    /// Show the deck status
    Status {},
    /// Show the table of contents
    Toc {},
    /// Show the disc name
    DiscName {},
    /// Show the name of a track
    TrackName {
        /// Track number, starting at 1
        track: u8,
    },
    /// Write the name of a track
    NameTrack {
        /// Track number, starting at 1
        track: u8,
        name: String,
    },
    /// Start playback
    Play {},
    /// Stop playback or recording
    Stop {},
    /// Enter record pause
    Record {},
    /// Eject the disc
    Eject {},
    /// Show the remaining recording time
    Remain {},
    /// Take the deck out of remote mode so the front panel works again
    Release {},
    /// Print the active deck profile
    Profiles {},
}

#[derive(Serialize)]
struct TrackEntry {
    track: u8,
    name: Option<String>,
}

fn print_yaml<T: Serialize>(value: &T) -> Result<()> {
    print!("{}", serde_yaml::to_string(value)?);
    Ok(())
}

fn info(session: &mut Session<SerialTransport>) -> Result<()> {
    session.model_request()?;
    log::info!("Connected with {}", session.model_name()?);
    print_yaml(&session.status()?)?;
    print_yaml(&session.disc_data()?)?;
    match session.disc_name()? {
        Some(name) => println!("disc_name: {:?}", name),
        None => println!("disc_name: ~"),
    }
    let toc = session.toc_data()?;
    print_yaml(&toc)?;
    let mut tracks = Vec::new();
    for track in toc.tracks() {
        tracks.push(TrackEntry {
            track,
            name: session.track_name(track)?,
        });
    }
    print_yaml(&tracks)?;
    println!("rec_remain_secs: {}", session.rec_remain()?.as_secs());
    Ok(())
}

fn run(session: &mut Session<SerialTransport>, command: Cmd) -> Result<()> {
    session.ensure_remote()?;
    match command {
        Cmd::Info {} => info(session)?,
        Cmd::Status {} => print_yaml(&session.status()?)?,
        Cmd::Toc {} => print_yaml(&session.toc_data()?)?,
        Cmd::DiscName {} => match session.disc_name()? {
            Some(name) => println!("{}", name),
            None => log::info!("No disc name set"),
        },
        Cmd::TrackName { track } => match session.track_name(track)? {
            Some(name) => println!("{}", name),
            None => log::info!("No name set for track {}", track),
        },
        Cmd::NameTrack { track, name } => {
            session.track_name_write(track, &name)?;
            if let Some(written) = session.track_name(track)? {
                log::info!("Name on disc: {}", written);
            }
        }
        Cmd::Play {} => session.play()?,
        Cmd::Stop {} => session.stop()?,
        Cmd::Record {} => session.record()?,
        Cmd::Eject {} => session.eject()?,
        Cmd::Remain {} => println!("{}", session.rec_remain()?.as_secs()),
        Cmd::Release {} | Cmd::Profiles {} => {}
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match (cli.quiet, cli.verbose) {
        (true, _) => simplelog::LevelFilter::Warn,
        (false, 0) => simplelog::LevelFilter::Info,
        (false, 1) => simplelog::LevelFilter::Debug,
        (false, _) => simplelog::LevelFilter::Trace,
    };
    let _ = simplelog::TermLogger::init(
        level,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );

    let profile = match &cli.profile {
        Some(path) => DeckProfile::from_file(path)
            .with_context(|| format!("loading deck profile {}", path.display()))?,
        None => DeckProfile::builtin()?,
    };

    if let Cmd::Profiles {} = cli.command {
        println!("{}", profile);
        println!("  {}", profile.description);
        println!(
            "  serial: {} baud 8N1, timeout {:?}",
            profile.serial.baudrate, profile.serial.timeout
        );
        println!("  settle: {:?}", profile.settle);
        return Ok(());
    }

    let port = cli.port.context("--port is required to talk to a deck")?;
    let mut session = Session::open(&port, profile)
        .with_context(|| format!("opening serial port {}", port))?;

    let result = match cli.command {
        Cmd::Release {} => session.release().context("could not release the deck"),
        command => session.with_remote(|session| run(session, command)),
    };
    session.close();
    result
}
