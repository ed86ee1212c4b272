use std::{
    error::Error,
    io::{self, BufRead},
    path::{Path, PathBuf},
    sync::Arc,
    thread,
    time::Duration,
};

use background_location::{
    alarm::AlarmEffects,
    audio::RodioPlayer,
    communication::{ACTION_STOP_SERVICE, EXTRA_STOP_SERVICE_ON_ALARM},
    console::{ConsoleHost, LoggingNotifier, LoggingVibrator, StaticLauncher},
    notification::TapTarget,
    replay::{ReplaySource, Track},
    store::TomlPreferences,
    volume::MasterVolume,
    AlarmRequest, BindOptions, Broadcast, LocationUpdatesService, Platform, ServiceConfig,
    StartCommand,
};
use clap::{command, Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write the default config
    Init {
        #[clap(long, short)]
        force: bool,
    },
    /// Replay a recorded track through the location service
    Track {
        file: PathBuf,
        #[clap(long, default_value_t = 0.0)]
        distance_filter: f64,
        #[clap(long)]
        force_location_manager: bool,
        /// act as if the fused provider isn't available
        #[clap(long)]
        no_primary: bool,
    },
    /// Ring an alarm for a while
    Alarm {
        sound: PathBuf,
        #[clap(long, default_value_t = 1)]
        id: i32,
        #[clap(long, default_value_t = 0.8)]
        volume: f64,
        #[clap(long, default_value_t = 10)]
        seconds: u64,
        #[clap(long)]
        no_vibrate: bool,
        #[clap(long, default_value = "Alarm")]
        title: String,
        #[clap(long, default_value = "Time to go")]
        body: String,
    },
}

fn platform(track: Track, primary_available: bool) -> Result<Platform, Box<dyn Error>> {
    let launcher = StaticLauncher(Some(TapTarget::new(env!("CARGO_PKG_NAME"))));
    let volume = MasterVolume::default();
    let notifier = LoggingNotifier::new();
    Ok(Platform {
        primary_available,
        primary: Box::new(ReplaySource::new("fused", track.clone())),
        fallback: Box::new(ReplaySource::new("gps", track)),
        preferences: Box::new(TomlPreferences::open(TomlPreferences::default_path()?)?),
        host: Box::new(ConsoleHost::new()),
        notifier: Box::new(notifier.clone()),
        launcher: Box::new(launcher.clone()),
        alarm: AlarmEffects {
            notifier: Box::new(notifier),
            audio: Box::new(RodioPlayer::new(volume.clone())),
            volume: Box::new(volume),
            vibrator: Box::new(LoggingVibrator::default()),
            launcher: Box::new(launcher),
        },
    })
}

fn print_broadcasts(service: &LocationUpdatesService) {
    let receiver = service.subscribe();
    thread::spawn(move || {
        for message in receiver {
            match message {
                Broadcast::Location(fix) => println!(
                    "{} {:.6},{:.6} ±{}m",
                    fix.time, fix.latitude, fix.longitude, fix.accuracy
                ),
                Broadcast::AlarmStopped { id, stop_service } => {
                    println!("alarm {id} stopped ({EXTRA_STOP_SERVICE_ON_ALARM}={stop_service})");
                }
            }
        }
    });
}

fn track(file: &Path, options: BindOptions, primary_available: bool) -> Result<(), Box<dyn Error>> {
    let config = ServiceConfig::load(&ServiceConfig::config_path()?)?;
    let track = Track::load(file)?;
    let service = Arc::new(LocationUpdatesService::create(
        config,
        platform(track, primary_available)?,
    ));
    print_broadcasts(&service);
    service.bind(options);
    service.request_location_updates();
    if !service.is_requesting_location_updates() {
        log::error!("location updates were refused");
    }
    println!("type `{ACTION_STOP_SERVICE}` to stop updates, `quit` or EOF to exit");
    for line in io::stdin().lock().lines() {
        match line?.trim() {
            "quit" => break,
            action => service.on_broadcast(action),
        }
    }
    service.shutdown();
    Ok(())
}

fn alarm(
    sound: PathBuf,
    id: i32,
    request: AlarmRequest,
    seconds: u64,
) -> Result<(), Box<dyn Error>> {
    let config = ServiceConfig::load(&ServiceConfig::config_path()?)?;
    let service = LocationUpdatesService::create(config, platform(Track::default(), false)?);
    print_broadcasts(&service);
    let started = service.start_alarm(AlarmRequest {
        id: Some(id),
        sound: Some(sound.to_string_lossy().into_owned()),
        ..request
    });
    if !started {
        return Err(format!("couldn't start alarm {id}").into());
    }
    thread::sleep(Duration::from_secs(seconds));
    // same path the notification's stop button takes
    service.handle_command(Some(StartCommand::stop_alarm(id, false)));
    service.shutdown();
    // let the printer catch up
    thread::sleep(Duration::from_millis(100));
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    // initilize the logger
    simple_file_logger::init_logger!("background_location")?;

    let args = Args::parse();
    match args.command {
        Command::Init { force } => {
            if force || !ServiceConfig::is_config_present() {
                let path = ServiceConfig::config_path()?;
                ServiceConfig::new().save(&path)?;
                println!("wrote {}", path.display());
            } else {
                println!("config already present, use --force to overwrite");
            }
            Ok(())
        }
        Command::Track {
            file,
            distance_filter,
            force_location_manager,
            no_primary,
        } => track(
            &file,
            BindOptions {
                distance_filter: Some(distance_filter),
                force_location_manager,
            },
            !no_primary,
        ),
        Command::Alarm {
            sound,
            id,
            volume,
            seconds,
            no_vibrate,
            title,
            body,
        } => alarm(
            sound,
            id,
            AlarmRequest {
                vibrate: Some(!no_vibrate),
                volume_enforced: Some(true),
                volume: Some(volume),
                title: Some(title),
                body: Some(body),
                stop_button_text: Some("Stop".to_string()),
                stop_service: Some(false),
                ..AlarmRequest::default()
            },
            seconds,
        ),
    }
}
