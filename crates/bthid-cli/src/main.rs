//! bthid CLI: run the Bluetooth HID bridge and feed it demo reports.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context;
use bthid_bluetooth::sdp;
use bthid_daemon::setup;
use bthid_protocol::ReportSender;
use bthid_types::{KeyboardReport, Keycode, MouseReport, TouchReport};
use clap::{Parser, Subcommand};

const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 6789;

#[derive(Parser)]
#[command(
    name = "bthid",
    about = "Emulate a Bluetooth keyboard, mouse and touch device",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bridge daemon until interrupted.
    Serve {
        /// Base configuration file [default: $BTHID_CONFIG or /etc/bthid.toml].
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print the composite HID report descriptor as hex.
    Descriptor {
        /// Base configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print the full SDP service record instead.
        #[arg(long)]
        record: bool,
    },

    /// Type a message on the emulated keyboard.
    Type {
        #[arg(long, default_value = DEFAULT_HOST)]
        host: String,

        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,

        /// Characters per second.
        #[arg(long, default_value_t = 3.0)]
        rate: f64,

        message: String,
    },

    /// Move the emulated mouse in a circle.
    Mouse {
        #[arg(long, default_value = DEFAULT_HOST)]
        host: String,

        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,

        /// Magnitude of each movement, in [0, 1].
        #[arg(long, default_value_t = 0.05)]
        gain: f64,

        /// Reports per second.
        #[arg(long, default_value_t = 50.0)]
        rate: f64,

        /// Stop after this many seconds; runs until interrupted otherwise.
        #[arg(long)]
        duration: Option<f64>,
    },

    /// Trace a circle with the emulated absolute pointer.
    Touch {
        #[arg(long, default_value = DEFAULT_HOST)]
        host: String,

        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,

        /// Circle radius as a fraction of the surface, in [0, 0.5].
        #[arg(long, default_value_t = 0.25)]
        radius: f64,

        /// Revolutions per second.
        #[arg(long, default_value_t = 0.1)]
        speed: f64,

        /// Reports per second.
        #[arg(long, default_value_t = 250.0)]
        rate: f64,

        /// Press the tip switch instead of hovering.
        #[arg(long)]
        contact: bool,

        /// Stop after this many seconds; runs until interrupted otherwise.
        #[arg(long)]
        duration: Option<f64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config } => serve(config).await,
        Commands::Descriptor { config, record } => {
            let config = setup::load_config(config.as_deref())?;
            let descriptors = config.descriptor_registry()?;
            if record {
                print!("{}", sdp::service_record(&descriptors.descriptor_hex()));
            } else {
                println!("{}", descriptors.descriptor_hex());
            }
            Ok(())
        }
        Commands::Type {
            host,
            port,
            rate,
            message,
        } => type_message(&host, port, rate, &message).await,
        Commands::Mouse {
            host,
            port,
            gain,
            rate,
            duration,
        } => circle_mouse(&host, port, gain, rate, duration).await,
        Commands::Touch {
            host,
            port,
            radius,
            speed,
            rate,
            contact,
            duration,
        } => {
            let circle = TouchCircle {
                radius,
                speed,
                contact,
            };
            circle_touch(&host, port, circle, rate, duration).await
        }
    }
}

#[cfg(feature = "bluez")]
async fn serve(config: Option<PathBuf>) -> anyhow::Result<()> {
    use bthid_bluetooth::bluez::BluezBackend;
    use bthid_daemon::Daemon;

    let config = setup::load_config(config.as_deref())?;
    tracing::info!(
        ingress = %config.server.address(),
        devices = ?config.hid.devices,
        "starting bthid daemon"
    );

    let backend = BluezBackend::connect(config.bluetooth.adapter.as_deref()).await?;
    let daemon = Daemon::start(&config, Box::new(backend)).await?;

    let shutdown = daemon.shutdown_token();
    tokio::spawn(async move {
        match shutdown_signal().await {
            Ok(()) => tracing::info!("shutdown signal received"),
            Err(e) => tracing::warn!(error = %e, "failed to listen for shutdown signals"),
        }
        shutdown.cancel();
    });

    daemon.run().await?;
    Ok(())
}

#[cfg(not(feature = "bluez"))]
async fn serve(_config: Option<PathBuf>) -> anyhow::Result<()> {
    Err(bthid_bluetooth::BluetoothError::Unavailable)
        .context("bthid was built without BlueZ support")
}

/// Resolves on SIGINT or SIGTERM.
#[cfg(feature = "bluez")]
async fn shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result,
        _ = terminate.recv() => Ok(()),
    }
}

fn interval_for(rate: f64) -> anyhow::Result<Duration> {
    anyhow::ensure!(rate.is_finite() && rate > 0.0, "rate must be positive, got {rate}");
    let period = Duration::try_from_secs_f64(1.0 / rate)
        .with_context(|| format!("rate {rate} is too low"))?;
    anyhow::ensure!(!period.is_zero(), "rate {rate} is too high");
    Ok(period)
}

fn duration_limit(duration: Option<f64>) -> anyhow::Result<Option<Duration>> {
    duration
        .map(Duration::try_from_secs_f64)
        .transpose()
        .context("invalid duration")
}

async fn connect(host: &str, port: u16) -> anyhow::Result<ReportSender> {
    ReportSender::connect((host, port))
        .await
        .with_context(|| format!("failed to connect to bthid at {host}:{port}"))
}

async fn type_message(host: &str, port: u16, rate: f64, message: &str) -> anyhow::Result<()> {
    let pause = interval_for(rate)?;
    let mut sender = connect(host, port).await?;

    let presses = message
        .chars()
        .filter_map(|c| {
            let report = KeyboardReport::for_char(c);
            if report.is_none() {
                tracing::warn!(character = %c.escape_debug(), "no key for character, skipping");
            }
            report
        })
        .chain(std::iter::once(KeyboardReport::press(Keycode::ENTER)));

    for press in presses {
        sender.send(&press).await?;
        sender.send(&KeyboardReport::default()).await?;
        tokio::time::sleep(pause).await;
    }

    sender.close().await?;
    Ok(())
}

async fn circle_mouse(
    host: &str,
    port: u16,
    gain: f64,
    rate: f64,
    duration: Option<f64>,
) -> anyhow::Result<()> {
    let mut ticker = tokio::time::interval(interval_for(rate)?);
    let limit = duration_limit(duration)?;
    let mut sender = connect(host, port).await?;
    let started = Instant::now();

    loop {
        ticker.tick().await;
        let elapsed = started.elapsed();
        if limit.is_some_and(|limit| elapsed >= limit) {
            break;
        }
        let angle = elapsed.as_secs_f64();
        let report = MouseReport::movement(angle.cos() * gain, angle.sin() * gain);
        sender.send(&report).await?;
    }

    sender.close().await?;
    Ok(())
}

/// A circle around the middle of the touch surface.
#[derive(Debug, Clone, Copy)]
struct TouchCircle {
    radius: f64,
    /// Revolutions per second.
    speed: f64,
    contact: bool,
}

impl TouchCircle {
    fn report_at(self, elapsed: Duration) -> TouchReport {
        let angle = std::f64::consts::TAU * self.speed * elapsed.as_secs_f64();
        let x = 0.5 + self.radius * angle.cos();
        let y = 0.5 + self.radius * angle.sin();
        if self.contact {
            TouchReport::contact(x, y)
        } else {
            TouchReport::hover(x, y)
        }
    }
}

async fn circle_touch(
    host: &str,
    port: u16,
    circle: TouchCircle,
    rate: f64,
    duration: Option<f64>,
) -> anyhow::Result<()> {
    anyhow::ensure!(
        (0.0..=0.5).contains(&circle.radius),
        "radius must be within [0, 0.5], got {}",
        circle.radius
    );
    let mut ticker = tokio::time::interval(interval_for(rate)?);
    let limit = duration_limit(duration)?;
    let mut sender = connect(host, port).await?;
    let started = Instant::now();

    loop {
        ticker.tick().await;
        let elapsed = started.elapsed();
        if limit.is_some_and(|limit| elapsed >= limit) {
            break;
        }
        sender.send(&circle.report_at(elapsed)).await?;
    }

    sender.close().await?;
    Ok(())
}
