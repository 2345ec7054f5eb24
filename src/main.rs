//! Poll a VL53L1X and print one distance (millimeters) per line on stdout.
//! Logs go to stderr; tune them with `-v` or `RUST_LOG`.

use std::{future::Future, io, process::ExitCode};

use clap::Parser;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use vl53l1x_reader::{
    app,
    cli::Args,
    config,
    i2cdev::linux::LinuxI2CDevice,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    // installed before the bus is touched, so a signal during bring-up is
    // never missed
    let shutdown = match shutdown_signal() {
        Ok(shutdown) => shutdown,
        Err(e) => {
            error!("failed to install signal handlers: {e}");
            return ExitCode::from(app::EXIT_FAILURE);
        }
    };

    let code = app::run(
        &args,
        config::disabled_by_env(),
        |config| LinuxI2CDevice::new(&config.bus_path, config.address),
        io::stdout().lock(),
        shutdown,
    )
    .await;

    ExitCode::from(code)
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn shutdown_signal() -> io::Result<impl Future<Output = ()>> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    Ok(async move {
        tokio::select! {
            _ = sigint.recv() => {}
            _ = sigterm.recv() => {}
        }
        info!("shutting down");
    })
}
