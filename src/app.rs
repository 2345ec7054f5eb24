//! The `tof` tool from parsed arguments to exit code.

use std::{future::Future, io::Write};

use anyhow::Context;
use tracing::{error, info};

use crate::{
    cli::Args,
    config::{Config, DISABLE_ENV},
    i2c::Bus,
    poll, Vl53l1x,
};

/// Exit code after a signal, an elapsed duration, or when disabled.
pub const EXIT_OK: u8 = 0;
/// Exit code when the sensor cannot be brought up or the output breaks.
pub const EXIT_FAILURE: u8 = 1;
/// Exit code for invalid arguments. clap uses it for parse errors too.
pub const EXIT_USAGE: u8 = 2;

/// Run the tool and return its exit code.
///
/// `open` is only called once the arguments are valid and the reader is not
/// `disabled`. Readings go to `out`. `shutdown` should already be listening
/// when this is called: it is raced against sensor bring-up as well as the
/// polling loop.
pub async fn run<B, O, W, F>(args: &Args, disabled: bool, open: O, out: W, shutdown: F) -> u8
where
    B: Bus,
    O: FnOnce(&Config) -> Result<B, B::Error>,
    W: Write,
    F: Future<Output = ()>,
{
    if disabled {
        info!("disabled through {DISABLE_ENV}");
        return EXIT_OK;
    }

    let config = match Config::try_from(args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("ERR: invalid args: {e}");
            return EXIT_USAGE;
        }
    };

    match serve(&config, open, out, shutdown).await {
        Ok(()) => EXIT_OK,
        Err(e) => {
            error!("{e:#}");
            EXIT_FAILURE
        }
    }
}

async fn serve<B, O, W, F>(config: &Config, open: O, out: W, shutdown: F) -> anyhow::Result<()>
where
    B: Bus,
    O: FnOnce(&Config) -> Result<B, B::Error>,
    W: Write,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    let dev = open(config).with_context(|| {
        format!(
            "failed to open {} at {:#04x}",
            config.bus_path.display(),
            config.address
        )
    })?;
    let mut vl53 = Vl53l1x::new(dev);

    tokio::select! {
        _ = &mut shutdown => {
            info!("shutting down during bring-up");
            vl53.stop_ranging().context("failed to stop ranging")?;
            return Ok(());
        }
        started = bring_up(&mut vl53, config) => started?,
    }

    info!(
        bus = %config.bus_path.display(),
        address = config.address,
        ranging = ?config.ranging,
        "ranging"
    );

    let report = poll::run(&mut vl53, &config.poll, out, shutdown)
        .await
        .context("failed to write reading")?;

    info!(
        readings = report.readings,
        failures = report.failures,
        "stopped"
    );

    Ok(())
}

async fn bring_up<B: Bus>(vl53: &mut Vl53l1x<B>, config: &Config) -> anyhow::Result<()> {
    vl53.init().await.context("failed to initialize sensor")?;
    vl53.configure(&config.ranging)
        .context("failed to configure ranging")?;
    vl53.start_ranging().context("failed to start ranging")?;
    Ok(())
}
