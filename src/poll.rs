//! The read, print, sleep loop behind the `tof` tool.

use std::{future::Future, io, io::Write, time::Duration};

use tokio::time::{sleep, Instant};

#[cfg(feature = "tracing")]
use tracing::{error, info, warn};

use crate::{i2c::Bus, Vl53l1x};

/// How often and how long to poll.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollSettings {
    /// Pause after every reading or failed read.
    pub interval: Duration,
    /// Stop once this much time has passed. `None` runs until shutdown.
    pub duration: Option<Duration>,
}

/// What a finished run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Report {
    /// Distances written to the output.
    pub readings: u64,
    /// Reads that failed and were retried.
    pub failures: u64,
}

/// Poll `sensor` and write each distance (millimeters) on its own line to
/// `out` until `shutdown` resolves or the configured duration elapses.
///
/// Ranging must already be started. Failed reads are logged and retried
/// after the usual interval. Ranging is stopped before returning.
///
/// # Errors
///
/// Only writing to `out` can fail the run. Ranging is stopped in that case
/// too.
pub async fn run<B, W, F>(
    sensor: &mut Vl53l1x<B>,
    settings: &PollSettings,
    mut out: W,
    shutdown: F,
) -> io::Result<Report>
where
    B: Bus,
    W: Write,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    let start = Instant::now();
    let mut report = Report::default();
    let mut outcome = Ok(());

    loop {
        let reading = tokio::select! {
            _ = &mut shutdown => break,
            reading = sensor.distance() => reading,
        };

        match reading {
            // 0 is printed too, it usually means no target
            Ok(mm) => {
                if let Err(e) = writeln!(out, "{mm}").and_then(|()| out.flush()) {
                    outcome = Err(e);
                    break;
                }
                report.readings += 1;
            }
            Err(_e) => {
                #[cfg(feature = "tracing")]
                error!(error = %_e, "read failed");
                report.failures += 1;
            }
        }

        if settings
            .duration
            .is_some_and(|limit| start.elapsed() >= limit)
        {
            #[cfg(feature = "tracing")]
            info!("duration elapsed");
            break;
        }

        tokio::select! {
            _ = &mut shutdown => break,
            _ = sleep(settings.interval) => {}
        }
    }

    if let Err(_e) = sensor.stop_ranging() {
        #[cfg(feature = "tracing")]
        warn!(error = %_e, "failed to stop ranging");
    }

    outcome.map(|()| report)
}
