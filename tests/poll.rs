mod common;

use std::{
    future::pending,
    io::{self, Write},
    time::Duration,
};

use common::FakeSensor;
use tokio::time::sleep;
use vl53l1x_reader::{
    poll::{self, PollSettings, Report},
    Vl53l1x,
};

fn ranging_sensor() -> (FakeSensor, Vl53l1x<FakeSensor>) {
    let fake = FakeSensor::new();
    let mut vl53 = Vl53l1x::new(fake.clone());
    vl53.start_ranging().unwrap();
    (fake, vl53)
}

fn settings(interval_ms: u64, duration_ms: Option<u64>) -> PollSettings {
    PollSettings {
        interval: Duration::from_millis(interval_ms),
        duration: duration_ms.map(Duration::from_millis),
    }
}

#[tokio::test(start_paused = true)]
async fn prints_one_distance_per_line_until_duration() {
    let (fake, mut vl53) = ranging_sensor();
    let mut out = Vec::new();

    let report = poll::run(&mut vl53, &settings(500, Some(1200)), &mut out, pending())
        .await
        .unwrap();

    // readings at 0, 0.5, 1.0 and 1.5 s; the last one is past the duration
    assert_eq!(
        report,
        Report {
            readings: 4,
            failures: 0
        }
    );
    assert_eq!(String::from_utf8(out).unwrap(), "500\n500\n500\n500\n");
    assert!(!fake.ranging());
}

#[tokio::test(start_paused = true)]
async fn failed_reads_keep_the_cadence() {
    let (fake, mut vl53) = ranging_sensor();
    fake.fail_reads(true);
    let mut out = Vec::new();

    let report = poll::run(&mut vl53, &settings(500, Some(1000)), &mut out, pending())
        .await
        .unwrap();

    assert_eq!(report.readings, 0);
    assert_eq!(report.failures, 3);
    assert!(out.is_empty());
    assert!(!fake.ranging());
}

#[tokio::test(start_paused = true)]
async fn recovers_after_failures() {
    let (fake, mut vl53) = ranging_sensor();
    fake.fail_reads(true);
    let mut out = Vec::new();

    let heal = {
        let fake = fake.clone();
        async move {
            sleep(Duration::from_millis(750)).await;
            fake.fail_reads(false);
            pending::<()>().await;
        }
    };

    let report = poll::run(&mut vl53, &settings(500, Some(1500)), &mut out, heal)
        .await
        .unwrap();

    assert_eq!(
        report,
        Report {
            readings: 2,
            failures: 2
        }
    );
    assert_eq!(String::from_utf8(out).unwrap(), "500\n500\n");
}

#[tokio::test(start_paused = true)]
async fn shutdown_interrupts_the_sleep() {
    let (fake, mut vl53) = ranging_sensor();
    let mut out = Vec::new();

    let report = poll::run(
        &mut vl53,
        &settings(500, None),
        &mut out,
        sleep(Duration::from_millis(700)),
    )
    .await
    .unwrap();

    assert_eq!(report.readings, 2);
    assert!(!fake.ranging());
}

#[tokio::test(start_paused = true)]
async fn shutdown_interrupts_a_pending_read() {
    let (fake, mut vl53) = ranging_sensor();
    fake.stall();
    let mut out = Vec::new();

    let report = poll::run(
        &mut vl53,
        &settings(500, None),
        &mut out,
        sleep(Duration::from_millis(100)),
    )
    .await
    .unwrap();

    assert_eq!(report, Report::default());
    assert!(out.is_empty());
    assert!(!fake.ranging());
}

struct ClosedPipe;

impl Write for ClosedPipe {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::ErrorKind::BrokenPipe.into())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn write_errors_end_the_run() {
    let (fake, mut vl53) = ranging_sensor();

    let err = poll::run(&mut vl53, &settings(500, None), ClosedPipe, pending())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    assert!(!fake.ranging());
}
