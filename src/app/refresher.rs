//! Periodic display refresh: wall-clock time plus the latest reading.
//!
//! Each cycle takes the display lock, reads the sensor, renders, and
//! releases.  The wait between cycles happens outside the lock: an
//! `async-io-mini` timer raced against the stop signal, driven by
//! `futures_lite::block_on` on the refresher's own thread, so
//! [`DisplayRefresher::stop`] returns within one render.

use std::io;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use chrono::{Local, NaiveTime};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use futures_lite::future;
use log::{debug, warn};

use crate::drivers::task_pin::{Core, spawn_on_core};
use crate::sensors::Reading;

use super::display::SharedDisplay;
use super::sensor::SharedSensor;

/// `HH:MM:SS\nT:<t>F\nP:<p>kPa`
pub fn format_frame(now: NaiveTime, reading: Reading) -> String {
    format!(
        "{}\nT:{:.1}F\nP:{:.1}kPa",
        now.format("%H:%M:%S"),
        reading.temperature_f,
        reading.pressure_kpa
    )
}

type StopSignal = Signal<CriticalSectionRawMutex, ()>;

pub struct DisplayRefresher {
    stop: Arc<StopSignal>,
    task: JoinHandle<()>,
}

impl DisplayRefresher {
    pub fn start(
        display: Arc<SharedDisplay>,
        sensor: Arc<SharedSensor>,
        period: Duration,
    ) -> io::Result<Self> {
        let stop = Arc::new(StopSignal::new());
        let signal = stop.clone();
        let task = spawn_on_core(Core::App, 3, 6, "display\0", move || {
            future::block_on(refresh_loop(&display, &sensor, period, &signal));
            debug!("Display refresher stopped");
        })?;
        Ok(Self { stop, task })
    }

    /// Stop and wait for the thread.
    pub fn stop(self) {
        self.stop.signal(());
        if self.task.join().is_err() {
            warn!("Display refresher thread panicked");
        }
    }
}

async fn refresh_loop(
    display: &SharedDisplay,
    sensor: &SharedSensor,
    period: Duration,
    stop: &StopSignal,
) {
    loop {
        display.with(|port| {
            let frame = format_frame(Local::now().time(), sensor.read());
            port.render(&frame);
        });
        let stopped = future::or(
            async {
                stop.wait().await;
                true
            },
            async {
                async_io_mini::Timer::after(period).await;
                false
            },
        )
        .await;
        if stopped {
            break;
        }
    }
}
