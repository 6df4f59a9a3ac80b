//! Synthetic vitals generation
//!
//! Produces one plausible reading per signal on a fixed interval while a
//! device is connected. Runs as a background thread in the collector style:
//! start/stop lifecycle, a shared running flag, and an mpsc channel carrying
//! the generated samples to the orchestration loop.

use crate::vitals::VitalsSample;
use log::{debug, info};
use rand::Rng;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Default interval between simulated readings
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(3000);

/// Generate one synthetic reading using independent bounded ranges
///
/// Integer-valued signals are floored; temperature is rounded to one
/// decimal place.
pub fn simulate_sample<R: Rng>(rng: &mut R) -> VitalsSample {
    let heart_rate = (65.0 + rng.random_range(0.0..30.0_f64)).floor();
    let systolic_bp = (115.0 + rng.random_range(0.0..25.0_f64)).floor();
    let diastolic_bp = (75.0 + rng.random_range(0.0..15.0_f64)).floor();
    let spo2 = (96.0 + rng.random_range(0.0..4.0_f64)).floor();
    let temperature = ((36.4 + rng.random_range(0.0..0.6_f64)) * 10.0).round() / 10.0;

    VitalsSample {
        heart_rate,
        systolic_bp,
        diastolic_bp,
        spo2,
        temperature,
    }
}

/// Background simulator tied to the connection lifetime
///
/// Started on connect and stopped on disconnect or shutdown; the stop call
/// joins the thread, so no two ticks ever overlap.
pub struct VitalsSimulator {
    interval: Duration,
    output_channel: Sender<VitalsSample>,
    thread_handle: Option<JoinHandle<()>>,
    running: Arc<Mutex<bool>>,
}

impl VitalsSimulator {
    /// Create a simulator sending samples on `channel` every `interval`
    pub fn new(interval: Duration, channel: Sender<VitalsSample>) -> Self {
        Self {
            interval,
            output_channel: channel,
            thread_handle: None,
            running: Arc::new(Mutex::new(false)),
        }
    }

    /// Start generating readings; a no-op when already running
    pub fn start(&mut self) {
        {
            let mut running = self.running.lock().unwrap();
            if *running {
                debug!("VitalsSimulator already running, skipping start");
                return;
            }
            *running = true;
        }

        let interval = self.interval;
        let channel = self.output_channel.clone();
        let running = Arc::clone(&self.running);

        let handle = thread::spawn(move || {
            Self::simulator_thread(interval, channel, running);
        });

        self.thread_handle = Some(handle);
        info!("VitalsSimulator started with interval {:?}", self.interval);
    }

    /// Stop generating readings and wait for the thread to finish
    pub fn stop(&mut self) {
        {
            let mut running = self.running.lock().unwrap();
            if !*running {
                debug!("VitalsSimulator already stopped");
                return;
            }
            *running = false;
        }

        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                log::error!("Failed to join VitalsSimulator thread");
            }
        }
        info!("VitalsSimulator stopped");
    }

    pub fn is_running(&self) -> bool {
        *self.running.lock().unwrap()
    }

    fn simulator_thread(
        interval: Duration,
        channel: Sender<VitalsSample>,
        running: Arc<Mutex<bool>>,
    ) {
        debug!("Simulator thread started");
        let mut rng = rand::rng();

        loop {
            // Sleep in short slices so stop() is picked up promptly
            let mut slept = Duration::ZERO;
            while slept < interval {
                if !*running.lock().unwrap() {
                    debug!("Simulator thread stopping");
                    return;
                }
                let slice = Duration::from_millis(100).min(interval - slept);
                thread::sleep(slice);
                slept += slice;
            }

            if !*running.lock().unwrap() {
                debug!("Simulator thread stopping");
                return;
            }

            let sample = simulate_sample(&mut rng);
            if channel.send(sample).is_err() {
                debug!("Sample receiver disconnected, stopping simulator thread");
                *running.lock().unwrap() = false;
                return;
            }
        }
    }
}

impl Drop for VitalsSimulator {
    fn drop(&mut self) {
        self.stop();
    }
}
