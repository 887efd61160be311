//! Shared handle to the environmental sensor.
//!
//! The publisher, the refresher and the console `s` command all read the
//! same sensor; the mutex serializes bus transactions between them.

use std::sync::{Mutex, PoisonError};

use crate::sensors::Reading;

use super::ports::SensorPort;

pub struct SharedSensor {
    port: Mutex<Box<dyn SensorPort>>,
}

impl SharedSensor {
    pub fn new(port: Box<dyn SensorPort>) -> Self {
        Self {
            port: Mutex::new(port),
        }
    }

    pub fn read(&self) -> Reading {
        self.port
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .read_sample()
    }
}
