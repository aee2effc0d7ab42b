//! Audio device enumeration and change notification.

use cpal::traits::{DeviceTrait, HostTrait};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use super::input::CaptureError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceInfo {
    pub name: String,
    pub direction: Direction,
    pub is_default: bool,
}

/// List every input and output device on the default host.
pub fn list_devices() -> Result<Vec<DeviceInfo>, CaptureError> {
    let host = cpal::default_host();
    let default_input = host.default_input_device().and_then(|d| d.name().ok());
    let default_output = host.default_output_device().and_then(|d| d.name().ok());

    let mut devices = Vec::new();

    let inputs = host
        .input_devices()
        .map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))?;
    for device in inputs {
        if let Ok(name) = device.name() {
            let is_default = default_input.as_deref() == Some(name.as_str());
            devices.push(DeviceInfo {
                name,
                direction: Direction::Input,
                is_default,
            });
        }
    }

    let outputs = host
        .output_devices()
        .map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))?;
    for device in outputs {
        if let Ok(name) = device.name() {
            let is_default = default_output.as_deref() == Some(name.as_str());
            devices.push(DeviceInfo {
                name,
                direction: Direction::Output,
                is_default,
            });
        }
    }

    Ok(devices)
}

/// Polls the device list on a background thread and sends the new list
/// whenever it changes. Stops when dropped.
pub struct DeviceWatcher {
    running: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl DeviceWatcher {
    pub fn spawn(interval: Duration) -> (Self, Receiver<Vec<DeviceInfo>>) {
        Self::spawn_with(interval, list_devices)
    }

    fn spawn_with<F>(interval: Duration, mut enumerate: F) -> (Self, Receiver<Vec<DeviceInfo>>)
    where
        F: FnMut() -> Result<Vec<DeviceInfo>, CaptureError> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);

        let handle = thread::spawn(move || {
            let mut last: Option<Vec<DeviceInfo>> = None;
            while flag.load(Ordering::Relaxed) {
                match enumerate() {
                    Ok(devices) => {
                        if last.as_ref() != Some(&devices) {
                            if last.is_some() && tx.send(devices.clone()).is_err() {
                                break;
                            }
                            last = Some(devices);
                        }
                    }
                    Err(e) => log::debug!("Device enumeration failed: {}", e),
                }
                thread::sleep(interval);
            }
        });

        (
            Self {
                running,
                handle: Some(handle),
            },
            rx,
        )
    }
}

impl Drop for DeviceWatcher {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
