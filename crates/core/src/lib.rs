//! Control of a single Android device.
//!
//! The [`DeviceDriver`] / [`Device`] / [`FileTransfer`] traits describe what a
//! connected device can do; [`adb::AdbDriver`] implements them on top of the
//! `adb` executable and the on-device monkey service.

pub mod adb;
pub mod device;
pub mod error;
pub mod gesture;
pub mod snapshot;

pub use chimp_protocol::PressType;
pub use chimp_runtime::TransferError;
pub use device::{Device, DeviceDriver, FileTransfer, serial_matcher};
pub use error::{Error, Result};
pub use gesture::{Drag, Point};
pub use snapshot::Snapshot;
