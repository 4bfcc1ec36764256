//! Process and socket plumbing for talking to an Android device.
//!
//! - [`adb`] runs the `adb` executable and classifies its failures
//! - [`locate`] finds the `adb` executable
//! - [`devices`] parses `adb devices` listings
//! - [`monkey`] speaks the on-device monkey line protocol over TCP

pub mod adb;
pub mod devices;
pub mod error;
pub mod locate;
pub mod monkey;

pub use adb::{Adb, AdbOutput};
pub use devices::{DeviceEntry, DeviceState};
pub use error::{Error, Result, TransferError};
pub use monkey::MonkeyClient;
