//! Parsing of `adb devices` output.

/// Connection state reported by `adb devices`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceState {
	Device,
	Offline,
	Unauthorized,
	Bootloader,
	Recovery,
	Other(String),
}

impl DeviceState {
	fn parse(raw: &str) -> Self {
		match raw {
			"device" => DeviceState::Device,
			"offline" => DeviceState::Offline,
			"unauthorized" => DeviceState::Unauthorized,
			"bootloader" => DeviceState::Bootloader,
			"recovery" => DeviceState::Recovery,
			other => DeviceState::Other(other.to_string()),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceEntry {
	pub serial: String,
	pub state: DeviceState,
}

impl DeviceEntry {
	/// True when the device accepts shell and sync commands.
	pub fn is_online(&self) -> bool {
		self.state == DeviceState::Device
	}
}

/// Parses the listing printed by `adb devices`.
///
/// The header line, daemon chatter (`* daemon started successfully`) and blank
/// lines are skipped.
pub fn parse_devices(output: &str) -> Vec<DeviceEntry> {
	output
		.lines()
		.map(str::trim)
		.filter(|line| !line.is_empty() && !line.starts_with('*') && !line.starts_with("List of devices"))
		.filter_map(|line| {
			let mut parts = line.split_whitespace();
			let serial = parts.next()?;
			let state = parts.next()?;
			Some(DeviceEntry {
				serial: serial.to_string(),
				state: DeviceState::parse(state),
			})
		})
		.collect()
}
