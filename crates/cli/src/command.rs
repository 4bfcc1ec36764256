//! Command names accepted as the first path segment.

/// A recognized command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
	/// Connect to a device; the only command allowed without a session.
	Init,
	/// Release the current session.
	Dispose,
	/// Browsers ask for it when an operator opens the banner page.
	Favicon,
	/// Any action on the connected device.
	Device(DeviceCommand),
}

/// Commands that act on the connected device and therefore need a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceCommand {
	Reboot,
	Wake,
	Install,
	Remove,
	Pull,
	Push,
	GetVar,
	GetProp,
	Type,
	Press,
	Touch,
	Drag,
	TakeSnapshot,
	Shell,
}

const COMMANDS: &[(&str, Command)] = &[
	("init", Command::Init),
	("dispose", Command::Dispose),
	("favicon.ico", Command::Favicon),
	("reboot", Command::Device(DeviceCommand::Reboot)),
	("wake", Command::Device(DeviceCommand::Wake)),
	("install", Command::Device(DeviceCommand::Install)),
	("remove", Command::Device(DeviceCommand::Remove)),
	("pull", Command::Device(DeviceCommand::Pull)),
	("push", Command::Device(DeviceCommand::Push)),
	("getVar", Command::Device(DeviceCommand::GetVar)),
	("getProp", Command::Device(DeviceCommand::GetProp)),
	("type", Command::Device(DeviceCommand::Type)),
	("press", Command::Device(DeviceCommand::Press)),
	("touch", Command::Device(DeviceCommand::Touch)),
	("drag", Command::Device(DeviceCommand::Drag)),
	("takeSnapshot", Command::Device(DeviceCommand::TakeSnapshot)),
	("shell", Command::Device(DeviceCommand::Shell)),
];

impl Command {
	/// Resolves a path segment. Names are case-sensitive.
	pub fn from_name(name: &str) -> Option<Self> {
		COMMANDS.iter().find(|(n, _)| *n == name).map(|(_, command)| *command)
	}

	pub fn name(self) -> &'static str {
		COMMANDS
			.iter()
			.find(|(_, command)| *command == self)
			.map(|(name, _)| *name)
			.unwrap_or("unknown")
	}

	/// True for commands rejected while no session exists.
	pub fn requires_session(self) -> bool {
		matches!(self, Command::Dispose | Command::Device(_))
	}
}
