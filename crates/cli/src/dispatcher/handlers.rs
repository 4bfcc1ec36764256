//! One handler per device command. The session gate has already passed.

use std::path::Path;
use std::time::Duration;

use chimp::{Device, Drag, Point, PressType};
use tracing::debug;

use crate::command::DeviceCommand;
use crate::error::CommandError;
use crate::request::{CommandRequest, Params};

const DEFAULT_KEY: &str = "KEYCODE_HOME";

pub(super) async fn run(
	command: DeviceCommand,
	device: &dyn Device,
	request: &CommandRequest,
) -> Result<String, CommandError> {
	let params = &request.params;
	match command {
		DeviceCommand::Reboot => {
			let into = params.get("into").filter(|mode| !mode.is_empty());
			device.reboot(into).await?;
			Ok("rebooted".to_string())
		}
		DeviceCommand::Wake => {
			device.wake().await?;
			Ok("morning".to_string())
		}
		DeviceCommand::Install => {
			let apk = params.required("apk")?;
			let installed = device.install_package(Path::new(apk)).await?;
			// Reported as installed either way; the outcome is only logged.
			debug!(target = "chimp", apk, installed, "install finished");
			Ok("installed".to_string())
		}
		DeviceCommand::Remove => {
			let removed = device.remove_package(params.required("pkg")?).await?;
			Ok(removed.to_string())
		}
		DeviceCommand::Pull => {
			let (src, dst) = (params.required("src")?, params.required("dst")?);
			device.file_transfer().pull(src, Path::new(dst)).await?;
			Ok("done".to_string())
		}
		DeviceCommand::Push => {
			let (src, dst) = (params.required("src")?, params.required("dst")?);
			device.file_transfer().push(Path::new(src), dst).await?;
			Ok("done".to_string())
		}
		DeviceCommand::GetVar => Ok(device.variable(params.required("var")?).await?),
		DeviceCommand::GetProp => Ok(device.system_property(params.required("prop")?).await?),
		DeviceCommand::Type => {
			device.type_text(params.required("s")?).await?;
			Ok("typed".to_string())
		}
		DeviceCommand::Press => {
			let key = params.get("keyname").unwrap_or(DEFAULT_KEY);
			let kind = params.parse_or("t", PressType::DownAndUp)?;
			device.press(key, kind).await?;
			Ok("sent".to_string())
		}
		DeviceCommand::Touch => {
			let x = params.parse_or("x", 0i32)?;
			let y = params.parse_or("y", 0i32)?;
			let kind = params.parse_or("t", PressType::DownAndUp)?;
			device.touch(x, y, kind).await?;
			Ok("sent".to_string())
		}
		DeviceCommand::Drag => {
			device.drag(drag_from(params)?).await?;
			Ok("sent".to_string())
		}
		DeviceCommand::TakeSnapshot => {
			let (path, format) = (params.required("path")?, params.required("format")?);
			let snapshot = device.take_snapshot().await?;
			snapshot.write_to_file(Path::new(path), format).await?;
			Ok("taken".to_string())
		}
		DeviceCommand::Shell => {
			let command = request.body.as_deref().ok_or(CommandError::UsePost)?;
			Ok(device.shell(command).await?)
		}
	}
}

fn drag_from(params: &Params) -> Result<Drag, CommandError> {
	let max_ms = Drag::MAX_DURATION.as_millis() as u64;
	Ok(Drag {
		start: Point::new(params.parse_or("startx", 0)?, params.parse_or("starty", 0)?),
		end: Point::new(params.parse_or("endx", 200)?, params.parse_or("endy", 200)?),
		steps: at_most("steps", params.parse_or("steps", 10)?, Drag::MAX_STEPS)?,
		duration: Duration::from_millis(at_most("ms", params.parse_or("ms", 100)?, max_ms)?),
	})
}

fn at_most<T>(name: &'static str, value: T, max: T) -> Result<T, CommandError>
where
	T: PartialOrd + std::fmt::Display,
{
	if value > max {
		return Err(CommandError::InvalidParam {
			name,
			value: value.to_string(),
			reason: format!("must be at most {max}"),
		});
	}
	Ok(value)
}
