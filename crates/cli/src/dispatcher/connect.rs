use std::time::Duration;

use chimp::Device;
use regex::Regex;
use tokio::time::Instant;
use tracing::{info, warn};

use super::{Dispatcher, Session};
use crate::error::CommandError;
use crate::request::Params;

const ANY_SERIAL: &str = ".*";

impl Dispatcher {
	/// `init`: connect unless a session already exists.
	pub(super) async fn init(&self, params: &Params) -> Result<String, CommandError> {
		if self.is_connected().await {
			return Ok("already connected".to_string());
		}

		let timeout = params
			.parse::<u64>("timeout")?
			.map(Duration::from_millis)
			.unwrap_or(self.policy.default_timeout);
		let pattern = params.get("serialno").unwrap_or(ANY_SERIAL);
		let matcher = chimp::serial_matcher(pattern).map_err(|e| CommandError::InvalidParam {
			name: "serialno",
			value: pattern.to_string(),
			reason: e.to_string(),
		})?;

		let _transition = self.transitions.lock().await;
		// Another init may have won while we waited.
		if self.is_connected().await {
			return Ok("already connected".to_string());
		}

		let session = self.connect(timeout, pattern, &matcher).await?;
		info!(
			target = "chimp",
			serial = session.device.serial(),
			model = %session.model,
			"device connected"
		);
		*self.session.write().await = Some(session);
		Ok("connected".to_string())
	}

	/// Retries until a handle answers the probe with a non-blank value or
	/// `timeout` has elapsed. Runs at least once.
	async fn connect(&self, timeout: Duration, pattern: &str, matcher: &Regex) -> Result<Session, CommandError> {
		let started = Instant::now();
		let mut attempts: u32 = 0;

		loop {
			attempts += 1;
			let remaining = timeout.saturating_sub(started.elapsed());
			info!(target = "chimp", attempt = attempts, pattern, ?remaining, "waiting for device");

			let candidate = match self.driver.wait_for_connection(remaining, matcher).await {
				Ok(device) => Some(device),
				Err(err) => {
					warn!(target = "chimp", attempt = attempts, error = %err, "connection attempt failed");
					None
				}
			};

			tokio::time::sleep(self.policy.attempt_interval).await;

			if let Some(device) = candidate {
				if let Some(model) = self.probe(device.as_ref(), attempts).await {
					return Ok(Session::new(device, pattern, &model));
				}
				device.dispose().await;
			}

			if started.elapsed() >= timeout {
				break;
			}
		}

		Err(CommandError::ConnectTimeout {
			attempts,
			elapsed_ms: started.elapsed().as_millis(),
		})
	}

	/// Reads the probe property; `None` when it is blank or unreadable.
	async fn probe(&self, device: &dyn Device, attempt: u32) -> Option<String> {
		let property = &self.policy.probe_property;
		match device.system_property(property).await {
			Ok(value) if !value.trim().is_empty() => Some(value.trim().to_string()),
			Ok(_) => {
				warn!(target = "chimp", attempt, serial = device.serial(), property = %property, "probe returned blank value");
				None
			}
			Err(err) => {
				warn!(target = "chimp", attempt, serial = device.serial(), error = %err, "probe failed");
				None
			}
		}
	}
}
