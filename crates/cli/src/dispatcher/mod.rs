//! Request dispatch and device session lifecycle.
//!
//! [`Dispatcher::handle`] maps every request to exactly one response. The
//! session slot is behind a [`RwLock`]: gated commands hold a read guard for
//! the duration of their driver call, while `init` and `dispose` are
//! serialized through a separate transition mutex and only take the write
//! guard to commit or clear the session.

mod connect;
mod handlers;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use chimp::{Device, DeviceDriver};
use tokio::sync::{Mutex, RwLock, RwLockReadGuard};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::command::Command;
use crate::config::InitPolicy;
use crate::error::CommandError;
use crate::request::CommandRequest;
use crate::response::CommandResponse;

/// Body served for the root path.
pub const BANNER: &str = "chimp-rest: control an Android device via REST APIs";

/// A live connection to one device.
pub struct Session {
	device: Box<dyn Device>,
	/// Serial pattern the session was requested with.
	pattern: String,
	/// Value of the probe property when the session was committed.
	model: String,
	connected_at: Instant,
}

impl Session {
	fn new(device: Box<dyn Device>, pattern: &str, model: &str) -> Self {
		Self {
			device,
			pattern: pattern.to_string(),
			model: model.to_string(),
			connected_at: Instant::now(),
		}
	}

	pub fn device(&self) -> &dyn Device {
		self.device.as_ref()
	}

	pub fn model(&self) -> &str {
		&self.model
	}
}

pub struct Dispatcher {
	driver: Arc<dyn DeviceDriver>,
	policy: InitPolicy,
	session: RwLock<Option<Session>>,
	transitions: Mutex<()>,
}

impl Dispatcher {
	pub fn new(driver: Arc<dyn DeviceDriver>, policy: InitPolicy) -> Self {
		Self {
			driver,
			policy,
			session: RwLock::new(None),
			transitions: Mutex::new(()),
		}
	}

	pub fn policy(&self) -> &InitPolicy {
		&self.policy
	}

	pub async fn is_connected(&self) -> bool {
		self.session.read().await.is_some()
	}

	/// Handles one request. Never fails: every error becomes a response.
	pub async fn handle(&self, request: CommandRequest) -> CommandResponse {
		let response = match self.route(&request).await {
			Ok(body) => CommandResponse::ok(body),
			Err(err) => {
				if err.is_client_error() {
					debug!(target = "chimp", command = request.command_name(), error = %err, "request rejected");
				} else {
					warn!(target = "chimp", command = request.command_name(), error = %err, "command failed");
				}
				CommandResponse::from(err)
			}
		};

		debug!(
			target = "chimp",
			method = %request.method,
			command = request.command_name(),
			status = response.status.code(),
			"handled request"
		);
		response
	}

	async fn route(&self, request: &CommandRequest) -> Result<String, CommandError> {
		let name = request.command_name();
		if name.is_empty() {
			return Ok(BANNER.to_string());
		}

		let command = Command::from_name(name).ok_or_else(|| CommandError::UnknownCommand(name.to_string()))?;
		match command {
			Command::Init => self.init(&request.params).await,
			Command::Favicon => Ok(String::new()),
			Command::Dispose => self.dispose().await,
			Command::Device(command) => {
				let session = self.ready().await?;
				handlers::run(command, session.device(), request).await
			}
		}
	}

	/// The readiness gate. The returned guard pins the session until dropped.
	async fn ready(&self) -> Result<RwLockReadGuard<'_, Session>, CommandError> {
		RwLockReadGuard::try_map(self.session.read().await, Option::as_ref).map_err(|_| CommandError::NotReady)
	}

	async fn dispose(&self) -> Result<String, CommandError> {
		// Fail fast instead of queueing behind an init in progress.
		drop(self.ready().await?);

		let _transition = self.transitions.lock().await;
		let session = self.session.write().await.take().ok_or(CommandError::NotReady)?;
		info!(
			target = "chimp",
			serial = session.device.serial(),
			pattern = %session.pattern,
			uptime = ?session.connected_at.elapsed(),
			"disposing session"
		);
		session.device.dispose().await;
		Ok("disposed".to_string())
	}

	/// Disposes any live session. Used on server shutdown.
	pub async fn shutdown(&self) {
		let _transition = self.transitions.lock().await;
		let session = self.session.write().await.take();
		if let Some(session) = session {
			info!(target = "chimp", serial = session.device.serial(), "disposing session on shutdown");
			session.device.dispose().await;
		}
	}
}
