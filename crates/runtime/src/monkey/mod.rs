//! Client for the monkey network protocol.
//!
//! Monkey handles one request at a time per connection, so the client
//! serializes requests behind an async mutex: each caller writes its line and
//! reads the matching reply before the next caller proceeds.


use std::time::Duration;

use chimp_protocol::{MonkeyCommand, MonkeyReply};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, trace};

use crate::error::{Error, Result};

/// Port monkey listens on inside the device.
pub const DEFAULT_DEVICE_PORT: u16 = 12345;
/// Budget for a single request/reply exchange.
pub const REPLY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug)]
struct Connection<S> {
	reader: BufReader<ReadHalf<S>>,
	writer: WriteHalf<S>,
	line: String,
}

#[derive(Debug)]
pub struct MonkeyClient<S = TcpStream> {
	conn: Mutex<Connection<S>>,
	reply_timeout: Duration,
}

impl MonkeyClient<TcpStream> {
	/// Connects to a monkey service forwarded to `127.0.0.1:<local_port>`.
	///
	/// A forwarded port accepts connections before monkey itself is listening,
	/// so every attempt is confirmed with a `listvar` round trip.
	pub async fn connect(local_port: u16, attempts: u32, delay: Duration) -> Result<Self> {
		let attempts = attempts.max(1);
		let mut last_error = String::from("no attempt made");
		for attempt in 1..=attempts {
			match TcpStream::connect(("127.0.0.1", local_port)).await {
				Ok(stream) => {
					let client = MonkeyClient::new(stream);
					match client.send(&MonkeyCommand::ListVar).await {
						Ok(_) => {
							debug!(target = "chimp", port = local_port, attempt, "monkey connected");
							return Ok(client);
						}
						Err(e) => last_error = e.to_string(),
					}
				}
				Err(e) => last_error = e.to_string(),
			}
			trace!(target = "chimp", port = local_port, attempt, error = %last_error, "monkey not ready");
			if attempt < attempts {
				tokio::time::sleep(delay).await;
			}
		}
		Err(Error::ConnectionFailed(format!(
			"monkey on port {local_port} not reachable after {attempts} attempts: {last_error}"
		)))
	}
}

impl<S> MonkeyClient<S>
where
	S: AsyncRead + AsyncWrite + Send + Unpin,
{
	pub fn new(stream: S) -> Self {
		let (read_half, writer) = tokio::io::split(stream);
		Self {
			conn: Mutex::new(Connection {
				reader: BufReader::new(read_half),
				writer,
				line: String::new(),
			}),
			reply_timeout: REPLY_TIMEOUT,
		}
	}

	pub fn with_reply_timeout(mut self, timeout: Duration) -> Self {
		self.reply_timeout = timeout;
		self
	}

	/// Sends one command and returns the value of an `OK:<value>` reply.
	///
	/// # Errors
	///
	/// `Error::Monkey` when monkey answers `ERROR`, `Error::Timeout` when no reply
	/// arrives in time, `Error::ConnectionFailed` when the peer hung up.
	pub async fn send(&self, command: &MonkeyCommand) -> Result<Option<String>> {
		let line = command.to_line();
		let mut conn = self.conn.lock().await;
		let reply = tokio::time::timeout(self.reply_timeout, conn.exchange(&line))
			.await
			.map_err(|_| Error::Timeout(format!("monkey did not answer '{line}'")))??;

		match reply {
			MonkeyReply::Ok(value) => Ok(value),
			MonkeyReply::Error(message) => Err(Error::Monkey {
				command: line,
				message: message.unwrap_or_else(|| "ERROR".to_string()),
			}),
		}
	}
}

impl<S> Connection<S>
where
	S: AsyncRead + AsyncWrite + Unpin,
{
	async fn exchange(&mut self, line: &str) -> Result<MonkeyReply> {
		trace!(target = "chimp", line, "monkey >");
		self.writer.write_all(line.as_bytes()).await?;
		self.writer.write_all(b"\n").await?;
		self.writer.flush().await?;

		self.line.clear();
		let bytes = self.reader.read_line(&mut self.line).await?;
		if bytes == 0 {
			return Err(Error::ConnectionFailed("monkey closed the connection".into()));
		}
		trace!(target = "chimp", line = self.line.trim_end(), "monkey <");
		Ok(MonkeyReply::parse(&self.line)?)
	}
}
