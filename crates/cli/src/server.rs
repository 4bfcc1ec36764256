//! HTTP surface: every path goes to the dispatcher.

use std::any::Any;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{Method, Uri};
use axum::response::{IntoResponse, Response};
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::dispatcher::Dispatcher;
use crate::request::{CommandRequest, Params};
use crate::response::{CommandResponse, Status};

pub fn router(dispatcher: Arc<Dispatcher>) -> Router {
	Router::new()
		.fallback(dispatch)
		.layer(CatchPanicLayer::custom(panic_response))
		.with_state(dispatcher)
}

async fn dispatch(
	State(dispatcher): State<Arc<Dispatcher>>,
	method: Method,
	uri: Uri,
	body: Bytes,
) -> CommandResponse {
	let params = Params::from_query(uri.query());
	let body = (method == Method::POST).then(|| String::from_utf8_lossy(&body).into_owned());
	dispatcher
		.handle(CommandRequest::new(method, uri.path(), params, body))
		.await
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
	let detail = if let Some(s) = panic.downcast_ref::<String>() {
		s.clone()
	} else if let Some(s) = panic.downcast_ref::<&str>() {
		(*s).to_string()
	} else {
		"unknown panic".to_string()
	};
	error!(target = "chimp", panic = %detail, "request handler panicked");
	CommandResponse::with_status(Status::InternalError, format!("SERVER INTERNAL ERROR: {detail}")).into_response()
}

/// Serves until SIGINT/SIGTERM, then disposes any live session.
pub async fn serve(config: &ServerConfig, dispatcher: Arc<Dispatcher>) -> Result<()> {
	let (host, port) = (config.host.as_str(), config.port);
	info!(target = "chimp", host, port, "starting chimp-rest server");

	let listener = TcpListener::bind((host, port))
		.await
		.with_context(|| format!("Failed to bind server to {host}:{port}"))?;
	if let Ok(addr) = listener.local_addr() {
		info!(target = "chimp", %addr, "listening");
	}

	axum::serve(listener, router(Arc::clone(&dispatcher)).into_make_service())
		.with_graceful_shutdown(shutdown_signal())
		.await
		.context("Server error")?;

	dispatcher.shutdown().await;
	Ok(())
}

async fn shutdown_signal() {
	let ctrl_c = async {
		if let Err(err) = tokio::signal::ctrl_c().await {
			warn!(target = "chimp", error = %err, "Failed to install SIGINT handler");
			std::future::pending::<()>().await;
		}
	};

	#[cfg(unix)]
	let terminate = async {
		use tokio::signal::unix::{SignalKind, signal};
		match signal(SignalKind::terminate()) {
			Ok(mut sigterm) => {
				sigterm.recv().await;
			}
			Err(err) => {
				warn!(target = "chimp", error = %err, "Failed to install SIGTERM handler");
				std::future::pending::<()>().await;
			}
		}
	};
	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => info!(target = "chimp", "received SIGINT, shutting down"),
		_ = terminate => info!(target = "chimp", "received SIGTERM, shutting down"),
	}
}
