//! REST server controlling one Android device.
//!
//! Requests are normalized into [`request::CommandRequest`]s and handed to a
//! [`dispatcher::Dispatcher`], which owns the single device session.

pub mod cli;
pub mod command;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod logging;
pub mod request;
pub mod response;
pub mod server;
pub mod testing;
