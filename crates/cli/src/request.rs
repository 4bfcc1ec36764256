//! Transport-neutral view of an inbound request.

use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;

use axum::http::Method;

use crate::error::CommandError;

/// Query parameters. When a name repeats, the first value wins.
#[derive(Debug, Clone, Default)]
pub struct Params(HashMap<String, String>);

impl Params {
	/// Decodes an `application/x-www-form-urlencoded` query string.
	pub fn from_query(query: Option<&str>) -> Self {
		Self::from_pairs(
			url::form_urlencoded::parse(query.unwrap_or_default().as_bytes())
				.map(|(k, v)| (k.into_owned(), v.into_owned())),
		)
	}

	pub fn from_pairs<I, K, V>(pairs: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		let mut map = HashMap::new();
		for (k, v) in pairs {
			map.entry(k.into()).or_insert_with(|| v.into());
		}
		Self(map)
	}

	pub fn get(&self, name: &str) -> Option<&str> {
		self.0.get(name).map(String::as_str)
	}

	/// # Errors
	///
	/// `CommandError::MissingParam` when `name` is absent.
	pub fn required(&self, name: &'static str) -> Result<&str, CommandError> {
		self.get(name).ok_or(CommandError::MissingParam(name))
	}

	/// Parses `name` strictly; `None` when it is absent.
	///
	/// # Errors
	///
	/// `CommandError::InvalidParam` when the value is present but does not parse.
	pub fn parse<T>(&self, name: &'static str) -> Result<Option<T>, CommandError>
	where
		T: FromStr,
		T::Err: Display,
	{
		self.get(name)
			.map(|raw| {
				raw.parse::<T>().map_err(|e| CommandError::InvalidParam {
					name,
					value: raw.to_string(),
					reason: e.to_string(),
				})
			})
			.transpose()
	}

	/// Like [`Params::parse`], falling back to `default` only when `name` is absent.
	pub fn parse_or<T>(&self, name: &'static str, default: T) -> Result<T, CommandError>
	where
		T: FromStr,
		T::Err: Display,
	{
		Ok(self.parse(name)?.unwrap_or(default))
	}
}

/// A request as seen by the dispatcher.
#[derive(Debug, Clone)]
pub struct CommandRequest {
	pub method: Method,
	pub path: String,
	pub params: Params,
	/// Raw body, present only for POST.
	pub body: Option<String>,
}

impl CommandRequest {
	pub fn new(method: Method, path: impl Into<String>, params: Params, body: Option<String>) -> Self {
		Self {
			method,
			path: path.into(),
			params,
			body,
		}
	}

	/// Builds a GET request from a path with an optional query string.
	pub fn get(path_and_query: &str) -> Self {
		let (path, query) = match path_and_query.split_once('?') {
			Some((path, query)) => (path, Some(query)),
			None => (path_and_query, None),
		};
		Self::new(Method::GET, path, Params::from_query(query), None)
	}

	pub fn post(path: &str, body: impl Into<String>) -> Self {
		Self::new(Method::POST, path, Params::default(), Some(body.into()))
	}

	/// First `/`-delimited path segment; empty for the root.
	pub fn command_name(&self) -> &str {
		self.path.trim_start_matches('/').split('/').next().unwrap_or_default()
	}
}
