//! adb executable discovery
//!
//! Search order:
//! 1. Explicit path (`--adb` or the config file)
//! 2. `ADB` environment variable
//! 3. `ANDROID_HOME/platform-tools/adb`, then `ANDROID_SDK_ROOT/platform-tools/adb`
//! 4. `adb` on `PATH`

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{Error, Result};

const ADB_EXE: &str = if cfg!(windows) { "adb.exe" } else { "adb" };

/// Locates the adb executable.
///
/// # Errors
///
/// Returns `Error::AdbNotFound` if no candidate exists.
pub fn find_adb(explicit: Option<&Path>) -> Result<PathBuf> {
	if let Some(path) = explicit {
		if path.is_file() {
			return Ok(path.to_path_buf());
		}
		warn!(target = "chimp", path = %path.display(), "configured adb path does not exist; searching elsewhere");
	}

	if let Some(path) = std::env::var_os("ADB").map(PathBuf::from) {
		if path.is_file() {
			debug!(target = "chimp", path = %path.display(), "using adb from ADB");
			return Ok(path);
		}
	}

	for var in ["ANDROID_HOME", "ANDROID_SDK_ROOT"] {
		if let Some(sdk) = std::env::var_os(var) {
			let candidate = sdk_adb(Path::new(&sdk));
			if candidate.is_file() {
				debug!(target = "chimp", source = var, path = %candidate.display(), "using adb from SDK");
				return Ok(candidate);
			}
		}
	}

	which::which(ADB_EXE).map_err(|_| Error::AdbNotFound)
}

fn sdk_adb(sdk_root: &Path) -> PathBuf {
	sdk_root.join("platform-tools").join(ADB_EXE)
}
