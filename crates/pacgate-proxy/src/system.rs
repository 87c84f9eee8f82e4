//! [`ProxyPlatform`] backed by the operating system settings.

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use pacgate_core::{PacScript, ProxyPlatform};
use tracing::{debug, info, warn};

use crate::error::{PlatformError, Result};
use crate::setup::{disable_system_proxy, enable_pac_url, pac_file_url};

/// Writes PAC files into a directory and points the OS at them.
///
/// Each script gets its own file named after its fingerprint, so the URL
/// handed to the OS changes whenever the rules do and browsers reload it.
#[derive(Debug)]
pub struct SystemProxy {
    dir: PathBuf,
    current: Option<PathBuf>,
}

impl SystemProxy {
    /// Keeps PAC files in `dir` (created on first apply).
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            current: None,
        }
    }

    /// Keeps PAC files in the application data directory.
    pub fn in_data_dir() -> Result<Self> {
        let proj_dirs = ProjectDirs::from("com", "pacgate", "pacgate").ok_or_else(|| {
            PlatformError::Config("Could not determine app data directory".into())
        })?;
        Ok(Self::new(proj_dirs.data_dir().join("pac")))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The PAC file currently handed to the OS.
    pub fn current_file(&self) -> Option<&Path> {
        self.current.as_deref()
    }

    /// Writes `script` to its fingerprinted file and returns the path.
    pub fn write_pac_file(&self, script: &PacScript) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let fingerprint = script.fingerprint();
        let path = self.dir.join(format!("proxy-{}.pac", &fingerprint[..12]));
        fs::write(&path, script.text())?;
        debug!(path = %path.display(), "Wrote PAC file");
        Ok(path)
    }

    fn remove_file(path: &Path) {
        if let Err(e) = fs::remove_file(path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %path.display(), error = %e, "Failed to remove old PAC file");
            }
        }
    }

    fn apply(&mut self, script: &PacScript) -> Result<()> {
        let path = self.write_pac_file(script)?;
        let url = pac_file_url(&path);

        let result = enable_pac_url(&url);
        if !result.success {
            if self.current.as_deref() != Some(path.as_path()) {
                Self::remove_file(&path);
            }
            return Err(PlatformError::Rejected(result.message));
        }
        info!("{}", result.message);

        if let Some(previous) = self.current.replace(path) {
            if self.current.as_deref() != Some(previous.as_path()) {
                Self::remove_file(&previous);
            }
        }
        Ok(())
    }

    fn disable(&mut self) -> Result<()> {
        let result = disable_system_proxy();
        if !result.success {
            return Err(PlatformError::Rejected(result.message));
        }
        info!("{}", result.message);

        if let Some(previous) = self.current.take() {
            Self::remove_file(&previous);
        }
        Ok(())
    }
}

impl ProxyPlatform for SystemProxy {
    fn apply_pac(&mut self, script: &PacScript) -> pacgate_core::Result<()> {
        Ok(self.apply(script)?)
    }

    fn clear(&mut self) -> pacgate_core::Result<()> {
        Ok(self.disable()?)
    }
}
