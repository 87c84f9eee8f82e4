//! Platform proxy configuration seam.

use tracing::debug;

use crate::error::{CoreError, Result};
use crate::pac::PacScript;

/// Installs or clears the active proxy configuration.
///
/// `apply_pac` must either leave the script active or return
/// [`CoreError::ConfigurationApply`]. `clear` restores direct connections
/// and should succeed even when nothing was applied.
pub trait ProxyPlatform: Send + 'static {
    fn apply_pac(&mut self, script: &PacScript) -> Result<()>;
    fn clear(&mut self) -> Result<()>;
}

/// In-process platform that only records what it was asked to do.
///
/// Backs `--dry-run` and the controller tests.
#[derive(Debug, Default)]
pub struct RecordingPlatform {
    active: Option<PacScript>,
    applies: usize,
    clears: usize,
    fail_applies: bool,
}

impl RecordingPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// A platform that rejects every apply.
    pub fn failing() -> Self {
        Self {
            fail_applies: true,
            ..Self::default()
        }
    }

    pub fn set_failing(&mut self, failing: bool) {
        self.fail_applies = failing;
    }

    /// Currently installed script.
    pub fn active(&self) -> Option<&PacScript> {
        self.active.as_ref()
    }

    /// Number of apply calls that reached the platform.
    pub fn apply_count(&self) -> usize {
        self.applies
    }

    pub fn clear_count(&self) -> usize {
        self.clears
    }
}

impl ProxyPlatform for RecordingPlatform {
    fn apply_pac(&mut self, script: &PacScript) -> Result<()> {
        self.applies += 1;
        if self.fail_applies {
            return Err(CoreError::ConfigurationApply(
                "platform rejected configuration".to_string(),
            ));
        }
        debug!(domains = script.domains().len(), "Recorded PAC apply");
        self.active = Some(script.clone());
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.clears += 1;
        self.active = None;
        Ok(())
    }
}
