//! Navigation collaborator

use std::sync::Mutex;

use crate::error::{Result, ToolkitError};

/// Performs (or schedules) navigation on behalf of the assistant
pub trait Navigator: Send + Sync {
    fn navigate(&self, destination: &str) -> Result<()>;
}

/// Records the last requested destination for the caller to act on
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    destination: Mutex<Option<String>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last requested destination, if any
    pub fn destination(&self) -> Option<String> {
        self.destination.lock().ok().and_then(|d| d.clone())
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, destination: &str) -> Result<()> {
        let mut slot = self
            .destination
            .lock()
            .map_err(|_| ToolkitError::Navigation("navigator state poisoned".into()))?;
        *slot = Some(destination.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_last_destination() {
        let nav = RecordingNavigator::new();
        assert!(nav.destination().is_none());
        nav.navigate("/pricing").unwrap();
        nav.navigate("/blog").unwrap();
        assert_eq!(nav.destination().as_deref(), Some("/blog"));
    }
}
