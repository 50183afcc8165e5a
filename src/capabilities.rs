//! The built-in tools.
//!
//! - [`date`]: `get-current-date`
//! - [`files`]: `file-read`, `file-write`, `file-list`, `file-delete`, `file-move`
//! - [`health`]: `health-check`
//!
//! File tools share one [`Sandbox`](sandbox::Sandbox) rooted at the configured
//! base directory.

pub mod date;
pub mod files;
pub mod health;
pub mod sandbox;

use crate::mcp::registry::{RegistryError, ToolRegistry};
use sandbox::Sandbox;
use std::sync::Arc;

/// Registers every built-in tool.
///
/// ```
/// use std::sync::Arc;
/// use toolgate::capabilities::{register_all, sandbox::Sandbox};
/// use toolgate::mcp::registry::ToolRegistry;
///
/// let dir = std::env::temp_dir();
/// let mut registry = ToolRegistry::new();
/// register_all(&mut registry, Arc::new(Sandbox::new(&dir).unwrap())).unwrap();
/// assert_eq!(registry.len(), 7);
/// assert!(registry.get("file-read").is_ok());
/// ```
pub fn register_all(registry: &mut ToolRegistry, sandbox: Arc<Sandbox>) -> Result<(), RegistryError> {
    registry.register(date::CurrentDate::new())?;
    registry.register(files::FileRead::new(sandbox.clone()))?;
    registry.register(files::FileWrite::new(sandbox.clone()))?;
    registry.register(files::FileList::new(sandbox.clone()))?;
    registry.register(files::FileDelete::new(sandbox.clone()))?;
    registry.register(files::FileMove::new(sandbox))?;
    registry.register(health::HealthCheck::new())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registering_twice_reports_duplicate() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = Arc::new(Sandbox::new(dir.path()).unwrap());
        let mut registry = ToolRegistry::new();
        register_all(&mut registry, sandbox.clone()).unwrap();
        let err = register_all(&mut registry, sandbox).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateTool(name) if name == "get-current-date"));
    }

    #[test]
    fn tools_are_listed_in_registration_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = ToolRegistry::new();
        register_all(&mut registry, Arc::new(Sandbox::new(dir.path()).unwrap())).unwrap();
        assert_eq!(
            registry.names(),
            [
                "get-current-date",
                "file-read",
                "file-write",
                "file-list",
                "file-delete",
                "file-move",
                "health-check"
            ]
        );
    }
}
