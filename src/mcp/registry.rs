//! The set of invocable tools.
//!
//! A [`ToolRegistry`] is filled once at startup and then shared read-only
//! (behind an `Arc`) by the dispatcher and both transports. Names are unique
//! and listing preserves registration order.

use crate::mcp::tools::{Tool, ToolInfo, ToolList};
use std::collections::HashMap;
use std::sync::Arc;

/// Errors produced by registry operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// A tool with this name is already registered.
    #[error("A tool named '{0}' is already registered")]
    DuplicateTool(String),
    /// No tool with this name exists.
    #[error("Unknown tool: {0}")]
    ToolNotFound(String),
}

/// Insertion-ordered mapping from tool name to tool.
///
/// ```
/// use toolgate::mcp::registry::{RegistryError, ToolRegistry};
/// use toolgate::capabilities::date::CurrentDate;
///
/// let mut registry = ToolRegistry::new();
/// registry.register(CurrentDate).unwrap();
/// assert_eq!(
///     registry.register(CurrentDate),
///     Err(RegistryError::DuplicateTool("get-current-date".to_string()))
/// );
/// assert_eq!(registry.names(), vec!["get-current-date"]);
/// ```
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a tool. Fails if the name is taken; the registry is unchanged in that case.
    pub fn register<T: Tool + 'static>(&mut self, tool: T) -> Result<(), RegistryError> {
        self.register_arc(Arc::new(tool))
    }

    /// Adds an already shared tool.
    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) -> Result<(), RegistryError> {
        let name = tool.name().to_string();
        if self.index.contains_key(&name) {
            return Err(RegistryError::DuplicateTool(name));
        }
        self.index.insert(name, self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    /// All tools in registration order.
    pub fn list(&self) -> impl Iterator<Item = &dyn Tool> {
        self.tools.iter().map(|t| t.as_ref())
    }

    /// Looks a tool up by name.
    pub fn get(&self, name: &str) -> Result<&dyn Tool, RegistryError> {
        self.index
            .get(name)
            .and_then(|&i| self.tools.get(i))
            .map(|t| t.as_ref())
            .ok_or_else(|| RegistryError::ToolNotFound(name.to_string()))
    }

    pub fn names(&self) -> Vec<&str> {
        self.list().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// The `tools/list` payload.
    pub fn tool_list(&self) -> ToolList {
        ToolList {
            tools: self.list().map(ToolInfo::from_tool).collect(),
        }
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::tools::{Arguments, InputSchema, ToolCallError, ToolCallResponse};

    struct Named(&'static str);

    impl Tool for Named {
        fn name(&self) -> &str {
            self.0
        }
        fn description(&self) -> &str {
            "test tool"
        }
        fn input_schema(&self) -> InputSchema {
            InputSchema::new(vec![])
        }
        fn call(&self, _: &Arguments) -> Result<ToolCallResponse, ToolCallError> {
            Ok(ToolCallResponse::text(self.0))
        }
    }

    #[test]
    fn list_preserves_registration_order() {
        let mut registry = ToolRegistry::new();
        for name in ["zeta", "alpha", "mid"] {
            registry.register(Named(name)).unwrap();
        }
        assert_eq!(registry.names(), vec!["zeta", "alpha", "mid"]);
        assert_eq!(registry.names(), registry.names());
    }

    #[test]
    fn duplicate_leaves_registry_unchanged() {
        let mut registry = ToolRegistry::new();
        registry.register(Named("a")).unwrap();
        let err = registry.register(Named("a")).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateTool("a".to_string()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn get_unknown_tool() {
        let registry = ToolRegistry::new();
        assert_eq!(
            registry.get("nope").err(),
            Some(RegistryError::ToolNotFound("nope".to_string()))
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn tool_list_matches_registry() {
        let mut registry = ToolRegistry::new();
        registry.register(Named("a")).unwrap();
        registry.register(Named("b")).unwrap();
        let list = registry.tool_list();
        let names: Vec<&str> = list.tools().iter().map(|t| t.name()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
