//! Capability registry: name → tool, shared read-mostly across concurrent runs.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::llm::ToolDefinition;
use crate::tools::tool::Tool;

struct Registered {
    tool: Arc<dyn Tool>,
    /// Built-ins are installed at startup and cannot be replaced afterwards.
    builtin: bool,
}

/// Registry of capabilities the generation step may call.
#[derive(Default)]
pub struct ToolRegistry {
    entries: RwLock<HashMap<String, Registered>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a built-in capability during startup, before the registry is
    /// shared. Returns false if the registry was already locked.
    pub fn register_builtin(&self, tool: Arc<dyn Tool>) -> bool {
        let name = tool.name().to_string();
        let Ok(mut entries) = self.entries.try_write() else {
            tracing::warn!(tool = %name, "Registry busy, built-in not registered");
            return false;
        };
        entries.insert(
            name.clone(),
            Registered {
                tool,
                builtin: true,
            },
        );
        tracing::debug!(tool = %name, "Registered built-in capability");
        true
    }

    /// Add an extra capability. Names taken by built-ins are refused.
    pub async fn register(&self, tool: Arc<dyn Tool>) -> bool {
        let name = tool.name().to_string();
        let mut entries = self.entries.write().await;
        if entries.get(&name).is_some_and(|e| e.builtin) {
            tracing::warn!(tool = %name, "Refusing to shadow a built-in capability");
            return false;
        }
        entries.insert(
            name.clone(),
            Registered {
                tool,
                builtin: false,
            },
        );
        tracing::debug!(tool = %name, "Registered capability");
        true
    }

    pub async fn lookup(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.entries
            .read()
            .await
            .get(name)
            .map(|e| Arc::clone(&e.tool))
    }

    pub async fn is_builtin(&self, name: &str) -> bool {
        self.entries
            .read()
            .await
            .get(name)
            .is_some_and(|e| e.builtin)
    }

    /// Registered names, sorted.
    pub async fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered capabilities (0 while a writer holds the lock).
    pub fn len(&self) -> usize {
        self.entries.try_read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Schemas offered to the generation step, sorted by name so the
    /// request body is stable between passes.
    pub async fn definitions(&self) -> Vec<ToolDefinition> {
        let entries = self.entries.read().await;
        let mut defs: Vec<ToolDefinition> = entries
            .values()
            .map(|e| ToolDefinition {
                name: e.tool.name().to_string(),
                description: e.tool.description().to_string(),
                parameters: e.tool.parameters_schema(),
            })
            .collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RunContext;
    use crate::tools::tool::{ToolError, ToolOutput};
    use async_trait::async_trait;
    use std::time::Duration;

    struct Named(&'static str);

    #[async_trait]
    impl Tool for Named {
        fn name(&self) -> &str {
            self.0
        }
        fn description(&self) -> &str {
            "test capability"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({"type": "object", "properties": {}})
        }
        async fn execute(
            &self,
            _params: serde_json::Value,
            _ctx: &RunContext,
        ) -> Result<ToolOutput, ToolError> {
            Ok(ToolOutput::text(self.0, Duration::ZERO))
        }
    }

    #[tokio::test]
    async fn lookup_by_name() {
        let registry = ToolRegistry::new();
        assert!(registry.register(Arc::new(Named("notify"))).await);
        assert_eq!(registry.lookup("notify").await.unwrap().name(), "notify");
        assert!(registry.lookup("send_fax").await.is_none());
    }

    #[tokio::test]
    async fn names_and_definitions_are_sorted() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(Named("zeta"))).await;
        registry.register(Arc::new(Named("alpha"))).await;

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names().await, vec!["alpha", "zeta"]);
        let defs = registry.definitions().await;
        assert_eq!(defs[0].name, "alpha");
        assert_eq!(defs[1].name, "zeta");
    }

    #[tokio::test]
    async fn builtins_cannot_be_shadowed() {
        let registry = ToolRegistry::new();
        assert!(registry.register_builtin(Arc::new(Named("flag_unknown_question"))));
        assert!(!registry.register(Arc::new(Named("flag_unknown_question"))).await);
        assert!(registry.is_builtin("flag_unknown_question").await);
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn builtin_registration_reports_contention() {
        let registry = ToolRegistry::new();
        let guard = registry.entries.read().await;
        assert!(!registry.register_builtin(Arc::new(Named("late"))));
        drop(guard);
        assert!(registry.register_builtin(Arc::new(Named("late"))));
        assert!(registry.is_builtin("late").await);
    }

    #[tokio::test]
    async fn extra_capability_can_be_replaced() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(Named("lookup_calendar"))).await;
        assert!(registry.register(Arc::new(Named("lookup_calendar"))).await);
        assert!(!registry.is_builtin("lookup_calendar").await);
    }

    #[tokio::test]
    async fn concurrent_lookups() {
        let registry = Arc::new(ToolRegistry::new());
        registry.register_builtin(Arc::new(Named("shared")));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                tokio::spawn(async move { registry.lookup("shared").await.is_some() })
            })
            .collect();
        for handle in handles {
            assert!(handle.await.unwrap());
        }
    }
}
