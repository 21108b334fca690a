//! Operation registry: a closed map from [`Operation`] to its handler.
//!
//! Handlers are written against typed arguments and payloads ([`Tool`]).
//! The registry erases them to JSON at the boundary, so argument validation
//! and failure wrapping happen in one place for every operation.

use std::{collections::HashMap, str::FromStr, sync::Arc};

use async_trait::async_trait;
use serde_json::Value;
use strum::IntoEnumIterator;
use tool_client::{Operation, ToolCall, ToolDescriptor, ToolFailure, ToolInvoker, ToolRequest};

use crate::error::RegistryError;

/// A handler for one operation.
#[async_trait]
pub trait Tool: Send + Sync + 'static {
    type Call: ToolCall;

    /// Errors become `remote_execution_error` failures with their message kept.
    async fn call(
        &self,
        args: <Self::Call as ToolCall>::Args,
    ) -> anyhow::Result<<Self::Call as ToolCall>::Payload>;
}

#[async_trait]
trait ErasedTool: Send + Sync {
    async fn call_json(&self, arguments: Value) -> Result<Value, ToolFailure>;
    fn descriptor(&self) -> ToolDescriptor;
}

struct Typed<T>(T);

#[async_trait]
impl<T: Tool> ErasedTool for Typed<T> {
    async fn call_json(&self, arguments: Value) -> Result<Value, ToolFailure> {
        let operation = T::Call::OPERATION;
        let args: <T::Call as ToolCall>::Args = serde_json::from_value(arguments)
            .map_err(|e| ToolFailure::invalid_arguments(format!("{}: {}", operation, e)))?;
        let payload = self
            .0
            .call(args)
            .await
            .map_err(|e| ToolFailure::remote(e.to_string()))?;
        serde_json::to_value(payload).map_err(|e| {
            ToolFailure::remote(format!("could not encode {} payload: {}", operation, e))
        })
    }

    fn descriptor(&self) -> ToolDescriptor {
        let operation = T::Call::OPERATION;
        let schema = schemars::schema_for!(<T::Call as ToolCall>::Args);
        ToolDescriptor {
            name: operation,
            description: operation.description().to_string(),
            input_schema: serde_json::to_value(schema).unwrap_or(Value::Null),
        }
    }
}

#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: HashMap<Operation, Arc<dyn ErasedTool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T: Tool>(&mut self, tool: T) -> Result<(), RegistryError> {
        let operation = T::Call::OPERATION;
        if self.tools.contains_key(&operation) {
            return Err(RegistryError::Duplicate(operation));
        }
        self.tools.insert(operation, Arc::new(Typed(tool)));
        tracing::debug!("[TOOL_HOST] Registered {}", operation);
        Ok(())
    }

    pub fn with<T: Tool>(mut self, tool: T) -> Result<Self, RegistryError> {
        self.register(tool)?;
        Ok(self)
    }

    pub fn is_registered(&self, operation: Operation) -> bool {
        self.tools.contains_key(&operation)
    }

    /// Registered operations in declaration order.
    pub fn operations(&self) -> Vec<Operation> {
        Operation::iter().filter(|op| self.is_registered(*op)).collect()
    }

    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        Operation::iter()
            .filter_map(|op| self.tools.get(&op).map(|tool| tool.descriptor()))
            .collect()
    }

    /// Map a wire name to a registered operation.
    pub fn resolve(&self, name: &str) -> Result<Operation, ToolFailure> {
        Operation::from_str(name)
            .ok()
            .filter(|op| self.is_registered(*op))
            .ok_or_else(|| ToolFailure::not_found(format!("unknown operation '{}'", name)))
    }

    pub async fn execute(
        &self,
        operation: Operation,
        arguments: Value,
    ) -> Result<Value, ToolFailure> {
        let tool = self.tools.get(&operation).ok_or_else(|| {
            ToolFailure::not_found(format!("operation '{}' is not registered", operation))
        })?;
        tool.call_json(arguments).await
    }

    pub async fn dispatch(&self, name: &str, arguments: Value) -> Result<Value, ToolFailure> {
        let operation = self.resolve(name)?;
        self.execute(operation, arguments).await
    }
}

/// In-process invocation, bypassing HTTP.
#[async_trait]
impl ToolInvoker for ToolRegistry {
    async fn invoke(&self, request: ToolRequest) -> Result<Value, ToolFailure> {
        self.execute(request.operation, request.arguments).await
    }
}
