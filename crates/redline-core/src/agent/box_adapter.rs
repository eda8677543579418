//! BoxAgentAdapter -- object-safe dynamic dispatch wrapper for AgentAdapter.
//!
//! 1. Define an object-safe `AgentAdapterDyn` trait with boxed futures
//! 2. Blanket-impl `AgentAdapterDyn` for all `T: AgentAdapter`
//! 3. `BoxAgentAdapter` wraps `Box<dyn AgentAdapterDyn>` and delegates

use std::future::Future;
use std::pin::Pin;

use redline_types::agent::{AgentOutcome, AgentRole};
use redline_types::error::AdapterError;

use super::{AgentAdapter, AgentContext};

/// Object-safe version of [`AgentAdapter`] with boxed futures.
pub trait AgentAdapterDyn: Send + Sync {
    fn role(&self) -> AgentRole;

    fn invoke_boxed<'a>(
        &'a self,
        context: &'a AgentContext,
    ) -> Pin<Box<dyn Future<Output = Result<AgentOutcome, AdapterError>> + Send + 'a>>;
}

impl<T: AgentAdapter> AgentAdapterDyn for T {
    fn role(&self) -> AgentRole {
        AgentAdapter::role(self)
    }

    fn invoke_boxed<'a>(
        &'a self,
        context: &'a AgentContext,
    ) -> Pin<Box<dyn Future<Output = Result<AgentOutcome, AdapterError>> + Send + 'a>> {
        Box::pin(self.invoke(context))
    }
}

/// Type-erased agent adapter.
///
/// Lets the engine hold LLM-backed and scripted adapters behind one type.
pub struct BoxAgentAdapter {
    inner: Box<dyn AgentAdapterDyn + Send + Sync>,
}

impl BoxAgentAdapter {
    pub fn new<T: AgentAdapter + 'static>(adapter: T) -> Self {
        Self {
            inner: Box::new(adapter),
        }
    }

    pub fn role(&self) -> AgentRole {
        self.inner.role()
    }

    pub async fn invoke(&self, context: &AgentContext) -> Result<AgentOutcome, AdapterError> {
        self.inner.invoke_boxed(context).await
    }
}
