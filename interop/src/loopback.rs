use std::sync::Arc;

use interop_proto::{Call, ObjectRef, Reply};

use crate::{BoxFuture, InvokeError, ObjectAdapter, Transport};

/// A [`Transport`] delivering every call to servants of the same process
#[derive(Debug, Clone)]
pub struct Loopback {
    adapter: Arc<ObjectAdapter>,
}

impl Loopback {
    #[must_use]
    pub fn new(adapter: Arc<ObjectAdapter>) -> Self {
        Self { adapter }
    }

    #[must_use]
    pub fn adapter(&self) -> &Arc<ObjectAdapter> {
        &self.adapter
    }
}

impl Transport for Loopback {
    fn invoke(&self, target: ObjectRef, call: Call) -> BoxFuture<'_, Result<Reply, InvokeError>> {
        Box::pin(async move { self.adapter.invoke_local(target, call, self).await })
    }

    fn send_oneway(&self, target: ObjectRef, call: Call) -> Result<(), InvokeError> {
        self.adapter.spawn_oneway(target, call, self.clone())
    }
}
