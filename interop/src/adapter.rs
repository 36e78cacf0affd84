use std::{
    collections::BTreeMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use arc_swap::ArcSwap;
use interop_proto::{Call, HostId, ObjectId, ObjectRef, Reply};
use tracing::warn;

use crate::{InvokeError, Servant, Transport};

type ServantMap = BTreeMap<ObjectId, Arc<dyn Servant>>;

/// Maps the objects hosted by this process to their servants
///
/// Every adapter gets a random [`HostId`], so references to its
/// objects can be told apart from the ones hosted by a peer.
#[derive(Debug)]
pub struct ObjectAdapter {
    host: HostId,
    next_id: AtomicU64,
    servants: ArcSwap<ServantMap>,
}

impl ObjectAdapter {
    #[must_use]
    pub fn new() -> Self {
        Self::with_host(HostId::from_raw(rand::random()))
    }

    #[must_use]
    pub fn with_host(host: HostId) -> Self {
        Self {
            host,
            next_id: AtomicU64::new(0),
            servants: ArcSwap::from_pointee(BTreeMap::new()),
        }
    }

    #[must_use]
    pub fn host(&self) -> HostId {
        self.host
    }

    /// Register `servant`, returning the reference peers can call it through
    pub fn activate(&self, servant: Arc<dyn Servant>) -> ObjectRef {
        let id = ObjectId::from_raw(self.next_id.fetch_add(1, Ordering::AcqRel));
        self.servants.rcu(|servants| {
            let mut servants = ServantMap::clone(servants);
            servants.insert(id, Arc::clone(&servant));
            servants
        });
        ObjectRef::new(self.host, id)
    }

    /// Unregister the servant behind `object`, returning it
    pub fn deactivate(&self, object: ObjectRef) -> Option<Arc<dyn Servant>> {
        if !self.is_local(object) {
            return None;
        }

        let mut removed = None;
        self.servants.rcu(|servants| {
            let mut servants = ServantMap::clone(servants);
            removed = servants.remove(&object.id);
            servants
        });
        removed
    }

    #[must_use]
    pub fn is_local(&self, object: ObjectRef) -> bool {
        object.host == self.host
    }

    /// Find the servant of a local object
    ///
    /// References to objects of any other host never resolve, even if
    /// this adapter holds an object with the same id.
    #[must_use]
    pub fn resolve(&self, object: ObjectRef) -> Option<Arc<dyn Servant>> {
        if self.is_local(object) {
            self.servants.load().get(&object.id).map(Arc::clone)
        } else {
            None
        }
    }

    pub(crate) async fn invoke_local(
        &self,
        target: ObjectRef,
        call: Call,
        transport: &dyn Transport,
    ) -> Result<Reply, InvokeError> {
        let servant = self
            .resolve(target)
            .ok_or(InvokeError::ObjectNotExist(target))?;
        servant
            .dispatch(call, transport)
            .await
            .map_err(|fault| InvokeError::RemoteFault(fault.to_string()))
    }

    pub(crate) fn spawn_oneway<T>(
        &self,
        target: ObjectRef,
        call: Call,
        transport: T,
    ) -> Result<(), InvokeError>
    where
        T: Transport + 'static,
    {
        let servant = self
            .resolve(target)
            .ok_or(InvokeError::ObjectNotExist(target))?;
        tokio::spawn(async move {
            let method = call.name();
            if let Err(err) = servant.dispatch(call, &transport).await {
                warn!(%target, method, %err, "one-way call failed");
            }
        });
        Ok(())
    }
}

impl Default for ObjectAdapter {
    fn default() -> Self {
        Self::new()
    }
}
