use interop_proto::{Call, FigureModel, ObjectRef, OperationKind, Payload, Reply};

use crate::{InvokeError, Transport};

/// Typed access to a remote [`EchoServer`]
///
/// [`EchoServer`]: crate::EchoServer
#[derive(Debug, Copy, Clone)]
pub struct EchoStub<'a> {
    transport: &'a dyn Transport,
    target: ObjectRef,
}

/// Typed access to a remote [`Probe`]
///
/// [`Probe`]: crate::Probe
#[derive(Debug, Copy, Clone)]
pub struct ProbeStub<'a> {
    transport: &'a dyn Transport,
    target: ObjectRef,
}

impl<'a> EchoStub<'a> {
    #[must_use]
    pub fn new(transport: &'a dyn Transport, target: ObjectRef) -> Self {
        Self { transport, target }
    }

    #[must_use]
    pub fn target(&self) -> ObjectRef {
        self.target
    }

    /// # Errors
    ///
    /// It returns an error if the call fails.
    pub async fn peek(&self) -> Result<String, InvokeError> {
        match self.transport.invoke(self.target, Call::Peek).await? {
            Reply::Description(description) => Ok(description),
            _ => Err(InvokeError::UnexpectedReply { call: "peek" }),
        }
    }

    /// # Errors
    ///
    /// It returns an error if the call fails. A payload which doesn't
    /// match `operation` is rejected before anything is sent.
    pub async fn invoke(
        &self,
        operation: OperationKind,
        payload: Payload,
    ) -> Result<(), InvokeError> {
        operation.check(&payload)?;
        self.unit(Call::Invoke { operation, payload }).await
    }

    /// Fire-and-forget, returns as soon as the call was handed over
    ///
    /// # Errors
    ///
    /// It returns an error if the call couldn't be handed over.
    pub fn oneway_method(&self) -> Result<(), InvokeError> {
        self.transport
            .send_oneway(self.target, Call::OnewayMethod)
    }

    /// Ask the server to push the canonical payload of `operation` into `callback`
    ///
    /// # Errors
    ///
    /// It returns an error if the call fails or the callback faulted.
    pub async fn call(
        &self,
        callback: ObjectRef,
        operation: OperationKind,
    ) -> Result<(), InvokeError> {
        self.call_raw(callback, operation.code()).await
    }

    /// Like [`EchoStub::call`], with a kind which may be unknown to the server
    ///
    /// # Errors
    ///
    /// It returns an error if the call fails or the callback faulted.
    pub async fn call_raw(&self, callback: ObjectRef, kind: u32) -> Result<(), InvokeError> {
        self.unit(Call::Callback { callback, kind }).await
    }

    /// # Errors
    ///
    /// It returns an error if the call fails.
    pub async fn set_composite_value(&self, model: Option<FigureModel>) -> Result<(), InvokeError> {
        self.invoke(OperationKind::ValueWithNull, Payload::Figure(model))
            .await
    }

    /// Have the server call `object` with `message`
    ///
    /// # Errors
    ///
    /// It returns an error if the call fails or `object` faulted.
    pub async fn send_object(
        &self,
        object: Option<ObjectRef>,
        message: String,
    ) -> Result<(), InvokeError> {
        self.invoke(
            OperationKind::ObjectReference,
            Payload::Object(object, message),
        )
        .await
    }

    /// # Errors
    ///
    /// It returns an error if the call fails.
    pub async fn get_object(&self) -> Result<Option<ObjectRef>, InvokeError> {
        self.object(Call::GetObject).await
    }

    /// # Errors
    ///
    /// It returns an error if the call fails.
    pub async fn reflect_object(
        &self,
        object: Option<ObjectRef>,
    ) -> Result<Option<ObjectRef>, InvokeError> {
        self.object(Call::ReflectObject { object }).await
    }

    async fn unit(&self, call: Call) -> Result<(), InvokeError> {
        let name = call.name();
        match self.transport.invoke(self.target, call).await? {
            Reply::Unit => Ok(()),
            _ => Err(InvokeError::UnexpectedReply { call: name }),
        }
    }

    async fn object(&self, call: Call) -> Result<Option<ObjectRef>, InvokeError> {
        let name = call.name();
        match self.transport.invoke(self.target, call).await? {
            Reply::Object(object) => Ok(object),
            _ => Err(InvokeError::UnexpectedReply { call: name }),
        }
    }
}

impl<'a> ProbeStub<'a> {
    #[must_use]
    pub fn new(transport: &'a dyn Transport, target: ObjectRef) -> Self {
        Self { transport, target }
    }

    /// # Errors
    ///
    /// It returns an error if the call fails.
    pub async fn call(&self, message: String) -> Result<(), InvokeError> {
        match self
            .transport
            .invoke(self.target, Call::Probe { message })
            .await?
        {
            Reply::Unit => Ok(()),
            _ => Err(InvokeError::UnexpectedReply { call: "probe" }),
        }
    }
}
