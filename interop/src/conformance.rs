//! Drives the catalog against an echo server and checks what it observed

use std::{
    fmt::{self, Display},
    sync::Arc,
};

use interop_proto::{
    ObjectRef, OperationKind, Payload, Point, PointPair, REFLECT_SENTINEL, canonical_payload,
    list_operations, render, render_composite,
};
use tracing::{debug, info, warn};

use crate::{
    EchoServer, EchoStub, HarnessError, ObjectAdapter, Probe, Transport, dispatcher::forwards,
};

const PROBE_MESSAGE: &str = "hello";
/// A kind no server knows about, exercising the callback fallthrough
const UNKNOWN_KIND: u32 = u32::MAX;

/// What is being sent and verified
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Step {
    /// Two peeks with no call in between
    Peek,
    /// A catalog operation sent to the server
    Operation(OperationKind),
    /// A catalog operation pushed back by the server into our callback
    Callback(OperationKind),
    /// A callback request of a kind the server doesn't know
    UnknownCallback,
    GetObject,
    ReflectObject,
    SendObject,
    NullComposite,
    /// Two equal but distinct points
    DistinctValues,
    Oneway,
}

/// Progress of a conformance run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    Connected,
    Sending(Step),
    Verifying(Step),
    Done,
    /// A verification failed, halting the run for good
    Failed {
        operation: Step,
        expected: String,
        observed: String,
    },
    /// The connection went away during `operation`, halting the run for good
    Disconnected { operation: Step },
}

/// A step whose observed description matched the expected one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verified {
    pub step: Step,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    pub verified: Vec<Verified>,
}

/// Runs conformance checks against the [`EchoServer`] at `server`
///
/// The client hosts its own [`EchoServer`] and [`Probe`], sharing one
/// state, in `adapter`, so that the server has something to call back.
#[derive(Debug)]
pub struct ConformanceClient<T> {
    transport: T,
    server: ObjectRef,
    local: LocalEcho,
    state: RunState,
}

#[derive(Debug)]
struct LocalEcho {
    echo: Arc<EchoServer>,
    object: ObjectRef,
    probe: ObjectRef,
}

impl<T> ConformanceClient<T>
where
    T: Transport,
{
    #[must_use]
    pub fn new(transport: T, server: ObjectRef, adapter: &ObjectAdapter) -> Self {
        let echo = Arc::new(EchoServer::new());
        let probe = adapter.activate(Arc::new(Probe::new(Arc::clone(echo.state()))));
        let object = adapter.activate(Arc::clone(&echo) as _);

        Self {
            transport,
            server,
            local: LocalEcho {
                echo,
                object,
                probe,
            },
            state: RunState::Connected,
        }
    }

    #[must_use]
    pub fn state(&self) -> &RunState {
        &self.state
    }

    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The object the server is asked to call back
    #[must_use]
    pub fn callback(&self) -> ObjectRef {
        self.local.object
    }

    /// Send every catalog operation and verify the server recorded it
    ///
    /// # Errors
    ///
    /// It returns an error on the first failed call or verification.
    pub async fn run_catalog(&mut self) -> Result<Report, HarnessError> {
        self.check_halted()?;
        let result = self.catalog().await;
        self.halt_on_disconnect(result)
    }

    /// Have the server push every forwardable operation into our callback
    ///
    /// # Errors
    ///
    /// It returns an error on the first failed call or verification.
    pub async fn run_callbacks(&mut self) -> Result<Report, HarnessError> {
        self.check_halted()?;
        let result = self.callbacks().await;
        self.halt_on_disconnect(result)
    }

    /// Exercise object references, null composites and value identity
    ///
    /// # Errors
    ///
    /// It returns an error on the first failed call or verification.
    pub async fn run_objects(&mut self) -> Result<Report, HarnessError> {
        self.check_halted()?;
        let result = self.objects().await;
        self.halt_on_disconnect(result)
    }

    /// Run every check, then fire a one-way call
    ///
    /// The one-way call isn't verified: nothing orders it with respect
    /// to later calls.
    ///
    /// # Errors
    ///
    /// It returns an error on the first failed call or verification.
    pub async fn run_all(&mut self) -> Result<Report, HarnessError> {
        let mut report = self.run_catalog().await?;
        report.extend(self.run_callbacks().await?);
        report.extend(self.run_objects().await?);

        self.begin(Step::Oneway);
        let sent = self.stub().oneway_method().map_err(HarnessError::from);
        self.halt_on_disconnect(sent)?;
        self.finish();

        info!(verified = report.verified.len(), "conformance run passed");
        Ok(report)
    }

    async fn catalog(&mut self) -> Result<Report, HarnessError> {
        let mut report = Report::default();

        self.begin(Step::Peek);
        let first = self.stub().peek().await?;
        self.state = RunState::Verifying(Step::Peek);
        let second = self.stub().peek().await?;
        report.push(self.verify(Step::Peek, first, second)?);

        for operation in list_operations() {
            let step = Step::Operation(operation);
            let payload = canonical_payload(operation);
            let expected = render(operation, &payload)?;

            self.begin(step);
            self.stub().invoke(operation, payload).await?;
            self.state = RunState::Verifying(step);
            let observed = self.stub().peek().await?;
            report.push(self.verify(step, expected, observed)?);
        }

        self.finish();
        Ok(report)
    }

    async fn callbacks(&mut self) -> Result<Report, HarnessError> {
        let mut report = Report::default();
        let callback = self.local.object;

        for operation in list_operations().filter(|&operation| forwards(operation)) {
            let step = Step::Callback(operation);
            let expected = render(operation, &canonical_payload(operation))?;

            self.begin(step);
            self.stub().call(callback, operation).await?;
            self.state = RunState::Verifying(step);
            let observed = self.local.echo.peek();
            report.push(self.verify(step, expected, observed)?);
        }

        let step = Step::UnknownCallback;
        self.begin(step);
        let expected = self.local.echo.peek();
        self.stub().call_raw(callback, UNKNOWN_KIND).await?;
        self.state = RunState::Verifying(step);
        let observed = self.local.echo.peek();
        report.push(self.verify(step, expected, observed)?);

        self.finish();
        Ok(report)
    }

    async fn objects(&mut self) -> Result<Report, HarnessError> {
        let mut report = Report::default();

        self.begin(Step::GetObject);
        let stored = self.stub().get_object().await?;
        debug!(?stored, "server object");

        let step = Step::ReflectObject;
        let targets = [Some(self.local.object), stored];
        for object in targets.into_iter().flatten() {
            self.begin(step);
            let reflected = self.stub().reflect_object(Some(object)).await?;
            self.state = RunState::Verifying(step);
            report.push(self.verify(
                step,
                object.to_string(),
                reflected.map_or_else(|| "null".to_owned(), |object| object.to_string()),
            )?);
            let observed = self.stub().peek().await?;
            report.push(self.verify(step, REFLECT_SENTINEL.to_owned(), observed)?);
        }

        // The probe records the message in the state it shares with its echo server
        let step = Step::SendObject;
        self.begin(step);
        let probe = stored.unwrap_or(self.local.probe);
        self.stub()
            .send_object(Some(probe), PROBE_MESSAGE.to_owned())
            .await?;
        self.state = RunState::Verifying(step);
        let observed = if stored.is_some() {
            self.stub().peek().await?
        } else {
            self.local.echo.peek()
        };
        report.push(self.verify(step, PROBE_MESSAGE.to_owned(), observed)?);

        let step = Step::NullComposite;
        self.begin(step);
        self.stub().set_composite_value(None).await?;
        self.state = RunState::Verifying(step);
        let observed = self.stub().peek().await?;
        report.push(self.verify(step, render_composite(None), observed)?);

        let step = Step::DistinctValues;
        let payload = Payload::Values(PointPair::new(
            Arc::new(Point::new(1, 1)),
            Arc::new(Point::new(1, 1)),
        ));
        let expected = render(OperationKind::ValuePair, &payload)?;
        self.begin(step);
        self.stub().invoke(OperationKind::ValuePair, payload).await?;
        self.state = RunState::Verifying(step);
        let observed = self.stub().peek().await?;
        report.push(self.verify(step, expected, observed)?);

        self.finish();
        Ok(report)
    }

    fn stub(&self) -> EchoStub<'_> {
        EchoStub::new(&self.transport, self.server)
    }

    fn begin(&mut self, step: Step) {
        debug!(%step, "sending");
        self.state = RunState::Sending(step);
    }

    fn finish(&mut self) {
        self.state = RunState::Done;
    }

    fn check_halted(&self) -> Result<(), HarnessError> {
        match &self.state {
            RunState::Failed {
                operation,
                expected,
                observed,
            } => Err(HarnessError::VerificationMismatch {
                operation: *operation,
                expected: expected.clone(),
                observed: observed.clone(),
            }),
            RunState::Disconnected { .. } => Err(HarnessError::ConnectionUnavailable),
            _ => Ok(()),
        }
    }

    fn halt_on_disconnect<R>(&mut self, result: Result<R, HarnessError>) -> Result<R, HarnessError> {
        if let Err(HarnessError::ConnectionUnavailable) = &result {
            if let RunState::Sending(step) | RunState::Verifying(step) = self.state {
                warn!(%step, "connection lost, halting the run");
                self.state = RunState::Disconnected { operation: step };
            }
        }
        result
    }

    fn verify(
        &mut self,
        step: Step,
        expected: String,
        observed: String,
    ) -> Result<Verified, HarnessError> {
        if expected == observed {
            debug!(%step, description = observed, "verified");
            return Ok(Verified {
                step,
                description: observed,
            });
        }

        self.state = RunState::Failed {
            operation: step,
            expected: expected.clone(),
            observed: observed.clone(),
        };
        Err(HarnessError::VerificationMismatch {
            operation: step,
            expected,
            observed,
        })
    }
}

impl Report {
    fn push(&mut self, verified: Verified) {
        self.verified.push(verified);
    }

    fn extend(&mut self, other: Self) {
        self.verified.extend(other.verified);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.verified.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.verified.is_empty()
    }
}

impl Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Peek => f.write_str("peek"),
            Self::Operation(operation) => Display::fmt(operation, f),
            Self::Callback(operation) => write!(f, "callback {operation}"),
            Self::UnknownCallback => f.write_str("callback of an unknown kind"),
            Self::GetObject => f.write_str("getObject"),
            Self::ReflectObject => f.write_str("reflectObject"),
            Self::SendObject => f.write_str("sendObject"),
            Self::NullComposite => f.write_str("null composite"),
            Self::DistinctValues => f.write_str("distinct values"),
            Self::Oneway => f.write_str("onewayMethod"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    };

    use claims::{assert_matches, assert_ok};
    use interop_proto::{Call, ObjectRef, OperationKind, Reply};

    use super::{ConformanceClient, RunState, Step};
    use crate::{
        BoxFuture, EchoServer, Fault, HarnessError, InvokeError, Loopback, ObjectAdapter, Probe,
        Servant, Transport,
    };

    fn server_and_client(
        with_probe: bool,
    ) -> (Arc<EchoServer>, ConformanceClient<Loopback>) {
        let adapter = Arc::new(ObjectAdapter::new());
        let server = Arc::new(EchoServer::new());
        if with_probe {
            let probe = adapter.activate(Arc::new(Probe::new(Arc::clone(server.state()))));
            server.store_object(Some(probe));
        }
        let object = adapter.activate(Arc::clone(&server) as _);
        let client = ConformanceClient::new(Loopback::new(Arc::clone(&adapter)), object, &adapter);
        (server, client)
    }

    #[tokio::test]
    async fn catalog_run() {
        let (server, mut client) = server_and_client(false);
        let report = assert_ok!(client.run_catalog().await);
        assert_eq!(report.len(), OperationKind::ALL.len() + 1);
        assert_eq!(client.state(), &RunState::Done);
        assert_eq!(server.peek(), "sendObject(..., \"hello\")");
    }

    #[tokio::test]
    async fn callback_run() {
        let (_server, mut client) = server_and_client(false);
        let report = assert_ok!(client.run_callbacks().await);
        assert_eq!(report.len(), OperationKind::ALL.len());
        assert_eq!(
            report.verified.last().map(|verified| verified.step),
            Some(Step::UnknownCallback)
        );
    }

    #[tokio::test]
    async fn object_run_with_and_without_probe() {
        let (server, mut client) = server_and_client(true);
        let report = assert_ok!(client.run_objects().await);
        // two reflections, two checks each
        assert_eq!(report.len(), 4 + 3);
        assert_eq!(server.peek(), "sendValuePoints(Point(1,1),Point(1,1))");

        let (_server, mut client) = server_and_client(false);
        let report = assert_ok!(client.run_objects().await);
        assert_eq!(report.len(), 2 + 3);
    }

    #[tokio::test]
    async fn full_run() {
        let (_server, mut client) = server_and_client(true);
        assert_ok!(client.run_all().await);
        assert_eq!(client.state(), &RunState::Done);
    }

    /// Records nothing, so every verification after an invoke fails
    #[derive(Debug)]
    struct Forgetful;

    impl Servant for Forgetful {
        fn dispatch<'a>(
            &'a self,
            call: Call,
            _transport: &'a dyn Transport,
        ) -> BoxFuture<'a, Result<Reply, Fault>> {
            Box::pin(async move {
                Ok(match call {
                    Call::Peek => Reply::Description("nothing".to_owned()),
                    Call::GetObject | Call::ReflectObject { .. } => Reply::Object(None),
                    _ => Reply::Unit,
                })
            })
        }
    }

    #[tokio::test]
    async fn mismatch_halts_the_run() {
        let adapter = Arc::new(ObjectAdapter::new());
        let object = adapter.activate(Arc::new(Forgetful));
        let mut client =
            ConformanceClient::new(Loopback::new(Arc::clone(&adapter)), object, &adapter);

        assert_matches!(
            client.run_catalog().await,
            Err(HarnessError::VerificationMismatch {
                operation: Step::Operation(OperationKind::Bool),
                expected,
                observed,
            }) if expected == "sendBool(false,true)" && observed == "nothing"
        );
        assert_matches!(
            client.state(),
            RunState::Failed {
                operation: Step::Operation(OperationKind::Bool),
                ..
            }
        );

        // the run stays halted
        assert_matches!(
            client.run_callbacks().await,
            Err(HarnessError::VerificationMismatch {
                operation: Step::Operation(OperationKind::Bool),
                ..
            })
        );
    }

    /// A [`Loopback`] whose connection can be pulled
    #[derive(Debug)]
    struct Unpluggable {
        inner: Loopback,
        unplugged: AtomicBool,
    }

    impl Transport for Unpluggable {
        fn invoke(
            &self,
            target: ObjectRef,
            call: Call,
        ) -> BoxFuture<'_, Result<Reply, InvokeError>> {
            if self.unplugged.load(Ordering::Acquire) {
                return Box::pin(async { Err(InvokeError::ConnectionUnavailable) });
            }
            self.inner.invoke(target, call)
        }

        fn send_oneway(&self, target: ObjectRef, call: Call) -> Result<(), InvokeError> {
            if self.unplugged.load(Ordering::Acquire) {
                return Err(InvokeError::ConnectionUnavailable);
            }
            self.inner.send_oneway(target, call)
        }
    }

    #[tokio::test]
    async fn lost_connection_halts_the_run() {
        let adapter = Arc::new(ObjectAdapter::new());
        let object = adapter.activate(Arc::new(EchoServer::new()));
        let transport = Unpluggable {
            inner: Loopback::new(Arc::clone(&adapter)),
            unplugged: AtomicBool::new(true),
        };
        let mut client = ConformanceClient::new(transport, object, &adapter);

        assert_matches!(
            client.run_catalog().await,
            Err(HarnessError::ConnectionUnavailable)
        );
        assert_eq!(
            client.state(),
            &RunState::Disconnected {
                operation: Step::Peek
            }
        );

        // coming back doesn't resume the run
        client.transport().unplugged.store(false, Ordering::Release);
        assert_matches!(
            client.run_callbacks().await,
            Err(HarnessError::ConnectionUnavailable)
        );
        assert_matches!(client.run_all().await, Err(HarnessError::ConnectionUnavailable));
    }
}
