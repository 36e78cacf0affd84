use std::{
    collections::BTreeMap,
    future::Future,
    mem,
    pin::Pin,
    task::{Context, Poll},
};

use interop_net::StreamingConnection;
use interop_proto::{Call, ObjectRef, Reply, RequestId, proto::Frame};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    sync::{mpsc, oneshot},
    task::coop,
};
use tracing::{debug, warn};

use super::{
    Link,
    keepalive::{KeepAlive, KeepAliveOutcome},
};
use crate::InvokeError;

const RECV_BUF: usize = 16;
const NOT_EXIST: &str = "object does not exist";

/// Drives a connection: writes our requests, dispatches the peer's ones
#[derive(Debug)]
pub(crate) struct Handler<S> {
    conn: StreamingConnection<S>,
    link: Link,
    writing: bool,
    flushing: bool,
    shutting_down: bool,

    keepalive: KeepAlive,

    commands: mpsc::Receiver<HandlerCommand>,
    recv_buf: Vec<HandlerCommand>,
    next_request_id: u64,
    pending: BTreeMap<RequestId, PendingRequest>,

    shutdown_recv: mpsc::Receiver<()>,
}

#[derive(Debug)]
pub(crate) enum HandlerCommand {
    Request {
        target: ObjectRef,
        call: Call,
        reply: oneshot::Sender<Result<Reply, InvokeError>>,
    },
    Oneway {
        target: ObjectRef,
        call: Call,
    },
    Respond {
        id: RequestId,
        outcome: Result<Reply, String>,
    },
}

#[derive(Debug)]
struct PendingRequest {
    target: ObjectRef,
    reply: oneshot::Sender<Result<Reply, InvokeError>>,
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum HandlerOutput {
    Disconnected,
    Closed,
}

#[derive(Debug, Copy, Clone)]
enum ReceiveOutcome {
    NoMoreCommands,
    NoMoreSpace,
}

impl<S> Handler<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub(crate) fn new(
        conn: StreamingConnection<S>,
        link: Link,
        keepalive: KeepAlive,
        commands: mpsc::Receiver<HandlerCommand>,
        shutdown_recv: mpsc::Receiver<()>,
    ) -> Self {
        Self {
            conn,
            link,
            writing: false,
            flushing: false,
            shutting_down: false,
            keepalive,
            commands,
            recv_buf: Vec::with_capacity(RECV_BUF),
            next_request_id: 0,
            pending: BTreeMap::new(),
            shutdown_recv,
        }
    }

    fn handle_frame(&mut self, frame: Frame) {
        match frame {
            Frame::Request { id, target, call } => {
                let Some(servant) = self.link.adapter.resolve(target) else {
                    debug!(%id, %target, method = call.name(), "request for a missing object");
                    self.conn.enqueue_write_op(&Frame::Fault {
                        id,
                        message: NOT_EXIST.to_owned(),
                    });
                    return;
                };

                debug!(%id, %target, method = call.name(), "inbound request");
                let link = self.link.clone();
                tokio::spawn(async move {
                    let outcome = servant
                        .dispatch(call, &link)
                        .await
                        .map_err(|fault| fault.to_string());
                    // The connection may already be gone
                    let _ = link
                        .sender
                        .send(HandlerCommand::Respond { id, outcome })
                        .await;
                });
            }
            Frame::Oneway { target, call } => {
                let Some(servant) = self.link.adapter.resolve(target) else {
                    warn!(%target, method = call.name(), "one-way call for a missing object");
                    return;
                };

                let link = self.link.clone();
                tokio::spawn(async move {
                    let method = call.name();
                    if let Err(err) = servant.dispatch(call, &link).await {
                        warn!(%target, method, %err, "one-way call failed");
                    }
                });
            }
            Frame::Reply { id, reply } => {
                if let Some(pending) = self.pending.remove(&id) {
                    let _ = pending.reply.send(Ok(reply));
                } else {
                    debug!(%id, "reply to an unknown request");
                }
            }
            Frame::Fault { id, message } => {
                if let Some(pending) = self.pending.remove(&id) {
                    let err = if message == NOT_EXIST {
                        InvokeError::ObjectNotExist(pending.target)
                    } else {
                        InvokeError::RemoteFault(message)
                    };
                    let _ = pending.reply.send(Err(err));
                } else {
                    debug!(%id, "fault for an unknown request");
                }
            }
            Frame::Ping => {
                self.conn.enqueue_write_op(&Frame::Pong);
            }
            Frame::Pong => {
                self.keepalive.handle_pong();
            }
        }
    }

    fn handle_command(&mut self, cmd: HandlerCommand) {
        match cmd {
            HandlerCommand::Request {
                target,
                call,
                reply,
            } => {
                if reply.is_closed() {
                    // The caller gave up before we even sent it
                    return;
                }

                let id = RequestId::from(self.next_request_id);
                self.next_request_id += 1;
                self.conn
                    .enqueue_write_op(&Frame::Request { id, target, call });
                self.pending.insert(id, PendingRequest { target, reply });
            }
            HandlerCommand::Oneway { target, call } => {
                self.conn.enqueue_write_op(&Frame::Oneway { target, call });
            }
            HandlerCommand::Respond { id, outcome } => {
                let frame = match outcome {
                    Ok(reply) => Frame::Reply { id, reply },
                    Err(message) => Frame::Fault { id, message },
                };
                self.conn.enqueue_write_op(&frame);
            }
        }
    }

    fn receive_commands(&mut self, cx: &mut Context<'_>) -> ReceiveOutcome {
        while self.conn.may_enqueue_more_ops() {
            debug_assert!(self.recv_buf.is_empty());

            match self
                .commands
                .poll_recv_many(cx, &mut self.recv_buf, RECV_BUF)
            {
                Poll::Pending => return ReceiveOutcome::NoMoreCommands,
                Poll::Ready(1..) => {
                    let mut recv_buf = mem::take(&mut self.recv_buf);
                    for cmd in recv_buf.drain(..) {
                        self.handle_command(cmd);
                    }
                    self.recv_buf = recv_buf;
                }
                Poll::Ready(0) => {
                    self.shutting_down = true;
                    return ReceiveOutcome::NoMoreCommands;
                }
            }
        }

        ReceiveOutcome::NoMoreSpace
    }

    #[cold]
    fn begin_shutdown(&mut self) {
        if self.shutting_down {
            return;
        }

        self.shutting_down = true;
        self.commands.close();
    }

    pub(crate) async fn shutdown(&mut self) {
        let _ = self.conn.shutdown().await;
    }
}

impl<S> Future for Handler<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    type Output = HandlerOutput;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let keepalive_outcome = this.keepalive.poll(cx, || {
            this.conn.enqueue_write_op(&Frame::Ping);
        });
        if keepalive_outcome == KeepAliveOutcome::Dead {
            warn!("peer stopped answering pings");
            return Poll::Ready(HandlerOutput::Disconnected);
        }

        if !this.shutting_down && this.shutdown_recv.poll_recv(cx).is_ready() {
            this.begin_shutdown();
        }

        let mut handled_frame = false;
        loop {
            match this.conn.poll_read_next(cx) {
                Poll::Pending => break,
                Poll::Ready(Ok(frame)) => {
                    this.handle_frame(frame);
                    handled_frame = true;
                }
                Poll::Ready(Err(err)) => {
                    debug!(%err, "connection lost");
                    return Poll::Ready(HandlerOutput::Disconnected);
                }
            }
        }
        if handled_frame {
            this.keepalive.reset();
        }

        let mut receive_outcome = ReceiveOutcome::NoMoreCommands;
        let mut iterate_again = true;
        while mem::take(&mut iterate_again) {
            receive_outcome = this.receive_commands(cx);
            if matches!(receive_outcome, ReceiveOutcome::NoMoreSpace) {
                this.writing = true;
            }

            if this.conn.may_write() {
                this.writing = true;

                if coop::has_budget_remaining() {
                    match this.conn.poll_write_next(cx) {
                        Poll::Pending => {}
                        Poll::Ready(Ok(_n)) => {
                            // Register the waker and try to write more
                            iterate_again = true;
                        }
                        Poll::Ready(Err(err)) => {
                            debug!(%err, "write failed");
                            return Poll::Ready(HandlerOutput::Disconnected);
                        }
                    }
                }
            } else if this.writing {
                // Everything was written, make sure it leaves the buffers
                this.writing = false;
                this.flushing = true;
            }
        }

        if this.flushing {
            match this.conn.poll_flush(cx) {
                Poll::Pending => {}
                Poll::Ready(Ok(())) => this.flushing = false,
                Poll::Ready(Err(err)) => {
                    debug!(%err, "flush failed");
                    return Poll::Ready(HandlerOutput::Disconnected);
                }
            }
        }

        if this.shutting_down
            && matches!(receive_outcome, ReceiveOutcome::NoMoreCommands)
            && !this.writing
            && !this.flushing
        {
            Poll::Ready(HandlerOutput::Closed)
        } else {
            Poll::Pending
        }
    }
}
