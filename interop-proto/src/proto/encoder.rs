use bytes::{Buf, BufMut, BytesMut};

use super::Frame;
use crate::ObjectRef;

/// Encodes [`Frame`]s into a contiguous buffer to be written to a stream
#[derive(Debug)]
pub struct StreamEncoder {
    buf: BytesMut,
}

impl StreamEncoder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: BytesMut::new(),
        }
    }

    pub fn enqueue_write_op(&mut self, item: &Frame) {
        let mut buffer = itoa::Buffer::new();

        match item {
            Frame::Request { id, target, call } => {
                // `REQ {id} {host} {object} {len}\r\n{call}\r\n`
                let body = serde_json::to_vec(call).expect("serialize `Call`");
                self.buf.put_slice(b"REQ ");
                self.buf.put_slice(buffer.format(u64::from(*id)).as_bytes());
                self.write_target(*target);
                self.write_body(&body);
            }
            Frame::Oneway { target, call } => {
                // `ONEWAY {host} {object} {len}\r\n{call}\r\n`
                let body = serde_json::to_vec(call).expect("serialize `Call`");
                self.buf.put_slice(b"ONEWAY");
                self.write_target(*target);
                self.write_body(&body);
            }
            Frame::Reply { id, reply } => {
                let body = serde_json::to_vec(reply).expect("serialize `Reply`");
                self.buf.put_slice(b"REP ");
                self.buf.put_slice(buffer.format(u64::from(*id)).as_bytes());
                self.write_body(&body);
            }
            Frame::Fault { id, message } => {
                self.buf.put_slice(b"FAULT ");
                self.buf.put_slice(buffer.format(u64::from(*id)).as_bytes());
                self.write_body(message.as_bytes());
            }
            Frame::Ping => {
                self.buf.put_slice(b"PING\r\n");
            }
            Frame::Pong => {
                self.buf.put_slice(b"PONG\r\n");
            }
        }
    }

    fn write_target(&mut self, target: ObjectRef) {
        let mut buffer = itoa::Buffer::new();
        self.buf.put_u8(b' ');
        self.buf.put_slice(target.host.to_string().as_bytes());
        self.buf.put_u8(b' ');
        self.buf.put_slice(buffer.format(target.id.into_raw()).as_bytes());
    }

    fn write_body(&mut self, body: &[u8]) {
        let mut buffer = itoa::Buffer::new();
        self.buf.put_u8(b' ');
        self.buf.put_slice(buffer.format(body.len()).as_bytes());
        self.buf.put_slice(b"\r\n");
        self.buf.put_slice(body);
        self.buf.put_slice(b"\r\n");
    }

    #[must_use]
    pub fn has_remaining(&self) -> bool {
        self.buf.has_remaining()
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    #[must_use]
    pub fn chunk(&self) -> &[u8] {
        self.buf.chunk()
    }

    pub fn advance(&mut self, n: usize) {
        self.buf.advance(n);
    }
}

impl Default for StreamEncoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::StreamEncoder;
    use crate::proto::Frame;
    use crate::{Call, HostId, ObjectId, ObjectRef, Reply, RequestId};

    fn encode(frame: &Frame) -> String {
        let mut encoder = StreamEncoder::new();
        encoder.enqueue_write_op(frame);
        String::from_utf8(encoder.chunk().to_vec()).unwrap()
    }

    #[test]
    fn encode_request() {
        assert_eq!(
            encode(&Frame::Request {
                id: RequestId::from(1),
                target: ObjectRef::new(HostId::from_raw(0xbeef), ObjectId::from_raw(2)),
                call: Call::Peek,
            }),
            "REQ 1 000000000000beef 2 17\r\n{\"method\":\"peek\"}\r\n"
        );
    }

    #[test]
    fn encode_oneway() {
        assert_eq!(
            encode(&Frame::Oneway {
                target: ObjectRef::new(HostId::from_raw(1), ObjectId::from_raw(7)),
                call: Call::OnewayMethod,
            }),
            "ONEWAY 0000000000000001 7 25\r\n{\"method\":\"onewayMethod\"}\r\n"
        );
    }

    #[test]
    fn encode_reply_and_fault() {
        assert_eq!(
            encode(&Frame::Reply {
                id: RequestId::from(9),
                reply: Reply::Unit,
            }),
            "REP 9 15\r\n{\"kind\":\"unit\"}\r\n"
        );
        assert_eq!(
            encode(&Frame::Fault {
                id: RequestId::from(10),
                message: "boom".to_owned(),
            }),
            "FAULT 10 4\r\nboom\r\n"
        );
    }

    #[test]
    fn encode_ping_pong() {
        assert_eq!(encode(&Frame::Ping), "PING\r\n");
        assert_eq!(encode(&Frame::Pong), "PONG\r\n");
    }

    #[test]
    fn advance_consumes() {
        let mut encoder = StreamEncoder::new();
        encoder.enqueue_write_op(&Frame::Ping);
        encoder.enqueue_write_op(&Frame::Pong);
        assert_eq!(encoder.remaining(), 12);
        encoder.advance(6);
        assert_eq!(encoder.chunk(), b"PONG\r\n");
        encoder.advance(6);
        assert!(!encoder.has_remaining());
    }
}
