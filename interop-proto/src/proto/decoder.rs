use core::str;

use bytes::{Buf, Bytes, BytesMut};

use super::Frame;
use crate::util::{CrlfFinder, split_spaces};
use crate::{HostId, ObjectId, ObjectRef, RequestId};

const MAX_HEADER_LEN: usize = 1024;
const MAX_BODY_LEN: usize = 1024 * 1024;

/// Decodes [`Frame`]s out of a stream of bytes
#[derive(Debug)]
pub struct StreamDecoder {
    buf: BytesMut,
    state: DecoderState,
    crlf: CrlfFinder,
}

#[derive(Debug, Copy, Clone)]
enum DecoderState {
    Header,
    Body { header: BodyHeader, len: usize },
    Poisoned,
}

#[derive(Debug, Copy, Clone)]
enum BodyHeader {
    Request { id: RequestId, target: ObjectRef },
    Oneway { target: ObjectRef },
    Reply { id: RequestId },
    Fault { id: RequestId },
}

/// An error encountered while decoding a [`Frame`]
///
/// Once an error has been returned the stream is out of sync and
/// every following call fails with [`DecoderError::Poisoned`].
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum DecoderError {
    #[error("the frame header is malformed")]
    InvalidHeader,
    #[error("unknown frame verb")]
    UnknownVerb,
    #[error("the frame header contains an invalid number")]
    InvalidNumber,
    #[error("the frame header is too long")]
    HeaderTooLong,
    #[error("the frame body of {len} bytes is too large")]
    BodyTooLarge { len: usize },
    #[error("the frame body isn't terminated by CRLF")]
    MissingBodyTerminator,
    #[error("the frame body is not valid JSON")]
    Json(#[source] serde_json::Error),
    #[error("the fault message is not valid UTF-8")]
    InvalidUtf8(#[source] str::Utf8Error),
    #[error("the decoder previously failed")]
    Poisoned,
}

impl StreamDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: BytesMut::new(),
            state: DecoderState::Header,
            crlf: CrlfFinder::new(),
        }
    }

    /// The buffer new bytes read from the stream must be appended to
    pub fn read_buf(&mut self) -> &mut BytesMut {
        &mut self.buf
    }

    /// Decode the next complete frame from the buffered bytes
    ///
    /// Returns `Ok(None)` if more bytes are needed.
    ///
    /// # Errors
    ///
    /// It returns an error if the buffered bytes don't form a valid frame.
    pub fn decode(&mut self) -> Result<Option<Frame>, DecoderError> {
        loop {
            match self.state {
                DecoderState::Header => {
                    let Some(end) = self.crlf.find(&self.buf) else {
                        if self.buf.len() > MAX_HEADER_LEN {
                            return Err(self.poison(DecoderError::HeaderTooLong));
                        }
                        return Ok(None);
                    };

                    if end > MAX_HEADER_LEN {
                        return Err(self.poison(DecoderError::HeaderTooLong));
                    }

                    let header = self.buf.split_to(end).freeze();
                    self.buf.advance(2);

                    match parse_header(header) {
                        Ok(Header::Bare(frame)) => return Ok(Some(frame)),
                        Ok(Header::WithBody { header, len }) => {
                            if len > MAX_BODY_LEN {
                                return Err(self.poison(DecoderError::BodyTooLarge { len }));
                            }
                            self.state = DecoderState::Body { header, len };
                        }
                        Err(err) => return Err(self.poison(err)),
                    }
                }
                DecoderState::Body { header, len } => {
                    if self.buf.len() < len + 2 {
                        self.buf.reserve(len + 2 - self.buf.len());
                        return Ok(None);
                    }
                    if &self.buf[len..len + 2] != b"\r\n" {
                        return Err(self.poison(DecoderError::MissingBodyTerminator));
                    }

                    let body = self.buf.split_to(len).freeze();
                    self.buf.advance(2);
                    self.state = DecoderState::Header;

                    return parse_body(header, &body)
                        .map(Some)
                        .map_err(|err| self.poison(err));
                }
                DecoderState::Poisoned => return Err(DecoderError::Poisoned),
            }
        }
    }

    fn poison(&mut self, err: DecoderError) -> DecoderError {
        self.state = DecoderState::Poisoned;
        err
    }
}

impl Default for StreamDecoder {
    fn default() -> Self {
        Self::new()
    }
}

enum Header {
    Bare(Frame),
    WithBody { header: BodyHeader, len: usize },
}

fn parse_header(header: Bytes) -> Result<Header, DecoderError> {
    let mut chunks = split_spaces(header);
    let verb = chunks.next().ok_or(DecoderError::InvalidHeader)?;

    let (body_header, len) = match &*verb {
        b"PING" | b"PONG" => {
            if chunks.next().is_some() {
                return Err(DecoderError::InvalidHeader);
            }
            let frame = if &*verb == b"PING" {
                Frame::Ping
            } else {
                Frame::Pong
            };
            return Ok(Header::Bare(frame));
        }
        b"REQ" => {
            let id = RequestId::from(parse_number(chunks.next())?);
            let target = parse_target(chunks.next(), chunks.next())?;
            (BodyHeader::Request { id, target }, chunks.next())
        }
        b"ONEWAY" => {
            let target = parse_target(chunks.next(), chunks.next())?;
            (BodyHeader::Oneway { target }, chunks.next())
        }
        b"REP" => {
            let id = RequestId::from(parse_number(chunks.next())?);
            (BodyHeader::Reply { id }, chunks.next())
        }
        b"FAULT" => {
            let id = RequestId::from(parse_number(chunks.next())?);
            (BodyHeader::Fault { id }, chunks.next())
        }
        _ => return Err(DecoderError::UnknownVerb),
    };

    let len = parse_number(len)?;
    if chunks.next().is_some() {
        return Err(DecoderError::InvalidHeader);
    }
    let len = usize::try_from(len).map_err(|_| DecoderError::BodyTooLarge { len: usize::MAX })?;
    Ok(Header::WithBody {
        header: body_header,
        len,
    })
}

fn parse_number(chunk: Option<Bytes>) -> Result<u64, DecoderError> {
    let chunk = chunk.ok_or(DecoderError::InvalidHeader)?;
    str::from_utf8(&chunk)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or(DecoderError::InvalidNumber)
}

fn parse_target(host: Option<Bytes>, id: Option<Bytes>) -> Result<ObjectRef, DecoderError> {
    let host = host.ok_or(DecoderError::InvalidHeader)?;
    let host = str::from_utf8(&host)
        .ok()
        .and_then(|s| s.parse::<HostId>().ok())
        .ok_or(DecoderError::InvalidNumber)?;
    let id = ObjectId::from_raw(parse_number(id)?);
    Ok(ObjectRef::new(host, id))
}

fn parse_body(header: BodyHeader, body: &[u8]) -> Result<Frame, DecoderError> {
    Ok(match header {
        BodyHeader::Request { id, target } => Frame::Request {
            id,
            target,
            call: serde_json::from_slice(body).map_err(DecoderError::Json)?,
        },
        BodyHeader::Oneway { target } => Frame::Oneway {
            target,
            call: serde_json::from_slice(body).map_err(DecoderError::Json)?,
        },
        BodyHeader::Reply { id } => Frame::Reply {
            id,
            reply: serde_json::from_slice(body).map_err(DecoderError::Json)?,
        },
        BodyHeader::Fault { id } => Frame::Fault {
            id,
            message: str::from_utf8(body)
                .map_err(DecoderError::InvalidUtf8)?
                .to_owned(),
        },
    })
}

#[cfg(test)]
mod tests {
    use claims::{assert_matches, assert_none, assert_ok, assert_ok_eq};

    use super::{DecoderError, MAX_HEADER_LEN, StreamDecoder};
    use crate::proto::{Frame, StreamEncoder};
    use crate::{
        Call, HostId, ObjectId, ObjectRef, OperationKind, Reply, RequestId, canonical_payload,
    };

    #[test]
    fn decode_request() {
        let mut decoder = StreamDecoder::new();
        decoder
            .read_buf()
            .extend_from_slice(b"REQ 1 000000000000beef 2 17\r\n{\"method\":\"peek\"}\r\n");
        assert_ok_eq!(
            decoder.decode(),
            Some(Frame::Request {
                id: RequestId::from(1),
                target: ObjectRef::new(HostId::from_raw(0xbeef), ObjectId::from_raw(2)),
                call: Call::Peek,
            })
        );
        assert_ok_eq!(decoder.decode(), None);
    }

    #[test]
    fn decode_byte_by_byte() {
        let target = ObjectRef::new(HostId::from_raw(u64::MAX), ObjectId::from_raw(1));
        let frames = [
            Frame::Request {
                id: RequestId::from(4),
                target,
                call: Call::Invoke {
                    operation: OperationKind::Sequence,
                    payload: canonical_payload(OperationKind::Sequence),
                },
            },
            Frame::Ping,
            Frame::Reply {
                id: RequestId::from(4),
                reply: Reply::Description("sendString(hello,you)".to_owned()),
            },
            Frame::Fault {
                id: RequestId::from(5),
                message: "object does not exist".to_owned(),
            },
            Frame::Oneway {
                target,
                call: Call::OnewayMethod,
            },
            Frame::Pong,
        ];

        let mut encoder = StreamEncoder::new();
        for frame in &frames {
            encoder.enqueue_write_op(frame);
        }
        let encoded = encoder.chunk().to_vec();

        let mut decoder = StreamDecoder::new();
        let mut decoded = Vec::new();
        for byte in encoded {
            decoder.read_buf().extend_from_slice(&[byte]);
            if let Some(frame) = assert_ok!(decoder.decode()) {
                decoded.push(frame);
            }
        }
        assert_eq!(decoded, frames);
    }

    #[test]
    fn decode_ping_pong() {
        let mut decoder = StreamDecoder::new();
        decoder.read_buf().extend_from_slice(b"PING\r\nPONG\r\nPI");
        assert_ok_eq!(decoder.decode(), Some(Frame::Ping));
        assert_ok_eq!(decoder.decode(), Some(Frame::Pong));
        assert_ok_eq!(decoder.decode(), None);
    }

    #[test]
    fn unknown_verb_poisons() {
        let mut decoder = StreamDecoder::new();
        decoder.read_buf().extend_from_slice(b"HELLO 1\r\nPING\r\n");
        assert_matches!(decoder.decode(), Err(DecoderError::UnknownVerb));
        assert_matches!(decoder.decode(), Err(DecoderError::Poisoned));
    }

    #[test]
    fn invalid_numbers() {
        let tests: &[&[u8]] = &[
            b"REQ x 1 2 3\r\n",
            b"REQ 1 zz 2 3\r\n",
            b"REQ 1 2 3\r\n",
            b"REP 1 -2\r\n",
            b"ONEWAY 1 2\r\n",
        ];
        for &input in tests {
            let mut decoder = StreamDecoder::new();
            decoder.read_buf().extend_from_slice(input);
            assert_matches!(
                decoder.decode(),
                Err(DecoderError::InvalidNumber | DecoderError::InvalidHeader)
            );
        }
    }

    #[test]
    fn oversize_body() {
        let mut decoder = StreamDecoder::new();
        decoder.read_buf().extend_from_slice(b"REP 1 1048577\r\n");
        assert_matches!(
            decoder.decode(),
            Err(DecoderError::BodyTooLarge { len: 1_048_577 })
        );
    }

    #[test]
    fn oversize_header() {
        let mut decoder = StreamDecoder::new();
        decoder
            .read_buf()
            .extend_from_slice(&[b'A'; MAX_HEADER_LEN + 1]);
        assert_matches!(decoder.decode(), Err(DecoderError::HeaderTooLong));
    }

    #[test]
    fn missing_terminator() {
        let mut decoder = StreamDecoder::new();
        decoder.read_buf().extend_from_slice(b"FAULT 1 4\r\nboomXX");
        assert_matches!(decoder.decode(), Err(DecoderError::MissingBodyTerminator));
    }

    #[test]
    fn invalid_json() {
        let mut decoder = StreamDecoder::new();
        decoder.read_buf().extend_from_slice(b"REP 1 2\r\n{}\r\n");
        assert_matches!(decoder.decode(), Err(DecoderError::Json(_)));
    }

    #[test]
    fn nothing_buffered() {
        let mut decoder = StreamDecoder::new();
        assert_none!(assert_ok!(decoder.decode()));
    }
}
