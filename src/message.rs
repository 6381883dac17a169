//! The strict versioned message envelope
//!
//! A message frames one encoded payload for transport: a 4-byte version
//! word carrying the message kind in its low bits, the function name as a
//! length-prefixed UTF-8 string, a 4-byte sequence id, and the payload
//! bytes. Only the strict envelope is produced or accepted; the legacy
//! unversioned framing (a bare name length in the first word) is rejected
//! with a version mismatch error.
//!
//! The envelope does not interpret its payload. Callers encode the payload
//! against the function's request or response spec separately and pair the
//! bytes with a kind, name, and sequence id here.

use crate::binary::error::{DecodeError, DecodeResult};
use crate::binary::reader::BinReader;
use crate::target::Target;

/// The strict protocol version marker occupying the high half of the first
/// envelope word.
pub const VERSION_1: u32 = 0x8001_0000;

/// Mask extracting the version half of the first envelope word.
pub const VERSION_MASK: u32 = 0xffff_0000;

/// The role a message plays in an exchange.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageKind {
    /// A request expecting a reply
    Call = 1,
    /// A successful response to a call
    Reply = 2,
    /// A transport-level failure response
    Exception = 3,
    /// A request expecting no reply; representable on the wire, but no
    /// schema compiles a oneway function, so it is never produced here
    Oneway = 4,
}

impl MessageKind {
    fn from_wire(byte: u8) -> DecodeResult<Self> {
        match byte {
            1 => Ok(MessageKind::Call),
            2 => Ok(MessageKind::Reply),
            3 => Ok(MessageKind::Exception),
            4 => Ok(MessageKind::Oneway),
            other => Err(DecodeError::InvalidTypeTag(other)),
        }
    }
}

/// One framed message: an opaque payload plus its routing metadata.
#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    pub name: String,
    pub seqid: i32,
    pub kind: MessageKind,
    pub payload: Vec<u8>,
}

impl Message {
    #[must_use]
    pub fn new(name: &str, seqid: i32, kind: MessageKind, payload: Vec<u8>) -> Self {
        Self {
            name: name.to_owned(),
            seqid,
            kind,
            payload,
        }
    }
}

/// Appends the strict envelope encoding of `message` to `buf`, returning
/// the number of bytes written.
pub fn write_message<T: Target>(message: &Message, buf: &mut T) -> usize {
    let name = message.name.as_bytes();
    buf.anticipate(12 + name.len() + message.payload.len());

    let word = VERSION_1 | u32::from(message.kind as u8);
    let mut written = buf.push_many(word.to_be_bytes());
    written += buf.push_many((name.len() as i32).to_be_bytes());
    written += buf.push_all(name);
    written += buf.push_many(message.seqid.to_be_bytes());
    written += buf.push_all(&message.payload);
    written
}

/// Serializes `message` into a fresh buffer with the strict envelope.
#[must_use]
pub fn serialize_message(message: &Message) -> Vec<u8> {
    let mut buf = Vec::new();
    write_message(message, &mut buf);
    buf
}

/// Parses a strict envelope, taking everything after the sequence id as
/// the payload.
///
/// # Errors
///
/// Fails with [`DecodeError::EnvelopeVersionMismatch`] when the first word
/// does not carry the strict version marker, with
/// [`DecodeError::InvalidTypeTag`] on an unknown message kind, and with
/// the usual truncation and UTF-8 errors on a malformed name.
pub fn deserialize_message(bytes: &[u8]) -> DecodeResult<Message> {
    let mut reader = BinReader::new(bytes);

    let word = reader.take_u32()?;
    if word & VERSION_MASK != VERSION_1 {
        return Err(DecodeError::EnvelopeVersionMismatch { word });
    }
    let kind = MessageKind::from_wire((word & 0xff) as u8)?;

    let declared = reader.take_i32()?;
    let name_len = reader.checked_count(declared)?;
    let name = String::from_utf8(reader.take(name_len)?.to_vec())?;
    let seqid = reader.take_i32()?;
    let payload = reader.take(reader.remainder())?.to_vec();

    Ok(Message {
        name,
        seqid,
        kind,
        payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{
        DefinitionNode, FieldNode, FunctionNode, ProgramNode, RecordNode, RecordNodeKind,
        ServiceNode, TypeRefNode,
    };
    use crate::binary::{dumps, loads};
    use crate::scope::Scope;
    use crate::spec::compile::compile_program;
    use crate::value::{RecordValue, Value};

    #[test]
    fn envelope_layout_is_exact() {
        let message = Message::new("ping", 7, MessageKind::Call, vec![0xaa, 0xbb]);
        let bytes = serialize_message(&message);
        assert_eq!(
            bytes,
            vec![
                0x80, 0x01, 0x00, 0x01, // strict version, kind Call
                0x00, 0x00, 0x00, 0x04, // name length
                b'p', b'i', b'n', b'g', 0x00, 0x00, 0x00, 0x07, // seqid
                0xaa, 0xbb, // payload
            ]
        );
        assert_eq!(deserialize_message(&bytes).unwrap(), message);
    }

    #[test]
    fn all_kinds_round_trip() {
        for kind in [
            MessageKind::Call,
            MessageKind::Reply,
            MessageKind::Exception,
            MessageKind::Oneway,
        ] {
            let message = Message::new("f", -1, kind, Vec::new());
            let decoded = deserialize_message(&serialize_message(&message)).unwrap();
            assert_eq!(decoded.kind, kind);
            assert_eq!(decoded.seqid, -1);
        }
    }

    #[test]
    fn unversioned_envelope_rejected() {
        // a legacy envelope starts with the name length as its first word
        let bytes = [0x00, 0x00, 0x00, 0x04, b'p', b'i', b'n', b'g'];
        let err = deserialize_message(&bytes).unwrap_err();
        assert_eq!(err, DecodeError::EnvelopeVersionMismatch { word: 4 });
    }

    #[test]
    fn unknown_message_kind_rejected() {
        let bytes = [0x80, 0x01, 0x00, 0x09, 0, 0, 0, 0, 0, 0, 0, 0];
        let err = deserialize_message(&bytes).unwrap_err();
        assert_eq!(err, DecodeError::InvalidTypeTag(0x09));
    }

    #[test]
    fn truncated_envelope_reports_end_of_input() {
        let bytes = serialize_message(&Message::new("ping", 1, MessageKind::Call, Vec::new()));
        // cut within the seqid
        let err = deserialize_message(&bytes[..bytes.len() - 2]).unwrap_err();
        assert!(matches!(err, DecodeError::UnexpectedEndOfInput { .. }));
    }

    #[test]
    fn call_and_reply_exchange_round_trips() {
        let mut scope = Scope::new();
        compile_program(
            &mut scope,
            &ProgramNode::new(vec![
                DefinitionNode::Record(RecordNode::new(
                    "Pong",
                    RecordNodeKind::Struct,
                    vec![FieldNode::new(1, "echoed", TypeRefNode::String).required()],
                )),
                DefinitionNode::Service(ServiceNode::new(
                    "Ping",
                    vec![FunctionNode::new(
                        "ping",
                        vec![FieldNode::new(1, "name", TypeRefNode::String)],
                        Some(TypeRefNode::named("Pong")),
                    )],
                )),
            ]),
        )
        .unwrap();
        scope.link().unwrap();

        let service = scope.service(scope.lookup_service("Ping").unwrap());
        let ping = service.surface().unwrap().function("ping").unwrap().clone();

        // caller side: frame the request
        let request = Value::Record(RecordValue::new().with(1, Value::from("world")));
        let payload = dumps(&scope, scope.spec(ping.request), &request).unwrap();
        let call = serialize_message(&Message::new("ping", 42, MessageKind::Call, payload));

        // server side: unframe, decode, reply with success at field id 0
        let received = deserialize_message(&call).unwrap();
        assert_eq!(received.kind, MessageKind::Call);
        assert_eq!(received.name, "ping");
        let args = loads(&scope, scope.spec(ping.request), &received.payload).unwrap();
        assert_eq!(args, request);

        let pong = Value::Record(RecordValue::new().with(1, Value::from("world")));
        let result = Value::Record(RecordValue::new().with(0, pong));
        let reply_payload = dumps(&scope, scope.spec(ping.result), &result).unwrap();
        let reply = serialize_message(&Message::new(
            "ping",
            received.seqid,
            MessageKind::Reply,
            reply_payload,
        ));

        // caller side again: the reply matches the sequence id and decodes
        let received = deserialize_message(&reply).unwrap();
        assert_eq!(received.seqid, 42);
        assert_eq!(received.kind, MessageKind::Reply);
        let decoded = loads(&scope, scope.spec(ping.result), &received.payload).unwrap();
        assert_eq!(decoded, result);
    }

    #[test]
    fn void_reply_is_an_empty_payload_record() {
        let mut scope = Scope::new();
        compile_program(
            &mut scope,
            &ProgramNode::new(vec![DefinitionNode::Service(ServiceNode::new(
                "Admin",
                vec![FunctionNode::new("nudge", vec![], None)],
            ))]),
        )
        .unwrap();
        scope.link().unwrap();

        let service = scope.service(scope.lookup_service("Admin").unwrap());
        let nudge = service.surface().unwrap().function("nudge").unwrap().clone();

        // synthesized result unions tolerate the empty encoding
        let empty = Value::Record(RecordValue::new());
        let payload = dumps(&scope, scope.spec(nudge.result), &empty).unwrap();
        assert_eq!(payload, vec![0x00]);
        let decoded = loads(&scope, scope.spec(nudge.result), &payload).unwrap();
        assert_eq!(decoded, empty);
    }
}
