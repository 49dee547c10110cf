//! JSON wire codec.
//!
//! Every message is a single JSON object. The concrete variant is selected by
//! the `messageType` discriminator (older clients send `type`); the handshake
//! request is the one message sent without a discriminator:
//!
//! ```text
//! {"version":"V_1_0","profileId":"p1","sessionKey":"k"}
//! {"messageType":"SDP_ANSWER","profileId":"p1","recipientProfileId":"p2","lifecycle":"SESSION","peerSdp":"v=0"}
//! ```
//!
//! Encoding writes the discriminator first, omits absent optional fields and
//! writes enums by name. Decoding ignores fields it does not know.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::MAX_MESSAGE_SIZE;
use crate::error::{DecodeError, ProtocolError, ProtocolResult};
use crate::handshake::{HandshakeRequest, HandshakeResponse};
use crate::kind::MessageType;
use crate::message::{Message, ProtocolMessage};
use crate::notice::{ErrorNotice, RecipientUnavailable};
use crate::signal::{
    BroadcastSignal, DirectSignal, DisconnectBroadcastSignal, IceCandidateDirectSignal,
    JoinBroadcastSignal, LeaveBroadcastSignal, SdpAnswerDirectSignal, SdpOfferDirectSignal,
    Signal,
};

/// Discriminator key written on every tagged message.
pub const DISCRIMINATOR: &str = "messageType";

/// Discriminator key accepted from legacy clients.
pub const LEGACY_DISCRIMINATOR: &str = "type";

/// Field whose presence marks an untagged payload as a handshake request.
const HANDSHAKE_MARKER: &str = "version";

#[derive(Serialize)]
struct Tagged<'a, M> {
    #[serde(rename = "messageType")]
    message_type: MessageType,
    #[serde(flatten)]
    record: &'a M,
}

/// Encodes a message to UTF-8 JSON bytes.
///
/// # Example
///
/// ```rust
/// use crossfire_protocol::{encode, ProtocolMessage, SdpAnswerDirectSignal};
///
/// let answer = SdpAnswerDirectSignal::new("p1", "p2", "v=0");
/// let bytes = encode(&ProtocolMessage::from(answer)).unwrap();
/// assert!(bytes.starts_with(br#"{"messageType":"SDP_ANSWER""#));
/// ```
pub fn encode(message: &ProtocolMessage) -> ProtocolResult<Vec<u8>> {
    match message {
        ProtocolMessage::HandshakeRequest(m) => encode_record(m),
        ProtocolMessage::HandshakeResponse(m) => encode_record(m),
        ProtocolMessage::Signal(signal) => encode_signal(signal),
        ProtocolMessage::RecipientUnavailable(m) => encode_record(m),
        ProtocolMessage::Error(m) => encode_record(m),
    }
}

/// Encodes a signal without wrapping it in a [`ProtocolMessage`] first.
pub fn encode_signal(signal: &Signal) -> ProtocolResult<Vec<u8>> {
    match signal {
        Signal::Direct(DirectSignal::SdpOffer(s)) => encode_record(s),
        Signal::Direct(DirectSignal::SdpAnswer(s)) => encode_record(s),
        Signal::Direct(DirectSignal::IceCandidate(s)) => encode_record(s),
        Signal::Broadcast(BroadcastSignal::Join(s)) => encode_record(s),
        Signal::Broadcast(BroadcastSignal::Leave(s)) => encode_record(s),
        Signal::Broadcast(BroadcastSignal::Disconnect(s)) => encode_record(s),
    }
}

/// Encodes one concrete record, adding its discriminator when tagged.
pub fn encode_record<M: Message>(record: &M) -> ProtocolResult<Vec<u8>> {
    let bytes = if M::TAGGED {
        serde_json::to_vec(&Tagged {
            message_type: M::MESSAGE_TYPE,
            record,
        })?
    } else {
        serde_json::to_vec(record)?
    };

    if bytes.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size: bytes.len(),
            max: MAX_MESSAGE_SIZE,
        });
    }
    Ok(bytes)
}

/// Decodes a message, rejecting payloads over [`MAX_MESSAGE_SIZE`].
///
/// # Example
///
/// ```rust
/// use crossfire_protocol::{decode, ProtocolMessage};
///
/// let message = decode(br#"{"version":"V_1_0","profileId":"p1","sessionKey":"k"}"#).unwrap();
/// assert!(matches!(message, ProtocolMessage::HandshakeRequest(_)));
/// ```
pub fn decode(data: &[u8]) -> Result<ProtocolMessage, DecodeError> {
    decode_with_limit(data, MAX_MESSAGE_SIZE)
}

/// Decodes a message, rejecting payloads over `max_size` bytes.
pub fn decode_with_limit(data: &[u8], max_size: usize) -> Result<ProtocolMessage, DecodeError> {
    if data.len() > max_size {
        return Err(DecodeError::MessageTooLarge {
            size: data.len(),
            max: max_size,
        });
    }

    let value: Value = serde_json::from_slice(data).map_err(DecodeError::Malformed)?;
    let Value::Object(map) = value else {
        return Err(DecodeError::NotAnObject);
    };

    let message_type = match discriminator(&map)? {
        Some(message_type) => message_type,
        None if map.contains_key(HANDSHAKE_MARKER) => MessageType::Handshake,
        None => return Err(DecodeError::MissingField(DISCRIMINATOR)),
    };

    let message: ProtocolMessage = match message_type {
        MessageType::Handshake => decode_record::<HandshakeRequest>(map)?.into(),
        MessageType::HandshakeResponse => decode_record::<HandshakeResponse>(map)?.into(),
        MessageType::SdpOffer => decode_record::<SdpOfferDirectSignal>(map)?.into(),
        MessageType::SdpAnswer => decode_record::<SdpAnswerDirectSignal>(map)?.into(),
        MessageType::IceCandidate => decode_record::<IceCandidateDirectSignal>(map)?.into(),
        MessageType::SignalJoin => decode_record::<JoinBroadcastSignal>(map)?.into(),
        MessageType::SignalLeave => decode_record::<LeaveBroadcastSignal>(map)?.into(),
        MessageType::Disconnect => decode_record::<DisconnectBroadcastSignal>(map)?.into(),
        MessageType::RecipientUnavailable => {
            decode_record::<RecipientUnavailable>(map)?.into()
        }
        MessageType::Error => decode_record::<ErrorNotice>(map)?.into(),
    };
    Ok(message)
}

/// Reads the discriminator, preferring `messageType` over legacy `type`.
fn discriminator(map: &Map<String, Value>) -> Result<Option<MessageType>, DecodeError> {
    let (field, value) = match map.get(DISCRIMINATOR) {
        Some(value) => (DISCRIMINATOR, value),
        None => match map.get(LEGACY_DISCRIMINATOR) {
            Some(value) => (LEGACY_DISCRIMINATOR, value),
            None => return Ok(None),
        },
    };

    let name = value.as_str().ok_or(DecodeError::InvalidFieldType {
        field,
        expected: "string",
    })?;
    name.parse().map(Some)
}

fn decode_record<M: Message>(map: Map<String, Value>) -> Result<M, DecodeError> {
    let record: M =
        serde_json::from_value(Value::Object(map)).map_err(|source| DecodeError::InvalidPayload {
            message_type: M::MESSAGE_TYPE,
            source,
        })?;
    record.validate()?;
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handshake::HandshakeOutcome;
    use crate::kind::{ProtocolVersion, SignalLifecycle};
    use crate::notice::ErrorCode;

    fn roundtrip(message: ProtocolMessage) {
        let bytes = encode(&message).unwrap();
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded, message);
    }

    fn encode_str(message: impl Into<ProtocolMessage>) -> String {
        let message: ProtocolMessage = message.into();
        String::from_utf8(encode(&message).unwrap()).unwrap()
    }

    #[test]
    fn roundtrip_every_variant() {
        roundtrip(HandshakeRequest::new(ProtocolVersion::V1_0, "p1", "k").into());
        roundtrip(HandshakeResponse::accepted(ProtocolVersion::V1_0).into());
        roundtrip(HandshakeResponse::rejected("bad key").into());
        roundtrip(SdpOfferDirectSignal::new("p1", "p2", "v=0\r\no=- 1 2 IN IP4 0.0.0.0").into());
        roundtrip(
            SdpAnswerDirectSignal::new("p2", "p1", "v=0")
                .with_lifecycle(SignalLifecycle::Match)
                .into(),
        );
        roundtrip(IceCandidateDirectSignal::new("p1", "p2", "candidate:1 1 udp 1 1.2.3.4 9 typ host").into());
        roundtrip(
            IceCandidateDirectSignal::new("p1", "p2", "candidate:2")
                .with_sdp_mid("audio")
                .into(),
        );
        roundtrip(
            IceCandidateDirectSignal::new("p1", "p2", "candidate:3")
                .with_sdp_mid("0")
                .with_sdp_m_line_index(0)
                .into(),
        );
        roundtrip(JoinBroadcastSignal::new("p1").into());
        roundtrip(JoinBroadcastSignal::with_lifecycle("p1", SignalLifecycle::Session).into());
        roundtrip(LeaveBroadcastSignal::new("p1").into());
        roundtrip(DisconnectBroadcastSignal::new("p1", SignalLifecycle::Match).into());
        roundtrip(
            RecipientUnavailable::new("p2", SignalLifecycle::Session, MessageType::SdpOffer).into(),
        );
        roundtrip(ErrorNotice::new(ErrorCode::ProtocolViolation, "handshake already completed").into());
    }

    #[test]
    fn sdp_answer_wire_format() {
        let text = encode_str(SdpAnswerDirectSignal::new("p1", "p2", "v=0"));
        insta::assert_snapshot!(text, @r#"{"messageType":"SDP_ANSWER","profileId":"p1","recipientProfileId":"p2","lifecycle":"SESSION","peerSdp":"v=0"}"#);
    }

    #[test]
    fn ice_candidate_wire_format_omits_absent_fields() {
        let text = encode_str(IceCandidateDirectSignal::new("p1", "p2", "candidate:1"));
        insta::assert_snapshot!(text, @r#"{"messageType":"ICE_CANDIDATE","profileId":"p1","recipientProfileId":"p2","lifecycle":"SESSION","candidate":"candidate:1"}"#);

        let text = encode_str(
            IceCandidateDirectSignal::new("p1", "p2", "candidate:1")
                .with_sdp_mid("0")
                .with_sdp_m_line_index(1),
        );
        insta::assert_snapshot!(text, @r#"{"messageType":"ICE_CANDIDATE","profileId":"p1","recipientProfileId":"p2","lifecycle":"SESSION","candidate":"candidate:1","sdpMid":"0","sdpMLineIndex":1}"#);
    }

    #[test]
    fn broadcast_wire_format() {
        insta::assert_snapshot!(
            encode_str(LeaveBroadcastSignal::new("p1")),
            @r#"{"messageType":"SIGNAL_LEAVE","profileId":"p1","lifecycle":"MATCH"}"#
        );
        insta::assert_snapshot!(
            encode_str(JoinBroadcastSignal::new("p1")),
            @r#"{"messageType":"SIGNAL_JOIN","profileId":"p1","lifecycle":"MATCH"}"#
        );
        insta::assert_snapshot!(
            encode_str(DisconnectBroadcastSignal::new("p1", SignalLifecycle::Session)),
            @r#"{"messageType":"DISCONNECT","profileId":"p1","lifecycle":"SESSION"}"#
        );
    }

    #[test]
    fn handshake_wire_format_has_no_discriminator() {
        insta::assert_snapshot!(
            encode_str(HandshakeRequest::new(ProtocolVersion::V1_0, "p1", "k")),
            @r#"{"version":"V_1_0","profileId":"p1","sessionKey":"k"}"#
        );
        insta::assert_snapshot!(
            encode_str(HandshakeResponse::accepted(ProtocolVersion::V1_0)),
            @r#"{"messageType":"HANDSHAKE_RESPONSE","outcome":"ACCEPTED","version":"V_1_0"}"#
        );
    }

    #[test]
    fn enums_are_never_numeric() {
        let messages: Vec<ProtocolMessage> = vec![
            SdpOfferDirectSignal::new("a", "b", "x").into(),
            SdpAnswerDirectSignal::new("a", "b", "x").into(),
            IceCandidateDirectSignal::new("a", "b", "x").into(),
            JoinBroadcastSignal::new("a").into(),
            LeaveBroadcastSignal::with_lifecycle("a", SignalLifecycle::Session).into(),
            DisconnectBroadcastSignal::new("a", SignalLifecycle::Match).into(),
            RecipientUnavailable::new("b", SignalLifecycle::Match, MessageType::IceCandidate).into(),
            HandshakeResponse::accepted(ProtocolVersion::V1_0).into(),
        ];

        for message in messages {
            let value: Value = serde_json::from_slice(&encode(&message).unwrap()).unwrap();
            let object = value.as_object().unwrap();
            for key in [DISCRIMINATOR, "lifecycle", "signalType", "outcome", "version"] {
                if let Some(field) = object.get(key) {
                    assert!(field.is_string(), "{key} encoded as {field}");
                }
            }
            assert_eq!(
                object[DISCRIMINATOR].as_str().unwrap(),
                message.message_type().as_str()
            );
        }
    }

    #[test]
    fn decode_handshake_scenario() {
        let message = decode(br#"{"version":"V_1_0","profileId":"p1","sessionKey":"k"}"#).unwrap();
        match message {
            ProtocolMessage::HandshakeRequest(request) => {
                assert_eq!(request.protocol_version(), Some(ProtocolVersion::V1_0));
                assert_eq!(request.profile_id(), "p1");
                assert_eq!(request.session_key(), "k");
            }
            other => panic!("expected handshake request, got {other:?}"),
        }
    }

    #[test]
    fn decode_sdp_answer_scenario() {
        let input = br#"{"messageType":"SDP_ANSWER","profileId":"p1","recipientProfileId":"p2","lifecycle":"SESSION","peerSdp":"v=0..."}"#;
        let message = decode(input).unwrap();
        assert_eq!(
            message,
            ProtocolMessage::from(SdpAnswerDirectSignal::new("p1", "p2", "v=0..."))
        );
    }

    #[test]
    fn decode_accepts_legacy_type_discriminator() {
        let input = br#"{"type":"SDP_ANSWER","profileId":"p1","recipientProfileId":"p2","peerSdp":"v=0"}"#;
        let message = decode(input).unwrap();
        assert_eq!(message.message_type(), MessageType::SdpAnswer);

        let input = br#"{"type":"HANDSHAKE","version":"V_1_0","profileId":"p1","sessionKey":"k"}"#;
        assert_eq!(decode(input).unwrap().message_type(), MessageType::Handshake);
    }

    #[test]
    fn decode_prefers_message_type_over_legacy_type() {
        let input = br#"{"messageType":"SIGNAL_LEAVE","type":"SDP_OFFER","profileId":"p1"}"#;
        assert_eq!(decode(input).unwrap().message_type(), MessageType::SignalLeave);
    }

    #[test]
    fn decode_applies_lifecycle_defaults() {
        let leave = decode(br#"{"messageType":"SIGNAL_LEAVE","profileId":"p1"}"#).unwrap();
        assert_eq!(leave.as_signal().unwrap().lifecycle(), SignalLifecycle::Match);

        let join = decode(br#"{"messageType":"JOIN","profileId":"p1"}"#).unwrap();
        assert_eq!(join.message_type(), MessageType::SignalJoin);
        assert_eq!(join.as_signal().unwrap().lifecycle(), SignalLifecycle::Match);

        let answer = decode(br#"{"messageType":"SDP_ANSWER","profileId":"p1","recipientProfileId":"p2","peerSdp":""}"#).unwrap();
        assert_eq!(answer.as_signal().unwrap().lifecycle(), SignalLifecycle::Session);

        let disconnect = decode(br#"{"messageType":"DISCONNECT","profileId":"p1"}"#).unwrap();
        assert_eq!(disconnect.as_signal().unwrap().lifecycle(), SignalLifecycle::Session);
    }

    #[test]
    fn decode_ignores_unknown_fields() {
        let input = br#"{"messageType":"SIGNAL_JOIN","profileId":"p1","lifecycle":"MATCH","avatar":{"color":"red"},"seq":7}"#;
        assert_eq!(
            decode(input).unwrap(),
            ProtocolMessage::from(JoinBroadcastSignal::new("p1"))
        );
    }

    #[test]
    fn decode_tolerates_explicit_null_optionals() {
        let input = br#"{"messageType":"ICE_CANDIDATE","profileId":"p1","recipientProfileId":"p2","candidate":"c","sdpMid":null}"#;
        assert_eq!(
            decode(input).unwrap(),
            ProtocolMessage::from(IceCandidateDirectSignal::new("p1", "p2", "c"))
        );
    }

    #[test]
    fn decode_rejects_malformed_input() {
        assert!(matches!(decode(b"{not json"), Err(DecodeError::Malformed(_))));
        assert!(matches!(decode(b""), Err(DecodeError::Malformed(_))));
        assert!(matches!(decode(&[0xff, 0xfe, 0x00]), Err(DecodeError::Malformed(_))));
        assert!(matches!(decode(b"[1,2,3]"), Err(DecodeError::NotAnObject)));
        assert!(matches!(decode(br#""SDP_OFFER""#), Err(DecodeError::NotAnObject)));
    }

    #[test]
    fn decode_rejects_unknown_discriminator() {
        let result = decode(br#"{"messageType":"SDP_ROLLBACK","profileId":"p1"}"#);
        assert!(matches!(result, Err(DecodeError::UnknownMessageType(name)) if name == "SDP_ROLLBACK"));
    }

    #[test]
    fn decode_rejects_non_string_discriminator() {
        let result = decode(br#"{"messageType":3,"profileId":"p1"}"#);
        assert!(matches!(
            result,
            Err(DecodeError::InvalidFieldType { field: "messageType", .. })
        ));
    }

    #[test]
    fn decode_rejects_missing_discriminator() {
        let result = decode(br#"{"profileId":"p1","lifecycle":"MATCH"}"#);
        assert!(matches!(result, Err(DecodeError::MissingField("messageType"))));
    }

    #[test]
    fn decode_rejects_missing_required_fields() {
        let missing_profile = decode(br#"{"messageType":"SIGNAL_LEAVE","lifecycle":"MATCH"}"#);
        assert!(matches!(
            missing_profile,
            Err(DecodeError::InvalidPayload { message_type: MessageType::SignalLeave, .. })
        ));

        for input in [
            &br#"{"version":"V_1_0","sessionKey":"k"}"#[..],
            &br#"{"version":"V_1_0","profileId":"p1"}"#[..],
            &br#"{"messageType":"HANDSHAKE","profileId":"p1","sessionKey":"k"}"#[..],
        ] {
            assert!(matches!(
                decode(input),
                Err(DecodeError::InvalidPayload { message_type: MessageType::Handshake, .. })
            ));
        }
    }

    #[test]
    fn decode_rejects_wrong_primitive_types() {
        let result = decode(br#"{"messageType":"SIGNAL_JOIN","profileId":42}"#);
        assert!(matches!(result, Err(DecodeError::InvalidPayload { .. })));

        let result = decode(br#"{"version":1.0,"profileId":"p1","sessionKey":"k"}"#);
        assert!(matches!(result, Err(DecodeError::InvalidPayload { .. })));

        let result = decode(br#"{"messageType":"SIGNAL_JOIN","profileId":"p1","lifecycle":1}"#);
        assert!(matches!(result, Err(DecodeError::InvalidPayload { .. })));
    }

    #[test]
    fn decode_rejects_invalid_addressing() {
        let result = decode(br#"{"messageType":"SDP_OFFER","profileId":"p1","recipientProfileId":"","peerSdp":"v=0"}"#);
        assert!(matches!(result, Err(DecodeError::EmptyField("recipientProfileId"))));

        let result = decode(br#"{"messageType":"SDP_OFFER","profileId":"p1","recipientProfileId":"p1","peerSdp":"v=0"}"#);
        assert!(matches!(result, Err(DecodeError::SelfAddressed(_))));

        let result = decode(br#"{"version":"V_1_0","profileId":"","sessionKey":"k"}"#);
        assert!(matches!(result, Err(DecodeError::EmptyField("profileId"))));
    }

    #[test]
    fn decode_keeps_unsupported_version_for_the_caller() {
        let message = decode(br#"{"version":"V_2_0","profileId":"p1","sessionKey":"k"}"#).unwrap();
        match message {
            ProtocolMessage::HandshakeRequest(request) => {
                assert_eq!(request.version(), "V_2_0");
                assert_eq!(request.protocol_version(), None);
            }
            other => panic!("expected handshake request, got {other:?}"),
        }
    }

    #[test]
    fn decode_enforces_size_limit() {
        let input = br#"{"messageType":"SIGNAL_JOIN","profileId":"p1"}"#;
        assert!(decode_with_limit(input, input.len()).is_ok());
        assert!(matches!(
            decode_with_limit(input, input.len() - 1),
            Err(DecodeError::MessageTooLarge { .. })
        ));
    }

    #[test]
    fn encode_rejects_oversized_messages() {
        let huge = "a".repeat(MAX_MESSAGE_SIZE);
        let result = encode(&ProtocolMessage::from(SdpOfferDirectSignal::new("p1", "p2", huge)));
        assert!(matches!(result, Err(ProtocolError::MessageTooLarge { .. })));
    }

    #[test]
    fn reencode_is_identical_modulo_field_order() {
        let inputs: [&[u8]; 4] = [
            br#"{"version":"V_1_0","profileId":"p1","sessionKey":"k"}"#,
            br#"{"lifecycle":"SESSION","peerSdp":"v=0","recipientProfileId":"p2","profileId":"p1","messageType":"SDP_ANSWER"}"#,
            br#"{"messageType":"ICE_CANDIDATE","profileId":"p1","recipientProfileId":"p2","lifecycle":"MATCH","candidate":"c"}"#,
            br#"{"messageType":"DISCONNECT","profileId":"p1","lifecycle":"MATCH"}"#,
        ];

        for input in inputs {
            let original: Value = serde_json::from_slice(input).unwrap();
            let reencoded = encode(&decode(input).unwrap()).unwrap();
            let reencoded: Value = serde_json::from_slice(&reencoded).unwrap();
            assert_eq!(reencoded, original);
            assert!(!String::from_utf8_lossy(input).contains("null"));
        }
    }

    #[test]
    fn handshake_response_decodes_outcome() {
        let message = decode(br#"{"messageType":"HANDSHAKE_RESPONSE","outcome":"REJECTED","reason":"unsupported protocol version: V_2_0"}"#).unwrap();
        match message {
            ProtocolMessage::HandshakeResponse(response) => {
                assert_eq!(response.outcome(), HandshakeOutcome::Rejected);
                assert!(response.version().is_none());
            }
            other => panic!("expected handshake response, got {other:?}"),
        }
    }
}
