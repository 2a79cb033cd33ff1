//! Messaging connector actions (`net.jms`).

use tracing::debug;

use super::action::ConnectorAction;
use super::types::{
    Envelope, EnvelopeBody, ExecutionModes, MessageKind, OutboundRequest, TransportReply,
};
use crate::error::{NativeResult, RuntimeError};
use crate::eval::context::ExecutionContext;
use crate::eval::message::{Message, NativeMessage};
use crate::eval::value::Value;
use crate::native::types::NativeSpec;

pub const FAMILY: &str = "jms";
pub const MESSAGE_TYPE_PROPERTY: &str = "JMS_MESSAGE_TYPE";
pub const DESTINATION_PROPERTY: &str = "JMS_DESTINATION";

static SEND_SPEC: NativeSpec = NativeSpec {
    package: "net.jms",
    name: "send",
    params: &[
        ("connector", "connector"),
        ("destinationName", "string"),
        ("msgType", "string"),
        ("m", "message"),
    ],
    returns: Some("boolean"),
    public: true,
};

/// `net.jms:send(connector, destinationName, msgType, m) -> boolean`
#[derive(Debug, Default)]
pub struct JmsSendAction;

impl JmsSendAction {
    pub fn new() -> Self {
        Self
    }

    fn body(kind: MessageKind, message: &Message) -> NativeResult<EnvelopeBody> {
        let data_source = message.data_source();
        match kind {
            MessageKind::Text | MessageKind::Bytes => match (data_source, message.native()) {
                (Some(Value::String(text)), _) => Ok(EnvelopeBody::Text(text)),
                (Some(_), _) => Err(RuntimeError::PayloadKindMismatch {
                    kind,
                    requirement: "a string payload must be set".to_string(),
                }),
                (None, NativeMessage::Text(text)) => Ok(EnvelopeBody::Text(text.clone())),
                (None, native @ NativeMessage::Bytes(_)) if kind == MessageKind::Bytes => {
                    Ok(EnvelopeBody::Native(native.clone()))
                }
                (None, native) => {
                    let accepted = match kind {
                        MessageKind::Bytes => "text or bytes",
                        _ => "text",
                    };
                    Err(RuntimeError::PayloadKindMismatch {
                        kind,
                        requirement: format!(
                            "either a string payload must be set or a received {} message \
                             passed, not {}",
                            accepted,
                            native.describe()
                        ),
                    })
                }
            },
            MessageKind::Object => {
                let json = match data_source {
                    Some(payload) => payload.to_json()?,
                    None => serde_json::to_value(message.headers())
                        .map_err(|e| RuntimeError::native(SEND_SPEC.name, e.to_string()))?,
                };
                let bytes = serde_json::to_vec(&json)
                    .map_err(|e| RuntimeError::native(SEND_SPEC.name, e.to_string()))?;
                Ok(EnvelopeBody::Object(bytes))
            }
            MessageKind::Map => match (data_source, message.native()) {
                (Some(Value::Map(entries)), _) => Ok(EnvelopeBody::Map(
                    entries
                        .iter()
                        .map(|(k, v)| (k.clone(), v.to_string()))
                        .collect(),
                )),
                (Some(_), _) => Err(RuntimeError::PayloadKindMismatch {
                    kind,
                    requirement: "the map data must be set".to_string(),
                }),
                (None, NativeMessage::Map(entries)) => Ok(EnvelopeBody::Map(entries.clone())),
                (None, native) => Err(RuntimeError::PayloadKindMismatch {
                    kind,
                    requirement: format!(
                        "either the map data must be set or a received map message passed, \
                         not {}",
                        native.describe()
                    ),
                }),
            },
            MessageKind::Generic => Ok(EnvelopeBody::Native(message.native().clone())),
        }
    }
}

impl ConnectorAction for JmsSendAction {
    fn spec(&self) -> &'static NativeSpec {
        &SEND_SPEC
    }

    fn connector_family(&self) -> &'static str {
        FAMILY
    }

    fn modes(&self) -> ExecutionModes {
        ExecutionModes::BOTH
    }

    fn validate(&self, args: &[Value]) -> NativeResult<()> {
        let destination = args.get(1).map(Value::as_str).transpose()?.unwrap_or_default();
        if destination.trim().is_empty() {
            return Err(RuntimeError::ValidationFailure {
                action: SEND_SPEC.qualified_name().to_string(),
                reason: "destination name is empty".to_string(),
            });
        }
        Ok(())
    }

    fn prepare(&self, context: &ExecutionContext, args: &[Value]) -> NativeResult<OutboundRequest> {
        let [_, destination, kind, message] = args else {
            return Err(RuntimeError::ArityMismatch {
                function: SEND_SPEC.qualified_name().to_string(),
                expected: SEND_SPEC.params.len(),
                found: args.len(),
            });
        };
        let destination = destination.as_str()?;
        let kind = MessageKind::parse(kind.as_str()?);
        let message = message.as_message()?;

        let envelope = Envelope {
            kind,
            body: Self::body(kind, message)?,
            headers: message.headers(),
        };
        debug!(trace_id = context.trace_id(), %kind, destination, "prepared jms send");

        Ok(OutboundRequest::new(envelope)
            .with_property(MESSAGE_TYPE_PROPERTY, kind.to_string())
            .with_property(DESTINATION_PROPERTY, destination))
    }

    fn complete(&self, reply: TransportReply) -> NativeResult<Option<Value>> {
        Ok(Some(Value::Boolean(reply.accepted)))
    }
}
