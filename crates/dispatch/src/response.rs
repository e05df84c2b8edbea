//! Response dispatcher: every result becomes one envelope and one status.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::oneshot;

use campus_core::{ErrorKind, Failure, Outcome};

/// Unrendered result of a call, as produced by a capability or a halting
/// middleware.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub ok: bool,
    pub code: Option<u16>,
    pub data: Option<Value>,
    pub errors: Option<Value>,
}

impl Reply {
    pub fn success(data: impl Into<Value>) -> Self {
        Self {
            ok: true,
            code: None,
            data: Some(data.into()),
            errors: None,
        }
    }

    pub fn failure(code: Option<u16>, errors: impl Into<Value>) -> Self {
        Self {
            ok: false,
            code,
            data: None,
            errors: Some(errors.into()),
        }
    }

    /// An unexpected fault. Details stay in the logs.
    pub fn fault() -> Self {
        Self::failure(Some(ErrorKind::Internal.status_code()), "internal server error")
    }
}

impl From<Failure> for Reply {
    fn from(value: Failure) -> Self {
        Reply::failure(value.code, value.error)
    }
}

impl From<Outcome> for Reply {
    fn from(value: Outcome) -> Self {
        match value {
            Outcome::Success { code, data } => Reply {
                ok: true,
                code,
                data: Some(data),
                errors: None,
            },
            Outcome::Failure(f) => f.into(),
        }
    }
}

/// Wire envelope: `{ ok, data?, errors? }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Value>,
}

/// A rendered envelope with its status code.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub envelope: Envelope,
}

/// One-shot outbound channel of a call.
#[derive(Debug)]
pub struct ResponseChannel {
    tx: Option<oneshot::Sender<Response>>,
}

impl ResponseChannel {
    pub fn new() -> (Self, oneshot::Receiver<Response>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx: Some(tx) }, rx)
    }

    pub fn is_sent(&self) -> bool {
        self.tx.is_none()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseDispatcher;

impl ResponseDispatcher {
    pub const SUCCESS_CODE: u16 = 200;

    pub fn new() -> Self {
        Self
    }

    /// Status: the reply's code, else 200 on success and 400 on failure.
    pub fn render(&self, reply: Reply) -> Response {
        let default = if reply.ok {
            Self::SUCCESS_CODE
        } else {
            Failure::DEFAULT_CODE
        };
        let status = reply.code.unwrap_or(default);
        let envelope = if reply.ok {
            Envelope {
                ok: true,
                data: Some(reply.data.unwrap_or_else(|| Value::Object(Default::default()))),
                errors: None,
            }
        } else {
            Envelope {
                ok: false,
                data: None,
                errors: Some(reply.errors.unwrap_or(Value::Null)),
            }
        };
        Response { status, envelope }
    }

    /// Send `reply` on `channel`. Returns `false` without sending when the
    /// channel was already used.
    pub fn dispatch(&self, channel: &mut ResponseChannel, reply: Reply) -> bool {
        let Some(tx) = channel.tx.take() else {
            tracing::error!("response already sent for this call; dropping second reply");
            return false;
        };
        let response = self.render(reply);
        tracing::debug!(status = response.status, ok = response.envelope.ok, "response dispatched");
        if tx.send(response).is_err() {
            tracing::warn!("caller went away before the response was delivered");
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_defaults_to_200() {
        let r = ResponseDispatcher.render(Reply::success(json!({"a": 1})));
        assert_eq!(r.status, 200);
        assert_eq!(serde_json::to_value(&r.envelope).unwrap(), json!({"ok": true, "data": {"a": 1}}));
    }

    #[test]
    fn explicit_success_code_is_kept() {
        let r = ResponseDispatcher.render(Outcome::with_code(201, json!({})).into());
        assert_eq!(r.status, 201);
    }

    #[test]
    fn failure_without_code_defaults_to_400() {
        let r = ResponseDispatcher.render(Failure::uncoded("bad").into());
        assert_eq!(r.status, 400);
        assert_eq!(serde_json::to_value(&r.envelope).unwrap(), json!({"ok": false, "errors": "bad"}));
    }

    #[test]
    fn failure_code_is_taken_from_the_capability() {
        let r = ResponseDispatcher.render(Failure::conflict("dup").into());
        assert_eq!(r.status, 409);
        assert!(!r.envelope.ok);
    }

    #[test]
    fn faults_render_as_500() {
        let r = ResponseDispatcher.render(Reply::fault());
        assert_eq!(r.status, 500);
        assert_eq!(r.envelope.errors, Some(json!("internal server error")));
    }

    #[tokio::test]
    async fn only_the_first_send_is_delivered() {
        let (mut channel, rx) = ResponseChannel::new();
        let d = ResponseDispatcher::new();
        assert!(d.dispatch(&mut channel, Reply::success(json!("first"))));
        assert!(channel.is_sent());
        assert!(!d.dispatch(&mut channel, Reply::success(json!("second"))));
        let delivered = rx.await.unwrap();
        assert_eq!(delivered.envelope.data, Some(json!("first")));
    }
}
