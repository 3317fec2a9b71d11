//! Wire types exchanged with the Odoo proxy.
//!
//! - [`OdooRequest`]: the call body posted to `/api/odoo`
//! - [`RpcEnvelope`]: the JSON-RPC 2.0 shaped answer
//! - [`RpcErrorObject`]: a business error reported by Odoo inside the envelope

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use crate::error::EnvelopeError;

/// JSON-RPC protocol tag every envelope must carry.
pub const JSON_RPC_VERSION: &str = "2.0";

/// Operation the proxy performs on the target model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OdooAction {
    SearchCount,
    Search,
    Read,
    FieldsGet,
    SearchRead,
    Create,
    Write,
    Unlink,
    CallMethod,
}

impl OdooAction {
    pub const ALL: [OdooAction; 9] = [
        OdooAction::SearchCount,
        OdooAction::Search,
        OdooAction::Read,
        OdooAction::FieldsGet,
        OdooAction::SearchRead,
        OdooAction::Create,
        OdooAction::Write,
        OdooAction::Unlink,
        OdooAction::CallMethod,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OdooAction::SearchCount => "search_count",
            OdooAction::Search => "search",
            OdooAction::Read => "read",
            OdooAction::FieldsGet => "fields_get",
            OdooAction::SearchRead => "search_read",
            OdooAction::Create => "create",
            OdooAction::Write => "write",
            OdooAction::Unlink => "unlink",
            OdooAction::CallMethod => "call_method",
        }
    }
}

impl fmt::Display for OdooAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OdooAction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OdooAction::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = OdooAction::ALL.iter().map(|a| a.as_str()).collect();
                anyhow::anyhow!(
                    "Unknown action '{}'. Expected one of: {}",
                    s,
                    names.join(", ")
                )
            })
    }
}

/// Odoo instance the proxy forwards to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetInstance {
    pub url: String,
    pub db: String,
    pub user_id: i64,
    pub api_key: String,
}

/// Call body posted to the proxy. Passed through as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OdooRequest {
    pub id: String,
    pub action: OdooAction,
    pub model_id: String,
    #[serde(rename = "keywordArgs", default, skip_serializing_if = "Option::is_none")]
    pub kwargs: Option<Map<String, Value>>,
    #[serde(rename = "positionalArgs", default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<Value>>,
    /// Only meaningful with [`OdooAction::CallMethod`].
    #[serde(rename = "methodName", default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(rename = "targetInstance")]
    pub instance: TargetInstance,
}

impl OdooRequest {
    pub fn new(
        id: impl Into<String>,
        action: OdooAction,
        model_id: impl Into<String>,
        instance: TargetInstance,
    ) -> Self {
        Self {
            id: id.into(),
            action,
            model_id: model_id.into(),
            kwargs: None,
            args: None,
            method: None,
            instance,
        }
    }

    /// Request invoking an arbitrary public method on `model_id`.
    pub fn call_method(
        id: impl Into<String>,
        model_id: impl Into<String>,
        method: impl Into<String>,
        instance: TargetInstance,
    ) -> Self {
        Self::new(id, OdooAction::CallMethod, model_id, instance).with_method(method)
    }

    pub fn with_kwargs(mut self, kwargs: Map<String, Value>) -> Self {
        self.kwargs = Some(kwargs);
        self
    }

    pub fn with_args(mut self, args: Vec<Value>) -> Self {
        self.args = Some(args);
        self
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }
}

/// Business error reported by Odoo.
///
/// Built leniently from whatever the proxy put under `error`: a missing or
/// non-numeric `code` becomes `None`, a bare string becomes the message. The
/// value as received stays available through [`raw`](Self::raw).
#[derive(Debug, Clone, PartialEq)]
pub struct RpcErrorObject {
    pub code: Option<i64>,
    pub message: String,
    pub data: Option<Value>,
    raw: Value,
}

impl RpcErrorObject {
    pub fn from_value(value: Value) -> Self {
        let (code, message, data) = match &value {
            Value::Object(obj) => {
                let code = obj.get("code").and_then(|code| match code {
                    Value::Number(n) => n.as_i64(),
                    Value::String(s) => s.trim().parse().ok(),
                    _ => None,
                });
                let message = match obj.get("message") {
                    Some(Value::String(message)) => message.clone(),
                    _ => value.to_string(),
                };
                (code, message, obj.get("data").cloned())
            }
            Value::String(message) => (None, message.clone(), None),
            other => (None, other.to_string(), None),
        };

        Self {
            code,
            message,
            data,
            raw: value,
        }
    }

    /// The `error` member exactly as received.
    pub fn raw(&self) -> &Value {
        &self.raw
    }
}

impl fmt::Display for RpcErrorObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "RPC error {}: {}", code, self.message),
            None => write!(f, "RPC error: {}", self.message),
        }
    }
}

impl std::error::Error for RpcErrorObject {}

/// A structurally valid JSON-RPC envelope returned by the proxy.
///
/// Build one with [`RpcEnvelope::from_value`]. Only the object shape, the
/// protocol tag and the presence of `id` are checked; `id`, `result` and
/// `error` are taken as they come, and `result` and `error` may even both be
/// set.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcEnvelope {
    pub jsonrpc: String,
    /// `Value::Null` when the proxy answered with `"id": null`.
    pub id: Value,
    pub result: Option<Value>,
    pub error: Option<RpcErrorObject>,
    raw: Value,
}

impl RpcEnvelope {
    /// The parsed body exactly as received.
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn into_raw(self) -> Value {
        self.raw
    }

    /// The id when it is a string.
    pub fn id_str(&self) -> Option<&str> {
        self.id.as_str()
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Splits the envelope into its business outcome.
    pub fn into_result(self) -> Result<Option<Value>, RpcErrorObject> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.result),
        }
    }

    /// Like [`into_result`](Self::into_result), deserializing the result.
    pub fn into_typed_result<T: DeserializeOwned>(self) -> anyhow::Result<Option<T>> {
        match self.into_result()? {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| anyhow::anyhow!("Failed to parse RPC result: {}", e)),
            None => Ok(None),
        }
    }

    /// Validates `value` as an envelope.
    ///
    /// Requires an object with `jsonrpc == "2.0"` and an `id` key. Nothing
    /// else is checked. `"error": null` counts as no error.
    pub fn from_value(value: Value) -> Result<Self, EnvelopeError> {
        let obj = value
            .as_object()
            .ok_or_else(|| EnvelopeError::NotAnObject(json_kind(&value)))?;

        match obj.get("jsonrpc") {
            Some(Value::String(tag)) if tag == JSON_RPC_VERSION => {}
            Some(other) => return Err(EnvelopeError::WrongVersion(other.to_string())),
            None => return Err(EnvelopeError::MissingVersion),
        }

        let id = obj.get("id").cloned().ok_or(EnvelopeError::MissingId)?;
        let result = obj.get("result").cloned();
        let error = match obj.get("error") {
            None | Some(Value::Null) => None,
            Some(err) => Some(RpcErrorObject::from_value(err.clone())),
        };

        Ok(Self {
            jsonrpc: JSON_RPC_VERSION.to_string(),
            id,
            result,
            error,
            raw: value,
        })
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
