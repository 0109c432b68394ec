//! AdmissionReview envelope codec.
//!
//! Inbound decoding requires an exact `application/json` content type and a
//! `request` object. Everything else is lenient: the envelope's `kind` and
//! `apiVersion` are kept as sent and echoed back, and absent or `null`
//! request fields fall back to their zero values. Outbound envelopes only
//! ever carry a `response`.

use axum::http::{HeaderMap, header};
use k8s_openapi::api::authentication::v1::UserInfo;
use kube::core::admission::Operation;
use kube::core::{GroupVersionKind, Status, TypeMeta};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::error::ReviewError;

/// The only media type accepted on the decision endpoint and emitted back.
pub const JSON_MEDIA_TYPE: &str = "application/json";

/// Treat an explicit JSON `null` like an absent field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Group/version/resource triple naming the resource being admitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    #[serde(default, deserialize_with = "null_as_default")]
    pub group: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub version: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub resource: String,
}

/// The operation under review, as sent by the API server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionRequest {
    /// Correlation id, echoed verbatim in the response.
    #[serde(default, deserialize_with = "null_as_default")]
    pub uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<GroupVersionKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<ResourceRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_resource: Option<String>,
    /// Name of the target object (for evictions, the pod name).
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub name: String,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub namespace: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_info: Option<UserInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_object: Option<serde_json::Value>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "std::ops::Not::not"
    )]
    pub dry_run: bool,
}

/// The verdict sent back to the API server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionResponse {
    pub uid: String,
    pub allowed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
}

impl AdmissionResponse {
    /// Allow the request identified by `uid`.
    pub fn allow(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            allowed: true,
            status: None,
        }
    }

    /// Deny the request identified by `uid` with a `metav1.Status` detail.
    pub fn deny(uid: impl Into<String>, status: Status) -> Self {
        Self {
            uid: uid.into(),
            allowed: false,
            status: Some(status),
        }
    }
}

/// What an envelope carries. A review holds a request on the way in and a
/// response on the way out, never both.
#[derive(Debug, Clone)]
pub enum ReviewPayload {
    Request(AdmissionRequest),
    Response(AdmissionResponse),
}

/// Versioned `AdmissionReview` envelope.
#[derive(Debug, Clone)]
pub struct AdmissionReview {
    pub types: TypeMeta,
    pub payload: ReviewPayload,
}

/// Wire form used only while decoding.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReview {
    #[serde(default, deserialize_with = "null_as_default")]
    api_version: String,
    #[serde(default, deserialize_with = "null_as_default")]
    kind: String,
    #[serde(default)]
    request: Option<AdmissionRequest>,
}

impl AdmissionReview {
    /// Decode an inbound review. On success the payload is always a request
    /// and `types` holds whatever `kind`/`apiVersion` arrived, possibly empty.
    pub fn decode(body: &[u8]) -> Result<Self, ReviewError> {
        let raw: RawReview =
            serde_json::from_slice(body).map_err(|e| ReviewError::MalformedBody(e.to_string()))?;

        let request = raw.request.ok_or(ReviewError::MissingRequest)?;
        Ok(Self {
            types: TypeMeta {
                api_version: raw.api_version,
                kind: raw.kind,
            },
            payload: ReviewPayload::Request(request),
        })
    }

    pub fn request(&self) -> Option<&AdmissionRequest> {
        match &self.payload {
            ReviewPayload::Request(request) => Some(request),
            ReviewPayload::Response(_) => None,
        }
    }

    pub fn response(&self) -> Option<&AdmissionResponse> {
        match &self.payload {
            ReviewPayload::Response(response) => Some(response),
            ReviewPayload::Request(_) => None,
        }
    }

    /// Turn this review into the outbound envelope. The apiVersion and kind
    /// are carried over unchanged and the request is replaced by `response`.
    pub fn respond(self, response: AdmissionResponse) -> Self {
        Self {
            types: self.types,
            payload: ReviewPayload::Response(response),
        }
    }

    /// Encode for the wire.
    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Indented rendering used by the audit log.
    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl Serialize for AdmissionReview {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("AdmissionReview", 3)?;
        if self.types.api_version.is_empty() {
            state.skip_field("apiVersion")?;
        } else {
            state.serialize_field("apiVersion", &self.types.api_version)?;
        }
        if self.types.kind.is_empty() {
            state.skip_field("kind")?;
        } else {
            state.serialize_field("kind", &self.types.kind)?;
        }
        match &self.payload {
            ReviewPayload::Request(request) => state.serialize_field("request", request)?,
            ReviewPayload::Response(response) => state.serialize_field("response", response)?,
        }
        state.end()
    }
}

/// Reject anything but an exact `application/json` content type.
pub fn check_content_type(headers: &HeaderMap) -> Result<(), ReviewError> {
    match headers.get(header::CONTENT_TYPE) {
        Some(value) if value.as_bytes() == JSON_MEDIA_TYPE.as_bytes() => Ok(()),
        _ => Err(ReviewError::UnsupportedMediaType),
    }
}
