use serde::{Deserialize, Serialize};

use crate::models::{Moment, MomentSummary};

// -- Envelope --

/// Uniform response shape: `{success, message, ...payload}`.
///
/// Failures are signaled in-body only; the transport status is always 200.
/// Use this instead of ad-hoc `serde_json::json!` maps so every handler
/// serializes the same way.
#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    pub message: String,
    #[serde(flatten)]
    pub payload: Option<T>,
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(message: impl Into<String>, payload: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            payload: Some(payload),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            payload: None,
        }
    }

    pub fn map_payload<U: Serialize>(self, f: impl FnOnce(T) -> U) -> Envelope<U> {
        Envelope {
            success: self.success,
            message: self.message,
            payload: self.payload.map(f),
        }
    }
}

// -- Requests --

/// Parameters accepted by the write entry point. Everything is optional at
/// the transport layer; handlers enforce presence per action.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteParams {
    pub action: Option<String>,
    pub name: Option<String>,
    pub message: Option<String>,
    pub image_url: Option<String>,
    pub rotation: Option<String>,
    pub image_data: Option<String>,
    pub file_name: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct ReadParams {
    pub action: Option<String>,
}

// -- Responses --

#[derive(Debug, Serialize)]
pub struct MomentCreated {
    pub moment: Moment,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageStored {
    pub image_url: String,
    pub file_id: String,
}

#[derive(Debug, Serialize)]
pub struct MomentList {
    pub moments: Vec<MomentSummary>,
}

/// Either write-action payload; serializes transparently into the envelope.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum WritePayload {
    Moment(MomentCreated),
    Image(ImageStored),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_flattens_payload_fields() {
        let env = Envelope::ok(
            "Moments fetched successfully",
            MomentList { moments: vec![] },
        );
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["message"], "Moments fetched successfully");
        assert_eq!(json["moments"], serde_json::json!([]));
    }

    #[test]
    fn failure_envelope_carries_no_payload_fields() {
        let env = Envelope::<MomentList>::fail("Invalid action");
        let json = serde_json::to_value(&env).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 2);
        assert_eq!(json["success"], false);
    }

    #[test]
    fn image_payload_serializes_camel_case() {
        let env = Envelope::ok(
            "Image uploaded successfully",
            ImageStored {
                image_url: "http://host/thumbnail?id=abc&sz=w1000".into(),
                file_id: "abc".into(),
            },
        );
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["imageUrl"], "http://host/thumbnail?id=abc&sz=w1000");
        assert_eq!(json["fileId"], "abc");
    }

    #[test]
    fn write_params_accept_camel_case_keys() {
        let params: WriteParams = serde_json::from_str(
            r#"{"action":"addMoment","imageUrl":"http://x/y.jpg","fileName":"y.jpg"}"#,
        )
        .unwrap();
        assert_eq!(params.action.as_deref(), Some("addMoment"));
        assert_eq!(params.image_url.as_deref(), Some("http://x/y.jpg"));
        assert_eq!(params.file_name.as_deref(), Some("y.jpg"));
        assert!(params.name.is_none());
    }
}
