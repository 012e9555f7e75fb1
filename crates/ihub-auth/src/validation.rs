//! Client for the validation service.
//!
//! Before an approval record is written the intercepted request is replayed
//! against the module's validation resource, which describes the resource
//! being touched and the caller's identity. The service answers with
//!
//! ```json
//! {"code": 0, "data": {"resource_info": {}, "userid": 1, "user_role": 0,
//!  "groupid": 2, "type": "charge", "username": "ann", "groupname": "ops",
//!  "nsid": "ns-1"}}
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::Method;
use serde_json::{json, Value};

use crate::error::{AuthError, Result};
use crate::fields;

/// A request to replay against the validation service.
#[derive(Debug, Clone)]
pub struct ValidationRequest {
    /// Validation resource URL.
    pub url: String,
    /// Method of the intercepted request.
    pub method: Method,
    /// Headers of the intercepted request, already stripped of hop-by-hop headers.
    pub headers: HeaderMap,
    /// Body of the intercepted request.
    pub body: Vec<u8>,
}

/// A successful validation answer.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationGrant {
    /// Description of the touched resource.
    pub resource_info: Value,
    /// Requesting user.
    pub user_id: i64,
    /// Requesting user's role.
    pub user_role: i64,
    /// Requesting user's group.
    pub group_id: i64,
    /// Approval type.
    pub approve_type: String,
    /// Requesting user's name.
    pub user_name: String,
    /// Requesting user's group name.
    pub group_name: String,
    /// Namespace id.
    pub nsid: String,
    /// The full response body.
    pub detail: Value,
}

impl ValidationGrant {
    /// Interpret a validation service response body.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Rejected` if `code` is not zero and
    /// `AuthError::MissingField` if `data` or any of its fields is absent.
    pub fn from_response(detail: Value) -> Result<Self> {
        let obj = detail
            .as_object()
            .ok_or_else(|| AuthError::InvalidResponse("expected a JSON object".to_string()))?;

        let code = fields::int(obj, "code").ok_or(AuthError::MissingField("code"))?;
        if code != 0 {
            return Err(AuthError::Rejected {
                code,
                message: fields::text(obj, "message").unwrap_or_default(),
            });
        }

        let data = obj
            .get("data")
            .and_then(Value::as_object)
            .ok_or(AuthError::MissingField("data"))?;

        let resource_info = data
            .get("resource_info")
            .filter(|v| !v.is_null())
            .cloned()
            .ok_or(AuthError::MissingField("resource_info"))?;
        let user_id = fields::int(data, "userid").ok_or(AuthError::MissingField("userid"))?;
        let user_role =
            fields::int(data, "user_role").ok_or(AuthError::MissingField("user_role"))?;
        let group_id = fields::int(data, "groupid").ok_or(AuthError::MissingField("groupid"))?;
        let approve_type = fields::text(data, "type").ok_or(AuthError::MissingField("type"))?;
        let user_name =
            fields::text(data, "username").ok_or(AuthError::MissingField("username"))?;
        let group_name =
            fields::text(data, "groupname").ok_or(AuthError::MissingField("groupname"))?;
        let nsid = fields::text(data, "nsid").ok_or(AuthError::MissingField("nsid"))?;

        Ok(Self {
            resource_info,
            user_id,
            user_role,
            group_id,
            approve_type,
            user_name,
            group_name,
            nsid,
            detail,
        })
    }

    /// The caller identity carried with the eventual replay of the request.
    #[must_use]
    pub fn user_info(&self) -> Value {
        json!({
            "user_info": {
                "user_id": self.user_id,
                "nsid": self.nsid,
                "groupid": self.group_id,
                "username": self.user_name,
                "groupname": self.group_name,
                "user_role": self.user_role,
            }
        })
    }
}

/// Trait for validation service communication.
///
/// This trait abstracts the validation client interface, allowing for
/// mock implementations in tests.
#[async_trait]
pub trait ValidationClient: Send + Sync {
    /// Replay `request` against the validation service.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Unavailable` if the service cannot be reached,
    /// `AuthError::InvalidResponse` if it does not answer with JSON, and the
    /// errors of [`ValidationGrant::from_response`] otherwise.
    async fn validate(&self, request: ValidationRequest) -> Result<ValidationGrant>;
}

/// HTTP client for the validation service.
#[derive(Debug, Clone)]
pub struct HttpValidationClient {
    client: reqwest::Client,
}

impl HttpValidationClient {
    /// Create a new validation client.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))
            .build()
            .expect("Failed to create HTTP client");

        Self { client }
    }

    /// Create a new validation client with a custom reqwest client.
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ValidationClient for HttpValidationClient {
    async fn validate(&self, request: ValidationRequest) -> Result<ValidationGrant> {
        let ValidationRequest {
            url,
            method,
            headers,
            body,
        } = request;

        let response = self
            .client
            .request(method, &url)
            .headers(headers)
            .body(body)
            .send()
            .await
            .map_err(|e| AuthError::Unavailable(format!("validation request failed: {e}")))?;

        let status = response.status();
        let detail: Value = response.json().await.map_err(|e| {
            AuthError::InvalidResponse(format!("validation service returned {status}: {e}"))
        })?;

        let grant = ValidationGrant::from_response(detail);
        match &grant {
            Ok(g) => tracing::debug!(url = %url, user_id = g.user_id, "Validation granted"),
            Err(e) => tracing::warn!(
                url = %url,
                status = %status,
                retriable = e.is_retriable(),
                error = %e,
                "Validation failed"
            ),
        }
        grant
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;
    use wiremock::matchers::{body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn grant_body() -> Value {
        json!({
            "code": 0,
            "data": {
                "resource_info": {"account": "acme", "amount": 10},
                "userid": 1,
                "user_role": "0",
                "groupid": "2",
                "type": "charge",
                "username": "ann",
                "groupname": "ops",
                "nsid": "ns-1"
            }
        })
    }

    fn request(url: String) -> ValidationRequest {
        let mut headers = HeaderMap::new();
        headers.insert("x-user", HeaderValue::from_static("ann"));
        ValidationRequest {
            url,
            method: Method::POST,
            headers,
            body: br#"{"amount":10}"#.to_vec(),
        }
    }

    #[test]
    fn parses_numbers_and_numeric_strings() {
        let grant = ValidationGrant::from_response(grant_body()).unwrap();
        assert_eq!(grant.user_id, 1);
        assert_eq!(grant.user_role, 0);
        assert_eq!(grant.group_id, 2);
        assert_eq!(grant.approve_type, "charge");
        assert_eq!(grant.resource_info, json!({"account": "acme", "amount": 10}));
        assert_eq!(grant.detail, grant_body());
    }

    #[test]
    fn user_info_shape() {
        let grant = ValidationGrant::from_response(grant_body()).unwrap();
        assert_eq!(
            grant.user_info(),
            json!({"user_info": {
                "user_id": 1, "nsid": "ns-1", "groupid": 2,
                "username": "ann", "groupname": "ops", "user_role": 0
            }})
        );
    }

    #[test]
    fn non_zero_code_is_rejected() {
        let err = ValidationGrant::from_response(json!({"code": 3, "message": "denied"}))
            .unwrap_err();
        assert!(matches!(err, AuthError::Rejected { code: 3, .. }));
    }

    #[test]
    fn missing_fields_are_reported() {
        let err = ValidationGrant::from_response(json!({"code": 0})).unwrap_err();
        assert!(matches!(err, AuthError::MissingField("data")));

        let mut body = grant_body();
        body["data"].as_object_mut().unwrap().remove("nsid");
        let err = ValidationGrant::from_response(body).unwrap_err();
        assert!(matches!(err, AuthError::MissingField("nsid")));

        let mut body = grant_body();
        body["data"]["resource_info"] = Value::Null;
        let err = ValidationGrant::from_response(body).unwrap_err();
        assert!(matches!(err, AuthError::MissingField("resource_info")));
    }

    #[tokio::test]
    async fn replays_method_headers_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/vali_billing_charge"))
            .and(header("x-user", "ann"))
            .and(body_string(r#"{"amount":10}"#))
            .respond_with(ResponseTemplate::new(200).set_body_json(grant_body()))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpValidationClient::new(Duration::from_secs(5));
        let grant = client
            .validate(request(format!("{}/vali_billing_charge", server.uri())))
            .await
            .unwrap();

        assert_eq!(grant.user_name, "ann");
    }

    #[tokio::test]
    async fn non_json_answer_is_invalid() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = HttpValidationClient::new(Duration::from_secs(5));
        let err = client
            .validate(request(format!("{}/vali_billing_charge", server.uri())))
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn unreachable_service_is_unavailable() {
        let client = HttpValidationClient::new(Duration::from_secs(5));
        let err = client
            .validate(request("http://127.0.0.1:1/vali_billing_charge".to_string()))
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::Unavailable(_)));
        assert!(err.is_retriable());
    }
}
