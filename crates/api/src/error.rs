//! HTTP error mapping.
//!
//! Every failure leaves the handler as an [`ApiError`] and is rendered as a
//! JSON body with a single `detail` key:
//!
//! - malformed or non-object body → the extractor's own status (400, 415, 422)
//! - field validation failures → `422` with the list of field issues
//! - failures inside the prediction pipeline → `500`

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use bp_ml::predictor::PredictError;

use crate::validate::ValidationErrors;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The body could not be decoded as a JSON object.
    #[error("{detail}")]
    BadRequest { status: StatusCode, detail: String },
    /// The body decoded but one or more fields were rejected.
    #[error("Validation Error: {0}")]
    Validation(#[from] ValidationErrors),
    /// The request was valid but inference failed.
    #[error("Internal server error: {0}")]
    Internal(#[from] PredictError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest { status, .. } => *status,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest {
            status: rejection.status(),
            detail: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::Validation(errors) => json!({ "detail": errors.issues }),
            other => json!({ "detail": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::{validate, FieldIssue};
    use http_body_util::BodyExt;

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_validation_renders_issue_list() {
        let errors = validate(&serde_json::Map::new()).unwrap_err();
        let n = errors.issues.len();
        let resp = ApiError::from(errors).into_response();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let json = body_json(resp).await;
        let detail = json["detail"].as_array().unwrap();
        assert_eq!(detail.len(), n);
        assert_eq!(detail[0]["type"], "missing");
        assert_eq!(detail[0]["loc"][0], "body");
    }

    #[tokio::test]
    async fn test_internal_renders_message() {
        let err = ApiError::from(PredictError::UnknownField("Foo".to_string()));
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let json = body_json(resp).await;
        let detail = json["detail"].as_str().unwrap();
        assert!(detail.starts_with("Internal server error:"), "{detail}");
        assert!(detail.contains("Foo"), "{detail}");
    }

    #[test]
    fn test_validation_display() {
        let err = ApiError::Validation(ValidationErrors {
            issues: vec![FieldIssue {
                loc: vec!["body".into(), "Debt_ratio_pct".into()],
                msg: "Input should be less than or equal to 0".into(),
                kind: "less_than_equal",
            }],
        });
        assert_eq!(
            err.to_string(),
            "Validation Error: 1 validation error(s); Debt_ratio_pct: Input should be less than or equal to 0"
        );
    }
}
