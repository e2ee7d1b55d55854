use crate::bundle::ModelBundle;
use crate::error::PredictError;
use crate::FEATURE_COUNT;
use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::Html,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

// ---------- Request/Response types ----------

/// Form field names, in model input order. The JSON variant sends the same
/// values positionally in `data[0]`.
pub const FORM_FIELDS: [&str; FEATURE_COUNT] = [
    "pregnancies",
    "glucose",
    "bloodPressure",
    "skinThickness",
    "insulin",
    "bmi",
    "diabetesPedigree",
    "age",
];

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub prediction: u8,
    pub probability: f64,
    pub status: &'static str,
}

// ---------- Server state ----------

#[derive(Clone)]
pub struct AppState {
    pub bundle: Arc<ModelBundle>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/health", get(health))
        .route("/predict", post(predict))
        .with_state(state)
}

// ---------- Request parsing ----------

/// Pull an 8-feature vector out of a request body. JSON
/// (`{"data":[[f1..f8]]}`) is canonical; form-encoded named fields are
/// accepted for compatibility with the older HTML form client.
///
/// Validation order: body shape, then feature count, then per-value
/// numeric parse. The classifier is never touched on failure.
pub fn parse_features(
    content_type: Option<&str>,
    body: &str,
) -> Result<[f64; FEATURE_COUNT], PredictError> {
    let is_form = content_type
        .map(|c| c.starts_with("application/x-www-form-urlencoded"))
        .unwrap_or(false);
    if is_form {
        parse_form(body)
    } else {
        parse_json(body)
    }
}

fn parse_json(body: &str) -> Result<[f64; FEATURE_COUNT], PredictError> {
    let value: Value = serde_json::from_str(body).map_err(|_| PredictError::invalid_format())?;
    let rows = value
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(PredictError::invalid_format)?;
    let row = rows
        .first()
        .and_then(Value::as_array)
        .ok_or_else(PredictError::invalid_format)?;

    if row.len() != FEATURE_COUNT {
        return Err(PredictError::InvalidFeatureCount(row.len()));
    }

    let mut features = [0.0; FEATURE_COUNT];
    for (slot, v) in features.iter_mut().zip(row) {
        *slot = json_number(v)?;
    }
    Ok(features)
}

fn parse_form(body: &str) -> Result<[f64; FEATURE_COUNT], PredictError> {
    let fields: HashMap<String, String> = serde_urlencoded::from_str(body)
        .map_err(|_| PredictError::invalid_format())?;

    let mut features = [0.0; FEATURE_COUNT];
    for (slot, name) in features.iter_mut().zip(FORM_FIELDS) {
        let raw = fields.get(name).ok_or_else(|| {
            PredictError::InvalidFormat(format!("Missing form field '{name}'."))
        })?;
        *slot = numeric_token(raw)?;
    }
    Ok(features)
}

/// JSON numbers and numeric strings are both accepted; anything else (or a
/// non-finite value) is an invalid feature value.
fn json_number(v: &Value) -> Result<f64, PredictError> {
    let parsed = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(x) if x.is_finite() => Ok(x),
        _ => Err(PredictError::InvalidFeatureValue(format!(
            "could not convert {v} to a number"
        ))),
    }
}

fn numeric_token(raw: &str) -> Result<f64, PredictError> {
    match raw.trim().parse::<f64>() {
        Ok(x) if x.is_finite() => Ok(x),
        _ => Err(PredictError::InvalidFeatureValue(format!(
            "could not convert '{raw}' to a number"
        ))),
    }
}

// ---------- Handlers ----------

async fn predict(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<PredictResponse>, PredictError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    let features = parse_features(content_type, &body)?;

    let prediction = state.bundle.predict(&features)?;
    Ok(Json(PredictResponse {
        prediction: prediction.label,
        probability: prediction.probability,
        status: "success",
    }))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

async fn home() -> Html<&'static str> {
    Html(LANDING_PAGE)
}

const LANDING_PAGE: &str = r#"<!doctype html>
<html>
<head><title>Diabetes Risk Predictor</title></head>
<body>
<h1>Diabetes Risk Predictor</h1>
<p>POST JSON to <code>/predict</code>:</p>
<pre>{"data": [[6, 148, 72, 35, 0, 33.6, 0.627, 50]]}</pre>
<p>Liveness: <a href="/health">/health</a></p>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn health_is_static() {
        // Health has no state to leak: ten calls, same body every time.
        for _ in 0..10 {
            let Json(v) = health().await;
            assert_eq!(v, json!({ "status": "healthy" }));
        }
    }

    #[test]
    fn json_body_parses_in_order() {
        let body = r#"{"data":[[6,148,72,35,0,33.6,0.627,50]]}"#;
        let f = parse_features(Some("application/json"), body).unwrap();
        assert_eq!(f[0], 6.0);
        assert_eq!(f[5], 33.6);
        assert_eq!(f[7], 50.0);
    }

    #[test]
    fn numeric_strings_are_accepted() {
        let body = r#"{"data":[["6","148",72,35,0,"33.6",0.627,50]]}"#;
        let f = parse_features(None, body).unwrap();
        assert_eq!(f[1], 148.0);
        assert_eq!(f[5], 33.6);
    }

    #[test]
    fn missing_data_field_is_invalid_format() {
        for body in ["", "not json", "{}", r#"{"features":[1,2,3]}"#, r#"{"data":[]}"#] {
            let err = parse_features(None, body).unwrap_err();
            assert!(
                matches!(err, PredictError::InvalidFormat(_)),
                "body {body:?} should be InvalidFormat, got {err:?}"
            );
        }
    }

    #[test]
    fn wrong_feature_count_is_rejected_before_values() {
        // Count is checked before values: a short row of garbage reports
        // the count problem, not the value problem.
        let body = r#"{"data":[["x","y","z"]]}"#;
        let err = parse_features(None, body).unwrap_err();
        assert!(matches!(err, PredictError::InvalidFeatureCount(3)), "{err:?}");
        assert!(err.to_string().contains('8'));
    }

    #[test]
    fn non_numeric_token_is_invalid_value() {
        let body = r#"{"data":[[6,148,"abc",35,0,33.6,0.627,50]]}"#;
        let err = parse_features(None, body).unwrap_err();
        assert!(matches!(err, PredictError::InvalidFeatureValue(_)), "{err:?}");
    }

    #[test]
    fn non_finite_values_are_rejected() {
        let body = r#"{"data":[[6,148,"NaN",35,0,33.6,0.627,50]]}"#;
        assert!(matches!(
            parse_features(None, body),
            Err(PredictError::InvalidFeatureValue(_))
        ));
        let body = r#"{"data":[[6,148,"inf",35,0,33.6,0.627,50]]}"#;
        assert!(matches!(
            parse_features(None, body),
            Err(PredictError::InvalidFeatureValue(_))
        ));
    }

    #[test]
    fn form_body_parses_named_fields() {
        let body = "pregnancies=6&glucose=148&bloodPressure=72&skinThickness=35\
                    &insulin=0&bmi=33.6&diabetesPedigree=0.627&age=50";
        let f = parse_features(Some("application/x-www-form-urlencoded"), body).unwrap();
        assert_eq!(f, [6.0, 148.0, 72.0, 35.0, 0.0, 33.6, 0.627, 50.0]);
    }

    #[test]
    fn form_missing_field_is_invalid_format() {
        let body = "pregnancies=6&glucose=148";
        let err = parse_features(Some("application/x-www-form-urlencoded"), body).unwrap_err();
        assert!(matches!(err, PredictError::InvalidFormat(_)), "{err:?}");
    }

    #[test]
    fn form_non_numeric_field_is_invalid_value() {
        let body = "pregnancies=6&glucose=abc&bloodPressure=72&skinThickness=35\
                    &insulin=0&bmi=33.6&diabetesPedigree=0.627&age=50";
        let err = parse_features(Some("application/x-www-form-urlencoded"), body).unwrap_err();
        assert!(matches!(err, PredictError::InvalidFeatureValue(_)), "{err:?}");
    }
}
