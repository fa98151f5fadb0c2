//! Public contact form. The relay to the site inbox is best-effort: the
//! response does not wait on, and cannot be failed by, mail delivery.

use axum::extract::State;
use axum::response::{IntoResponse, Json};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::error::ApiError;
use crate::extract::FormBody;

/// POST /api/v1/contact
pub async fn submit(
    State(state): State<AppState>,
    FormBody(body): FormBody,
) -> Result<impl IntoResponse, ApiError> {
    let field = |name: &str| -> Result<&str, ApiError> {
        body.get(name)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ApiError::bad_request(format!("{} is required", name)))
    };

    let name = field("name")?;
    let email = field("email")?;
    let number = field("number")?;
    let message = field("message")?;

    state.notifier.send_contact(name, email, number, message);

    Ok(Json(json!({
        "message": "Your message has been sent successfully"
    })))
}
