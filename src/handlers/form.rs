//! Prediction form handlers

use axum::{
    extract::{rejection::FormRejection, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Form,
};

use crate::models::PredictionRequest;
use crate::submission::{self, RecordStatus, Submission};
use crate::views::{self, Notice};
use crate::AppState;

/// Render the empty form
pub async fn index() -> Html<String> {
    Html(views::page(None, &[]))
}

/// Handle a form submission and render the result below the form
pub async fn submit(
    State(state): State<AppState>,
    form: Result<Form<PredictionRequest>, FormRejection>,
) -> Response {
    let request = match form {
        Ok(Form(request)) => request,
        Err(rejection) => {
            tracing::warn!("Rejected form submission: {}", rejection.body_text());
            let notice = Notice::Error(format!("Error: {}", rejection.body_text()));
            return (StatusCode::BAD_REQUEST, Html(views::page(None, &[notice]))).into_response();
        }
    };

    if let Err(msg) = request.check() {
        tracing::warn!("Form values out of bounds: {}", msg);
        let notice = Notice::Error(format!("Error: {}", msg));
        return (StatusCode::BAD_REQUEST, Html(views::page(Some(&request), &[notice]))).into_response();
    }

    let result = submission::submit(&state, request.clone()).await;

    let mut notices = Vec::with_capacity(2);
    match &result {
        Submission::Succeeded { record, .. } => {
            notices.push(Notice::Success(result.message()));
            if let RecordStatus::NotLogged { reason } = record {
                notices.push(Notice::Warning(format!("Prediction was not recorded: {}", reason)));
            }
        }
        Submission::Failed(_) => notices.push(Notice::Error(result.message())),
    }

    Html(views::page(Some(&request), &notices)).into_response()
}
