use axum::{
    Extension,
    body::Body,
    extract::{RawQuery, State},
    http::header,
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::db::RequestScope;
use crate::error::AppError;
use crate::router::AppState;
use crate::service::Identity;
use crate::types::ReportDate;

/// GET|POST / -> streamed report page for `?date=YYYYMMDD` (today, UTC, when absent or invalid).
pub async fn report(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Extension(scope): Extension<RequestScope>,
    RawQuery(query): RawQuery,
) -> Result<Response, AppError> {
    let date = ReportDate::from_query(query.as_deref());
    debug!(user = %identity.id, date = %date, "rendering report");

    // Connect before the 200 goes out so a refused connection is still a 500.
    drop(scope.acquire().await?);

    let body = Body::from_stream(state.renderer.render(date, scope));
    Ok(([(header::CONTENT_TYPE, "text/html; charset=utf-8")], body).into_response())
}
