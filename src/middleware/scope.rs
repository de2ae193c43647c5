use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use futures::{
    future,
    stream::{self, StreamExt},
};
use tracing::{Instrument, info_span};

use crate::db::RequestScope;
use crate::router::AppState;

/// Gives every request its own connection slot and ties the slot's release to the response body.
///
/// The release runs after the last body frame. If the body is dropped early (client disconnect,
/// body error) the scope's drop closes the connection instead.
pub async fn request_scope(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let span = info_span!("request", method = %req.method(), path = %req.uri().path());
    let scope = RequestScope::new(state.connector.clone());
    req.extensions_mut().insert(scope.clone());

    let response = next.run(req).instrument(span.clone()).await;

    let (parts, body) = response.into_parts();
    let release = stream::once(async move { scope.release().await }.instrument(span))
        .filter_map(|()| future::ready(None::<Result<Bytes, axum::Error>>));

    Response::from_parts(parts, Body::from_stream(body.into_data_stream().chain(release)))
}
