use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Extension, Path, Query, rejection::QueryRejection},
    http::{HeaderMap, Method},
    response::Response,
};

use tracing::Instrument;

use campus_core::Failure;
use campus_dispatch::{ApiHandler, Verb};

use crate::app::{dto, errors};

/// Any method on `/api/:module_name/:fn_name`.
pub async fn call(
    Extension(api): Extension<Arc<ApiHandler>>,
    Path((module, capability)): Path<(String, String)>,
    method: Method,
    query: Result<Query<HashMap<String, String>>, QueryRejection>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Ok(verb) = method.as_str().parse::<Verb>() else {
        tracing::debug!(%method, "unsupported method");
        return errors::failure(Failure::not_found("not found"));
    };
    let query = match query {
        Ok(Query(query)) => query,
        Err(rejection) => return errors::failure(Failure::bad_request(rejection.body_text())),
    };
    let body = match dto::parse_body(&body) {
        Ok(body) => body,
        Err(failure) => return errors::failure(failure),
    };

    let span = tracing::info_span!("call", module = %module, capability = %capability, verb = verb.as_str());
    let inbound = dto::inbound_call(module, capability, verb, body, query, &headers);
    let response = api.dispatch(inbound).instrument(span.clone()).await;
    span.in_scope(|| tracing::info!(status = response.status, ok = response.envelope.ok, "call completed"));
    errors::envelope(response)
}
