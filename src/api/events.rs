use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::{Stream, StreamExt};
use serde::Deserialize;

use crate::error::ApiError;
use crate::notify::{ChangeBroadcaster, WATCHED_TABLES};

#[derive(Deserialize)]
pub struct SubscribeParams {
    /// `insert`, `update`, `delete`, or `*` (default).
    pub event: Option<String>,
}

/// Streams row-change notifications for one table, so clients can refetch
/// instead of polling. Mirrors the store's subscribe-to-changes primitive:
/// keyed by table name, optionally narrowed to one event type.
pub async fn subscribe(
    Extension(broadcaster): Extension<Arc<ChangeBroadcaster>>,
    Path(table): Path<String>,
    Query(params): Query<SubscribeParams>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    if !WATCHED_TABLES.contains(&table.as_str()) {
        return Err(ApiError::Validation(format!(
            "unknown table '{table}', expected one of {WATCHED_TABLES:?}"
        )));
    }

    let wanted = params.event.unwrap_or_else(|| "*".to_string());
    if !matches!(wanted.as_str(), "*" | "insert" | "update" | "delete") {
        return Err(ApiError::Validation(format!(
            "unknown event type '{wanted}'"
        )));
    }

    let changes = broadcaster.subscribe(&table).await?;
    let stream = changes.filter_map(move |message| {
        let wanted = wanted.clone();
        async move {
            if wanted != "*" && message.event.as_str() != wanted {
                return None;
            }
            let event = Event::default()
                .event(message.event.as_str())
                .json_data(&message)
                .ok()?;
            Some(Ok::<_, Infallible>(event))
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
