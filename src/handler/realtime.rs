use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::Query,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    routing::get,
    Extension, Router,
};
use futures::stream::{self, Stream};

use crate::{
    db::store::DeskStore,
    error::HttpError,
    middleware::JWTAuthMiddeware,
    models::profilemodel::Profile,
    service::{
        lifecycle,
        realtime::{ChangeEvent, FeedMessage, Subscription, SubscriptionFilter},
    },
    AppState,
};

pub fn realtime_handler() -> Router {
    Router::new().route("/", get(subscribe))
}

async fn visible_to(store: &Arc<dyn DeskStore>, viewer: &Profile, event: &ChangeEvent) -> bool {
    if viewer.role.is_it_team() {
        return true;
    }
    match store.get_ticket(event.ticket_id).await {
        Ok(Some(ticket)) => lifecycle::can_view(&ticket, viewer),
        Ok(None) => false,
        Err(e) => {
            tracing::warn!("Realtime visibility check failed: {}", e);
            false
        }
    }
}

/// Next message the viewer is allowed to see. Changes to tickets outside
/// their reach are skipped; lag notices always pass.
async fn next_visible(
    subscription: &mut Subscription,
    store: &Arc<dyn DeskStore>,
    viewer: &Profile,
) -> Option<FeedMessage> {
    loop {
        let message = subscription.recv().await?;
        if let FeedMessage::Change(change) = &message {
            if !visible_to(store, viewer, change).await {
                continue;
            }
        }
        return Some(message);
    }
}

fn change_stream(
    subscription: Subscription,
    store: Arc<dyn DeskStore>,
    viewer: Profile,
) -> impl Stream<Item = Result<Event, Infallible>> {
    stream::unfold(
        (subscription, store, viewer),
        |(mut subscription, store, viewer)| async move {
            let event = match next_visible(&mut subscription, &store, &viewer).await? {
                FeedMessage::Change(change) => Event::default()
                    .event("change")
                    .json_data(&change)
                    .unwrap_or_else(|_| Event::default().event("refetch")),
                FeedMessage::Lagged(skipped) => {
                    Event::default().event("refetch").data(skipped.to_string())
                }
            };
            Some((Ok(event), (subscription, store, viewer)))
        },
    )
}

/// Server-sent change events. The subscription is released when the client
/// disconnects and the stream is dropped.
pub async fn subscribe(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Query(filter): Query<SubscriptionFilter>,
) -> Result<impl IntoResponse, HttpError> {
    if let Some(ticket_id) = filter.ticket_id {
        let ticket = app_state
            .store
            .get_ticket(ticket_id)
            .await
            .map_err(|e| HttpError::server_error(e.to_string()))?
            .ok_or_else(|| HttpError::not_found("Ticket not found"))?;
        if !lifecycle::can_view(&ticket, &auth.profile) {
            return Err(HttpError::forbidden(
                "You do not have access to this ticket's updates",
            ));
        }
    }

    let subscription = app_state.change_feed.subscribe(filter);
    let stream = change_stream(subscription, app_state.store.clone(), auth.profile);

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
