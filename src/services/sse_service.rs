use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};

use crate::{
    dto::sse::{AuthStateEvent, ServerEvent},
    services::auth_service,
    state::{AuthSubscription, SessionId, SharedState},
};

/// Subscribe to auth changes of `session`.
pub fn subscribe_auth(state: &SharedState, session: SessionId) -> AuthSubscription {
    state.auth_events().subscribe(session)
}

/// Auth state sent as the first event of a new stream.
pub async fn current_auth_state(state: &SharedState, session: SessionId) -> AuthStateEvent {
    AuthStateEvent {
        logged_in: auth_service::is_logged_in(state, session).await,
    }
}

/// Convert a subscription into an SSE response, sending `initial` first and
/// releasing the subscription once the client disconnects.
pub fn to_sse_stream(
    mut subscription: AuthSubscription,
    initial: AuthStateEvent,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    tokio::spawn(async move {
        let session = subscription.session();
        if forward(&tx, initial).await {
            loop {
                tokio::select! {
                    _ = tx.closed() => break,
                    change = subscription.recv() => match change {
                        Some(change) => {
                            if !forward(&tx, change.into()).await {
                                break;
                            }
                        }
                        None => break,
                    }
                }
            }
        }

        drop(subscription);
        info!(session = %session, "auth event stream disconnected");
    });

    // response stream reads from mpsc; when client disconnects axum drops this stream
    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Push one auth state to the client; false once the client is gone.
async fn forward(tx: &mpsc::Sender<Result<Event, Infallible>>, state: AuthStateEvent) -> bool {
    let payload: ServerEvent = match state.to_server_event() {
        Ok(payload) => payload,
        Err(err) => {
            warn!(error = %err, "failed to encode auth event");
            return true;
        }
    };

    let mut event = Event::default().data(payload.data);
    if let Some(name) = payload.event {
        event = event.event(name);
    }
    tx.send(Ok(event)).await.is_ok()
}
