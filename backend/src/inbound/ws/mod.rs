//! WebSocket inbound adapter streaming live trip views to clients.
//!
//! Responsibilities:
//! - validate upgrade requests against the origin allow-list
//! - read the caller identity from the cookie session
//! - start one trip feed per connection and stop it when the socket goes

use std::sync::Arc;

use actix_web::web::{self, Payload};
use actix_web::{
    HttpRequest, HttpResponse, get,
    http::header::{HeaderValue, ORIGIN},
};
use tracing::{error, info, warn};
use url::Url;

use crate::inbound::http::session::SessionContext;

mod session;

pub mod messages;
pub mod origins;
pub mod sink;
pub mod state;

use origins::AllowedOrigins;
use sink::ChannelSink;

/// Upgrade to a socket following the trip with slug `slug`.
///
/// The upgrade succeeds for any allowed origin; resolution failures such as
/// an unknown slug or a missing sign-in arrive as `error` frames followed by
/// a normal close.
#[get("/ws/trips/{slug}")]
pub async fn trip_feed_entry(
    state: web::Data<state::WsState>,
    session: SessionContext,
    slug: web::Path<String>,
    req: HttpRequest,
    stream: Payload,
) -> actix_web::Result<HttpResponse> {
    let mut origin_iter = req.headers().get_all(ORIGIN);
    let origin_header = origin_iter.next().ok_or_else(|| {
        error!("Missing Origin header on WebSocket upgrade");
        actix_web::error::ErrorForbidden("Origin not allowed")
    })?;
    if origin_iter.next().is_some() {
        error!("Multiple Origin headers on WebSocket upgrade");
        return Err(actix_web::error::ErrorBadRequest("Invalid Origin header"));
    }

    validate_origin(&state.origins, origin_header)?;

    let caller = session.user_id().map_err(|err| {
        error!(error = %err, "Failed to read caller from session");
        actix_web::error::ErrorInternalServerError("Session unavailable")
    })?;

    let (response, ws_session, messages) = actix_ws::handle(&req, stream).map_err(|error| {
        error!(error = %error, "WebSocket upgrade failed");
        actix_web::error::ErrorInternalServerError("WebSocket upgrade failed")
    })?;

    let slug = slug.into_inner();
    info!(slug = %slug, signed_in = caller.is_some(), "trip feed socket opened");
    let (sink, frames) = ChannelSink::channel();
    let feed = state.feed.start(&slug, caller, Arc::new(sink));
    actix_web::rt::spawn(session::handle_feed_session(
        feed, frames, ws_session, messages,
    ));
    Ok(response)
}

fn validate_origin(origins: &AllowedOrigins, origin_header: &HeaderValue) -> actix_web::Result<()> {
    let origin_value = match origin_header.to_str() {
        Ok(value) => value,
        Err(error) => {
            error!(error = %error, "Failed to parse Origin header as string");
            return Err(actix_web::error::ErrorBadRequest("Invalid Origin header"));
        }
    };

    let origin = Url::parse(origin_value).map_err(|error| {
        error!(error = %error, "Failed to parse Origin header as URL");
        actix_web::error::ErrorBadRequest("Invalid Origin header")
    })?;

    if origins.allows(&origin) {
        Ok(())
    } else {
        warn!(
            origin = origin_value,
            "Rejected WS upgrade due to disallowed Origin"
        );
        Err(actix_web::error::ErrorForbidden("Origin not allowed"))
    }
}
