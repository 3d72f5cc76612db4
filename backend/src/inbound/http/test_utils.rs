//! Test helpers standing in for the external auth service's cookie session.

use actix_session::{Session, SessionMiddleware, storage::CookieSessionStore};
use actix_web::cookie::Key;
use actix_web::{HttpResponse, web};

use super::session::USER_ID_KEY;

/// Session middleware with the server's cookie name over plain HTTP.
///
/// Pass one `key` to every worker of a multi-worker server so each of them
/// can read cookies issued by the others.
pub fn test_session_middleware(key: Key) -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), key)
        .cookie_name("session".to_owned())
        .cookie_secure(false)
        .build()
}

/// Handler for `/sign-in/{id}`: records `id` as the caller identity.
pub async fn sign_in(session: Session, id: web::Path<String>) -> HttpResponse {
    session
        .insert(USER_ID_KEY, id.into_inner())
        .expect("store user id");
    HttpResponse::Ok().finish()
}
