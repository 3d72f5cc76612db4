//! Server construction and middleware wiring.

mod config;
mod settings;

pub use config::ServerConfig;
pub use settings::ServerSettings;

use std::sync::Arc;

use actix_session::{
    SessionMiddleware,
    config::{CookieContentSecurity, PersistentSession},
    storage::CookieSessionStore,
};
use actix_web::cookie::{Key, SameSite};
use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};

use tripboard::domain::TripFeed;
use tripboard::inbound::http::health::{HealthState, live, ready};
use tripboard::inbound::ws;
use tripboard::inbound::ws::state::WsState;

#[derive(Clone)]
struct AppDependencies {
    health_state: web::Data<HealthState>,
    ws_state: web::Data<WsState>,
    key: Key,
    cookie_secure: bool,
    same_site: SameSite,
}

fn build_app(
    deps: AppDependencies,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let AppDependencies {
        health_state,
        ws_state,
        key,
        cookie_secure,
        same_site,
    } = deps;

    let session = SessionMiddleware::builder(CookieSessionStore::default(), key)
        .cookie_name("session".into())
        .cookie_path("/".into())
        .cookie_secure(cookie_secure)
        .cookie_http_only(true)
        .cookie_content_security(CookieContentSecurity::Private)
        .cookie_same_site(same_site)
        .session_lifecycle(
            PersistentSession::default().session_ttl(actix_web::cookie::time::Duration::hours(2)),
        )
        .build();

    App::new()
        .app_data(health_state)
        .app_data(ws_state)
        .wrap(session)
        .service(ws::trip_feed_entry)
        .service(ready)
        .service(live)
}

/// Construct an Actix HTTP server from `config`.
///
/// The readiness probe flips once the listener is bound.
///
/// # Errors
/// Propagates [`std::io::Error`] when binding the socket fails.
pub fn create_server(
    health_state: web::Data<HealthState>,
    config: ServerConfig,
) -> std::io::Result<Server> {
    let ServerConfig {
        key,
        cookie_secure,
        same_site,
        bind_addr,
        origins,
        store,
    } = config;
    let ws_state = web::Data::new(WsState::new(TripFeed::new(Arc::new(store)), origins));
    let server_health_state = health_state.clone();

    let server = HttpServer::new(move || {
        build_app(AppDependencies {
            health_state: server_health_state.clone(),
            ws_state: ws_state.clone(),
            key: key.clone(),
            cookie_secure,
            same_site,
        })
    })
    .bind(bind_addr)?
    .run();

    health_state.mark_ready();
    Ok(server)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::test;
    use tripboard::inbound::ws::origins::AllowedOrigins;

    fn deps() -> AppDependencies {
        let health = web::Data::new(HealthState::new());
        health.mark_ready();
        let origins: AllowedOrigins = "http://localhost:3000".parse().expect("allow-list");
        AppDependencies {
            health_state: health,
            ws_state: web::Data::new(WsState::new(
                TripFeed::new(Arc::new(
                    tripboard::outbound::memory::InMemoryTripStore::default(),
                )),
                origins,
            )),
            key: Key::generate(),
            cookie_secure: false,
            same_site: SameSite::Lax,
        }
    }

    #[actix_web::test]
    async fn probes_are_mounted() {
        let app = test::init_service(build_app(deps())).await;
        for uri in ["/health/live", "/health/ready"] {
            let res = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
            assert_eq!(res.status(), StatusCode::OK, "{uri}");
        }
    }

    #[actix_web::test]
    async fn feed_upgrade_requires_an_allowed_origin() {
        let app = test::init_service(build_app(deps())).await;
        let req = test::TestRequest::get()
            .uri("/ws/trips/porto")
            .insert_header(("Origin", "https://elsewhere.example"))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }
}
