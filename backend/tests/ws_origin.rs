//! Behavioural tests for trip feed upgrade origin validation.

use std::sync::Arc;

use actix_web::http::header::HeaderValue;
use actix_web::{
    App,
    http::{StatusCode, header},
    test::{self, TestRequest},
    web,
};
use rstest::{fixture, rstest};
use tripboard::domain::TripFeed;
use tripboard::inbound::ws;
use tripboard::inbound::ws::state::WsState;
use tripboard::outbound::memory::InMemoryTripStore;

// Example Sec-WebSocket-Key from RFC 6455 section 1.3 used to satisfy handshake requirements.
const RFC6455_SAMPLE_KEY: &str = "dGhlIHNhbXBsZSBub25jZQ==";

#[fixture]
fn ws_state() -> WsState {
    WsState::new(
        TripFeed::new(Arc::new(InMemoryTripStore::default())),
        "http://localhost:3000, https://trips.example"
            .parse()
            .expect("valid allow-list"),
    )
}

fn handshake_request() -> TestRequest {
    TestRequest::get()
        .uri("/ws/trips/porto-spring")
        .insert_header((header::UPGRADE, "websocket"))
        .insert_header((header::CONNECTION, "Upgrade"))
        .insert_header((header::SEC_WEBSOCKET_VERSION, "13"))
        .insert_header((header::SEC_WEBSOCKET_KEY, RFC6455_SAMPLE_KEY))
}

#[derive(Debug, Clone, Copy)]
/// Origin header shapes that must not upgrade.
enum OriginHeaderCase {
    /// No Origin header present.
    Missing,
    /// Origin not in the allow-list.
    Unlisted,
    /// Multiple Origin headers (forbidden by RFC 6455).
    Multiple,
    /// Malformed Origin header (invalid UTF-8).
    Malformed,
    /// Allowed host on a different port.
    OtherPort,
}

fn handshake_request_for_origin_case(origin_case: OriginHeaderCase) -> TestRequest {
    match origin_case {
        OriginHeaderCase::Missing => handshake_request(),
        OriginHeaderCase::Unlisted => {
            handshake_request().append_header((header::ORIGIN, "https://example.com"))
        }
        OriginHeaderCase::Multiple => handshake_request()
            .append_header((header::ORIGIN, "https://trips.example"))
            .append_header((header::ORIGIN, "https://example.com")),
        OriginHeaderCase::Malformed => {
            // Byte 0x80 is invalid UTF-8.
            let invalid = HeaderValue::from_bytes(&[0x80]).expect("opaque Origin header value");
            handshake_request().insert_header((header::ORIGIN, invalid))
        }
        OriginHeaderCase::OtherPort => {
            handshake_request().insert_header((header::ORIGIN, "http://localhost:4000"))
        }
    }
}

#[rstest]
#[case("https://trips.example")]
#[case("http://localhost:3000")]
fn upgrades_when_origin_allowed(ws_state: WsState, #[case] origin: &str) {
    actix_rt::System::new().block_on(async move {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(ws_state))
                .service(ws::trip_feed_entry),
        )
        .await;

        let req = handshake_request()
            .insert_header((header::ORIGIN, origin))
            .to_request();
        let response = test::call_service(&app, req).await;
        assert_eq!(
            response.status(),
            StatusCode::SWITCHING_PROTOCOLS,
            "origin {origin}"
        );
    });
}

#[rstest]
#[case(OriginHeaderCase::Missing, StatusCode::FORBIDDEN)]
#[case(OriginHeaderCase::Unlisted, StatusCode::FORBIDDEN)]
#[case(OriginHeaderCase::Multiple, StatusCode::BAD_REQUEST)]
#[case(OriginHeaderCase::Malformed, StatusCode::BAD_REQUEST)]
#[case(OriginHeaderCase::OtherPort, StatusCode::FORBIDDEN)]
fn rejects_disallowed_origin_headers(
    ws_state: WsState,
    #[case] origin_case: OriginHeaderCase,
    #[case] expected: StatusCode,
) {
    actix_rt::System::new().block_on(async move {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(ws_state))
                .service(ws::trip_feed_entry),
        )
        .await;

        let req = handshake_request_for_origin_case(origin_case).to_request();
        let response = test::call_service(&app, req).await;
        assert_eq!(response.status(), expected, "{origin_case:?}");
    });
}
