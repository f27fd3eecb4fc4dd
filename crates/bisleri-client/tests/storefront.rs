//! Integration tests for `StorefrontClient` against a local fake storefront.
//!
//! `wiremock` serves fixture pages and records requests so the tests can
//! assert both outcomes and how many calls were made.

use std::time::Duration;

use bisleri_client::auth::login_with_otp;
use bisleri_client::{ClientSettings, Deadline, StorefrontClient, StorefrontError};
use bisleri_core::{Address, ScriptedPrompter, StoredCookie};
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SITE: &str = "/on/demandware.store/Sites-Bis-Site/default";

fn settings(server: &MockServer) -> ClientSettings {
    ClientSettings::new(server.uri())
        .with_throttle(Duration::ZERO)
        .with_backoff_step(Duration::ZERO)
}

fn client(server: &MockServer) -> StorefrontClient {
    StorefrontClient::new(settings(server), &[]).expect("client builds")
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/html; charset=utf-8")
        .set_body_string(body)
}

fn redirect_to(location: &str) -> ResponseTemplate {
    ResponseTemplate::new(302).insert_header("Location", location)
}

// ---------------------------------------------------------------------------
// Page loads and auth inference
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cart_bounce_to_login_is_not_authenticated_and_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/mycart"))
        .respond_with(redirect_to("/login"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(html("<form id='login'></form>"))
        .mount(&server)
        .await;

    let err = client(&server).fetch_cart_page().await.unwrap_err();
    assert!(err.is_not_authenticated(), "got {err:?}");
}

#[tokio::test]
async fn cart_bounce_elsewhere_is_unexpected_redirect() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/mycart"))
        .respond_with(redirect_to("/maintenance"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/maintenance"))
        .respond_with(html("<p>back soon</p>"))
        .mount(&server)
        .await;

    let err = client(&server).fetch_cart_page().await.unwrap_err();
    assert!(
        matches!(err, StorefrontError::UnexpectedRedirect { ref path } if path == "/maintenance"),
        "got {err:?}"
    );
}

#[tokio::test]
async fn transient_server_errors_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/checkout"))
        .and(query_param("stage", "shipping"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/checkout"))
        .respond_with(html("<input name='csrf_token' value='t'>"))
        .expect(1)
        .mount(&server)
        .await;

    let body = client(&server).fetch_shipping_page().await.unwrap();
    assert!(body.contains("csrf_token"));
}

#[tokio::test]
async fn client_errors_fail_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/checkout"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server).fetch_payment_page().await.unwrap_err();
    assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn persistent_server_errors_exhaust_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/mycart"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let err = client(&server).fetch_cart_page().await.unwrap_err();
    assert!(matches!(err, StorefrontError::RetriesExhausted { attempts: 3, .. }));
    assert_eq!(err.status(), Some(500));
}

#[tokio::test]
async fn stored_cookies_and_default_headers_are_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/my-orders"))
        .and(header("cookie", "dwsid=abc"))
        .and(header("accept-language", "en-US,en;q=0.9"))
        .respond_with(html("<div class='all-order'></div>"))
        .expect(1)
        .mount(&server)
        .await;

    let cookies = [StoredCookie {
        name: "dwsid".into(),
        value: "abc".into(),
        domain: ".bisleri.com".into(),
        path: "/".into(),
        ..StoredCookie::default()
    }];
    let client = StorefrontClient::new(settings(&server), &cookies).unwrap();
    client.verify_authenticated().await.unwrap();
}

#[tokio::test]
async fn throttle_sleep_observes_deadline() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(html("ok"))
        .expect(0)
        .mount(&server)
        .await;

    let slow = ClientSettings::new(server.uri()).with_throttle(Duration::from_secs(30));
    let client = StorefrontClient::new(slow, &[])
        .unwrap()
        .with_deadline(Deadline::after(Duration::from_millis(50)));
    let err = client.fetch_cart_page().await.unwrap_err();
    assert!(err.is_deadline_exceeded(), "got {err:?}");
}

// ---------------------------------------------------------------------------
// Place order
// ---------------------------------------------------------------------------

#[tokio::test]
async fn place_order_reads_id_without_following_redirect() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{SITE}/Wallet-WalletPlaceOrder")))
        .respond_with(redirect_to("/orderplaced?orderID=BS-7781&token=z"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/orderplaced"))
        .respond_with(html("thanks"))
        .expect(0)
        .mount(&server)
        .await;

    assert_eq!(client(&server).place_order().await.unwrap(), "BS-7781");
}

#[tokio::test]
async fn place_order_redirect_without_id_is_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{SITE}/Wallet-WalletPlaceOrder")))
        .respond_with(redirect_to("/orderplaced"))
        .mount(&server)
        .await;

    let err = client(&server).place_order().await.unwrap_err();
    assert!(matches!(err, StorefrontError::OrderNotPlaced { .. }));
}

// ---------------------------------------------------------------------------
// Cart, location and checkout endpoints
// ---------------------------------------------------------------------------

#[tokio::test]
async fn saved_address_location_retries_once_with_fresh_token() {
    let server = MockServer::start().await;
    let endpoint = format!("{SITE}/LocationSelector-SetSavedAddressLocation");
    Mock::given(method("POST"))
        .and(path(endpoint.as_str()))
        .and(body_string_contains("csrf_token=fresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(endpoint.as_str()))
        .respond_with(
            ResponseTemplate::new(403)
                .set_body_json(json!({"csrf": {"tokenName": "csrf_token", "token": "fresh-token"}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let address = Address {
        first_name: "Asha".into(),
        address1: "12 MG Road".into(),
        city: "Bengaluru".into(),
        state_code: "KA".into(),
        postal_code: "560001".into(),
        country: "IN".into(),
        ..Address::default()
    };
    client(&server)
        .set_saved_address_location(&address, "addr-1")
        .await
        .unwrap();
}

#[tokio::test]
async fn only_connect_and_timeout_transport_errors_are_transient() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/not-json"))
        .respond_with(html("<html>maintenance</html>"))
        .mount(&server)
        .await;
    let decode = reqwest::get(format!("{}/not-json", server.uri()))
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap_err();
    assert!(!StorefrontError::Http(decode).is_transient());

    let closed = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let connect = reqwest::get(format!("http://{closed}/")).await.unwrap_err();
    assert!(StorefrontError::Http(connect).is_transient());
}

#[tokio::test]
async fn deadline_while_reading_a_location_rejection_is_not_a_status_error() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    // Answers 403 with a body that never finishes arriving.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let stall = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = [0_u8; 4096];
        let _ = socket.read(&mut request).await.unwrap();
        socket
            .write_all(b"HTTP/1.1 403 Forbidden\r\ncontent-type: application/json\r\ncontent-length: 512\r\n\r\n{\"csrf\":")
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
    });

    let settings = ClientSettings::new(base).with_throttle(Duration::ZERO);
    let client = StorefrontClient::new(settings, &[])
        .unwrap()
        .with_deadline(Deadline::after(Duration::from_millis(300)));
    let address = Address {
        address1: "12 MG Road".into(),
        city: "Bengaluru".into(),
        state_code: "KA".into(),
        postal_code: "560001".into(),
        country: "IN".into(),
        ..Address::default()
    };

    let err = client
        .set_saved_address_location(&address, "addr-1")
        .await
        .unwrap_err();
    assert!(err.is_deadline_exceeded(), "got {err:?}");
    stall.abort();
}

#[tokio::test]
async fn quantity_updates_use_query_parameters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{SITE}/Cart-UpdateQuantity")))
        .and(query_param("pid", "BIS-20LTR01-90"))
        .and(query_param("quantity", "3"))
        .and(query_param("uuid", "abc123def456"))
        .and(header("x-requested-with", "XMLHttpRequest"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{SITE}/Cart-UpdateJarQuantity")))
        .and(query_param("jarQuantity", "0"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    client
        .update_quantity("BIS-20LTR01-90", "abc123def456", 3)
        .await
        .unwrap();
    client.update_jar_quantity(0).await.unwrap();
}

#[tokio::test]
async fn add_product_rejects_zero_before_any_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = client(&server).add_product("BIS-20LTR01-90", 0).await.unwrap_err();
    assert!(matches!(err, StorefrontError::InvalidInput(_)));
}

#[tokio::test]
async fn begin_checkout_falls_back_to_discovered_link() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/mycart"))
        .respond_with(html(r#"<a class="btn" href="/checkout-begin?stage=shipping">Proceed</a>"#))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/checkout-begin"))
        .and(header("referer", format!("{}/mycart", server.uri()).as_str()))
        .respond_with(html("ok"))
        .expect(1)
        .mount(&server)
        .await;

    client(&server).begin_checkout().await.unwrap();
}

#[tokio::test]
async fn begin_checkout_submits_scored_form() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/mycart"))
        .respond_with(html(
            r#"<form action="/Checkout-Begin" method="post">
                 <input type="hidden" name="csrf_token" value="cart-token">
                 <button type="submit">Checkout</button>
               </form>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/Checkout-Begin"))
        .and(body_string_contains("csrf_token=cart-token"))
        .respond_with(html("ok"))
        .expect(1)
        .mount(&server)
        .await;

    client(&server).begin_checkout().await.unwrap();
}

// ---------------------------------------------------------------------------
// Logout
// ---------------------------------------------------------------------------

#[tokio::test]
async fn logout_walks_fallback_endpoints() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/my-orders"))
        .respond_with(html("<a href='/help'>Help</a>"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{SITE}/Account-Logout")))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{SITE}/Login-Logout")))
        .respond_with(html("bye"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{SITE}/Logout-Logout")))
        .respond_with(html("bye"))
        .expect(0)
        .mount(&server)
        .await;

    client(&server).logout().await.unwrap();
}

#[tokio::test]
async fn logout_fails_only_when_every_endpoint_refuses() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = client(&server).logout().await.unwrap_err();
    assert!(matches!(err, StorefrontError::LogoutFailed));
}

// ---------------------------------------------------------------------------
// OTP login
// ---------------------------------------------------------------------------

async fn mount_login(server: &MockServer, send_calls: u64) {
    Mock::given(method("GET"))
        .and(path("/home"))
        .respond_with(html(r#"<div class="login" data-csrf="login-token"></div>"#))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{SITE}/Account-SendOTP")))
        .and(body_string_contains("mobileNumber=9876543210"))
        .and(body_string_contains("csrf_token=login-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": {"Status": "Success"}})))
        .expect(send_calls)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/my-orders"))
        .respond_with(html("<div class='all-order'></div>"))
        .mount(server)
        .await;
}

#[tokio::test]
async fn otp_login_resends_then_returns_verified_cookies() {
    let server = MockServer::start().await;
    mount_login(&server, 2).await;
    Mock::given(method("POST"))
        .and(path(format!("{SITE}/Account-CheckCustomer")))
        .and(body_string_contains("OTP=123456"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Set-Cookie", "dwsid=fresh-session; Path=/; HttpOnly")
                .set_body_json(json!({"error": false})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let prompter = ScriptedPrompter::new().with_answers(["r", "123456"]);
    let client = client(&server);
    let cookies = login_with_otp(&client, &prompter, "9876543210").await.unwrap();

    assert!(cookies
        .iter()
        .any(|c| c.name == "dwsid" && c.value == "fresh-session"));
    assert!(prompter.notices().iter().any(|n| n == "Login successful!"));
}

#[tokio::test]
async fn otp_login_rejects_short_code_before_verifying() {
    let server = MockServer::start().await;
    mount_login(&server, 1).await;
    Mock::given(method("POST"))
        .and(path(format!("{SITE}/Account-CheckCustomer")))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let prompter = ScriptedPrompter::new().with_answers(["1234"]);
    let err = login_with_otp(&client(&server), &prompter, "9876543210")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("OTP must be 6 digits"));
}

#[tokio::test]
async fn otp_login_surfaces_site_rejection() {
    let server = MockServer::start().await;
    mount_login(&server, 1).await;
    Mock::given(method("POST"))
        .and(path(format!("{SITE}/Account-CheckCustomer")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"error": true, "message": "Invalid OTP"})),
        )
        .mount(&server)
        .await;

    let prompter = ScriptedPrompter::new().with_answers(["654321"]);
    let err = login_with_otp(&client(&server), &prompter, "9876543210")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Invalid OTP"), "got {err}");
}
