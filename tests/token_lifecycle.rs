//! Device-token lifecycle tests against a local capture server: login-edge
//! registration, logout unregistration, and refresh re-registration.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;

use fuelnet_client::api::ApiClient;
use fuelnet_client::auth::{AuthStore, User};
use fuelnet_client::push::TokenManager;
use fuelnet_client::routing::Role;

/// Minimal HTTP server that captures each request (head + body) and answers
/// 200 with an empty JSON object.
async fn capture_server(listener: TcpListener, requests: mpsc::UnboundedSender<String>) {
    loop {
        let Ok((mut stream, _)) = listener.accept().await else { return };
        let requests = requests.clone();
        tokio::spawn(async move {
            let mut data = Vec::new();
            let mut buf = [0u8; 1024];
            loop {
                let Ok(n) = stream.read(&mut buf).await else { return };
                if n == 0 {
                    return;
                }
                data.extend_from_slice(&buf[..n]);
                if let Some(request) = complete_request(&data) {
                    let _ = requests.send(request);
                    let _ = stream
                        .write_all(
                            b"HTTP/1.1 200 OK\r\ncontent-length: 2\r\nconnection: close\r\n\r\n{}",
                        )
                        .await;
                    return;
                }
            }
        });
    }
}

/// Full request text once the headers and the declared body length have both
/// arrived.
fn complete_request(data: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(data).into_owned();
    let head_end = text.find("\r\n\r\n")?;
    let content_length = text[..head_end]
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())?
        })
        .unwrap_or(0);
    (data.len() >= head_end + 4 + content_length).then_some(text)
}

async fn manager_with_server() -> (Arc<AuthStore>, Arc<TokenManager>, mpsc::UnboundedReceiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(capture_server(listener, tx));

    let auth = Arc::new(AuthStore::in_memory());
    let api = Arc::new(ApiClient::new(base_url, Arc::clone(&auth)).unwrap());
    let manager = Arc::new(TokenManager::new(api, Arc::clone(&auth)));
    (auth, manager, rx)
}

fn driver(id: &str) -> User {
    User { id: id.into(), name: None, role: Role::Driver }
}

async fn next_request(requests: &mut mpsc::UnboundedReceiver<String>) -> String {
    timeout(Duration::from_secs(5), requests.recv()).await.unwrap().unwrap()
}

#[tokio::test]
async fn token_refresh_reregisters_for_logged_in_user() {
    let (auth, manager, mut requests) = manager_with_server().await;
    auth.set_user(driver("u1"), Some("jwt".into()));

    manager.handle_token_refresh("fcm-refreshed".into());
    assert_eq!(manager.device_token().as_deref(), Some("fcm-refreshed"));

    let request = next_request(&mut requests).await;
    assert!(request.starts_with("POST /api/notifications/register-token"));
    assert!(request.contains("fcm-refreshed"));
}

#[tokio::test]
async fn token_refresh_without_user_only_updates_the_cache() {
    let (_auth, manager, mut requests) = manager_with_server().await;

    manager.handle_token_refresh("fcm-idle".into());

    assert_eq!(manager.device_token().as_deref(), Some("fcm-idle"));
    assert!(timeout(Duration::from_millis(200), requests.recv()).await.is_err());
}

#[tokio::test]
async fn logout_unregisters_the_device_token() {
    let (auth, manager, mut requests) = manager_with_server().await;
    manager.set_device_token("fcm-out".into());
    auth.set_user(driver("u2"), Some("jwt".into()));
    manager.watch_auth();

    auth.logout();

    let request = next_request(&mut requests).await;
    assert!(request.starts_with("POST /api/notifications/unregister-token"));
    assert!(request.contains("fcm-out"));
}

#[tokio::test]
async fn login_edge_registers_in_background() {
    let (auth, manager, mut requests) = manager_with_server().await;
    manager.set_device_token("fcm-login".into());
    manager.watch_auth();

    auth.set_user(driver("u3"), Some("jwt".into()));

    let request = next_request(&mut requests).await;
    assert!(request.starts_with("POST /api/notifications/register-token"));
    assert!(request.contains("fcm-login"));
}
