use budgeteer_core::{
    BudgetState, CredentialStore, DropboxConfig, DropboxRemote, NewTransaction, RemoteError,
    RemoteStore, SqliteKeyValueStore, Transaction,
};
use chrono::Utc;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

#[derive(Debug)]
struct RecordedRequest {
    request_line: String,
    headers: Vec<(String, String)>,
    body: String,
}

impl RecordedRequest {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Answers one connection per canned response, in order, and records what arrived.
async fn serve(responses: Vec<(u16, &'static str)>) -> (String, JoinHandle<Vec<RecordedRequest>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let mut recorded = Vec::new();
        for (status, body) in responses {
            let (mut socket, _) = listener.accept().await.unwrap();
            recorded.push(read_request(&mut socket).await);
            let reply = format!(
                "HTTP/1.1 {status} Canned\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(reply.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        }
        recorded
    });

    (base_url, handle)
}

async fn read_request(socket: &mut TcpStream) -> RecordedRequest {
    let mut buffer = Vec::new();
    let mut chunk = [0_u8; 4096];
    let header_end = loop {
        let read = socket.read(&mut chunk).await.unwrap();
        assert!(read > 0, "connection closed before headers completed");
        buffer.extend_from_slice(&chunk[..read]);
        if let Some(pos) = buffer.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
    };

    let head = String::from_utf8(buffer[..header_end].to_vec()).unwrap();
    let mut lines = head.split("\r\n");
    let request_line = lines.next().unwrap().to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| (name.trim().to_ascii_lowercase(), value.trim().to_string()))
        .collect();
    let content_length = headers
        .iter()
        .find(|(name, _)| name == "content-length")
        .map(|(_, value)| value.parse::<usize>().unwrap())
        .unwrap_or(0);

    let mut body = buffer[header_end + 4..].to_vec();
    while body.len() < content_length {
        let read = socket.read(&mut chunk).await.unwrap();
        assert!(read > 0, "connection closed before body completed");
        body.extend_from_slice(&chunk[..read]);
    }

    RecordedRequest {
        request_line,
        headers,
        body: String::from_utf8(body).unwrap(),
    }
}

fn remote_against(base_url: &str, token: Option<&str>) -> (DropboxRemote, CredentialStore) {
    let credentials = CredentialStore::new(Arc::new(SqliteKeyValueStore::open_in_memory().unwrap()));
    if let Some(token) = token {
        credentials.set_access_token(token).unwrap();
    }
    let config = DropboxConfig {
        api_url: base_url.to_string(),
        content_url: format!("{base_url}/"),
        timeout_secs: 5,
        ..DropboxConfig::default()
    };
    let remote = DropboxRemote::new(config, credentials.clone()).unwrap();
    (remote, credentials)
}

fn sample_state() -> BudgetState {
    let mut state = BudgetState::default();
    state.transactions = vec![Transaction::create(
        NewTransaction::new(dec!(12.50), "coffee").with_category("food"),
        Utc::now(),
    )
    .unwrap()];
    state
}

#[tokio::test]
async fn authenticate_exchanges_code_and_persists_token() {
    let (base_url, server) =
        serve(vec![(200, r#"{"access_token":"tok-1","token_type":"bearer"}"#)]).await;
    let (remote, credentials) = remote_against(&base_url, None);
    remote.set_app_key("app-key").unwrap();

    remote.authenticate("abc").await.unwrap();

    assert!(remote.is_authenticated());
    assert_eq!(credentials.access_token().unwrap().as_deref(), Some("tok-1"));

    let requests = server.await.unwrap();
    let request = &requests[0];
    assert_eq!(request.request_line, "POST /oauth2/token HTTP/1.1");
    assert!(request.body.contains("grant_type=authorization_code"));
    assert!(request.body.contains("code=abc"));
    assert!(request.body.contains("client_id=app-key"));
    assert!(request
        .body
        .contains("redirect_uri=http%3A%2F%2Flocalhost%3A8080"));
    assert!(!request.body.contains("client_secret"));
}

#[tokio::test]
async fn rejected_exchange_keeps_remote_unauthenticated() {
    let (base_url, server) = serve(vec![(400, r#"{"error":"invalid_grant"}"#)]).await;
    let (remote, credentials) = remote_against(&base_url, None);
    remote.set_app_key("app-key").unwrap();

    let err = remote.authenticate("expired").await.unwrap_err();

    assert!(matches!(err, RemoteError::Api { status: 400, .. }));
    assert!(!remote.is_authenticated());
    assert_eq!(credentials.access_token().unwrap(), None);
    server.await.unwrap();
}

#[tokio::test]
async fn save_overwrites_fixed_path_with_pretty_json() {
    let (base_url, server) = serve(vec![(200, r#"{"name":"budgeteer-data.json"}"#)]).await;
    let (remote, _) = remote_against(&base_url, Some("tok-1"));
    let state = sample_state();

    remote.save(&state).await.unwrap();

    let requests = server.await.unwrap();
    let request = &requests[0];
    assert_eq!(request.request_line, "POST /2/files/upload HTTP/1.1");
    assert_eq!(request.header("authorization"), Some("Bearer tok-1"));
    assert_eq!(
        request.header("content-type"),
        Some("application/octet-stream")
    );
    let arg: serde_json::Value =
        serde_json::from_str(request.header("dropbox-api-arg").unwrap()).unwrap();
    assert_eq!(
        arg,
        serde_json::json!({ "path": "/budgeteer-data.json", "mode": "overwrite" })
    );
    assert!(request.body.contains("\n  \"dailyBudget\""));
    assert_eq!(BudgetState::from_json(&request.body).unwrap(), state);
}

#[tokio::test]
async fn missing_remote_file_is_not_an_error() {
    let (base_url, server) = serve(vec![(
        409,
        r#"{"error_summary":"path/not_found/..","error":{".tag":"path"}}"#,
    )])
    .await;
    let (remote, _) = remote_against(&base_url, Some("tok-1"));

    assert!(remote.load().await.unwrap().is_none());

    let requests = server.await.unwrap();
    assert_eq!(requests[0].request_line, "POST /2/files/download HTTP/1.1");
    let arg: serde_json::Value =
        serde_json::from_str(requests[0].header("dropbox-api-arg").unwrap()).unwrap();
    assert_eq!(arg, serde_json::json!({ "path": "/budgeteer-data.json" }));
}

#[tokio::test]
async fn load_parses_remote_document() {
    let body = r#"{
        "dailyBudget": { "amount": 30, "currency": "GBP" },
        "transactions": [
            { "id": "0b7f9a4c-1f7e-4d8e-9a53-5c4e2f0d6b21", "amount": 4.2,
              "description": "tea", "date": "2026-10-19T10:00:00.000Z" }
        ],
        "lastSync": "2026-10-19T10:00:01.000Z"
    }"#;
    let (base_url, server) = serve(vec![(200, body)]).await;
    let (remote, _) = remote_against(&base_url, Some("tok-1"));

    let state = remote.load().await.unwrap().unwrap();

    assert_eq!(state.daily_budget.currency, "GBP");
    assert_eq!(state.transactions[0].amount, dec!(4.2));
    assert_eq!(state.last_sync.as_deref(), Some("2026-10-19T10:00:01.000Z"));
    server.await.unwrap();
}

#[tokio::test]
async fn load_propagates_server_errors() {
    let (base_url, server) = serve(vec![(500, r#"{"error":"internal"}"#)]).await;
    let (remote, _) = remote_against(&base_url, Some("tok-1"));

    let err = remote.load().await.unwrap_err();

    match err {
        RemoteError::Api { status, body } => {
            assert_eq!(status, 500);
            assert!(body.contains("internal"));
        }
        other => panic!("unexpected error: {other}"),
    }
    server.await.unwrap();
}

#[tokio::test]
async fn load_rejects_non_budget_payload() {
    let (base_url, server) = serve(vec![(200, r#"{"hello":"world"}"#)]).await;
    let (remote, _) = remote_against(&base_url, Some("tok-1"));

    let err = remote.load().await.unwrap_err();

    assert!(matches!(err, RemoteError::InvalidPayload(_)));
    server.await.unwrap();
}

#[tokio::test]
async fn save_propagates_auth_failures() {
    let (base_url, server) = serve(vec![(401, r#"{"error_summary":"expired_access_token/"}"#)]).await;
    let (remote, _) = remote_against(&base_url, Some("stale"));

    let err = remote.save(&BudgetState::default()).await.unwrap_err();

    assert!(matches!(err, RemoteError::Api { status: 401, .. }));
    server.await.unwrap();
}
