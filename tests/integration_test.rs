#![cfg(feature = "reqwest-transport")]

use std::io::Write;

use assert_cmd::Command;
use assert_cmd::cargo;
use futures_util::future::join_all;
use mockito::{Matcher, Server};
use odoo_relay::rpc::{OdooAction, OdooRequest, TargetInstance};
use odoo_relay::{Dispatcher, ForwardError};
use serde_json::json;
use tempfile::NamedTempFile;

fn instance() -> TargetInstance {
    TargetInstance {
        url: "https://erp.example.com".to_string(),
        db: "prod".to_string(),
        user_id: 2,
        api_key: "odoo-key".to_string(),
    }
}

#[tokio::test]
async fn test_forward_end_to_end() {
    let mut server = Server::new_async().await;
    let url = server.url();

    let mock = server
        .mock("POST", "/api/odoo")
        .match_header("content-type", "application/json")
        .match_header("accept", "application/json")
        .match_header("apikey", "proxy-key")
        .match_body(Matcher::PartialJson(json!({
            "id": "req-1",
            "action": "search_read",
            "modelId": "res.partner",
            "keywordArgs": {"limit": 1},
            "targetInstance": {"db": "prod", "userId": 2}
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"jsonrpc":"2.0","id":"req-1","result":[{"id":7,"name":"Azure"}]}"#)
        .create_async()
        .await;

    let dispatcher = Dispatcher::builder(format!("{}/", url), "proxy-key")
        .build()
        .unwrap();

    let mut kwargs = serde_json::Map::new();
    kwargs.insert("limit".to_string(), json!(1));
    let request = OdooRequest::new("req-1", OdooAction::SearchRead, "res.partner", instance())
        .with_kwargs(kwargs);

    let envelope = dispatcher.forward(&request).await.unwrap();

    mock.assert_async().await;
    assert_eq!(envelope.result, Some(json!([{"id": 7, "name": "Azure"}])));
}

#[tokio::test]
async fn test_forward_unauthorized_envelope_is_data() {
    let mut server = Server::new_async().await;

    let _mock = server
        .mock("POST", "/api/odoo")
        .with_status(401)
        .with_body(r#"{"jsonrpc":"2.0","id":null,"error":{"code":401,"message":"Invalid API key"}}"#)
        .create_async()
        .await;

    let dispatcher = Dispatcher::builder(server.url(), "wrong-key").build().unwrap();
    let envelope = dispatcher
        .forward(&OdooRequest::new("r", OdooAction::Search, "res.partner", instance()))
        .await
        .unwrap();

    let error = envelope.into_result().unwrap_err();
    assert_eq!(error.code, Some(401));
    assert_eq!(error.message, "Invalid API key");
}

#[tokio::test]
async fn test_forward_out_of_contract_status() {
    let mut server = Server::new_async().await;

    let _mock = server
        .mock("POST", "/api/odoo")
        .with_status(404)
        .with_body("<html>not here</html>")
        .create_async()
        .await;

    let dispatcher = Dispatcher::builder(server.url(), "proxy-key").build().unwrap();
    let err = dispatcher
        .forward(&OdooRequest::new("r", OdooAction::Read, "res.partner", instance()))
        .await
        .unwrap_err();

    match err {
        ForwardError::Transport {
            status, response, ..
        } => {
            assert_eq!(status, Some(404));
            assert_eq!(
                response.unwrap().body_excerpt.as_deref(),
                Some("<html>not here</html>")
            );
        }
        other => panic!("expected transport error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_concurrent_forwards_do_not_interfere() {
    let mut server = Server::new_async().await;

    let mut mocks = Vec::new();
    for i in 0..8 {
        let mock = server
            .mock("POST", "/api/odoo")
            .match_body(Matcher::PartialJson(json!({"id": format!("req-{}", i)})))
            .with_status(200)
            .with_body(format!(
                r#"{{"jsonrpc":"2.0","id":"req-{}","result":{}}}"#,
                i, i
            ))
            .create_async()
            .await;
        mocks.push(mock);
    }

    let dispatcher = Dispatcher::builder(server.url(), "proxy-key").build().unwrap();

    let calls = (0..8).map(|i| {
        let dispatcher = dispatcher.clone();
        let request = OdooRequest::new(
            format!("req-{}", i),
            OdooAction::SearchCount,
            "res.partner",
            instance(),
        );
        tokio::spawn(async move { dispatcher.forward(&request).await })
    });

    let results = join_all(calls).await;

    for (i, result) in results.into_iter().enumerate() {
        let envelope = result.unwrap().unwrap();
        assert_eq!(envelope.id_str(), Some(format!("req-{}", i).as_str()));
        assert_eq!(envelope.result, Some(json!(i)));
    }
    for mock in mocks {
        mock.assert_async().await;
    }
}

#[test]
fn test_cli_send_request_file() {
    let mut server = Server::new();
    let url = server.url();

    let mock = server
        .mock("POST", "/api/odoo")
        .match_header("apikey", "proxy-key")
        .match_body(Matcher::PartialJson(json!({
            "id": "from-file",
            "action": "fields_get",
            "modelId": "res.partner"
        })))
        .with_status(200)
        .with_body(r#"{"jsonrpc":"2.0","id":"from-file","result":{"name":{"type":"char"}}}"#)
        .create();

    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{
            "id": "from-file",
            "action": "fields_get",
            "modelId": "res.partner",
            "targetInstance": {{"url": "https://erp.example.com", "db": "prod", "userId": 2, "apiKey": "k"}}
        }}"#
    )
    .unwrap();

    Command::new(cargo::cargo_bin!("odoo-relay"))
        .arg("send")
        .arg(file.path())
        .arg("--endpoint")
        .arg(&url)
        .arg("--api-key")
        .arg("proxy-key")
        .assert()
        .success()
        .stdout(predicates::str::contains("\"from-file\""))
        .stdout(predicates::str::contains("\"char\""));

    mock.assert();
}

#[test]
fn test_cli_call_business_error_exit_code() {
    let mut server = Server::new();
    let url = server.url();

    let _mock = server
        .mock("POST", "/api/odoo")
        .with_status(500)
        .with_body(
            r#"{"jsonrpc":"2.0","id":"odoo-relay","error":{"code":200,"message":"Odoo Server Error","data":{"name":"odoo.exceptions.AccessError"}}}"#,
        )
        .create();

    Command::new(cargo::cargo_bin!("odoo-relay"))
        .args(["call", "unlink", "res.partner", "--args", "[[7]]"])
        .args(["--endpoint", url.as_str(), "--api-key", "proxy-key"])
        .args(["--instance-url", "https://erp.example.com", "--db", "prod"])
        .args(["--user-id", "2", "--instance-key", "odoo-key"])
        .assert()
        .code(2)
        .stdout(predicates::str::contains("AccessError"))
        .stderr(predicates::str::contains("Odoo Server Error"));
}

#[test]
fn test_cli_invalid_envelope_fails() {
    let mut server = Server::new();
    let url = server.url();

    let _mock = server
        .mock("POST", "/api/odoo")
        .with_status(200)
        .with_body("not json")
        .create();

    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{"id": "x", "action": "search", "modelId": "res.partner",
            "targetInstance": {{"url": "u", "db": "d", "userId": 1, "apiKey": "k"}}}}"#
    )
    .unwrap();

    Command::new(cargo::cargo_bin!("odoo-relay"))
        .arg("send")
        .arg(file.path())
        .args(["--endpoint", url.as_str(), "--api-key", "proxy-key"])
        .assert()
        .failure()
        .stderr(predicates::str::contains("invalid JSON in response body"));
}

#[test]
fn test_cli_missing_endpoint_fails() {
    Command::new(cargo::cargo_bin!("odoo-relay"))
        .env_remove("ODOO_RELAY_ENDPOINT")
        .env_remove("ODOO_RELAY_API_KEY")
        .args(["send", "request.json"])
        .assert()
        .failure()
        .stderr(predicates::str::contains("endpoint root must not be empty"));
}
