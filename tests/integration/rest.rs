//! REST writes and queries end to end.

use serde::Serialize;
use wiremock::matchers::{any, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use super::common::{received, rest_client, API};

#[derive(Serialize)]
struct Account {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "External_Id__c")]
    external_id: String,
}

fn accounts(n: usize) -> Vec<Account> {
    (0..n)
        .map(|i| Account {
            name: format!("Account {i}"),
            external_id: format!("EXT-{i}"),
        })
        .collect()
}

/// One success per record in a collections body, ids numbered by name.
fn echo_records(request: &Request) -> ResponseTemplate {
    let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
    let results: Vec<_> = body["records"]
        .as_array()
        .unwrap()
        .iter()
        .map(|record| {
            serde_json::json!({
                "id": record["External_Id__c"],
                "success": true,
                "created": true,
                "errors": []
            })
        })
        .collect();
    ResponseTemplate::new(200).set_body_json(results)
}

#[tokio::test]
async fn test_insert_collection_splits_at_200() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{API}/composite/sobjects")))
        .respond_with(echo_records)
        .expect(2)
        .mount(&server)
        .await;

    let results = rest_client(&server)
        .insert_collection("Account", &accounts(250), 200, false)
        .await
        .unwrap();

    assert_eq!(results.len(), 250);
    assert!(!results.has_errors());
    assert_eq!(results.results()[249].id.as_deref(), Some("EXT-249"));

    let posts = received(&server, "POST").await;
    let sizes: Vec<usize> = posts
        .iter()
        .map(|r| {
            let body: serde_json::Value = serde_json::from_slice(&r.body).unwrap();
            body["records"].as_array().unwrap().len()
        })
        .collect();
    assert_eq!(sizes, vec![200, 50]);
}

#[tokio::test]
async fn test_upsert_composite_single_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{API}/composite")))
        .respond_with(|request: &Request| {
            let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
            let responses: Vec<_> = body["compositeRequest"]
                .as_array()
                .unwrap()
                .iter()
                .map(|sub| {
                    assert_eq!(sub["method"], "PATCH");
                    assert_eq!(
                        sub["url"],
                        "/services/data/v62.0/composite/sobjects/Account/External_Id__c"
                    );
                    let results: Vec<_> = sub["body"]["records"]
                        .as_array()
                        .unwrap()
                        .iter()
                        .map(|r| {
                            serde_json::json!({
                                "id": r["External_Id__c"],
                                "success": true,
                                "created": false
                            })
                        })
                        .collect();
                    serde_json::json!({
                        "body": results,
                        "httpHeaders": {},
                        "httpStatusCode": 200,
                        "referenceId": sub["referenceId"]
                    })
                })
                .collect();
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "compositeResponse": responses }))
        })
        .expect(1)
        .mount(&server)
        .await;

    let results = rest_client(&server)
        .upsert_composite("Account", "External_Id__c", &accounts(450), 200, true)
        .await
        .unwrap();

    assert_eq!(results.len(), 450);
    let ids: Vec<_> = results.iter().map(|r| r.id.clone().unwrap()).collect();
    assert_eq!(ids[0], "EXT-0");
    assert_eq!(ids[200], "EXT-200");
    assert_eq!(ids[449], "EXT-449");
}

#[tokio::test]
async fn test_update_without_ids_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let err = rest_client(&server)
        .update_composite("Account", &accounts(3), 200, false)
        .await
        .unwrap_err();
    assert!(err.is_validation());
}

#[tokio::test]
async fn test_single_record_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{API}/sobjects/Account")))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "id": "001000000000001AAA",
            "success": true,
            "errors": []
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{API}/query")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "totalSize": 1,
            "done": true,
            "records": [{
                "attributes": {"type": "Account"},
                "Name": "Account 0",
                "External_Id__c": "EXT-0"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(format!("{API}/sobjects/Account/001000000000001AAA")))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = rest_client(&server);
    let created = client.insert_one("Account", &accounts(1)[0]).await.unwrap();
    let id = created.id.clone().unwrap();

    let rows: Vec<serde_json::Value> = client
        .query_fields("Account", &["Name", "External_Id__c"])
        .await
        .unwrap();
    assert_eq!(rows[0]["External_Id__c"], "EXT-0");

    client
        .delete_one("Account", &serde_json::json!({ "Id": id }))
        .await
        .unwrap();
}
