//! Bulk API 2.0 pipelines end to end.

use forcepipe::bulk::codec;
use forcepipe::bulk::{ColumnDelimiter, ErrorKind, JobState, Stage};
use forcepipe::{CancellationToken, Wait};
use serde::{Deserialize, Serialize};
use wiremock::matchers::{any, body_json, body_partial_json, body_string, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use super::common::{bulk_client, job_json, mount_job_states, received, API};

#[derive(Debug, Serialize)]
struct Contact {
    #[serde(rename = "LastName")]
    last_name: String,
    #[serde(rename = "Email")]
    email: Option<String>,
}

#[derive(Debug, Deserialize, PartialEq)]
struct AccountRow {
    #[serde(rename = "Id")]
    id: String,
    #[serde(rename = "Name")]
    name: String,
}

fn contacts(n: usize) -> Vec<Contact> {
    (0..n)
        .map(|i| Contact {
            last_name: format!("Contact {i}"),
            email: (i % 2 == 0).then(|| format!("c{i}@example.com")),
        })
        .collect()
}

async fn mount_create(server: &MockServer, id: &str, operation: &str) {
    Mock::given(method("POST"))
        .and(path(format!("{API}/jobs/ingest")))
        .respond_with(ResponseTemplate::new(200).set_body_json(job_json(id, "Open", operation)))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_close(server: &MockServer, id: &str, operation: &str) {
    Mock::given(method("PATCH"))
        .and(path(format!("{API}/jobs/ingest/{id}")))
        .and(body_json(serde_json::json!({"state": "UploadComplete"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(job_json(id, "UploadComplete", operation)),
        )
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_insert_250_records_in_two_batches_with_results() {
    let server = MockServer::start().await;
    mount_create(&server, "750A", "insert").await;
    Mock::given(method("PUT"))
        .and(path(format!("{API}/jobs/ingest/750A/batches")))
        .respond_with(ResponseTemplate::new(201))
        .expect(2)
        .mount(&server)
        .await;
    mount_close(&server, "750A", "insert").await;
    mount_job_states(&server, "ingest", "750A", "insert", &["InProgress", "JobComplete"]).await;

    let mut successes = String::from("\"sf__Id\",\"sf__Created\",LastName,Email\n");
    for i in 0..248 {
        successes.push_str(&format!("003{i:012},true,Contact {i},\n"));
    }
    Mock::given(method("GET"))
        .and(path(format!("{API}/jobs/ingest/750A/successfulResults")))
        .respond_with(ResponseTemplate::new(200).set_body_string(successes))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{API}/jobs/ingest/750A/failedResults")))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "\"sf__Id\",\"sf__Error\",LastName,Email\n\
             ,INVALID_EMAIL_ADDRESS:Email: invalid email address: x [Email],Contact 248,x\n\
             ,INVALID_EMAIL_ADDRESS:Email: invalid email address: y [Email],Contact 249,y\n",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = bulk_client(&server)
        .insert_bulk(&CancellationToken::new(), "Contact", &contacts(250), 200, Wait::Results)
        .await
        .unwrap();

    assert_eq!(outcome.job_ids, vec!["750A".to_string()]);
    assert_eq!(outcome.job.as_ref().unwrap().state, JobState::JobComplete);
    let results = outcome.results.as_ref().unwrap();
    assert_eq!(results.len(), 250);
    assert!(outcome.has_errors());
    let success_ids: Vec<String> = results
        .iter()
        .filter(|r| r.success)
        .map(|r| r.id.clone().unwrap_or_default())
        .collect();
    let expected: Vec<String> = (0..248).map(|i| format!("003{i:012}")).collect();
    assert_eq!(success_ids, expected);
    assert!(results.iter().take(248).all(|r| r.created));
    let failures: Vec<_> = results.failures().collect();
    assert_eq!(failures.len(), 2);
    assert_eq!(failures[0].errors[0].status_code, "INVALID_EMAIL_ADDRESS");
    assert_eq!(failures[0].errors[0].fields, vec!["Email".to_string()]);

    let uploads = received(&server, "PUT").await;
    let rows = |r: &Request| String::from_utf8_lossy(&r.body).lines().count();
    assert_eq!(rows(&uploads[0]), 201);
    assert_eq!(rows(&uploads[1]), 51);
    let first = String::from_utf8_lossy(&uploads[0].body).into_owned();
    assert!(first.starts_with("LastName,Email\nContact 0,c0@example.com\nContact 1,\n"));
}

#[tokio::test]
async fn test_query_iterator_follows_locators() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{API}/jobs/query")))
        .and(body_partial_json(serde_json::json!({"query": "SELECT Id, Name FROM Account"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(job_json("750Q", "UploadComplete", "query")),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_job_states(&server, "query", "750Q", "query", &["InProgress", "JobComplete"]).await;

    let results = format!("{API}/jobs/query/750Q/results");
    for (locator, next, body) in [
        ("abc", "def", "Id,Name\n001B,Globex\n"),
        ("def", "", "Id,Name\n001C,Initech\n"),
    ] {
        Mock::given(method("GET"))
            .and(path(results.clone()))
            .and(query_param("locator", locator))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Sforce-Locator", next)
                    .insert_header("Sforce-NumberOfRecords", "1")
                    .set_body_string(body),
            )
            .expect(1)
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path(results))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Sforce-Locator", "abc")
                .insert_header("Sforce-NumberOfRecords", "1")
                .set_body_string("Id,Name\n001A,Acme\n"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    let mut pages = bulk_client(&server)
        .query_bulk_iterator(&cancel, "SELECT Id, Name FROM Account")
        .await
        .unwrap();

    let mut names = Vec::new();
    while let Some(rows) = pages.next_records::<AccountRow>(&cancel).await.unwrap() {
        names.extend(rows.into_iter().map(|row| row.name));
    }

    assert_eq!(names, vec!["Acme", "Globex", "Initech"]);
    assert_eq!(pages.pages_fetched(), 3);
    assert!(pages.is_exhausted());
    assert!(!pages.advance(&cancel).await);
    assert!(pages.error().is_none());
}

#[tokio::test]
async fn test_cancelled_token_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = bulk_client(&server)
        .insert_bulk(&cancel, "Contact", &contacts(3), 200, Wait::Completion)
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(err.stage(), Some(Stage::CreateJob));
}

#[tokio::test]
async fn test_cancel_while_polling_stops_the_pipeline() {
    let server = MockServer::start().await;
    let cancel = CancellationToken::new();
    mount_create(&server, "750C", "insert").await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    mount_close(&server, "750C", "insert").await;
    let trigger = cancel.clone();
    Mock::given(method("GET"))
        .and(path(format!("{API}/jobs/ingest/750C")))
        .respond_with(move |_: &Request| {
            trigger.cancel();
            ResponseTemplate::new(200).set_body_json(job_json("750C", "InProgress", "insert"))
        })
        .expect(1)
        .mount(&server)
        .await;

    let err = bulk_client(&server)
        .insert_bulk(&cancel, "Contact", &contacts(3), 200, Wait::Completion)
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(err.stage(), Some(Stage::Poll));
}

#[tokio::test]
async fn test_assignment_rule_only_for_leads_and_cases() {
    let server = MockServer::start().await;
    let client = bulk_client(&server);
    let cancel = CancellationToken::new();
    let records = vec![serde_json::json!({"Name": "Acme"})];

    {
        let guard = Mock::given(any())
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount_as_scoped(&server)
            .await;
        let err = client
            .insert_bulk_assign(&cancel, "Account", &records, 200, Wait::None, "01Q000000000001")
            .await
            .unwrap_err();
        assert!(err.is_validation());
        drop(guard);
    }

    for (object, id) in [("Lead", "750L"), ("case", "750K")] {
        Mock::given(method("POST"))
            .and(path(format!("{API}/jobs/ingest")))
            .and(body_partial_json(serde_json::json!({
                "object": object,
                "assignmentRuleId": "01Q000000000001"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(job_json(id, "Open", "insert")))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path(format!("{API}/jobs/ingest/{id}/batches")))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;
        mount_close(&server, id, "insert").await;

        let outcome = client
            .insert_bulk_assign(&cancel, object, &records, 200, Wait::None, "01Q000000000001")
            .await
            .unwrap();
        assert_eq!(outcome.job_ids, vec![id.to_string()]);
    }
}

#[tokio::test]
async fn test_upsert_without_external_id_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;
    let client = bulk_client(&server);
    let cancel = CancellationToken::new();

    let records = vec![serde_json::json!({"Ext__c": "A-1", "Name": "Acme"})];
    let err = client
        .upsert_bulk(&cancel, "Account", "", &records, 200, Wait::None)
        .await
        .unwrap_err();
    assert!(err.is_validation());

    let missing = vec![serde_json::json!({"Name": "no key"})];
    let err = client
        .upsert_bulk(&cancel, "Account", "Ext__c", &missing, 200, Wait::None)
        .await
        .unwrap_err();
    assert!(err.is_validation());
}

#[tokio::test]
async fn test_failed_job_reports_server_message() {
    let server = MockServer::start().await;
    mount_create(&server, "750F", "delete").await;
    Mock::given(method("PUT"))
        .and(body_string("Id\n001000000000001\n"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    mount_close(&server, "750F", "delete").await;
    let mut failed = job_json("750F", "Failed", "delete");
    failed["errorMessage"] = serde_json::json!("InvalidBatch : Field name not found : Foo");
    Mock::given(method("GET"))
        .and(path(format!("{API}/jobs/ingest/750F")))
        .respond_with(ResponseTemplate::new(200).set_body_json(failed))
        .mount(&server)
        .await;

    let records = vec![serde_json::json!({"Id": "001000000000001", "Name": "ignored"})];
    let err = bulk_client(&server)
        .delete_bulk(&CancellationToken::new(), "Account", &records, 200, Wait::Completion)
        .await
        .unwrap_err();

    match &err.kind {
        ErrorKind::JobFailed { job_id, state, message } => {
            assert_eq!(job_id, "750F");
            assert_eq!(*state, JobState::Failed);
            assert!(message.contains("Field name not found"));
        }
        other => panic!("expected JobFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_aborted_job_stops_the_pipeline() {
    let server = MockServer::start().await;
    mount_create(&server, "750X", "update").await;
    Mock::given(method("PUT"))
        .and(body_string("Id,LastName\n003000000000001,Renamed\n"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    mount_close(&server, "750X", "update").await;
    mount_job_states(&server, "ingest", "750X", "update", &["InProgress", "Aborted"]).await;

    let records = vec![serde_json::json!({"Id": "003000000000001", "LastName": "Renamed"})];
    let err = bulk_client(&server)
        .update_bulk(&CancellationToken::new(), "Contact", &records, 200, Wait::Results)
        .await
        .unwrap_err();

    match &err.kind {
        ErrorKind::JobFailed { job_id, state, .. } => {
            assert_eq!(job_id, "750X");
            assert_eq!(*state, JobState::Aborted);
        }
        other => panic!("expected JobFailed, got {other:?}"),
    }
    let fetched_results = received(&server, "GET")
        .await
        .iter()
        .any(|r| r.url.path().ends_with("Results"));
    assert!(!fetched_results);
}

#[tokio::test]
async fn test_export_to_file() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{API}/jobs/query")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(job_json("750E", "UploadComplete", "query")),
        )
        .mount(&server)
        .await;
    mount_job_states(&server, "query", "750E", "query", &["JobComplete"]).await;
    Mock::given(method("GET"))
        .and(path(format!("{API}/jobs/query/750E/results")))
        .and(query_param("locator", "next"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Sforce-Locator", "null")
                .insert_header("Sforce-NumberOfRecords", "1")
                .set_body_string("Id,Name\n001B,Globex\n"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{API}/jobs/query/750E/results")))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Sforce-Locator", "next")
                .insert_header("Sforce-NumberOfRecords", "1")
                .set_body_string("Id,Name\n001A,Acme\n"),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("exports").join("accounts.csv");
    let summary = bulk_client(&server)
        .query_bulk_export(&CancellationToken::new(), "SELECT Id, Name FROM Account", &target)
        .await
        .unwrap();

    assert_eq!(summary.job_id, "750E");
    assert_eq!(summary.records, 2);
    let written = std::fs::read(&target).unwrap();
    let rows: Vec<AccountRow> = codec::decode_records(&written, ColumnDelimiter::Comma).unwrap();
    assert_eq!(
        rows,
        vec![
            AccountRow { id: "001A".into(), name: "Acme".into() },
            AccountRow { id: "001B".into(), name: "Globex".into() },
        ]
    );
}

#[test]
fn test_header_only_page_decodes_to_nothing() {
    let rows: Vec<AccountRow> =
        codec::decode_records(b"Id,Name\n", ColumnDelimiter::Comma).unwrap();
    assert!(rows.is_empty());
}
