//! REST gateway against a local warp server

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use studio_draft::{
    EntityId, PanelBuilder, PersistOutcome, PersistenceError, PersistenceGateway, RelationLink,
};
use studio_entities::{
    CustomFieldGateway, RestConfig, RestGateway, TaskChange, TaskKind, TaskPriority,
};
use warp::http::StatusCode;
use warp::{Filter, Reply};

type Log = Arc<Mutex<Vec<(String, Value)>>>;

fn stamped(mut body: Value, id: i64) -> Value {
    body["id"] = json!(id);
    body["created_at"] = json!("2026-01-01T00:00:00Z");
    body["updated_at"] = json!("2026-01-02T00:00:00Z");
    body
}

async fn spawn_server() -> (SocketAddr, Log) {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let with_log = {
        let log = log.clone();
        warp::any().map(move || log.clone())
    };

    let create = warp::post()
        .and(warp::path!("api" / "tasks"))
        .and(warp::header::optional::<String>("authorization"))
        .and(warp::body::json())
        .and(with_log.clone())
        .map(|auth: Option<String>, body: Value, log: Log| {
            log.lock().push(("authorization".into(), json!(auth)));
            log.lock().push(("POST /tasks".into(), body.clone()));
            warp::reply::with_status(warp::reply::json(&stamped(body, 77)), StatusCode::CREATED)
        });

    let update = warp::patch()
        .and(warp::path!("api" / "tasks" / i64))
        .and(warp::body::json())
        .and(with_log.clone())
        .map(|id: i64, body: Value, log: Log| {
            log.lock().push((format!("PATCH /tasks/{id}"), body.clone()));
            if id == 404 {
                return StatusCode::NOT_FOUND.into_response();
            }
            let mut task = json!({"title": "Mix notes", "description": null});
            if let (Some(target), Value::Object(patch)) = (task.as_object_mut(), body) {
                target.extend(patch);
            }
            warp::reply::json(&stamped(task, id)).into_response()
        });

    let link = warp::post()
        .and(warp::path!("api" / "tasks" / i64 / "relations" / String))
        .and(warp::body::json())
        .and(with_log.clone())
        .map(|id: i64, domain: String, body: Value, log: Log| {
            log.lock()
                .push((format!("POST /tasks/{id}/relations/{domain}"), body));
            StatusCode::NO_CONTENT
        });

    let unlink = warp::delete()
        .and(warp::path!("api" / "tasks" / i64 / "relations" / String))
        .and(with_log.clone())
        .map(|id: i64, domain: String, log: Log| {
            log.lock()
                .push((format!("DELETE /tasks/{id}/relations/{domain}"), Value::Null));
            StatusCode::NO_CONTENT
        });

    let delete = warp::delete()
        .and(warp::path!("api" / "tasks" / i64))
        .map(|id: i64| {
            if id == 77 {
                StatusCode::NO_CONTENT
            } else {
                StatusCode::NOT_FOUND
            }
        });

    let custom_fields = warp::put()
        .and(warp::path!("api" / "tasks" / i64 / "custom-fields"))
        .and(warp::body::json())
        .map(|_id: i64, _body: Value| {
            warp::reply::with_status(
                warp::reply::json(&json!({"message": "unknown field severity"})),
                StatusCode::UNPROCESSABLE_ENTITY,
            )
        });

    let routes = create
        .or(update)
        .or(link)
        .or(unlink)
        .or(delete)
        .or(custom_fields);
    let (addr, server) = warp::serve(routes).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);
    (addr, log)
}

fn gateway(addr: SocketAddr) -> Arc<RestGateway<TaskKind>> {
    let config = RestConfig::new(format!("http://{addr}/api")).with_token("secret");
    Arc::new(RestGateway::new(config).unwrap())
}

#[tokio::test]
async fn panel_creates_and_links_over_http() {
    let (addr, log) = spawn_server().await;
    let panel = PanelBuilder::new(gateway(addr)).open_create();

    panel
        .record_relation(RelationLink::new("campaign", 7))
        .await
        .unwrap();
    panel.set_field(TaskChange::Title("Over the wire".into())).unwrap();
    let report = panel.close().await;

    assert_eq!(report.outcome, PersistOutcome::Created(EntityId(77)));
    let log = log.lock().clone();
    assert_eq!(log[0], ("authorization".to_string(), json!("Bearer secret")));
    assert_eq!(log[1].0, "POST /tasks");
    assert_eq!(log[1].1["title"], json!("Over the wire"));
    assert_eq!(
        log[2],
        (
            "POST /tasks/77/relations/campaign".to_string(),
            json!({"related_id": 7, "extra": null})
        )
    );
}

#[tokio::test]
async fn update_sends_merged_patch() {
    let (addr, log) = spawn_server().await;
    let gateway = gateway(addr);

    let task = gateway
        .update(
            EntityId(42),
            &[
                TaskChange::Priority(TaskPriority::Urgent),
                TaskChange::Description("notes".into()),
            ],
        )
        .await
        .unwrap();

    assert_eq!(task.id, EntityId(42));
    assert_eq!(task.fields.priority, TaskPriority::Urgent);
    assert_eq!(
        log.lock()[0],
        (
            "PATCH /tasks/42".to_string(),
            json!({"priority": "urgent", "description": "notes"})
        )
    );
}

#[tokio::test]
async fn statuses_map_to_persistence_errors() {
    let (addr, _log) = spawn_server().await;
    let gateway = gateway(addr);

    assert!(matches!(
        gateway
            .update(EntityId(404), &[TaskChange::Title("gone".into())])
            .await,
        Err(PersistenceError::NotFound(_))
    ));
    assert!(matches!(
        gateway.delete(EntityId(5)).await,
        Err(PersistenceError::NotFound(_))
    ));
    gateway.delete(EntityId(77)).await.unwrap();
    gateway.unlink_relation(EntityId(77), "project").await.unwrap();

    let mut values = BTreeMap::new();
    values.insert("severity".to_string(), json!("p1"));
    assert_eq!(
        gateway.save_values(EntityId(77), &values).await,
        Err(PersistenceError::rejected(422, "unknown field severity"))
    );
}

#[tokio::test]
async fn refused_connection_is_network_error() {
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let gateway = gateway(SocketAddr::from(([127, 0, 0, 1], port)));

    let err = gateway.delete(EntityId(1)).await.unwrap_err();
    assert!(matches!(err, PersistenceError::Network(_)));
    assert!(err.is_retryable());
}
