//! Integration tests for the `/api/v1/jobs` resource, driving the full
//! stack: router, handlers, queue manager, worker loops, all over an
//! in-memory store with a scripted generator.

mod common;

use axum::http::StatusCode;
use common::{body_json, build_test_app, delete, get, post_json, ScriptedGenerator};
use serde_json::json;

fn batch(titles: &[&str]) -> serde_json::Value {
    let items: Vec<_> = titles
        .iter()
        .enumerate()
        .map(|(i, t)| {
            json!({
                "ratingKey": format!("rk-{i}"),
                "title": t,
                "year": 2000,
                "type": "movie",
            })
        })
        .collect();
    json!({
        "libraryKey": "1",
        "items": items,
        "model": "sdxl-turbo",
        "style": "minimalist",
    })
}

// ---------------------------------------------------------------------------
// Create + full lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_job_runs_batch_to_completion() {
    let t = build_test_app(ScriptedGenerator::new(&[]));

    let response = post_json(t.app.clone(), "/api/v1/jobs", batch(&["Alien", "Heat"])).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let created = body_json(response).await;
    assert_eq!(created["data"]["status"], "pending");
    assert_eq!(created["data"]["totalItems"], 2);
    let job_id: uuid::Uuid = created["data"]["id"].as_str().unwrap().parse().unwrap();

    let done = common::wait_terminal(&t.manager, &job_id).await;
    assert_eq!(done.completed_items, 2);

    // The API view reflects the final state.
    let response = get(t.app.clone(), &format!("/api/v1/jobs/{job_id}")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let fetched = body_json(response).await;
    assert_eq!(fetched["data"]["status"], "completed");
    assert_eq!(fetched["data"]["progress"], 100);

    // Both posters were delivered in order.
    assert_eq!(
        t.sink.delivered.lock().unwrap().as_slice(),
        ["rk-0", "rk-1"]
    );
}

#[tokio::test]
async fn partially_failing_batch_reports_errors() {
    let t = build_test_app(ScriptedGenerator::new(&["Alien"]));

    let response = post_json(t.app.clone(), "/api/v1/jobs", batch(&["Alien", "Heat"])).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let job_id: uuid::Uuid = body_json(response).await["data"]["id"]
        .as_str()
        .unwrap()
        .parse()
        .unwrap();

    let done = common::wait_terminal(&t.manager, &job_id).await;
    assert_eq!(done.status.as_str(), "completed");
    assert_eq!(done.completed_items, 1);
    assert_eq!(done.failed_items, 1);

    let fetched = body_json(get(t.app.clone(), &format!("/api/v1/jobs/{job_id}")).await).await;
    let errors = fetched["data"]["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["ratingKey"], "rk-0");
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn empty_batch_is_rejected() {
    let t = build_test_app(ScriptedGenerator::new(&[]));

    let body = json!({
        "libraryKey": "1",
        "items": [],
        "model": "sdxl-turbo",
        "style": "minimalist",
    });
    let response = post_json(t.app.clone(), "/api/v1/jobs", body).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn blank_model_is_rejected() {
    let t = build_test_app(ScriptedGenerator::new(&[]));

    let mut body = batch(&["Alien"]);
    body["model"] = json!("  ");
    let response = post_json(t.app.clone(), "/api/v1/jobs", body).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_and_active_views_diverge_after_completion() {
    let t = build_test_app(ScriptedGenerator::new(&[]));

    let response = post_json(t.app.clone(), "/api/v1/jobs", batch(&["Alien"])).await;
    let job_id: uuid::Uuid = body_json(response).await["data"]["id"]
        .as_str()
        .unwrap()
        .parse()
        .unwrap();
    common::wait_terminal(&t.manager, &job_id).await;

    let all = body_json(get(t.app.clone(), "/api/v1/jobs").await).await;
    assert_eq!(all["data"].as_array().unwrap().len(), 1);

    let active = body_json(get(t.app.clone(), "/api/v1/jobs/active").await).await;
    assert_eq!(active["data"].as_array().unwrap().len(), 0);
}

// ---------------------------------------------------------------------------
// Pause / resume
// ---------------------------------------------------------------------------

#[tokio::test]
async fn pause_completed_job_is_conflict() {
    let t = build_test_app(ScriptedGenerator::new(&[]));

    let response = post_json(t.app.clone(), "/api/v1/jobs", batch(&["Alien"])).await;
    let job_id: uuid::Uuid = body_json(response).await["data"]["id"]
        .as_str()
        .unwrap()
        .parse()
        .unwrap();
    common::wait_terminal(&t.manager, &job_id).await;

    let response = post_json(
        t.app.clone(),
        &format!("/api/v1/jobs/{job_id}/pause"),
        json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "CONFLICT");
}

#[tokio::test]
async fn resume_unpaused_job_is_conflict() {
    let t = build_test_app(ScriptedGenerator::new(&[]));

    let response = post_json(t.app.clone(), "/api/v1/jobs", batch(&["Alien"])).await;
    let job_id: uuid::Uuid = body_json(response).await["data"]["id"]
        .as_str()
        .unwrap()
        .parse()
        .unwrap();
    common::wait_terminal(&t.manager, &job_id).await;

    let response = post_json(
        t.app.clone(),
        &format!("/api/v1/jobs/{job_id}/resume"),
        json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

#[tokio::test]
async fn delete_job_purges_it() {
    let t = build_test_app(ScriptedGenerator::new(&[]));

    let response = post_json(t.app.clone(), "/api/v1/jobs", batch(&["Alien"])).await;
    let job_id: uuid::Uuid = body_json(response).await["data"]["id"]
        .as_str()
        .unwrap()
        .parse()
        .unwrap();
    common::wait_terminal(&t.manager, &job_id).await;

    let response = delete(t.app.clone(), &format!("/api/v1/jobs/{job_id}")).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = get(t.app.clone(), &format!("/api/v1/jobs/{job_id}")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "NOT_FOUND");
}

#[tokio::test]
async fn delete_missing_job_is_not_found() {
    let t = build_test_app(ScriptedGenerator::new(&[]));

    let response = delete(
        t.app.clone(),
        &format!("/api/v1/jobs/{}", uuid::Uuid::new_v4()),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
