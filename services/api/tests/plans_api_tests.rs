//! Training plan endpoint tests against the in-memory backend.

use axum::http::StatusCode;
use serde_json::json;
use uuid::Uuid;

mod common;

#[tokio::test]
async fn test_requests_without_user_header_are_rejected() {
    let (app, _) = common::create_test_app();

    let (status, body) = common::send(&app, "GET", "/plans", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    let (status, _) = common::send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_malformed_user_header_is_rejected() {
    let (app, _) = common::create_test_app();
    let request = axum::http::Request::builder()
        .uri("/plans")
        .header("x-user-id", "not-a-uuid")
        .body(axum::body::Body::empty())
        .unwrap();

    let response = tower::ServiceExt::oneshot(app, request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_plan_keeps_group_order() {
    let (app, store) = common::create_test_app();
    let user = Uuid::new_v4();
    let exercise = store.add_exercise();
    let squat = common::create_group(&app, user, common::range_group("Squat", exercise)).await;
    let press = common::create_group(&app, user, common::range_group("Press", exercise)).await;

    let (status, plan) = common::send(
        &app,
        "POST",
        "/plans",
        Some(user),
        Some(json!({
            "name": "Leg day",
            "description": "Heavy",
            "groupIds": [press, squat, press]
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(plan["status"], "DRAFT");
    assert_eq!(plan["isTemplate"], false);
    let groups = plan["groups"].as_array().unwrap();
    assert_eq!(groups.len(), 3);
    for (i, expected) in [press, squat, press].iter().enumerate() {
        assert_eq!(groups[i]["orderIndex"], i as u64);
        assert_eq!(groups[i]["groupId"], expected.to_string());
        assert_eq!(groups[i]["group"]["id"], expected.to_string());
    }
}

#[tokio::test]
async fn test_create_plan_validation_errors() {
    let (app, _) = common::create_test_app();
    let user = Uuid::new_v4();

    let (status, body) =
        common::send(&app, "POST", "/plans", Some(user), Some(json!({ "name": "  " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, body) = common::send(
        &app,
        "POST",
        "/plans",
        Some(user),
        Some(json!({ "name": "x", "status": "SOMEDAY" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, body) = common::send(
        &app,
        "POST",
        "/plans",
        Some(user),
        Some(json!({ "name": "x", "groupIds": [Uuid::new_v4()] })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn test_update_plan_replaces_groups_only_when_given() {
    let (app, store) = common::create_test_app();
    let user = Uuid::new_v4();
    let exercise = store.add_exercise();
    let a = common::create_group(&app, user, common::range_group("A", exercise)).await;
    let b = common::create_group(&app, user, common::range_group("B", exercise)).await;
    let plan = common::create_plan(&app, user, "Plan", &[a, b]).await;
    let uri = format!("/plans/{}", plan);

    let (status, body) = common::send(
        &app,
        "PATCH",
        &uri,
        Some(user),
        Some(json!({ "name": "Renamed", "status": "ACTIVE" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Renamed");
    assert_eq!(body["status"], "ACTIVE");
    assert_eq!(body["groups"].as_array().unwrap().len(), 2);

    let (status, body) =
        common::send(&app, "PATCH", &uri, Some(user), Some(json!({ "groupIds": [b] }))).await;
    assert_eq!(status, StatusCode::OK);
    let groups = body["groups"].as_array().unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0]["groupId"], b.to_string());
    assert_eq!(groups[0]["orderIndex"], 0);

    let (status, body) =
        common::send(&app, "PATCH", &uri, Some(user), Some(json!({ "groupIds": [] }))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["groups"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_duplicate_plan_resets_state() {
    let (app, store) = common::create_test_app();
    let user = Uuid::new_v4();
    let exercise = store.add_exercise();
    let a = common::create_group(&app, user, common::range_group("A", exercise)).await;
    let b = common::create_group(&app, user, common::range_group("B", exercise)).await;

    let (_, source) = common::send(
        &app,
        "POST",
        "/plans",
        Some(user),
        Some(json!({
            "name": "Push",
            "description": "Chest",
            "status": "ACTIVE",
            "planDate": "2026-03-01",
            "isTemplate": true,
            "isPublic": true,
            "groupIds": [b, a]
        })),
    )
    .await;

    let (status, copy) = common::send(
        &app,
        "POST",
        &format!("/plans/{}/duplicate", source["id"].as_str().unwrap()),
        Some(user),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_ne!(copy["id"], source["id"]);
    assert_eq!(copy["name"], "Push (Copy)");
    assert_eq!(copy["description"], "Chest");
    assert_eq!(copy["status"], "DRAFT");
    assert_eq!(copy["planDate"], serde_json::Value::Null);
    assert_eq!(copy["isTemplate"], false);
    assert_eq!(copy["isPublic"], false);
    let groups = copy["groups"].as_array().unwrap();
    assert_eq!(groups[0]["groupId"], b.to_string());
    assert_eq!(groups[1]["groupId"], a.to_string());
}

#[tokio::test]
async fn test_start_plan_builds_session_from_groups() {
    let (app, store) = common::create_test_app();
    let user = Uuid::new_v4();
    let exercise = store.add_exercise();
    let ranged = common::create_group(&app, user, common::range_group("Squat", exercise)).await;
    let explicit = common::create_group(
        &app,
        user,
        json!({
            "name": "Deadlift",
            "exerciseRef": exercise,
            "sets": 5,
            "setTemplates": [
                { "reps": 5, "weight": 100.0 },
                { "reps": 5, "weight": 105.0 }
            ]
        }),
    )
    .await;
    let plan = common::create_plan(&app, user, "Strength", &[ranged, explicit]).await;

    let (status, session) = common::send(
        &app,
        "POST",
        &format!("/plans/{}/start", plan),
        Some(user),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(session["name"], "Strength");
    assert_eq!(session["status"], "IN_PROGRESS");
    assert_eq!(session["planId"], plan.to_string());
    assert!(session["startTime"].is_string());

    let records = session["records"].as_array().unwrap();
    assert_eq!(records.len(), 2);

    assert_eq!(records[0]["orderIndex"], 0);
    assert_eq!(records[0]["groupId"], ranged.to_string());
    assert_eq!(records[0]["exerciseRef"], exercise.to_string());
    let sets = records[0]["sets"].as_array().unwrap();
    assert_eq!(sets.len(), 3);
    for (i, set) in sets.iter().enumerate() {
        assert_eq!(set["setNumber"], i as u64 + 1);
        assert_eq!(set["reps"], 8);
        assert_eq!(set["weight"], 60.0);
        assert_eq!(set["restTimeSeconds"], 90);
        assert_eq!(set["isCompleted"], false);
    }

    assert_eq!(records[1]["orderIndex"], 1);
    let sets = records[1]["sets"].as_array().unwrap();
    assert_eq!(sets.len(), 2);
    assert_eq!(sets[0]["weight"], 100.0);
    assert_eq!(sets[1]["weight"], 105.0);
    assert_eq!(sets[1]["setNumber"], 2);
    assert_eq!(sets[1]["isCompleted"], false);
}

#[tokio::test]
async fn test_start_plan_twice_creates_two_sessions() {
    let (app, _) = common::create_test_app();
    let user = Uuid::new_v4();
    let plan = common::create_plan(&app, user, "Empty", &[]).await;
    let uri = format!("/plans/{}/start", plan);

    let (_, first) = common::send(&app, "POST", &uri, Some(user), None).await;
    let (_, second) = common::send(&app, "POST", &uri, Some(user), None).await;
    assert_ne!(first["id"], second["id"]);
    assert!(first["records"].as_array().unwrap().is_empty());

    let (_, page) = common::send(
        &app,
        "GET",
        &format!("/sessions?planId={}", plan),
        Some(user),
        None,
    )
    .await;
    assert_eq!(page["total"], 2);
}

#[tokio::test]
async fn test_delete_plan_with_sessions_conflicts() {
    let (app, _) = common::create_test_app();
    let user = Uuid::new_v4();
    let used = common::create_plan(&app, user, "Used", &[]).await;
    let unused = common::create_plan(&app, user, "Unused", &[]).await;
    common::send(&app, "POST", &format!("/plans/{}/start", used), Some(user), None).await;

    let (status, body) =
        common::send(&app, "DELETE", &format!("/plans/{}", used), Some(user), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");

    let (status, _) =
        common::send(&app, "DELETE", &format!("/plans/{}", unused), Some(user), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) =
        common::send(&app, "GET", &format!("/plans/{}", unused), Some(user), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, page) = common::send(&app, "GET", "/plans", Some(user), None).await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["id"], used.to_string());
}

#[tokio::test]
async fn test_plans_are_scoped_to_their_owner() {
    let (app, _) = common::create_test_app();
    let owner = Uuid::new_v4();
    let stranger = Uuid::new_v4();
    let plan = common::create_plan(&app, owner, "Mine", &[]).await;
    let uri = format!("/plans/{}", plan);

    for (method, path) in [
        ("GET", uri.clone()),
        ("DELETE", uri.clone()),
        ("POST", format!("{}/duplicate", uri)),
        ("POST", format!("{}/start", uri)),
    ] {
        let (status, _) = common::send(&app, method, &path, Some(stranger), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{} {}", method, path);
    }

    let (_, page) = common::send(&app, "GET", "/plans", Some(stranger), None).await;
    assert_eq!(page["total"], 0);
}

#[tokio::test]
async fn test_list_plans_pages_and_filters() {
    let (app, _) = common::create_test_app();
    let user = Uuid::new_v4();
    for name in ["Upper A", "Upper B", "Lower"] {
        common::create_plan(&app, user, name, &[]).await;
    }

    let (status, page) = common::send(&app, "GET", "/plans?page=1&limit=2", Some(user), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["items"].as_array().unwrap().len(), 2);
    assert_eq!(page["total"], 3);
    assert_eq!(page["totalPages"], 2);
    assert_eq!(page["limit"], 2);

    let (_, page) = common::send(&app, "GET", "/plans?search=upper", Some(user), None).await;
    assert_eq!(page["total"], 2);

    let (_, page) = common::send(&app, "GET", "/plans?status=ACTIVE", Some(user), None).await;
    assert_eq!(page["total"], 0);

    let (status, body) = common::send(&app, "GET", "/plans?page=0", Some(user), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, _) = common::send(&app, "GET", "/plans?limit=1000", Some(user), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
