//! Training group endpoint tests against the in-memory backend.

use axum::http::StatusCode;
use serde_json::json;
use uuid::Uuid;

mod common;

#[tokio::test]
async fn test_create_group_defaults_and_numbers_templates() {
    let (app, store) = common::create_test_app();
    let user = Uuid::new_v4();
    let exercise = store.add_exercise();

    let (status, group) = common::send(
        &app,
        "POST",
        "/groups",
        Some(user),
        Some(json!({
            "name": "  Bench  ",
            "exerciseRef": exercise,
            "sets": 4,
            "setTemplates": [
                { "reps": 10, "weight": 40.0 },
                { "reps": 8, "weight": 50.0, "restTimeSeconds": 120 }
            ]
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(group["name"], "Bench");
    assert_eq!(group["restTimeSeconds"], 60);
    assert_eq!(group["exerciseRef"], exercise.to_string());
    let templates = group["setTemplates"].as_array().unwrap();
    assert_eq!(templates.len(), 2);
    assert_eq!(templates[0]["setNumber"], 1);
    assert_eq!(templates[1]["setNumber"], 2);
    assert_eq!(templates[1]["restTimeSeconds"], 120);
}

#[tokio::test]
async fn test_create_group_rejects_invalid_input() {
    let (app, store) = common::create_test_app();
    let user = Uuid::new_v4();
    let exercise = store.add_exercise();

    let cases = [
        json!({ "name": "x", "exerciseRef": Uuid::new_v4(), "sets": 3 }),
        json!({ "name": "", "exerciseRef": exercise, "sets": 3 }),
        json!({ "name": "x", "exerciseRef": exercise, "sets": 0 }),
        json!({ "name": "x", "exerciseRef": exercise, "sets": 3, "repsMin": 12, "repsMax": 8 }),
        json!({ "name": "x", "exerciseRef": exercise, "sets": 3, "weightMin": -5.0 }),
        json!({ "name": "x", "exerciseRef": exercise, "sets": -1 }),
        json!({ "name": "x", "exerciseRef": exercise, "sets": 4294967295u32 }),
        json!({ "name": "x", "exerciseRef": exercise, "sets": 101 }),
        json!({ "name": "x", "exerciseRef": exercise, "sets": 3, "repsMax": 2147483648u32 }),
        json!({ "name": "x", "sets": 3 }),
    ];
    for body in cases {
        let (status, error) =
            common::send(&app, "POST", "/groups", Some(user), Some(body.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
        assert_eq!(error["error"], "validation_error", "{}", body);
    }
}

#[tokio::test]
async fn test_update_group_patches_and_replaces_templates() {
    let (app, store) = common::create_test_app();
    let user = Uuid::new_v4();
    let exercise = store.add_exercise();
    let group = common::create_group(&app, user, common::range_group("Row", exercise)).await;
    let uri = format!("/groups/{}", group);

    let (status, body) = common::send(
        &app,
        "PATCH",
        &uri,
        Some(user),
        Some(json!({ "sets": 5, "setTemplates": [{ "reps": 3 }] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sets"], 5);
    assert_eq!(body["name"], "Row");
    assert_eq!(body["repsMin"], 8);
    assert_eq!(body["setTemplates"].as_array().unwrap().len(), 1);

    let (_, body) =
        common::send(&app, "PATCH", &uri, Some(user), Some(json!({ "notes": "slow" }))).await;
    assert_eq!(body["notes"], "slow");
    assert_eq!(body["setTemplates"].as_array().unwrap().len(), 1);

    let (status, body) = common::send(
        &app,
        "PATCH",
        &uri,
        Some(user),
        Some(json!({ "exerciseRef": Uuid::new_v4() })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn test_delete_group_guarded_by_active_plans() {
    let (app, store) = common::create_test_app();
    let user = Uuid::new_v4();
    let exercise = store.add_exercise();
    let group = common::create_group(&app, user, common::range_group("Dip", exercise)).await;
    let plan = common::create_plan(&app, user, "Arms", &[group]).await;
    let uri = format!("/groups/{}", group);

    let (status, body) = common::send(&app, "DELETE", &uri, Some(user), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");

    let (status, _) =
        common::send(&app, "DELETE", &format!("/plans/{}", plan), Some(user), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = common::send(&app, "DELETE", &uri, Some(user), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = common::send(&app, "GET", &uri, Some(user), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_groups_list_sorts_and_scopes() {
    let (app, store) = common::create_test_app();
    let user = Uuid::new_v4();
    let exercise = store.add_exercise();
    for name in ["curl", "Bench", "Squat"] {
        common::create_group(&app, user, common::range_group(name, exercise)).await;
    }
    common::create_group(&app, Uuid::new_v4(), common::range_group("Other", exercise)).await;

    let (status, page) = common::send(
        &app,
        "GET",
        "/groups?sortBy=name&order=asc",
        Some(user),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 3);
    let names: Vec<_> = page["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|g| g["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, ["Bench", "curl", "Squat"]);

    let (status, body) = common::send(&app, "GET", "/groups?sortBy=weight", Some(user), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn test_groups_of_other_users_are_not_found() {
    let (app, store) = common::create_test_app();
    let owner = Uuid::new_v4();
    let exercise = store.add_exercise();
    let group = common::create_group(&app, owner, common::range_group("Lunge", exercise)).await;
    let uri = format!("/groups/{}", group);
    let stranger = Some(Uuid::new_v4());

    let (status, _) = common::send(&app, "GET", &uri, stranger, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = common::send(&app, "PATCH", &uri, stranger, Some(json!({ "sets": 1 }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = common::send(&app, "DELETE", &uri, stranger, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = common::send(
        &app,
        "POST",
        "/plans",
        stranger,
        Some(json!({ "name": "Stolen", "groupIds": [group] })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}
