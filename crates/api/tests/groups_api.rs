//! HTTP-level integration tests for group transitions and the listing
//! screens.

mod common;

use axum::http::StatusCode;
use common::{admin, app_user, body_json, get, patch_json, post_json, supervisor};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

const SYSTEM: i64 = 3;
const GROUP: i64 = 55;

/// A form with one required text field and a group of `members` filled
/// records plus one filled single. Returns `(form_id, field_id)`.
async fn seed_group(pool: &PgPool, members: usize) -> (i64, i64) {
    let app = common::build_test_app(pool.clone());
    let json = body_json(
        post_json(
            app,
            "/api/v1/fields/textboxes",
            &admin(),
            json!({"label": "Full name", "required": true}),
        )
        .await,
    )
    .await;
    let field_id = json["data"]["field_id"].as_i64().unwrap();

    let app = common::build_test_app(pool.clone());
    let json = body_json(post_json(app, "/api/v1/forms", &admin(), json!({"name": "Escort"})).await).await;
    let form_id = json["data"]["form_id"].as_i64().unwrap();

    let app = common::build_test_app(pool.clone());
    patch_json(
        app,
        &format!("/api/v1/build-form/{form_id}"),
        &admin(),
        json!({"field_ids": [field_id]}),
    )
    .await;

    for i in 0..=members {
        let group = if i < members { json!(GROUP) } else { json!(null) };
        let app = common::build_test_app(pool.clone());
        let response = patch_json(
            app,
            &format!("/api/v1/form-response/{}/{form_id}/{SYSTEM}", Uuid::new_v4()),
            &app_user(),
            json!({"fields": {(field_id.to_string()): format!("Visitor {i}")}, "groupId": group}),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    (form_id, field_id)
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_group_submit_then_decide(pool: PgPool) {
    let (form_id, _) = seed_group(&pool, 3).await;
    let base = format!("/api/v1/form-groups/{GROUP}/{form_id}/{SYSTEM}");

    let app = common::build_test_app(pool.clone());
    let response = post_json(app, &format!("{base}/submit"), &app_user(), json!({})).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["succeeded"].as_array().unwrap().len(), 3);
    assert_eq!(json["data"]["skipped"], json!([]));

    // Repeating is a no-op for members already submitted.
    let app = common::build_test_app(pool.clone());
    let json = body_json(post_json(app, &format!("{base}/submit"), &app_user(), json!({})).await).await;
    assert_eq!(json["data"]["succeeded"], json!([]));
    assert_eq!(json["data"]["skipped"].as_array().unwrap().len(), 3);

    let app = common::build_test_app(pool.clone());
    let response = post_json(
        app,
        &format!("{base}/decide"),
        &supervisor(),
        json!({"approved": "true", "comment": "ok"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["succeeded"].as_array().unwrap().len(), 3);

    let app = common::build_test_app(pool);
    let json = body_json(
        get(
            app,
            &format!("/api/v1/systems/{SYSTEM}/forms/{form_id}/response-status?approved=approved"),
            &supervisor(),
        )
        .await,
    )
    .await;
    assert_eq!(json["data"].as_array().unwrap().len(), 3);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_group_submit_by_reviewer_is_rejected_up_front(pool: PgPool) {
    let (form_id, _) = seed_group(&pool, 2).await;

    let app = common::build_test_app(pool.clone());
    let response = post_json(
        app,
        &format!("/api/v1/form-groups/{GROUP}/{form_id}/{SYSTEM}/submit"),
        &supervisor(),
        json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let app = common::build_test_app(pool);
    let json = body_json(
        get(
            app,
            &format!("/api/v1/systems/{SYSTEM}/forms/{form_id}/response-status?status=submitted"),
            &supervisor(),
        )
        .await,
    )
    .await;
    assert_eq!(json["data"], json!([]));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_unknown_group_is_not_found(pool: PgPool) {
    let (form_id, _) = seed_group(&pool, 1).await;
    let app = common::build_test_app(pool);
    let response = post_json(
        app,
        &format!("/api/v1/form-groups/999/{form_id}/{SYSTEM}/submit"),
        &app_user(),
        json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_view_aggregates_groups_and_singles(pool: PgPool) {
    let (form_id, _) = seed_group(&pool, 3).await;
    let view = format!("/api/v1/systems/{SYSTEM}/forms/{form_id}/responses/view");

    let app = common::build_test_app(pool.clone());
    let response = get(app, &view, &supervisor()).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["total_items"], 2);
    assert_eq!(json["data"]["page"], 1);

    let app = common::build_test_app(pool.clone());
    let json = body_json(get(app, &format!("{view}?view=groups"), &supervisor()).await).await;
    let items = json["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["kind"], "group");
    assert_eq!(items[0]["group_id"], GROUP);
    assert_eq!(items[0]["member_count"], 3);
    assert_eq!(items[0]["progress"], "in_progress");

    let app = common::build_test_app(pool.clone());
    let json = body_json(get(app, &format!("{view}?view=singles&page=0"), &supervisor()).await).await;
    assert_eq!(json["data"]["page"], 1);
    assert_eq!(json["data"]["items"][0]["kind"], "single");

    let app = common::build_test_app(pool);
    let response = get(
        app,
        &format!("{view}?from=2024-02-01&to=2024-01-01"),
        &supervisor(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
