//! HTTP-level integration tests for the field registry endpoints.

mod common;

use axum::http::StatusCode;
use common::{admin, app_user, body_json, delete, get, post_json, put_json};
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_field_returns_201_with_defaults(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = post_json(
        app,
        "/api/v1/fields/textareas",
        &admin(),
        json!({"label": "Purpose of visit", "required": true}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    let field = &json["data"];
    assert_eq!(field["type"], "textarea");
    assert_eq!(field["label"], "Purpose of visit");
    assert_eq!(field["rows"], 4);
    assert_eq!(field["required"], true);
    let id = field["field_id"].as_i64().unwrap();
    assert!((1..1_000_000).contains(&id));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_non_admin_cannot_create_field(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = post_json(
        app,
        "/api/v1/fields/textboxes",
        &app_user(),
        json!({"label": "Nickname"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_unknown_field_collection_returns_404(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = get(app, "/api/v1/fields/sliders", &app_user()).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_conflicting_type_in_body_is_rejected(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = post_json(
        app,
        "/api/v1/fields/dropdowns",
        &admin(),
        json!({"label": "Site", "type": "radio", "options": ["A"]}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_field_update_list_and_delete(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let created = body_json(
        post_json(
            app,
            "/api/v1/fields/dropdowns",
            &admin(),
            json!({"label": "Site", "options": [" North ", "", "South"]}),
        )
        .await,
    )
    .await;
    let id = created["data"]["field_id"].as_i64().unwrap();
    assert_eq!(created["data"]["options"], json!(["North", "South"]));

    let app = common::build_test_app(pool.clone());
    let response = put_json(
        app,
        &format!("/api/v1/fields/dropdowns/{id}"),
        &admin(),
        json!({"label": "Site", "options": ["North", "South", "East"]}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let app = common::build_test_app(pool.clone());
    let listed = body_json(get(app, "/api/v1/fields/dropdowns", &app_user()).await).await;
    assert_eq!(listed["data"].as_array().unwrap().len(), 1);
    assert_eq!(listed["data"][0]["options"][2], "East");

    let app = common::build_test_app(pool.clone());
    let response = delete(app, &format!("/api/v1/fields/dropdowns/{id}"), &admin()).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let app = common::build_test_app(pool);
    let response = get(app, &format!("/api/v1/fields/dropdowns/{id}"), &app_user()).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_duplicate_label_returns_409(pool: PgPool) {
    let body = json!({"label": "Email address"});
    let app = common::build_test_app(pool.clone());
    post_json(app, "/api/v1/fields/emailfields", &admin(), body.clone()).await;

    let app = common::build_test_app(pool);
    let response = post_json(app, "/api/v1/fields/emailfields", &admin(), body).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}
