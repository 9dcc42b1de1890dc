mod common;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use funil_crm::{
    common::clock::SharedClock,
    db::seed::seed_defaults,
    models::auth::UserRole,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use common::{app_at, PASSWORD};

async fn call(app: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn login(app: &Router, email: &str, password: &str) -> String {
    let (status, body) = call(
        app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": email, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn seeded_admin_logs_in_and_reads_templates() {
    let test = app_at(2024, 5, 15, 10);
    let clock: SharedClock = Arc::new(test.clock.clone());
    seed_defaults(&test.store, &test.state.config, &clock).await.unwrap();
    let app = funil_crm::router(test.state.clone());

    let token = login(&app, "admin@portal.com", "Portal2025*").await;
    let (status, me) = call(&app, Method::GET, "/api/users/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["role"], "ADMIN");

    let (_, templates) = call(&app, Method::GET, "/api/settings/message-templates", Some(&token), None).await;
    assert_eq!(templates.as_array().unwrap().len(), 6);
    let (_, squads) = call(&app, Method::GET, "/api/squads", Some(&token), None).await;
    assert_eq!(squads[0]["name"], "Squad 1 - Alpha");
}

#[tokio::test]
async fn protected_routes_need_a_token() {
    let test = app_at(2024, 5, 15, 10);
    let app = funil_crm::router(test.state.clone());

    let (status, _) = call(&app, Method::GET, "/api/crm/leads", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = call(&app, Method::GET, "/api/crm/leads", Some("invalido"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = call(&app, Method::GET, "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn lead_lifecycle_over_http() {
    let test = app_at(2024, 5, 15, 10);
    let seller = test.add_user("Gabi", UserRole::Salesperson, None).await;
    let other = test.add_user("Hugo", UserRole::Salesperson, None).await;
    let app = funil_crm::router(test.state.clone());
    let token = login(&app, &seller.email, PASSWORD).await;
    let other_token = login(&app, &other.email, PASSWORD).await;

    let (status, errors) = call(
        &app,
        Method::POST,
        "/api/crm/leads",
        Some(&token),
        Some(json!({ "name": "", "phone": "81999990000", "notes": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(errors["details"]["name"].is_array());

    let (status, lead) = call(
        &app,
        Method::POST,
        "/api/crm/leads",
        Some(&token),
        Some(json!({
            "name": "Iara",
            "phone": "81999990000",
            "value": 12000.0,
            "stage": "PROPOSAL_SENT",
            "notes": [{ "content": "Pediu proposta", "type": "call" }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{lead}");
    assert_eq!(lead["isOverdue"], false);
    let id = lead["id"].as_str().unwrap().to_string();

    let (status, _) = call(
        &app,
        Method::PUT,
        &format!("/api/crm/leads/{id}/stage"),
        Some(&token),
        Some(json!({ "stage": "ARQUIVADO" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(
        &app,
        Method::PUT,
        &format!("/api/crm/leads/{id}/stage"),
        Some(&other_token),
        Some(json!({ "stage": "WON" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, moved) = call(
        &app,
        Method::PUT,
        &format!("/api/crm/leads/{id}/stage"),
        Some(&token),
        Some(json!({ "stage": "NEGOTIATION" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(moved["stage"], "NEGOTIATION");

    let (status, noted) = call(
        &app,
        Method::POST,
        &format!("/api/crm/leads/{id}/notes"),
        Some(&token),
        Some(json!({ "content": "Retornou a ligação", "type": "call" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(noted["notes"][0]["content"], "Retornou a ligação");

    let (_, board) = call(&app, Method::GET, "/api/crm/board", Some(&token), None).await;
    assert_eq!(board["totalPipelineValue"], 12000.0);

    let (status, _) = call(&app, Method::DELETE, &format!("/api/crm/leads/{id}"), Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = call(&app, Method::GET, &format!("/api/crm/leads/{id}"), Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn workspace_load_pushes_notifications_into_the_inbox() {
    let test = app_at(2024, 5, 15, 10);
    let seller = test.add_user("Joana", UserRole::Salesperson, None).await;
    let app = funil_crm::router(test.state.clone());
    let token = login(&app, &seller.email, PASSWORD).await;

    call(
        &app,
        Method::POST,
        "/api/crm/leads",
        Some(&token),
        Some(json!({
            "name": "Karla",
            "company": "Jaboatão",
            "phone": "81999990000",
            "value": 25000.0,
            "stage": "PROPOSAL_SENT",
            "nextFollowUp": "2024-05-10",
            "notes": [{ "content": "Proposta enviada" }]
        })),
    )
    .await;

    let (status, workspace) = call(&app, Method::GET, "/api/crm/workspace", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(workspace["leads"][0]["isOverdue"], true);
    assert_eq!(workspace["notifications"]["unreadCount"], 2);

    let (_, feed) = call(&app, Method::POST, "/api/notifications/evaluate", Some(&token), None).await;
    assert_eq!(feed["unreadCount"], 2);

    let (_, feed) = call(&app, Method::POST, "/api/notifications/read-all", Some(&token), None).await;
    assert_eq!(feed["unreadCount"], 0);
    let (_, feed) = call(&app, Method::DELETE, "/api/notifications", Some(&token), None).await;
    assert_eq!(feed["notifications"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn missing_lead_fields_come_back_as_field_errors() {
    let test = app_at(2024, 5, 15, 10);
    let seller = test.add_user("Lia", UserRole::Salesperson, None).await;
    let app = funil_crm::router(test.state.clone());
    let token = login(&app, &seller.email, PASSWORD).await;

    let (status, errors) = call(
        &app,
        Method::POST,
        "/api/crm/leads",
        Some(&token),
        Some(json!({ "phone": "81", "value": 10.0, "notes": [{ "content": "Oi" }] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(errors["details"]["name"].is_array());
    assert!(errors["details"].get("value").is_none());

    let (status, errors) = call(
        &app,
        Method::POST,
        "/api/crm/leads",
        Some(&token),
        Some(json!({ "name": "Mia", "value": 10.0, "notes": [{ "content": "Oi" }] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(errors["details"]["phone"].is_array());
}

#[tokio::test]
async fn lead_list_and_board_accept_a_text_filter() {
    let test = app_at(2024, 5, 15, 10);
    let seller = test.add_user("Nina", UserRole::Salesperson, None).await;
    let app = funil_crm::router(test.state.clone());
    let token = login(&app, &seller.email, PASSWORD).await;

    for (name, value) in [("Olga", 1000.0), ("Paulo", 3000.0)] {
        let (status, _) = call(
            &app,
            Method::POST,
            "/api/crm/leads",
            Some(&token),
            Some(json!({
                "name": name,
                "phone": "81999990000",
                "value": value,
                "notes": [{ "content": "Primeiro contato" }]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, leads) = call(&app, Method::GET, "/api/crm/leads?q=olg", Some(&token), None).await;
    assert_eq!(leads.as_array().unwrap().len(), 1);
    assert_eq!(leads[0]["name"], "Olga");

    let (_, board) = call(&app, Method::GET, "/api/crm/board?q=paulo", Some(&token), None).await;
    assert_eq!(board["totalPipelineValue"], 3000.0);
    let (_, board) = call(&app, Method::GET, "/api/crm/board", Some(&token), None).await;
    assert_eq!(board["totalPipelineValue"], 4000.0);
}
