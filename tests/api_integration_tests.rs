mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;
use tradeplan_backend::models::trading_plan::ChannelInfo;
use tradeplan_backend::services::history::DayWindow;

use crate::common::{build_test_app, plan, seed};

fn at(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 12, day)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

async fn get(router: axum::Router, uri: &str) -> (StatusCode, Value) {
    let response = router
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

async fn next_frame(body: &mut Body) -> String {
    loop {
        let frame = body.frame().await.unwrap().unwrap();
        if let Ok(data) = frame.into_data() {
            return String::from_utf8(data.to_vec()).unwrap();
        }
    }
}

#[tokio::test]
async fn test_root_banner() {
    let app = build_test_app(None);
    let response = app
        .router
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_history_newest_first_with_previous() {
    let app = build_test_app(None);
    seed(
        &app.store,
        &[
            plan(1, "BBCA", at(18, 9)),
            plan(2, "TLKM", at(18, 10)),
            plan(3, "BBCA", at(19, 9)),
        ],
    )
    .await;

    let (status, json) = get(app.router, "/history").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 3);
    assert_eq!(json["skip"], 0);
    assert_eq!(json["limit"], 50);

    let plans = json["trading_plans"].as_array().unwrap();
    let ids: Vec<i64> = plans.iter().map(|p| p["message_id"].as_i64().unwrap()).collect();
    assert_eq!(ids, vec![3, 2, 1]);

    assert_eq!(plans[0]["name"], "BBCA");
    assert_eq!(plans[0]["datetime"], "2025-12-19T09:00:00");
    assert_eq!(plans[0]["previous"]["message_id"], 1);
    assert!(plans[1]["previous"].is_null());
}

#[tokio::test]
async fn test_history_symbol_filter_is_case_insensitive() {
    let app = build_test_app(None);
    seed(
        &app.store,
        &[plan(1, "BBCA", at(18, 9)), plan(2, "TLKM", at(18, 10))],
    )
    .await;

    let (status, json) = get(app.router, "/history?stock_name=bbca").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 1);
    assert_eq!(json["trading_plans"][0]["name"], "BBCA");
}

#[tokio::test]
async fn test_history_pagination() {
    let app = build_test_app(None);
    let plans: Vec<_> = (1..=5).map(|i| plan(i, "BBCA", at(10 + i as u32, 9))).collect();
    seed(&app.store, &plans).await;

    let (_, json) = get(app.router, "/history?skip=1&limit=2").await;
    assert_eq!(json["skip"], 1);
    assert_eq!(json["limit"], 2);
    let ids: Vec<i64> = json["trading_plans"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["message_id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![4, 3]);
}

#[tokio::test]
async fn test_history_rejects_malformed_query() {
    let app = build_test_app(None);
    let (status, _) = get(app.router, "/history?skip=abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_history_today_excludes_older_days() {
    let app = build_test_app(None);
    let today = DayWindow::today().start + Duration::hours(1);
    seed(
        &app.store,
        &[plan(1, "BBCA", at(18, 9)), plan(2, "BBCA", today)],
    )
    .await;

    let (status, json) = get(app.router, "/history/today").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 1);
    assert_eq!(json["trading_plans"][0]["message_id"], 2);
    // the earlier plan is outside today's window
    assert!(json["trading_plans"][0]["previous"].is_null());
}

#[tokio::test]
async fn test_channels_listed() {
    let app = build_test_app(Some(vec![ChannelInfo {
        id: -1001234567890,
        name: "Stock Plans".to_string(),
    }]));

    let (status, json) = get(app.router, "/channels").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["channels"][0]["id"], -1001234567890i64);
    assert_eq!(json["channels"][0]["name"], "Stock Plans");
}

#[tokio::test]
async fn test_channels_failure_is_bad_gateway() {
    let app = build_test_app(None);

    let (status, json) = get(app.router, "/channels").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["code"], "CHANNEL_ERROR");
}

#[tokio::test]
async fn test_health_reports_listener_and_subscribers() {
    let app = build_test_app(None);
    let _subscription = app.hub.subscribe();

    let (status, json) = get(app.router, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["listener"]["state"], "starting");
    assert_eq!(json["listener"]["processed_count"], 0);
    assert_eq!(json["subscribers"], 1);
}

#[tokio::test]
async fn test_alert_stream_delivers_published_plan() {
    let app = build_test_app(None);
    let response = app
        .router
        .oneshot(Request::builder().uri("/alert").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "text/event-stream"
    );
    assert_eq!(app.hub.subscriber_count(), 1);

    let mut body = response.into_body();
    assert_eq!(next_frame(&mut body).await, ": connected\n\n");

    app.hub.publish(plan(7, "BBCA", at(19, 10)));
    let frame = next_frame(&mut body).await;
    let json: Value = serde_json::from_str(frame.trim_start_matches("data: ").trim_end()).unwrap();
    assert_eq!(json["message_id"], 7);
    assert_eq!(json["buy"], serde_json::json!([9000, 9050]));

    drop(body);
    assert_eq!(app.hub.subscriber_count(), 0);
}

#[tokio::test]
async fn test_filtered_alert_stream() {
    let app = build_test_app(None);
    let response = app
        .router
        .oneshot(Request::builder().uri("/alert/bbca").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let mut body = response.into_body();
    assert_eq!(next_frame(&mut body).await, ": connected\n\n");

    app.hub.publish(plan(1, "TLKM", at(19, 10)));
    app.hub.publish(plan(2, "BBCA", at(19, 11)));

    let frame = next_frame(&mut body).await;
    assert!(frame.contains("\"message_id\":2"));
    assert!(!frame.contains("TLKM"));
}
