use chrono::{Duration, NaiveDate};
use salvo::prelude::*;
use salvo::test::{ResponseExt, TestClient};
use serde_json::{json, Value};

use crate::db::sqlite::test_support::{seed_room, seed_user};
use crate::domain::Role;
use crate::hotel::customers::CustomerInput;
use crate::hotel::test_support::{TestHotel, BOOTSTRAP_TOKEN};
use crate::web::{create_router, WebState};

const BASE: &str = "http://127.0.0.1:8080";

struct TestApi {
    hotel: TestHotel,
    service: Service,
}

impl TestApi {
    async fn new() -> Self {
        let hotel = TestHotel::new().await;
        let service = Service::new(create_router(WebState::new(hotel.core.clone())));
        Self { hotel, service }
    }

    fn today(&self) -> NaiveDate {
        self.hotel.core.today()
    }

    async fn get(&self, path: &str, token: &str) -> (StatusCode, Value) {
        let mut res = TestClient::get(format!("{BASE}{path}"))
            .bearer_auth(token)
            .send(&self.service)
            .await;
        read(&mut res).await
    }

    async fn send(
        &self,
        method: &str,
        path: &str,
        token: &str,
        body: Value,
    ) -> (StatusCode, Value) {
        let url = format!("{BASE}{path}");
        let client = match method {
            "POST" => TestClient::post(url),
            "PUT" => TestClient::put(url),
            "DELETE" => TestClient::delete(url),
            other => panic!("unsupported method {other}"),
        };
        let mut res = client.bearer_auth(token).json(&body).send(&self.service).await;
        read(&mut res).await
    }

    async fn post(&self, path: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send("POST", path, token, body).await
    }
}

async fn read(res: &mut Response) -> (StatusCode, Value) {
    let status = res.status_code.unwrap_or(StatusCode::OK);
    let body = res.take_string().await.unwrap_or_default();
    let value = serde_json::from_str(&body).unwrap_or(Value::String(body));
    (status, value)
}

#[tokio::test]
async fn public_routes_need_no_token() {
    let api = TestApi::new().await;
    let mut res = TestClient::get(format!("{BASE}/health")).send(&api.service).await;
    let (status, body) = read(&mut res).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let mut res = TestClient::get(format!("{BASE}/metrics")).send(&api.service).await;
    let text = res.take_string().await.unwrap();
    assert!(text.contains("# TYPE hrs_http_requests_total counter"));
}

#[tokio::test]
async fn protected_routes_reject_missing_and_unknown_tokens() {
    let api = TestApi::new().await;
    let mut res = TestClient::get(format!("{BASE}/me")).send(&api.service).await;
    let (status, body) = read(&mut res).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "missing bearer token");

    let (status, _) = api.get("/me", "not-a-real-token").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = api.get("/me", BOOTSTRAP_TOKEN).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["principal"]["role"], "admin");
    assert_eq!(body["permissions"]["manage-roles"]["granted"], true);
}

#[tokio::test]
async fn permissions_and_bad_input_map_to_statuses() {
    let api = TestApi::new().await;
    let desk = seed_user(&api.hotel.db, "desk", Role::Receptionist).await;

    let room_type = json!({ "name": "Suite", "base_price_cents": 20000, "capacity": 2 });
    let (status, _) = api.post("/room-types", &desk.api_token, room_type.clone()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, created) = api.post("/room-types", BOOTSTRAP_TOKEN, room_type.clone()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["name"], "Suite");

    let (status, _) = api.post("/room-types", BOOTSTRAP_TOKEN, room_type).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, listed) = api.get("/room-types", &desk.api_token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().map(Vec::len), Some(1));

    let (status, body) = api
        .get("/rooms/available?check_in=tomorrow&check_out=2030-01-02", BOOTSTRAP_TOKEN)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("check_in"));

    let (status, _) = api.get("/rooms/abc", BOOTSTRAP_TOKEN).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = api.get("/rooms/999", BOOTSTRAP_TOKEN).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = api
        .post("/customers", BOOTSTRAP_TOKEN, json!({ "full_name": "No Email" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn booking_through_check_out_over_http() {
    let api = TestApi::new().await;
    let (_, room_id) = seed_room(&api.hotel.db, "201", 2, 10_000).await;
    let today = api.today();

    let (status, customer) = api
        .post(
            "/customers",
            BOOTSTRAP_TOKEN,
            json!({ "full_name": "Grace Guest", "email": "grace@example.com" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let customer_id = customer["id"].as_i64().unwrap();

    let request = json!({
        "customer_id": customer_id,
        "room_id": room_id,
        "check_in": today.to_string(),
        "check_out": (today + Duration::days(2)).to_string(),
        "guests": 2,
    });
    let (status, booking) = api.post("/bookings", BOOTSTRAP_TOKEN, request.clone()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(booking["status"], "confirmed");
    assert_eq!(booking["total_price_cents"], 20_000);
    let booking_id = booking["id"].as_i64().unwrap();

    let (status, _) = api.post("/bookings", BOOTSTRAP_TOKEN, request).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, due) = api.get("/front-desk/check-ins", BOOTSTRAP_TOKEN).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(due[0]["id"], booking_id);

    let mut res = TestClient::post(format!("{BASE}/front-desk/check-ins/{booking_id}"))
        .bearer_auth(BOOTSTRAP_TOKEN)
        .send(&api.service)
        .await;
    let (status, checked_in) = read(&mut res).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(checked_in["booking"]["status"], "checked-in");

    let (status, _) = api
        .post(&format!("/front-desk/check-ins/{booking_id}"), BOOTSTRAP_TOKEN, json!({}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, stay) = api
        .post(
            &format!("/front-desk/stays/{booking_id}/charges"),
            BOOTSTRAP_TOKEN,
            json!({ "description": "Minibar", "amount_cents": 1_500 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stay["additional_charges_cents"], 1_500);

    let (status, quote) = api
        .get(&format!("/front-desk/check-outs/{booking_id}"), BOOTSTRAP_TOKEN)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(quote["bill"]["total_cents"], 21_500);

    let (status, done) = api
        .post(&format!("/front-desk/check-outs/{booking_id}"), BOOTSTRAP_TOKEN, json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(done["booking"]["status"], "checked-out");

    let (_, room) = api.get(&format!("/rooms/{room_id}"), BOOTSTRAP_TOKEN).await;
    assert_eq!(room["status"], "cleaning");

    let (status, payment) = api
        .post(
            "/payments",
            BOOTSTRAP_TOKEN,
            json!({
                "customer_id": customer_id,
                "booking_id": booking_id,
                "amount_cents": 21_500,
                "method": "card",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(payment["status"], "completed");

    let (_, balance) = api
        .get(&format!("/bookings/{booking_id}/balance"), BOOTSTRAP_TOKEN)
        .await;
    assert_eq!(balance["balance_cents"], 0);
}

#[tokio::test]
async fn customers_only_reach_their_own_records() {
    let api = TestApi::new().await;
    let (_, room_id) = seed_room(&api.hotel.db, "301", 2, 8_000).await;
    let login = seed_user(&api.hotel.db, "ada", Role::Customer).await;
    let own = api
        .hotel
        .core
        .create_customer(CustomerInput {
            full_name: "Ada Guest".to_string(),
            email: "ada@example.com".to_string(),
            phone: None,
            user_id: Some(login.id),
        })
        .await
        .unwrap();
    let other = api
        .hotel
        .core
        .create_customer(CustomerInput {
            full_name: "Other Guest".to_string(),
            email: "other@example.com".to_string(),
            phone: None,
            user_id: None,
        })
        .await
        .unwrap();

    let check_in = api.today() + Duration::days(5);
    let stay = |customer_id: i64| {
        json!({
            "customer_id": customer_id,
            "room_id": room_id,
            "check_in": check_in.to_string(),
            "check_out": (check_in + Duration::days(1)).to_string(),
            "guests": 1,
        })
    };
    let (status, _) = api.post("/bookings", &login.api_token, stay(other.id)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, booking) = api.post("/bookings", &login.api_token, stay(own.id)).await;
    assert_eq!(status, StatusCode::CREATED);
    let booking_id = booking["id"].as_i64().unwrap();

    let (status, listed) = api.get("/bookings", &login.api_token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().map(Vec::len), Some(1));
    let (status, _) = api
        .get(&format!("/bookings?customer_id={}", other.id), &login.api_token)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, pending) = api
        .post(&format!("/bookings/{booking_id}/cancellation"), &login.api_token, json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pending["status"], "cancellation-pending");
    let (status, _) = api
        .post(
            &format!("/bookings/{booking_id}/cancellation/resolve"),
            &login.api_token,
            json!({ "approve": true }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, posted) = api
        .post(
            &format!("/chat/conversations/{}/messages", own.id),
            &login.api_token,
            json!({ "body": "Is breakfast included?" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(posted["message"]["sender"], "customer");
    let (status, _) = api
        .get(&format!("/chat/conversations/{}/messages", other.id), &login.api_token)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = api.get("/chat/conversations", &login.api_token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, reply) = api
        .post(
            &format!("/chat/conversations/{}/messages", own.id),
            BOOTSTRAP_TOKEN,
            json!({ "body": "It is." }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(reply["message_count"], 2);
}

#[tokio::test]
async fn deactivated_users_lose_access() {
    let api = TestApi::new().await;
    let (status, issued) = api
        .post(
            "/users",
            BOOTSTRAP_TOKEN,
            json!({
                "username": "night-desk",
                "display_name": "Night Desk",
                "email": "night@example.com",
                "role": "receptionist",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(issued["user"].get("api_token").is_none());
    let token = issued["api_token"].as_str().unwrap().to_string();
    let user_id = issued["user"]["id"].as_i64().unwrap();

    let (status, _) = api.get("/dashboard/summary", &token).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = api.get("/dashboard/revenue?from=2026-01-01&to=2026-01-31", &token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, resolved) = api
        .send(
            "PUT",
            &format!("/users/{user_id}/permissions/view-analytics"),
            BOOTSTRAP_TOKEN,
            json!({ "granted": true }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resolved["view-analytics"]["source"], "override");
    let (status, series) = api
        .get("/dashboard/revenue?from=2026-01-01&to=2026-01-31", &token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(series.as_array().map(Vec::len), Some(31));

    let (status, _) = api
        .send(
            "PUT",
            &format!("/users/{user_id}/permissions/not-a-permission"),
            BOOTSTRAP_TOKEN,
            json!({ "granted": true }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = api
        .post(&format!("/users/{user_id}/deactivate"), BOOTSTRAP_TOKEN, json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = api.get("/me", &token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
