use axum::{body::Body, http::Request};
use serde_json::{Value, json};

use super::setup::ADMIN_TOKEN;
use crate::request;

fn admin() -> String {
    format!("Token {ADMIN_TOKEN}")
}

pub fn health() -> Request<Body> {
    request!(GET "/health"; ;)
}

pub fn spot_body(name: &str, city: &str) -> Value {
    json!({
        "name": name,
        "description": format!("{name}, a landmark of {city}"),
        "city": city,
        "state": "RJ",
        "country": "Brasil",
        "latitude": -22.95,
        "longitude": -43.21,
        "address": "Centro",
    })
}

pub fn accommodation_body(name: &str, kind: &str, avg_price: Option<f64>) -> Value {
    json!({
        "name": name,
        "address": "Rua 1",
        "kind": kind,
        "avg_price": avg_price,
    })
}

pub fn create_spot(body: Value) -> Request<Body> {
    create_spot_as(Some(admin()), body)
}

pub fn create_spot_as(authorization: Option<String>, body: Value) -> Request<Body> {
    let mut req = request!(
        POST "/spots";
        "content-type" => "application/json";
        body.to_string()
    );
    if let Some(authorization) = authorization {
        req.headers_mut().insert(
            "authorization",
            authorization.parse().expect("valid header value"),
        );
    }
    req
}

pub fn get_spot(id: i64) -> Request<Body> {
    request!(GET format!("/spots/{id}"); ;)
}

pub fn list_spots(query: &str) -> Request<Body> {
    request!(GET format!("/spots?{query}"); ;)
}

pub fn update_spot(id: i64, body: Value) -> Request<Body> {
    request!(
        PUT format!("/spots/{id}");
        "content-type" => "application/json",
        "authorization" => admin();
        body.to_string()
    )
}

pub fn delete_spot(id: i64) -> Request<Body> {
    request!(DELETE format!("/spots/{id}"); "authorization" => admin(); )
}

pub fn create_accommodation(spot_id: i64, body: Value) -> Request<Body> {
    request!(
        POST format!("/spots/{spot_id}/accommodations");
        "content-type" => "application/json",
        "authorization" => admin();
        body.to_string()
    )
}

pub fn list_accommodations(spot_id: i64, query: &str) -> Request<Body> {
    request!(GET format!("/spots/{spot_id}/accommodations?{query}"); ;)
}

pub fn get_accommodation(id: i64) -> Request<Body> {
    request!(GET format!("/accommodations/{id}"); ;)
}

pub fn update_accommodation(id: i64, body: Value) -> Request<Body> {
    request!(
        PUT format!("/accommodations/{id}");
        "content-type" => "application/json",
        "authorization" => admin();
        body.to_string()
    )
}

pub fn delete_accommodation(id: i64) -> Request<Body> {
    request!(DELETE format!("/accommodations/{id}"); "authorization" => admin(); )
}
