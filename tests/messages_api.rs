mod common;

use common::{listing_body, spawn_server};
use serde_json::{json, Value as JsonValue};

#[tokio::test]
async fn message_with_wrong_seller_email_is_a_mismatch() {
    let server = spawn_server().await;
    let listing = server
        .create_listing(listing_body("Bike", "$100", "Sporting Goods"))
        .await;

    let resp = server
        .http
        .post(server.url("/messages"))
        .json(&json!({
            "listing_id": listing["id"],
            "buyer_email": "buyer@example.com",
            "message": "Still available?",
            "seller_email": "someone@example.com",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: JsonValue = resp.json().await.unwrap();
    assert_eq!(body["error"], "Seller email does not match listing");
    assert_eq!(server.store.message_count().await, 0);
}

#[tokio::test]
async fn message_to_missing_listing_is_not_found() {
    let server = spawn_server().await;
    let resp = server
        .http
        .post(server.url("/messages"))
        .json(&json!({
            "listing_id": "nope",
            "buyer_email": "buyer@example.com",
            "message": "Hello",
            "seller_email": "seller@example.com",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn message_validates_both_emails() {
    let server = spawn_server().await;
    let resp = server
        .http
        .post(server.url("/messages"))
        .json(&json!({
            "listing_id": "x",
            "buyer_email": "buyer-at-example",
            "message": "Hello",
            "seller_email": "seller@example.com",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: JsonValue = resp.json().await.unwrap();
    assert_eq!(body["error"], "Invalid buyer email format");
}

#[tokio::test]
async fn sent_messages_are_listed_by_listing_and_seller() {
    let server = spawn_server().await;
    let listing = server
        .create_listing(listing_body("Bike", "$100", "Sporting Goods"))
        .await;

    let resp = server
        .http
        .post(server.url("/messages"))
        .json(&json!({
            "listing_id": listing["id"],
            "buyer_name": "Sam",
            "buyer_email": " Buyer@Example.com ",
            "message": "Still available?",
            "seller_email": "SELLER@example.com",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let body: JsonValue = resp.json().await.unwrap();
    assert_eq!(body["message"], "Message sent successfully");
    assert_eq!(body["data"]["message"], "From: Sam\n\nStill available?");
    assert_eq!(body["data"]["buyer_email"], "buyer@example.com");

    let by_listing: JsonValue = server
        .http
        .get(server.url("/messages"))
        .query(&[("listing_id", listing["id"].as_str().unwrap())])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(by_listing["data"].as_array().unwrap().len(), 1);
    assert_eq!(by_listing["pagination"]["limit"], 50);

    let by_seller: JsonValue = server
        .http
        .get(server.url("/messages?seller_email=Seller@Example.com"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(by_seller["pagination"]["total"], 1);
}

#[tokio::test]
async fn listing_messages_needs_a_filter() {
    let server = spawn_server().await;
    let resp = server.http.get(server.url("/messages")).send().await.unwrap();
    assert_eq!(resp.status(), 400);
    let body: JsonValue = resp.json().await.unwrap();
    assert_eq!(body["error"], "Either listing_id or seller_email is required");
}
