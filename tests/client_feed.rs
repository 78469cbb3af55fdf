//! `ApiClient` and `ListingsFeed` against the in-process server, plus a gated
//! source for the overlapping-fetch cases.

mod common;

use async_trait::async_trait;
use chrono::Utc;
use classifieds::client::{
    ApiClient, ApiResult, FetchOutcome, ImageHosts, ListingParams, ListingSource, ListingsFeed,
    MessageParams,
};
use classifieds::domain::{Category, Listing, ListingDraft, MessageDraft, Price};
use common::{listing_body, spawn_server, PUBLIC_BASE};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, Notify};

#[tokio::test]
async fn client_round_trips_listing_and_message() {
    let server = spawn_server().await;
    let client = ApiClient::new(server.base_url.clone());

    let created = client
        .create_listing(&ListingDraft {
            title: Some("Guitar".to_string()),
            price: Some("$250".to_string()),
            seller_email: Some("seller@example.com".to_string()),
            category: Some("musical-instruments".to_string()),
            ..Default::default()
        })
        .await;
    assert!(created.is_ok());
    let listing = created.data.unwrap();
    assert_eq!(listing.category, Category::MusicalInstruments);
    assert_eq!(listing.price, Price::from_cents(25_000));

    let fetched = client.get_listing(&listing.id).await;
    assert_eq!(fetched.data.as_ref().map(|l| l.id.as_str()), Some(listing.id.as_str()));

    let sent = client
        .send_message(&MessageDraft {
            listing_id: Some(listing.id.clone()),
            buyer_email: Some("buyer@example.com".to_string()),
            message: Some("Does it come with a case?".to_string()),
            seller_email: Some("seller@example.com".to_string()),
            ..Default::default()
        })
        .await;
    assert!(sent.is_ok());

    let messages = client.get_messages(&MessageParams::for_listing(&listing.id)).await;
    assert_eq!(messages.data.unwrap().len(), 1);

    assert!(client.delete_listing(&listing.id).await.is_ok());
    let gone = client.get_listing(&listing.id).await;
    assert_eq!(gone.error.as_deref(), Some("Listing not found"));
}

#[tokio::test]
async fn client_pages_through_messages() {
    let server = spawn_server().await;
    let client = ApiClient::new(server.base_url.clone());
    let listing = server
        .create_listing(listing_body("Kayak", "$400", "Sporting Goods"))
        .await;
    let listing_id = listing["id"].as_str().unwrap().to_string();
    for i in 0..3 {
        let sent = client
            .send_message(&MessageDraft {
                listing_id: Some(listing_id.clone()),
                buyer_email: Some("buyer@example.com".to_string()),
                message: Some(format!("Question {}", i)),
                seller_email: Some("seller@example.com".to_string()),
                ..Default::default()
            })
            .await;
        assert!(sent.is_ok());
    }

    let first = client
        .get_messages(&MessageParams {
            limit: Some(2),
            offset: Some(0),
            ..MessageParams::for_listing(&listing_id)
        })
        .await;
    assert_eq!(first.data.unwrap().len(), 2);
    let pagination = first.pagination.unwrap();
    assert_eq!(pagination.limit, 2);
    assert!(pagination.has_more);

    let rest = client
        .get_messages(&MessageParams {
            limit: Some(2),
            offset: Some(2),
            ..MessageParams::for_listing(&listing_id)
        })
        .await;
    assert_eq!(rest.data.unwrap().len(), 1);
    assert!(!rest.pagination.unwrap().has_more);
}

#[tokio::test]
async fn client_surfaces_server_errors_as_strings() {
    let server = spawn_server().await;
    let client = ApiClient::new(server.base_url.clone());

    let result = client.get_messages(&MessageParams::default()).await;
    assert!(result.data.is_none());
    assert_eq!(
        result.error.as_deref(),
        Some("Either listing_id or seller_email is required")
    );

    let upload = client.upload_image("a.txt", "text/plain", vec![1, 2, 3]).await;
    assert_eq!(upload.error.as_deref(), Some("Invalid file type"));

    let upload = client.upload_image("a.gif", "image/gif", vec![1, 2, 3]).await;
    let stored = upload.data.unwrap();
    assert!(client.delete_image(&stored.file_name).await.is_ok());
}

#[tokio::test]
async fn feed_appends_on_load_more_and_resets_on_filter_change() {
    let server = spawn_server().await;
    for i in 0..5 {
        server
            .create_listing(listing_body(&format!("Toy {}", i), "$5", "Toys & Games"))
            .await;
    }
    server
        .create_listing(listing_body("Desk", "$80", "Office Supplies"))
        .await;

    let feed = ListingsFeed::with_page_size(Arc::new(ApiClient::new(server.base_url.clone())), 2);

    assert_eq!(feed.refresh().await, FetchOutcome::Applied);
    let state = feed.snapshot().await;
    assert_eq!(state.listings.len(), 2);
    assert!(state.has_more);

    assert_eq!(feed.load_more().await, FetchOutcome::Applied);
    assert_eq!(feed.load_more().await, FetchOutcome::Applied);
    let state = feed.snapshot().await;
    assert_eq!(state.listings.len(), 6);
    assert_eq!(state.offset, 4);
    assert!(!state.has_more);
    assert_eq!(feed.load_more().await, FetchOutcome::Skipped);

    assert_eq!(feed.set_category("office-supplies").await, FetchOutcome::Applied);
    let state = feed.snapshot().await;
    assert_eq!(state.offset, 0);
    assert_eq!(state.listings.len(), 1);
    assert_eq!(state.listings[0].title, "Desk");

    assert_eq!(feed.set_category("all").await, FetchOutcome::Applied);
    assert_eq!(feed.set_search("toy 3").await, FetchOutcome::Applied);
    let titles: Vec<String> = feed
        .snapshot()
        .await
        .listings
        .into_iter()
        .map(|l| l.title)
        .collect();
    assert_eq!(titles, vec!["Toy 3"]);
}

#[tokio::test]
async fn load_more_on_a_fresh_feed_starts_at_the_first_page() {
    let server = spawn_server().await;
    for i in 0..3 {
        server
            .create_listing(listing_body(&format!("Toy {}", i), "$5", "Toys & Games"))
            .await;
    }
    let feed = ListingsFeed::with_page_size(Arc::new(ApiClient::new(server.base_url.clone())), 2);

    assert_eq!(feed.load_more().await, FetchOutcome::Applied);
    let state = feed.snapshot().await;
    let titles: Vec<&str> = state.listings.iter().map(|l| l.title.as_str()).collect();
    assert_eq!(titles, vec!["Toy 2", "Toy 1"]);
    assert_eq!(state.offset, 0);

    assert_eq!(feed.load_more().await, FetchOutcome::Applied);
    let state = feed.snapshot().await;
    let titles: Vec<&str> = state.listings.iter().map(|l| l.title.as_str()).collect();
    assert_eq!(titles, vec!["Toy 2", "Toy 1", "Toy 0"]);
    assert_eq!(state.offset, 2);
    assert_eq!(feed.load_more().await, FetchOutcome::Skipped);
}

#[tokio::test]
async fn feed_prepends_created_listing() {
    let server = spawn_server().await;
    server
        .create_listing(listing_body("Old", "$1", "Free Stuff"))
        .await;
    let feed = ListingsFeed::new(Arc::new(ApiClient::new(server.base_url.clone())));
    feed.refresh().await;

    let created = feed
        .create_listing(&ListingDraft {
            title: Some("New".to_string()),
            price: Some("$0".to_string()),
            seller_email: Some("seller@example.com".to_string()),
            category: Some("Free Stuff".to_string()),
            ..Default::default()
        })
        .await;
    assert!(created.is_ok());
    let titles: Vec<String> = feed.snapshot().await.listings.into_iter().map(|l| l.title).collect();
    assert_eq!(titles, vec!["New", "Old"]);
}

/// Source whose fetches for a given search term block until released.
#[derive(Default)]
struct GatedSource {
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    requested_offsets: Mutex<Vec<Option<u64>>>,
}

impl GatedSource {
    async fn gate(&self, search: &str) -> Arc<Notify> {
        self.gates
            .lock()
            .await
            .entry(search.to_string())
            .or_insert_with(|| Arc::new(Notify::new()))
            .clone()
    }
}

fn listing(title: &str) -> Listing {
    Listing {
        id: title.to_string(),
        title: title.to_string(),
        price: Price::from_cents(100),
        seller_email: "seller@example.com".to_string(),
        description: String::new(),
        category: Category::Hobbies,
        location: "Not specified".to_string(),
        image_url: None,
        created_at: Utc::now(),
        updated_at: None,
    }
}

#[async_trait]
impl ListingSource for GatedSource {
    async fn fetch(&self, params: &ListingParams) -> ApiResult<Vec<Listing>> {
        self.requested_offsets.lock().await.push(params.offset);
        let search = params.search.clone().unwrap_or_default();
        self.gate(&search).await.notified().await;
        ApiResult {
            data: Some(vec![listing(&format!("result for {}", search))]),
            error: None,
            pagination: None,
        }
    }

    async fn create(&self, _draft: &ListingDraft) -> ApiResult<Listing> {
        ApiResult::failure("read only")
    }
}

#[tokio::test]
async fn stale_fetch_is_cancelled_by_a_newer_one() {
    let source = Arc::new(GatedSource::default());
    let feed = Arc::new(ListingsFeed::new(source.clone()));

    let slow = tokio::spawn({
        let feed = feed.clone();
        async move { feed.set_search("old").await }
    });
    // Let the first fetch start before superseding it.
    while !feed.snapshot().await.loading {
        tokio::task::yield_now().await;
    }

    let fresh = tokio::spawn({
        let feed = feed.clone();
        async move { feed.set_search("new").await }
    });
    assert_eq!(slow.await.unwrap(), FetchOutcome::Cancelled);

    source.gate("new").await.notify_one();
    assert_eq!(fresh.await.unwrap(), FetchOutcome::Applied);

    // Releasing the stale request afterwards changes nothing.
    source.gate("old").await.notify_one();
    let state = feed.snapshot().await;
    assert_eq!(state.search, "new");
    assert_eq!(state.listings.len(), 1);
    assert_eq!(state.listings[0].title, "result for new");
    assert!(!state.loading);
}

#[tokio::test]
async fn cancel_discards_the_in_flight_fetch() {
    let source = Arc::new(GatedSource::default());
    let feed = Arc::new(ListingsFeed::new(source.clone()));

    let pending = tokio::spawn({
        let feed = feed.clone();
        async move { feed.refresh().await }
    });
    while !feed.snapshot().await.loading {
        tokio::task::yield_now().await;
    }
    feed.cancel().await;

    assert_eq!(pending.await.unwrap(), FetchOutcome::Cancelled);
    let state = feed.snapshot().await;
    assert!(state.listings.is_empty());
    assert!(!state.loading);
}

#[test]
fn display_image_falls_back_for_foreign_hosts() {
    let hosts = ImageHosts::for_store(PUBLIC_BASE);
    let mut item = listing("Camera");
    assert_eq!(hosts.display_image(&item), None);

    item.image_url = Some(format!("{}/storage/v1/object/public/images/cam.jpg", PUBLIC_BASE));
    assert_eq!(hosts.display_image(&item), item.image_url.as_deref());

    item.image_url = Some("https://tracker.example.net/pixel.gif".to_string());
    assert_eq!(hosts.display_image(&item), None);
}

#[tokio::test]
async fn load_more_after_a_cancelled_refresh_reloads_the_first_page() {
    let source = Arc::new(GatedSource::default());
    let feed = Arc::new(ListingsFeed::with_page_size(source.clone(), 2));

    let pending = tokio::spawn({
        let feed = feed.clone();
        async move { feed.refresh().await }
    });
    while !feed.snapshot().await.loading {
        tokio::task::yield_now().await;
    }
    feed.cancel().await;
    assert_eq!(pending.await.unwrap(), FetchOutcome::Cancelled);

    let more = tokio::spawn({
        let feed = feed.clone();
        async move { feed.load_more().await }
    });
    while !feed.snapshot().await.loading {
        tokio::task::yield_now().await;
    }
    source.gate("").await.notify_one();
    assert_eq!(more.await.unwrap(), FetchOutcome::Applied);

    assert_eq!(*source.requested_offsets.lock().await, vec![Some(0), Some(0)]);
    let state = feed.snapshot().await;
    assert_eq!(state.listings.len(), 1);
    assert_eq!(state.offset, 0);
}
