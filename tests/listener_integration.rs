//! Full ticks through a listener: poll, decide, render and deliver.

mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, TimeZone, Utc};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ankama_hooks::almanax::AlmanaxHandler;
use ankama_hooks::config::{AlmanaxConfig, RssConfig};
use ankama_hooks::hooks::{FeedKind, HookRepository, NewAlmanaxHook, NewSocialHook};
use ankama_hooks::rss::{RssHandler, RssState};
use ankama_hooks::scheduler::{Listener, ListenerGroup};

use common::{bodies_for, discord_mock, TestStore};

const PERIOD: Duration = Duration::from_secs(300);

fn rss_item(guid: &str, title: &str, body: &str) -> String {
    format!(
        "<item><guid>{guid}</guid><title>{title}</title>\
         <link>https://www.dofus.com/news/{guid}</link>\
         <description>{body}</description></item>"
    )
}

fn rss_doc(items: &[String]) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><rss version="2.0"><channel><title>News</title><link>https://www.dofus.com</link>{}</channel></rss>"#,
        items.concat()
    )
}

async fn serve_feed(server: &MockServer, body: String) {
    server.reset().await;
    Mock::given(method("GET"))
        .and(path("/rss"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_rss_ticks_send_only_new_items() {
    let store = TestStore::new().await;
    let discord = discord_mock().await;
    let source = MockServer::start().await;

    let feed = store
        .repo
        .create_rss_feed("dofus2-fr", &format!("{}/rss", source.uri()))
        .await
        .unwrap();
    store
        .repo
        .create_social_hook(&NewSocialHook::new(
            FeedKind::Rss,
            format!("{}/ok", discord.uri()),
            vec![feed.id],
        ))
        .await
        .unwrap();
    store
        .repo
        .create_social_hook(
            &NewSocialHook::new(FeedKind::Rss, format!("{}/gone", discord.uri()), vec![feed.id])
                .with_blacklist(vec!["maintenance".to_string()]),
        )
        .await
        .unwrap();

    let handler = Arc::new(RssHandler::new(&RssConfig::default()).unwrap());
    let mut listener = Listener::new(
        handler,
        feed.clone(),
        RssState::default(),
        PERIOD,
        store.dyn_repo(),
        store.dispatcher(),
    );

    let old = rss_item("1", "Old news", "Already seen");
    serve_feed(&source, rss_doc(&[old.clone()])).await;
    let first = listener.tick(Utc::now()).await.unwrap();
    assert_eq!(first.jobs, 0);
    assert!(listener.state().baseline.is_some());

    // Unchanged feed sends nothing.
    let again = listener.tick(Utc::now()).await.unwrap();
    assert_eq!(again.jobs, 0);

    let new = rss_item("2", "Maintenance", "Scheduled maintenance tonight");
    serve_feed(&source, rss_doc(&[new, old])).await;
    let second = listener.tick(Utc::now()).await.unwrap();
    assert_eq!(second.jobs, 1);
    assert_eq!(second.messages, 1);
    assert_eq!(second.delivery.delivered, 1);

    let bodies = bodies_for(&discord, "/ok").await;
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["username"], "Dofus2 Fr");
    assert_eq!(bodies[0]["embeds"][0]["title"], "Maintenance");
    assert_eq!(
        bodies[0]["embeds"][0]["description"],
        "Scheduled maintenance tonight"
    );
    assert!(bodies_for(&discord, "/gone").await.is_empty());

    // The filtered subscriber was never contacted and stays registered.
    let subscribers = store
        .repo
        .social_subscribers(FeedKind::Rss, feed.id)
        .await
        .unwrap();
    assert_eq!(subscribers.len(), 2);
}

#[tokio::test]
async fn test_rss_tick_failure_keeps_state() {
    let store = TestStore::new().await;
    let source = MockServer::start().await;
    let feed = store
        .repo
        .create_rss_feed("dofus2-fr", &format!("{}/rss", source.uri()))
        .await
        .unwrap();

    let handler = Arc::new(RssHandler::new(&RssConfig::default()).unwrap());
    let mut listener = Listener::new(
        handler,
        feed,
        RssState::default(),
        PERIOD,
        store.dyn_repo(),
        store.dispatcher(),
    );

    serve_feed(&source, rss_doc(&[rss_item("1", "News", "Body")])).await;
    listener.tick(Utc::now()).await.unwrap();
    let baseline = listener.state().baseline;

    source.reset().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&source)
        .await;
    assert!(listener.tick(Utc::now()).await.is_err());
    assert_eq!(listener.state().baseline, baseline);
}

fn calendar_json(from: NaiveDate, days: u64) -> serde_json::Value {
    let entries: Vec<serde_json::Value> = (0..days)
        .map(|i| {
            let date = from + chrono::Days::new(i);
            serde_json::json!({
                "date": date.format("%Y-%m-%d").to_string(),
                "reward_kamas": 1000,
                "bonus": {
                    "description": "More experience",
                    "type": { "id": "experience", "name": "Experience" }
                },
                "tribute": {
                    "quantity": 3,
                    "item": {
                        "name": "Wheat",
                        "image_urls": { "icon": "https://img/icon.png" }
                    }
                }
            })
        })
        .collect();
    serde_json::Value::Array(entries)
}

#[tokio::test]
async fn test_almanax_tick_at_local_midnight() {
    let store = TestStore::new().await;
    let discord = discord_mock().await;
    let api = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/dofus3/v1/en/almanax"))
        .and(query_param("range[from]", "2022-10-31"))
        .and(query_param("timezone", "Europe/Paris"))
        .respond_with(ResponseTemplate::new(200).set_body_json(calendar_json(
            NaiveDate::from_ymd_opt(2022, 10, 31).unwrap(),
            10,
        )))
        .mount(&api)
        .await;

    let feed = store.repo.create_almanax_feed("almanax_en", "en").await.unwrap();
    store
        .repo
        .create_almanax_hook(&NewAlmanaxHook::new(
            format!("{}/ok", discord.uri()),
            vec![feed.id],
        ))
        .await
        .unwrap();

    let config = AlmanaxConfig {
        api_url: api.uri(),
        ..Default::default()
    };
    let handler = Arc::new(AlmanaxHandler::new(&config).unwrap());
    let mut listener = Listener::new(
        handler,
        feed,
        (),
        Duration::from_secs(60),
        store.dyn_repo(),
        store.dispatcher(),
    );

    // 23:30 UTC is not a new hour.
    let quiet = listener
        .tick(Utc.with_ymd_and_hms(2022, 10, 31, 23, 30, 0).unwrap())
        .await
        .unwrap();
    assert_eq!(quiet.jobs, 0);

    // Midnight in Paris on 2022-11-01.
    let report = listener
        .tick(Utc.with_ymd_and_hms(2022, 10, 31, 23, 0, 0).unwrap())
        .await
        .unwrap();
    assert_eq!(report.jobs, 1);
    assert_eq!(report.delivery.delivered, 1);

    let bodies = bodies_for(&discord, "/ok").await;
    assert_eq!(bodies.len(), 1);
    let embed = &bodies[0]["embeds"][0];
    assert_eq!(embed["title"], "Tuesday, 01/11/2022");
    assert_eq!(embed["fields"][0]["name"], ":zap: Experience");
    assert_eq!(bodies[0]["username"], "Almanax");
}

#[tokio::test]
async fn test_listener_group_shutdown() {
    let store = TestStore::new().await;
    let feed = store
        .repo
        .create_rss_feed("dofus2-fr", "http://127.0.0.1:9/rss")
        .await
        .unwrap();
    let handler = Arc::new(RssHandler::new(&RssConfig::default()).unwrap());

    let mut group = ListenerGroup::new();
    group.spawn(
        Listener::new(
            handler,
            feed,
            RssState::default(),
            PERIOD,
            store.dyn_repo(),
            store.dispatcher(),
        )
        .with_start_delay(Duration::from_secs(3600)),
    );
    assert_eq!(group.len(), 1);

    tokio::time::timeout(Duration::from_secs(5), group.shutdown_and_join())
        .await
        .expect("listeners did not stop");
}
