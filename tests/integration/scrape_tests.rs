//! End-to-end scrape cycles against a mock server

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use sumi_harvest::config::{load_config, FetcherConfig};
use sumi_harvest::extract::FieldValues;
use sumi_harvest::{
    Anchor, ExtractionMode, FieldExtractor, Record, Row, Scraper, ScraperConfig, Source,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Product {
    name: String,
    price: String,
}

impl Record for Product {
    const FIELDS: &'static [&'static str] = &["name", "price"];

    fn from_fields(fields: &FieldValues) -> Option<Self> {
        Some(Self {
            name: fields.text("name")?.to_string(),
            price: fields.text("price")?.to_string(),
        })
    }
}

fn product_page(name: &str, price: &str) -> String {
    format!(
        r#"<html><body><main>
            <h1 class="name">{}</h1>
            <div class="offer"><span class="price">{}</span></div>
        </main></body></html>"#,
        name, price
    )
}

async fn mount_html(server: &MockServer, route: &str, body: String, delay: Option<Duration>) {
    let mut template = ResponseTemplate::new(200)
        .set_body_raw(body, "text/html");
    if let Some(delay) = delay {
        template = template.set_delay(delay);
    }

    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(template)
        .mount(server)
        .await;
}

/// Test settings: quiet, short timeouts
fn test_config() -> ScraperConfig {
    ScraperConfig {
        logging: false,
        mode: ExtractionMode::Single,
        max_concurrency: 2,
        batch_timeout: Duration::from_secs(10),
        fetcher: FetcherConfig {
            request_timeout_ms: 300,
            hard_timeout_ms: 500,
            user_agent: None,
        },
    }
}

fn product_scraper(config: ScraperConfig) -> Scraper<Product> {
    Scraper::builder()
        .field(FieldExtractor::css("name", "h1.name").expect("valid selector"))
        .field(FieldExtractor::xpath("price", "//span[@class='price']").expect("valid path"))
        .config(config)
        .build()
        .expect("Failed to build scraper")
}

#[tokio::test]
async fn test_batch_with_one_timed_out_url() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_html(&mock_server, "/kettle", product_page("Kettle", "$20"), None).await;
    mount_html(&mock_server, "/toaster", product_page("Toaster", "$35"), None).await;
    mount_html(
        &mock_server,
        "/slow",
        product_page("Blender", "$80"),
        Some(Duration::from_secs(3)),
    )
    .await;

    let scraper = product_scraper(test_config());
    let urls = vec![
        format!("{}/kettle", base_url),
        format!("{}/slow", base_url),
        format!("{}/toaster", base_url),
    ];

    let completions = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&completions);
    scraper
        .scrape_throttled(urls.clone(), 2, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .await
        .expect("Batch watcher failed");

    assert_eq!(completions.load(Ordering::SeqCst), 1);

    let mut data = scraper.data().await;
    data.sort_by(|a, b| a.name.cmp(&b.name));
    assert_eq!(
        data,
        vec![
            Product {
                name: "Kettle".to_string(),
                price: "$20".to_string()
            },
            Product {
                name: "Toaster".to_string(),
                price: "$35".to_string()
            },
        ]
    );

    assert_eq!(scraper.failed_requests().await, vec![urls[1].clone()]);

    let log = scraper.log().await;
    let scraping = log
        .iter()
        .filter(|e| e.message.starts_with("Scraping "))
        .count();
    let failures: Vec<_> = log
        .iter()
        .filter(|e| e.message.starts_with("Failed"))
        .collect();

    assert_eq!(scraping, 3);
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].message, format!("Failed to fetch {}", urls[1]));
}

#[tokio::test]
async fn test_duplicate_pages_store_one_record() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_html(&mock_server, "/a", product_page("Kettle", "$20"), None).await;
    mount_html(&mock_server, "/b", product_page("Kettle", "$20"), None).await;

    let scraper = product_scraper(test_config());
    scraper
        .scrape_throttled(
            vec![format!("{}/a", base_url), format!("{}/b", base_url)],
            2,
            || {},
        )
        .await
        .expect("Batch watcher failed");

    let records = scraper.records().await;
    assert_eq!(records.len(), 1);
    assert!(matches!(records[0].1, Source::Url(_)));
    assert!(scraper.failed_requests().await.is_empty());
}

#[tokio::test]
async fn test_page_without_record_is_a_failure() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_html(
        &mock_server,
        "/blank",
        "<html><h1 class=\"name\">No price</h1></html>".to_string(),
        None,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404).insert_header("content-type", "text/html"))
        .mount(&mock_server)
        .await;

    let scraper = product_scraper(test_config());
    let blank = format!("{}/blank", base_url);
    let gone = format!("{}/gone", base_url);

    assert_eq!(scraper.scrape(&blank).await, None);
    assert_eq!(scraper.scrape(&gone).await, None);

    assert_eq!(scraper.failed_requests().await, vec![blank.clone(), gone.clone()]);

    let messages: Vec<String> = scraper.log().await.into_iter().map(|e| e.message).collect();
    assert!(messages.contains(&format!("Failed to extract a record from {}", blank)));
    assert!(messages.contains(&format!("Failed to fetch {}", gone)));
}

#[tokio::test]
async fn test_listing_with_anchor_and_attributes() {
    let mock_server = MockServer::start().await;
    mount_html(
        &mock_server,
        "/catalog",
        r#"<html><body><ul>
            <li><div><span class="tag">new</span></div><a href="/p/1">One</a></li>
            <li><div><span class="tag">sale</span></div><a href="/p/2">Two</a></li>
        </ul></body></html>"#
            .to_string(),
        None,
    )
    .await;

    let scraper = Scraper::<Row>::builder()
        .field(
            FieldExtractor::css("card", "span.tag")
                .expect("valid selector")
                .anchor(Anchor::GrandParent)
                .many(true),
        )
        .field(
            FieldExtractor::css("link", "li > a")
                .expect("valid selector")
                .many(true)
                .attribute("href"),
        )
        .config(test_config())
        .build()
        .expect("Failed to build scraper");

    let rows = scraper
        .scrape_all(&format!("{}/catalog", mock_server.uri()))
        .await;
    assert_eq!(rows.len(), 2);

    let first = rows[0].as_ref().expect("first row");
    assert_eq!(first.fields().text("card"), Some("new One"));
    assert_eq!(first.fields().text("link"), Some("/p/1"));

    let second = rows[1].as_ref().expect("second row");
    assert_eq!(second.fields().text("link"), Some("/p/2"));
}

#[tokio::test]
async fn test_scraper_from_job_file() {
    let mock_server = MockServer::start().await;
    mount_html(&mock_server, "/kettle", product_page("Kettle", "$20"), None).await;

    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    write!(
        file,
        r#"
urls = ["{}/kettle"]

[scraper]
max-concurrency = 1
logging = false

[fetcher]
request-timeout-ms = 1000
hard-timeout-ms = 2000

[[field]]
name = "name"
css = "h1.name"

[[field]]
name = "price"
xpath = "//div[@class='offer']/span"
"#,
        mock_server.uri()
    )
    .expect("write job file");

    let config = load_config(file.path()).expect("valid job file");
    let scraper = Scraper::<Product>::builder()
        .fields(config.field_extractors().expect("valid fields"))
        .config(config.scraper_config())
        .build()
        .expect("Failed to build scraper");

    scraper
        .scrape_throttled(config.urls.clone(), config.scraper.max_concurrency, || {})
        .await
        .expect("Batch watcher failed");

    assert_eq!(
        scraper.data().await,
        vec![Product {
            name: "Kettle".to_string(),
            price: "$20".to_string()
        }]
    );
}
