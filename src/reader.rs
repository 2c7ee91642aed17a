use std::time::Duration;

use rss::Channel;

use crate::errors::AppError;

pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

const ACCEPT: &str =
    "application/rss+xml, application/rdf+xml, application/atom+xml, application/xml;q=0.9, text/xml;q=0.8";
const USER_AGENT: &str = concat!("termfeed/", env!("CARGO_PKG_VERSION"));

/// A feed document reduced to the fields the aggregator stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedFeed {
    pub title: String,
    pub link: String,
    pub description: String,
    pub items: Vec<FetchedItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedItem {
    pub title: String,
    pub link: String,
    pub description: Option<String>,
    /// Publish date exactly as it appeared in the document. The writer
    /// parses it and skips the item when it doesn't conform.
    pub pub_date: Option<String>,
}

/// The remote side of an aggregation cycle. Implemented over HTTP for real
/// runs and scripted in tests.
pub trait FeedFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, AppError>;
}

pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, AppError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| AppError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(HttpFetcher { client })
    }
}

impl FeedFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, AppError> {
        let response = self
            .client
            .get(url)
            .header("Accept", ACCEPT)
            .header("User-Agent", USER_AGENT)
            .send()
            .map_err(|e| AppError::Fetch {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        if !response.status().is_success() {
            return Err(AppError::Fetch {
                url: url.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }
        response
            .bytes()
            .map(|body| body.to_vec())
            .map_err(|e| AppError::Fetch {
                url: url.to_string(),
                reason: e.to_string(),
            })
    }
}

/// Parse a raw RSS payload. Malformed XML is a hard error; items without a
/// link are dropped since posts are keyed by URL.
pub fn parse_feed(payload: &[u8]) -> Result<FetchedFeed, AppError> {
    let channel = Channel::read_from(payload)?;
    Ok(FetchedFeed::from(channel))
}

impl From<Channel> for FetchedFeed {
    fn from(channel: Channel) -> Self {
        let items = channel
            .items()
            .iter()
            .filter(|item| item.link().is_some())
            .map(|item| FetchedItem {
                title: decode(item.title().unwrap_or_default()),
                link: item.link().unwrap_or_default().to_string(),
                description: item.description().map(decode),
                pub_date: item.pub_date().map(str::to_string),
            })
            .collect();

        FetchedFeed {
            title: decode(channel.title()),
            link: channel.link().to_string(),
            description: decode(channel.description()),
            items,
        }
    }
}

fn decode(text: &str) -> String {
    html_escape::decode_html_entities(text).into_owned()
}
