//! Channel scraper.
//!
//! Pulls the channel's /videos page and reads the listing out of the
//! embedded `ytInitialData` JSON blob, no API key involved. The listing
//! comes back in page order, newest first.

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info, warn};

use shorts_models::{ScrapedVideo, VideoId};

use crate::error::{PipelineError, PipelineResult};
use crate::ports::Scraper;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Scraper backed by a plain HTTP fetch of the channel page.
pub struct ChannelScraper {
    client: Client,
    initial_data: Regex,
}

impl ChannelScraper {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            // Non-greedy so we stop at the first `});` after the blob
            initial_data: Regex::new(r"var ytInitialData = (\{.*?\});")
                .expect("static regex"),
        }
    }

    async fn fetch_page(&self, channel_url: &str) -> PipelineResult<String> {
        let url = videos_url(channel_url);
        debug!("Fetching channel page {url}");
        let response = self
            .client
            .get(&url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.text().await?)
    }

    fn extract_videos(&self, html: &str) -> PipelineResult<Vec<ScrapedVideo>> {
        let captures = self.initial_data.captures(html).ok_or_else(|| {
            PipelineError::scrape_failed("ytInitialData not found in channel page")
        })?;
        let data: Value = serde_json::from_str(&captures[1])
            .map_err(|e| PipelineError::scrape_failed(format!("invalid ytInitialData: {e}")))?;
        Ok(videos_from_initial_data(&data))
    }
}

impl Default for ChannelScraper {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Scraper for ChannelScraper {
    async fn discover(&self, channel_url: &str) -> PipelineResult<Vec<ScrapedVideo>> {
        info!("Scraping channel: {channel_url}");
        let html = self.fetch_page(channel_url).await?;
        let videos = self.extract_videos(&html)?;
        info!("Found {} videos", videos.len());
        Ok(videos)
    }
}

/// Normalize a channel URL to its /videos tab.
fn videos_url(channel_url: &str) -> String {
    if channel_url.ends_with("/videos") {
        channel_url.to_string()
    } else {
        format!("{}/videos", channel_url.trim_end_matches('/'))
    }
}

/// Walk the selected tab's rich grid and collect every video renderer.
fn videos_from_initial_data(data: &Value) -> Vec<ScrapedVideo> {
    let mut videos = Vec::new();

    let tabs = data
        .pointer("/contents/twoColumnBrowseResultsRenderer/tabs")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    for tab in tabs {
        let renderer = &tab["tabRenderer"];
        if !renderer["selected"].as_bool().unwrap_or(false) {
            continue;
        }
        let contents = renderer
            .pointer("/content/richGridRenderer/contents")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        for item in contents {
            let video = &item["richItemRenderer"]["content"]["videoRenderer"];
            if let Some(scraped) = scraped_from_renderer(video) {
                videos.push(scraped);
            }
        }
    }

    if videos.is_empty() {
        warn!("Channel page contained no video renderers");
    }
    videos
}

fn scraped_from_renderer(video: &Value) -> Option<ScrapedVideo> {
    let id = video["videoId"].as_str()?;
    let title = video["title"]["runs"][0]["text"].as_str()?;
    if id.is_empty() || title.is_empty() {
        return None;
    }

    let view_count = video["viewCountText"]["simpleText"]
        .as_str()
        .map(parse_view_count)
        .unwrap_or(0);
    let duration_label = video["lengthText"]["simpleText"]
        .as_str()
        .unwrap_or("")
        .to_string();
    let published_label = video["publishedTimeText"]["simpleText"]
        .as_str()
        .unwrap_or("Unknown")
        .to_string();

    Some(ScrapedVideo {
        id: VideoId::from(id),
        title: title.to_string(),
        view_count,
        duration_label,
        published_label,
        url: format!("https://www.youtube.com/watch?v={id}"),
    })
}

/// Parse a display count like "1.2M views" into a number. Unparseable
/// input counts as zero.
fn parse_view_count(text: &str) -> u64 {
    let cleaned = text
        .to_lowercase()
        .replace("views", "")
        .replace("view", "")
        .trim()
        .to_string();

    for (suffix, multiplier) in [('k', 1_000.0), ('m', 1_000_000.0), ('b', 1_000_000_000.0)] {
        if cleaned.contains(suffix) {
            let number: f64 = match cleaned.replace(suffix, "").trim().parse() {
                Ok(n) => n,
                Err(_) => return 0,
            };
            return (number * multiplier) as u64;
        }
    }

    cleaned.replace(',', "").parse().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn renderer(id: &str, title: &str, views: &str) -> Value {
        json!({
            "richItemRenderer": {
                "content": {
                    "videoRenderer": {
                        "videoId": id,
                        "title": { "runs": [{ "text": title }] },
                        "viewCountText": { "simpleText": views },
                        "lengthText": { "simpleText": "10:31" },
                        "publishedTimeText": { "simpleText": "2 days ago" }
                    }
                }
            }
        })
    }

    fn page(contents: Vec<Value>) -> Value {
        json!({
            "contents": {
                "twoColumnBrowseResultsRenderer": {
                    "tabs": [
                        { "tabRenderer": { "selected": false } },
                        {
                            "tabRenderer": {
                                "selected": true,
                                "content": { "richGridRenderer": { "contents": contents } }
                            }
                        }
                    ]
                }
            }
        })
    }

    #[test]
    fn test_parse_view_count_suffixes() {
        assert_eq!(parse_view_count("1.2M views"), 1_200_000);
        assert_eq!(parse_view_count("875K views"), 875_000);
        assert_eq!(parse_view_count("1B views"), 1_000_000_000);
        assert_eq!(parse_view_count("12,345 views"), 12_345);
        assert_eq!(parse_view_count("1 view"), 1);
        assert_eq!(parse_view_count("No views"), 0);
        assert_eq!(parse_view_count(""), 0);
    }

    #[test]
    fn test_videos_preserve_page_order() {
        let data = page(vec![
            renderer("aaa", "First", "1M views"),
            renderer("bbb", "Second", "2K views"),
        ]);
        let videos = videos_from_initial_data(&data);
        assert_eq!(videos.len(), 2);
        assert_eq!(videos[0].id.as_str(), "aaa");
        assert_eq!(videos[0].view_count, 1_000_000);
        assert_eq!(videos[1].id.as_str(), "bbb");
        assert_eq!(videos[1].url, "https://www.youtube.com/watch?v=bbb");
    }

    #[test]
    fn test_items_without_renderer_are_skipped() {
        let data = page(vec![
            json!({ "continuationItemRenderer": {} }),
            renderer("ccc", "Kept", "5 views"),
        ]);
        let videos = videos_from_initial_data(&data);
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].title, "Kept");
    }

    #[test]
    fn test_extract_from_embedded_html() {
        let scraper = ChannelScraper::new();
        let blob = page(vec![renderer("ddd", "Embedded", "3.5K views")]);
        let html = format!(
            "<html><script>var ytInitialData = {};</script></html>",
            serde_json::to_string(&blob).unwrap()
        );
        let videos = scraper.extract_videos(&html).unwrap();
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].view_count, 3_500);
    }

    #[test]
    fn test_missing_initial_data_is_an_error() {
        let scraper = ChannelScraper::new();
        let err = scraper.extract_videos("<html></html>").unwrap_err();
        assert!(matches!(err, PipelineError::ScrapeFailed(_)));
    }

    #[test]
    fn test_videos_url_normalization() {
        assert_eq!(
            videos_url("https://www.youtube.com/@Chan"),
            "https://www.youtube.com/@Chan/videos"
        );
        assert_eq!(
            videos_url("https://www.youtube.com/@Chan/"),
            "https://www.youtube.com/@Chan/videos"
        );
        assert_eq!(
            videos_url("https://www.youtube.com/@Chan/videos"),
            "https://www.youtube.com/@Chan/videos"
        );
    }
}
