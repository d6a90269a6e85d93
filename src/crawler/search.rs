//! Search timeline requests
//!
//! Builds the paginated search request and fetches one page as JSON.

use crate::crawler::credentials::Credentials;
use crate::record::CrawlCursor;
use crate::state::CrawlMode;
use crate::TagDownError;
use reqwest::header::{AUTHORIZATION, COOKIE, REFERER};
use reqwest::Client;
use serde_json::{json, Value};
use url::Url;

/// Path of the search timeline query
pub const SEARCH_TIMELINE_PATH: &str = "/i/api/graphql/tUJgNbJvuiieOXvq7OmHwA/SearchTimeline";

/// Public bearer token of the web client
const BEARER_TOKEN: &str = concat!(
    "AAAAAAAAAAAAAAAAAAAAANRILgAAAAAAnNwIzUejRCOuH5E6I8xnZz4puTs%3D",
    "1Zv7ttfk8LF81IUq16cHjhLTvJu4FA33AGWWjCpTnA",
);

/// Feature flags the current query version requires
const FEATURES: &str = concat!(
    r#"{"rweb_tipjar_consumption_enabled":true,"#,
    r#""responsive_web_graphql_exclude_directive_enabled":true,"#,
    r#""verified_phone_label_enabled":false,"#,
    r#""creator_subscriptions_tweet_preview_api_enabled":true,"#,
    r#""responsive_web_graphql_timeline_navigation_enabled":true,"#,
    r#""responsive_web_graphql_skip_user_profile_image_extensions_enabled":false,"#,
    r#""communities_web_enable_tweet_community_results_fetch":true,"#,
    r#""c9s_tweet_anatomy_moderator_badge_enabled":true,"#,
    r#""articles_preview_enabled":true,"#,
    r#""tweetypie_unmention_optimization_enabled":true,"#,
    r#""responsive_web_edit_tweet_api_enabled":true,"#,
    r#""graphql_is_translatable_rweb_tweet_is_translatable_enabled":true,"#,
    r#""view_counts_everywhere_api_enabled":true,"#,
    r#""longform_notetweets_consumption_enabled":true,"#,
    r#""responsive_web_twitter_article_tweet_consumption_enabled":true,"#,
    r#""tweet_awards_web_tipping_enabled":false,"#,
    r#""creator_subscriptions_quote_tweet_preview_enabled":false,"#,
    r#""freedom_of_speech_not_reach_fetch_enabled":true,"#,
    r#""standardized_nudges_misinfo":true,"#,
    r#""tweet_with_visibility_results_prefer_gql_limited_actions_policy_enabled":true,"#,
    r#""tweet_with_visibility_results_prefer_gql_media_interstitial_enabled":true,"#,
    r#""rweb_video_timestamps_enabled":true,"#,
    r#""longform_notetweets_rich_text_read_enabled":true,"#,
    r#""longform_notetweets_inline_media_enabled":true,"#,
    r#""responsive_web_enhance_cards_enabled":false}"#,
);

/// Joins tag and filter into the raw search string
pub fn raw_query(tag: &str, filter: &str) -> String {
    [tag.trim(), filter.trim()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// A search query fixed for a run
#[derive(Debug, Clone)]
pub struct SearchQuery {
    base_url: Url,
    raw_query: String,
    mode: CrawlMode,
}

impl SearchQuery {
    pub fn new(
        base_url: &str,
        raw_query: String,
        mode: CrawlMode,
    ) -> Result<Self, url::ParseError> {
        Ok(Self {
            base_url: Url::parse(base_url)?,
            raw_query,
            mode,
        })
    }

    pub fn raw_query(&self) -> &str {
        &self.raw_query
    }

    /// URL of the page following `cursor`
    pub fn page_url(&self, cursor: &CrawlCursor) -> Result<Url, url::ParseError> {
        let variables = json!({
            "rawQuery": self.raw_query,
            "count": self.mode.page_size(),
            "cursor": cursor.as_deref().unwrap_or(""),
            "querySource": "typed_query",
            "product": self.mode.product(),
        });

        let mut url = self.base_url.join(SEARCH_TIMELINE_PATH)?;
        url.query_pairs_mut()
            .append_pair("variables", &variables.to_string())
            .append_pair("features", FEATURES);
        Ok(url)
    }

    /// Referer of the search page the request appears to come from
    pub fn referer(&self) -> Result<Url, url::ParseError> {
        let mut url = self.base_url.join("/search")?;
        url.query_pairs_mut()
            .append_pair("q", &self.raw_query)
            .append_pair("src", "typed_query")
            .append_pair("f", "media");
        Ok(url)
    }
}

/// Authenticated client for search pages
pub struct SearchClient {
    client: Client,
    query: SearchQuery,
    credentials: Credentials,
}

impl SearchClient {
    pub fn new(client: Client, query: SearchQuery, credentials: Credentials) -> Self {
        Self {
            client,
            query,
            credentials,
        }
    }

    pub fn query(&self) -> &SearchQuery {
        &self.query
    }

    /// Fetches the page following `cursor` and decodes it as JSON
    ///
    /// # Returns
    ///
    /// * `Ok(Value)` - The decoded response body
    /// * `Err(TagDownError)` - Transport error, non-success status, or a body
    ///   that is not JSON
    pub async fn fetch_page(&self, cursor: &CrawlCursor) -> Result<Value, TagDownError> {
        let url = self.query.page_url(cursor)?;
        let referer = self.query.referer()?;
        tracing::trace!("Requesting search page {}", url);

        let response = self
            .client
            .get(url.clone())
            .header(AUTHORIZATION, format!("Bearer {}", BEARER_TOKEN))
            .header(COOKIE, self.credentials.cookie())
            .header("x-csrf-token", self.credentials.csrf_token())
            .header(REFERER, referer.as_str())
            .send()
            .await
            .map_err(|source| TagDownError::Http {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TagDownError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|source| TagDownError::Http {
            url: url.to_string(),
            source,
        })?;

        serde_json::from_slice(&body).map_err(|source| TagDownError::InvalidJson {
            url: url.to_string(),
            source,
        })
    }
}
