//! lyrics.ovh HTTP client.
//!
//! `GET {base}/v1/{artist}/{title}` answers `{"lyrics": "..."}` on success and
//! `404 {"error": "No lyrics found"}` when the song is unknown.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

use crate::application::repos::{LyricsError, LyricsProvider};
use crate::config::LyricsSettings;
use crate::domain::track::format_lyrics;

use super::error::InfraError;

pub(crate) const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct LyricsResponse {
    #[serde(default)]
    lyrics: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

pub struct LyricsOvhClient {
    http: reqwest::Client,
    base_url: Url,
}

impl LyricsOvhClient {
    pub fn new(settings: &LyricsSettings) -> Result<Self, InfraError> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(InfraError::http_client)?;

        Ok(Self {
            http,
            base_url: settings.base_url.clone(),
        })
    }

    fn lyrics_url(&self, artist: &str, title: &str) -> Result<Url, LyricsError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| LyricsError::Http(format!("`{}` cannot be a base", self.base_url)))?;
            segments.pop_if_empty().extend(["v1", artist, title]);
        }
        Ok(url)
    }
}

#[async_trait]
impl LyricsProvider for LyricsOvhClient {
    #[instrument(skip(self))]
    async fn lyrics(&self, artist: &str, title: &str) -> Result<Vec<String>, LyricsError> {
        let url = self.lyrics_url(artist, title)?;

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|err| LyricsError::Http(err.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(LyricsError::NotFound);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LyricsError::Http(format!(
                "HTTP {status}: {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        let body: LyricsResponse = response
            .json()
            .await
            .map_err(|err| LyricsError::Decode(err.to_string()))?;

        if let Some(message) = body.error.filter(|message| !message.trim().is_empty()) {
            if message.to_ascii_lowercase().contains("no lyrics") {
                return Err(LyricsError::NotFound);
            }
            return Err(LyricsError::Api(message));
        }

        let lines = format_lyrics(body.lyrics.as_deref().unwrap_or_default());
        if lines.is_empty() {
            return Err(LyricsError::NotFound);
        }

        debug!(lines = lines.len(), "lyrics fetched");
        Ok(lines)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::{Json, Router, extract::Path, http::StatusCode as AxumStatus, routing::get};
    use serde_json::json;

    use super::*;

    async fn fake_lyrics_ovh() -> Url {
        let router = Router::new().route(
            "/v1/{artist}/{title}",
            get(|Path((artist, title)): Path<(String, String)>| async move {
                match (artist.as_str(), title.as_str()) {
                    ("Juice WRLD", "Lucid Dreams") => (
                        AxumStatus::OK,
                        Json(json!({ "lyrics": "I still see your shadows in my room\r\n\r\n  Can't take back the love that I gave you \n" })),
                    ),
                    ("Blank", "Song") => (AxumStatus::OK, Json(json!({ "lyrics": "  \n\r\n" }))),
                    ("Broken", "Api") => (
                        AxumStatus::OK,
                        Json(json!({ "error": "Rate limited" })),
                    ),
                    ("Down", "Stream") => (
                        AxumStatus::BAD_GATEWAY,
                        Json(json!({ "error": "upstream down" })),
                    ),
                    _ => (
                        AxumStatus::NOT_FOUND,
                        Json(json!({ "error": "No lyrics found" })),
                    ),
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake server");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("fake server runs");
        });
        Url::parse(&format!("http://{addr}")).expect("fake server url")
    }

    fn client(base_url: Url) -> LyricsOvhClient {
        LyricsOvhClient::new(&LyricsSettings {
            base_url,
            timeout: Duration::from_secs(5),
        })
        .expect("client builds")
    }

    #[test]
    fn url_segments_are_percent_encoded() {
        let client = client(Url::parse("https://api.lyrics.ovh/").expect("url"));
        let url = client
            .lyrics_url("AC/DC", "Back In Black?")
            .expect("url builds");
        assert_eq!(
            url.as_str(),
            "https://api.lyrics.ovh/v1/AC%2FDC/Back%20In%20Black%3F"
        );
    }

    #[tokio::test]
    async fn fetches_and_formats_lyrics() {
        let client = client(fake_lyrics_ovh().await);

        let lines = client
            .lyrics("Juice WRLD", "Lucid Dreams")
            .await
            .expect("lyrics found");

        assert_eq!(
            lines,
            vec![
                "I still see your shadows in my room",
                "Can't take back the love that I gave you",
            ]
        );
    }

    #[tokio::test]
    async fn unknown_song_is_not_found() {
        let client = client(fake_lyrics_ovh().await);

        let result = client.lyrics("Nobody", "Nothing").await;

        assert!(matches!(result, Err(LyricsError::NotFound)));
    }

    #[tokio::test]
    async fn blank_lyrics_are_not_found() {
        let client = client(fake_lyrics_ovh().await);

        let result = client.lyrics("Blank", "Song").await;

        assert!(matches!(result, Err(LyricsError::NotFound)));
    }

    #[tokio::test]
    async fn api_error_field_is_reported() {
        let client = client(fake_lyrics_ovh().await);

        let result = client.lyrics("Broken", "Api").await;

        match result {
            Err(LyricsError::Api(message)) => assert_eq!(message, "Rate limited"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn server_errors_are_http_failures() {
        let client = client(fake_lyrics_ovh().await);

        let result = client.lyrics("Down", "Stream").await;

        match result {
            Err(LyricsError::Http(message)) => assert!(message.contains("502")),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
