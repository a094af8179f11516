//! Yandex Cloud Translate v2 client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use crate::application::repos::{LyricsTranslator, TranslateError};
use crate::config::TranslatorSettings;
use crate::domain::track::normalize_lines;

use super::error::InfraError;
use super::lyrics::USER_AGENT;

/// Upper bound on characters per request; the API rejects bodies over 10k.
const MAX_BATCH_CHARS: usize = 9_000;
const TRANSLATE_PATH: [&str; 3] = ["translate", "v2", "translate"];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TranslateRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    folder_id: Option<&'a str>,
    texts: &'a [String],
    target_language_code: &'a str,
    format: &'static str,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    #[serde(default)]
    translations: Vec<Translation>,
}

#[derive(Debug, Deserialize)]
struct Translation {
    #[serde(default)]
    text: String,
}

pub struct YandexTranslator {
    http: reqwest::Client,
    endpoint: Url,
    api_key: String,
    folder_id: Option<String>,
    target_language: String,
}

impl YandexTranslator {
    pub fn new(settings: &TranslatorSettings) -> Result<Self, InfraError> {
        let api_key = settings
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| InfraError::configuration("translator.api_key is not configured"))?
            .to_string();

        let endpoint = translate_endpoint(&settings.base_url)?;

        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(InfraError::http_client)?;

        Ok(Self {
            http,
            endpoint,
            api_key,
            folder_id: settings.folder_id.clone(),
            target_language: settings.target_language.clone(),
        })
    }

    async fn translate_batch(&self, texts: &[String]) -> Result<Vec<String>, TranslateError> {
        let request = TranslateRequest {
            folder_id: self.folder_id.as_deref(),
            texts,
            target_language_code: &self.target_language,
            format: "PLAIN_TEXT",
        };

        let response = self
            .http
            .post(self.endpoint.clone())
            .header(reqwest::header::AUTHORIZATION, format!("Api-Key {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|err| TranslateError::Http(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = format!(
                "HTTP {status}: {}",
                body.chars().take(200).collect::<String>()
            );
            // A rejected request cannot be translated; a server fault is an outage.
            return Err(if status.is_client_error() {
                TranslateError::failed(detail)
            } else {
                TranslateError::Http(detail)
            });
        }

        let body: TranslateResponse = response
            .json()
            .await
            .map_err(|err| TranslateError::Decode(err.to_string()))?;

        if body.translations.len() != texts.len() {
            return Err(TranslateError::failed(format!(
                "expected {} translations, got {}",
                texts.len(),
                body.translations.len()
            )));
        }

        Ok(body.translations.into_iter().map(|t| t.text).collect())
    }
}

fn translate_endpoint(base_url: &Url) -> Result<Url, InfraError> {
    let mut endpoint = base_url.clone();
    endpoint
        .path_segments_mut()
        .map_err(|_| {
            InfraError::configuration(format!("translator.base_url `{base_url}` cannot be a base"))
        })?
        .pop_if_empty()
        .extend(TRANSLATE_PATH);
    Ok(endpoint)
}

#[async_trait]
impl LyricsTranslator for YandexTranslator {
    #[instrument(skip(self, lines), fields(lines = lines.len()))]
    async fn translate(&self, lines: &[String]) -> Result<Vec<String>, TranslateError> {
        if lines.is_empty() {
            return Err(TranslateError::failed("nothing to translate"));
        }

        let mut translated = Vec::with_capacity(lines.len());
        for batch in batches(lines, MAX_BATCH_CHARS) {
            translated.extend(self.translate_batch(batch).await?);
        }

        let translated = normalize_lines(translated);
        if translated.is_empty() {
            return Err(TranslateError::failed("translation came back empty"));
        }

        debug!(translated = translated.len(), "lyrics translated");
        Ok(translated)
    }
}

/// Split `lines` into consecutive runs whose combined length stays within
/// `limit` characters. A single oversized line forms its own batch.
fn batches(lines: &[String], limit: usize) -> Vec<&[String]> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut size = 0;

    for (index, line) in lines.iter().enumerate() {
        let len = line.chars().count();
        if index > start && size + len > limit {
            out.push(&lines[start..index]);
            start = index;
            size = 0;
        }
        size += len;
    }
    if start < lines.len() {
        out.push(&lines[start..]);
    }
    out
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };
    use std::time::Duration;

    use axum::{
        Json, Router,
        extract::State,
        http::{HeaderMap, StatusCode},
        response::{IntoResponse, Response},
        routing::post,
    };
    use serde_json::{Value, json};

    use super::*;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    #[derive(Clone, Default)]
    struct FakeState {
        calls: Arc<AtomicUsize>,
    }

    async fn fake_translate(
        State(state): State<FakeState>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> Response {
        state.calls.fetch_add(1, Ordering::SeqCst);

        let authorized = headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            == Some("Api-Key test-key");
        if !authorized {
            return (StatusCode::UNAUTHORIZED, Json(json!({ "message": "bad key" })))
                .into_response();
        }
        if body["targetLanguageCode"] != "ru" || body["format"] != "PLAIN_TEXT" {
            return (StatusCode::BAD_REQUEST, Json(json!({ "message": "bad body" })))
                .into_response();
        }

        let texts = body["texts"].as_array().cloned().unwrap_or_default();
        if texts.iter().any(|text| text == "explode") {
            return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response();
        }
        if texts.iter().any(|text| text == "short") {
            return Json(json!({ "translations": [] })).into_response();
        }

        let translations: Vec<Value> = texts
            .iter()
            .map(|text| {
                let text = text.as_str().unwrap_or_default();
                json!({ "text": format!(" {} ", text.to_uppercase()), "detectedLanguageCode": "en" })
            })
            .collect();
        Json(json!({ "translations": translations })).into_response()
    }

    async fn fake_yandex() -> (Url, FakeState) {
        let state = FakeState::default();
        let router = Router::new()
            .route("/translate/v2/translate", post(fake_translate))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake server");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("fake server runs");
        });
        let url = Url::parse(&format!("http://{addr}/")).expect("fake server url");
        (url, state)
    }

    fn settings(base_url: Url, api_key: Option<&str>) -> TranslatorSettings {
        TranslatorSettings {
            base_url,
            api_key: api_key.map(str::to_string),
            folder_id: Some("folder".to_string()),
            target_language: "ru".to_string(),
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn batches_respect_character_limit() {
        let input = lines(&["aaaa", "bbbb", "cc", "dddddddddd", "e"]);

        let split = batches(&input, 8);

        assert_eq!(
            split,
            vec![
                &input[0..2],
                &input[2..3],
                &input[3..4],
                &input[4..5],
            ]
        );
    }

    #[test]
    fn batches_of_small_input_are_single() {
        let input = lines(&["one", "two"]);
        assert_eq!(batches(&input, MAX_BATCH_CHARS), vec![&input[..]]);
        assert!(batches(&[], MAX_BATCH_CHARS).is_empty());
    }

    #[test]
    fn missing_api_key_is_a_configuration_error() {
        let base = Url::parse("https://translate.api.cloud.yandex.net").expect("url");

        assert!(YandexTranslator::new(&settings(base.clone(), None)).is_err());
        assert!(YandexTranslator::new(&settings(base, Some("   "))).is_err());
    }

    #[test]
    fn endpoint_keeps_base_path_prefix() {
        let bare = Url::parse("https://translate.api.cloud.yandex.net").expect("url");
        let prefixed = Url::parse("http://gateway.local/yandex").expect("url");
        let slashed = Url::parse("http://gateway.local/yandex/").expect("url");

        assert_eq!(
            translate_endpoint(&bare).expect("endpoint").as_str(),
            "https://translate.api.cloud.yandex.net/translate/v2/translate"
        );
        assert_eq!(
            translate_endpoint(&prefixed).expect("endpoint").as_str(),
            "http://gateway.local/yandex/translate/v2/translate"
        );
        assert_eq!(
            translate_endpoint(&slashed).expect("endpoint").as_str(),
            "http://gateway.local/yandex/translate/v2/translate"
        );
    }

    #[tokio::test]
    async fn translates_and_normalizes_lines() {
        let (url, state) = fake_yandex().await;
        let translator =
            YandexTranslator::new(&settings(url, Some("test-key"))).expect("translator builds");

        let translated = translator
            .translate(&lines(&["hello", "world"]))
            .await
            .expect("translation succeeds");

        assert_eq!(translated, vec!["HELLO", "WORLD"]);
        assert_eq!(state.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn long_lyrics_are_sent_in_batches() {
        let (url, state) = fake_yandex().await;
        let translator =
            YandexTranslator::new(&settings(url, Some("test-key"))).expect("translator builds");
        let long_line = "a".repeat(5_000);

        let translated = translator
            .translate(&[long_line.clone(), long_line.clone(), "b".to_string()])
            .await
            .expect("translation succeeds");

        assert_eq!(translated.len(), 3);
        assert_eq!(state.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn rejected_request_is_translation_failure() {
        let (url, _) = fake_yandex().await;
        let translator =
            YandexTranslator::new(&settings(url, Some("wrong-key"))).expect("translator builds");

        let result = translator.translate(&lines(&["hello"])).await;

        assert!(matches!(result, Err(TranslateError::Failed(_))));
    }

    #[tokio::test]
    async fn short_response_is_translation_failure() {
        let (url, _) = fake_yandex().await;
        let translator =
            YandexTranslator::new(&settings(url, Some("test-key"))).expect("translator builds");

        let result = translator.translate(&lines(&["short"])).await;

        assert!(matches!(result, Err(TranslateError::Failed(_))));
    }

    #[tokio::test]
    async fn server_fault_is_http_error() {
        let (url, _) = fake_yandex().await;
        let translator =
            YandexTranslator::new(&settings(url, Some("test-key"))).expect("translator builds");

        let result = translator.translate(&lines(&["explode"])).await;

        assert!(matches!(result, Err(TranslateError::Http(_))));
    }

    #[tokio::test]
    async fn empty_input_is_rejected_without_a_request() {
        let (url, state) = fake_yandex().await;
        let translator =
            YandexTranslator::new(&settings(url, Some("test-key"))).expect("translator builds");

        let result = translator.translate(&[]).await;

        assert!(matches!(result, Err(TranslateError::Failed(_))));
        assert_eq!(state.calls.load(Ordering::SeqCst), 0);
    }
}
