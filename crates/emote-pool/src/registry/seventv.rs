//! 7TV GraphQL emote set client.
//!
//! Both mutations go to a single POST endpoint with a bearer token. 7TV
//! reports rejected mutations inside the body, so a body mentioning
//! `BAD_REQUEST` is a failure whatever the HTTP status says.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use super::{EmoteRegistry, RegistryError};
use crate::catalog::EmoteId;
use crate::version::user_agent;

pub const DEFAULT_API_URL: &str = "https://api.7tv.app/v4/gql";

const REJECTION_MARKER: &str = "BAD_REQUEST";

const ADD_EMOTE_MUTATION: &str = "mutation AddEmoteToSet($setId: Id!, $emote: EmoteSetEmoteId!) {
    emoteSets {
        emoteSet(id: $setId) {
            addEmote(id: $emote) {
                id
                __typename
            }
            __typename
        }
        __typename
    }
}";

const REMOVE_EMOTE_MUTATION: &str = "mutation RemoveEmoteFromSet($setId: Id!, $emote: EmoteSetEmoteId!) {
    emoteSets {
        emoteSet(id: $setId) {
            removeEmote(id: $emote) {
                id
                __typename
            }
            __typename
        }
        __typename
    }
}";

#[derive(Debug, Clone)]
pub struct SevenTvConfig {
    pub api_url: String,
    pub token: String,
    pub set_id: String,
    pub timeout: Duration,
}

impl SevenTvConfig {
    pub fn new(token: String, set_id: String) -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            token,
            set_id,
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_api_url(mut self, api_url: String) -> Self {
        self.api_url = api_url;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

pub struct SevenTvRegistry {
    api_url: String,
    set_id: String,
    client: reqwest::Client,
}

impl SevenTvRegistry {
    pub fn new(config: SevenTvConfig) -> Result<Self, RegistryError> {
        let mut headers = reqwest::header::HeaderMap::new();

        let auth = reqwest::header::HeaderValue::from_str(&format!("Bearer {}", config.token))
            .map_err(|_| RegistryError::InvalidToken)?;
        headers.insert(reqwest::header::AUTHORIZATION, auth);

        if let Ok(value) = reqwest::header::HeaderValue::from_str(&user_agent()) {
            headers.insert(reqwest::header::USER_AGENT, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            api_url: config.api_url,
            set_id: config.set_id,
            client,
        })
    }

    pub fn set_id(&self) -> &str {
        &self.set_id
    }

    fn add_payload(&self, alias: &str, id: &EmoteId) -> serde_json::Value {
        json!({
            "operationName": "AddEmoteToSet",
            "query": ADD_EMOTE_MUTATION,
            "variables": {
                "emote": {
                    "alias": alias,
                    "emoteId": id,
                },
                "setId": self.set_id,
            }
        })
    }

    fn remove_payload(&self, id: &EmoteId) -> serde_json::Value {
        json!({
            "operationName": "RemoveEmoteFromSet",
            "query": REMOVE_EMOTE_MUTATION,
            "variables": {
                "emote": {
                    "emoteId": id,
                },
                "setId": self.set_id,
            }
        })
    }

    async fn execute(&self, payload: &serde_json::Value) -> Result<(), RegistryError> {
        let operation = payload["operationName"].as_str().unwrap_or_default();
        tracing::debug!(operation, "Sending 7TV mutation");

        let response = self.client.post(&self.api_url).json(payload).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        tracing::debug!(operation, status, body = %body, "7TV response");

        check_response(status, &body)
    }
}

fn check_response(status: u16, body: &str) -> Result<(), RegistryError> {
    if body.contains(REJECTION_MARKER) {
        return Err(RegistryError::Rejected(body.to_string()));
    }
    if serde_json::from_str::<serde_json::Value>(body).is_err() {
        return Err(RegistryError::Malformed(format!("HTTP {status}: {body}")));
    }
    if !(200..300).contains(&status) {
        tracing::warn!(status, "7TV answered with a non-success status, treating body as authoritative");
    }
    Ok(())
}

#[async_trait]
impl EmoteRegistry for SevenTvRegistry {
    async fn add(&self, alias: &str, id: &EmoteId) -> Result<(), RegistryError> {
        self.execute(&self.add_payload(alias, id)).await
    }

    async fn remove(&self, id: &EmoteId) -> Result<(), RegistryError> {
        self.execute(&self.remove_payload(id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const EMOTE: &str = "01F5VW2TKR0003RCV2Z6JBHCST";
    const SET: &str = "01JXB28M4B0BN5ZFZKDHTFH8BM";

    fn registry(server: &MockServer) -> SevenTvRegistry {
        let config = SevenTvConfig::new("secret".to_string(), SET.to_string())
            .with_api_url(format!("{}/v4/gql", server.uri()))
            .with_timeout(Duration::from_secs(2));
        SevenTvRegistry::new(config).unwrap()
    }

    #[test]
    fn config_defaults() {
        let config = SevenTvConfig::new("t".to_string(), SET.to_string());
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.timeout, Duration::from_secs(10));
    }

    #[test]
    fn token_with_newline_is_rejected() {
        let config = SevenTvConfig::new("bad\ntoken".to_string(), SET.to_string());
        assert!(matches!(
            SevenTvRegistry::new(config),
            Err(RegistryError::InvalidToken)
        ));
    }

    #[test]
    fn add_payload_variables() {
        let config = SevenTvConfig::new("t".to_string(), SET.to_string());
        let registry = SevenTvRegistry::new(config).unwrap();
        let payload = registry.add_payload("catJAM", &EmoteId::from(EMOTE));

        assert_eq!(payload["operationName"], "AddEmoteToSet");
        assert!(payload["query"].as_str().unwrap().contains("addEmote"));
        insta::assert_json_snapshot!(payload["variables"], @r###"
        {
          "emote": {
            "alias": "catJAM",
            "emoteId": "01F5VW2TKR0003RCV2Z6JBHCST"
          },
          "setId": "01JXB28M4B0BN5ZFZKDHTFH8BM"
        }
        "###);
    }

    #[test]
    fn remove_payload_has_no_alias() {
        let config = SevenTvConfig::new("t".to_string(), SET.to_string());
        let registry = SevenTvRegistry::new(config).unwrap();
        let payload = registry.remove_payload(&EmoteId::from(EMOTE));

        assert_eq!(payload["operationName"], "RemoveEmoteFromSet");
        assert!(payload["query"].as_str().unwrap().contains("removeEmote"));
        assert!(payload["variables"]["emote"].get("alias").is_none());
        assert_eq!(payload["variables"]["emote"]["emoteId"], EMOTE);
        assert_eq!(payload["variables"]["setId"], SET);
    }

    #[test]
    fn check_response_rules() {
        assert!(check_response(200, r#"{"data":{}}"#).is_ok());
        assert!(check_response(500, r#"{"data":null}"#).is_ok());
        assert!(matches!(
            check_response(200, r#"{"errors":[{"extensions":{"code":"BAD_REQUEST"}}]}"#),
            Err(RegistryError::Rejected(_))
        ));
        assert!(matches!(
            check_response(502, "<html>bad gateway</html>"),
            Err(RegistryError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn add_posts_mutation_with_bearer_token() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v4/gql"))
            .and(header("authorization", "Bearer secret"))
            .and(body_partial_json(serde_json::json!({
                "operationName": "AddEmoteToSet",
                "variables": {"emote": {"alias": "catJAM", "emoteId": EMOTE}, "setId": SET}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"data":{"emoteSets":{"emoteSet":{"addEmote":{"id":"x"}}}}}"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        registry(&server)
            .add("catJAM", &EmoteId::from(EMOTE))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn add_fails_on_bad_request_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v4/gql"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"errors":[{"message":"emote already in set","extensions":{"code":"BAD_REQUEST"}}]}"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let result = registry(&server).add("catJAM", &EmoteId::from(EMOTE)).await;
        assert!(matches!(result, Err(RegistryError::Rejected(_))));
    }

    #[tokio::test]
    async fn remove_posts_mutation() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v4/gql"))
            .and(body_partial_json(serde_json::json!({
                "operationName": "RemoveEmoteFromSet",
                "variables": {"emote": {"emoteId": EMOTE}, "setId": SET}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"data":{}}"#))
            .expect(1)
            .mount(&server)
            .await;

        registry(&server)
            .remove(&EmoteId::from(EMOTE))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn unmatched_route_is_malformed() {
        // No mocks mounted: wiremock answers 404 with an empty body
        let server = MockServer::start().await;

        let result = registry(&server).remove(&EmoteId::from(EMOTE)).await;
        match result {
            Err(RegistryError::Malformed(detail)) => assert!(detail.starts_with("HTTP 404")),
            other => panic!("expected Malformed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_registry_is_an_error() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let config = SevenTvConfig::new("secret".to_string(), SET.to_string())
            .with_api_url(format!("http://127.0.0.1:{port}/v4/gql"))
            .with_timeout(Duration::from_secs(2));
        let registry = SevenTvRegistry::new(config).unwrap();

        let result = registry.remove(&EmoteId::from(EMOTE)).await;
        assert!(matches!(result, Err(RegistryError::Http(_))));
    }
}
