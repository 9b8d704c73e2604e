//! The Backend Client (C2): issues one streaming completion request against
//! an OpenAI-compatible server and yields `StreamingEvent`s.
//!
//! Wire contract: SSE lines prefixed `data: `,
//! terminated by the literal `[DONE]`, chat deltas at
//! `choices[0].delta.content`, text deltas at `choices[0].text`, usage at
//! `usage.completion_tokens`. Multi-token usage deltas are fanned out into
//! one `Iter` event per token so `iter_count` always equals the server's
//! reported output token count.

use crate::error::{BackendError, Result};
use crate::types::{BackendConfig, BackendRequest, Endpoint, Message, MessageRole, StreamingEvent, UsageTotals};
use futures::Stream;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::{json, Value};
use std::pin::Pin;
use std::time::Instant;

/// A configured HTTP client for the streaming completions contract.
pub struct BackendClient {
    http: reqwest::Client,
    config: BackendConfig,
}

impl BackendClient {
    pub fn new(config: BackendConfig) -> Self {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .redirect(if config.follow_redirects {
                reqwest::redirect::Policy::limited(10)
            } else {
                reqwest::redirect::Policy::none()
            });

        if config.http2 {
            builder = builder.http2_prior_knowledge();
        }

        Self {
            http: builder.build().expect("failed to build HTTP client"),
            config,
        }
    }

    fn build_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(ref key) = self.config.api_key {
            if let Ok(value) = HeaderValue::from_str(&format!("Bearer {key}")) {
                headers.insert(AUTHORIZATION, value);
            }
        }
        if let Some(ref org) = self.config.organization {
            if let Ok(value) = HeaderValue::from_str(org) {
                headers.insert("OpenAI-Organization", value);
            }
        }
        if let Some(ref project) = self.config.project {
            if let Ok(value) = HeaderValue::from_str(project) {
                headers.insert("OpenAI-Project", value);
            }
        }

        headers
    }

    fn build_url(&self, endpoint: Endpoint) -> reqwest::Url {
        let mut url = reqwest::Url::parse(&format!("{}{}", self.config.target, endpoint.path()))
            .expect("target + endpoint path must form a valid URL");

        if let Some(overrides) = self.config.extra_query.get(endpoint.extra_query_key()) {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in overrides {
                pairs.append_pair(key, value);
            }
        }

        url
    }

    fn build_body(&self, request: &BackendRequest) -> Value {
        let mut body = serde_json::Map::new();
        body.insert("model".to_string(), json!(request.model));

        match request.endpoint() {
            Endpoint::ChatCompletions => {
                let messages = request.messages.as_ref().expect("chat request without messages");
                body.insert("messages".to_string(), json!(messages_to_wire(messages)));
            }
            Endpoint::TextCompletions => {
                body.insert("prompt".to_string(), json!(request.prompt.clone().unwrap_or_default()));
            }
        }

        body.insert("stream".to_string(), json!(true));
        body.insert(
            "stream_options".to_string(),
            json!({ "include_usage": true, "continuous_usage_stats": true }),
        );

        let max_output = request.max_output_tokens.or(self.config.max_output_tokens);
        if let Some(n) = max_output {
            body.insert("max_tokens".to_string(), json!(n));
        }

        // Request-level max_output_tokens forces the server to honor the cap
        // exactly rather than stop early; the instance-level default does not.
        if request.max_output_tokens.is_some() {
            body.insert("stop".to_string(), Value::Null);
            body.insert("ignore_eos".to_string(), json!(true));
        }

        for (key, value) in &self.config.extra_body {
            body.insert(key.clone(), value.clone());
        }

        Value::Object(body)
    }

    /// Issue the request and return the event stream. `deadline` is the
    /// absolute wall-clock instant the caller must abandon the stream by.
    pub fn stream(
        &self,
        request: BackendRequest,
        deadline: Option<Instant>,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamingEvent>> + Send>> {
        let endpoint = request.endpoint();
        let url = self.build_url(endpoint);
        let headers = self.build_headers();
        let body = self.build_body(&request);
        let req_builder = self.http.post(url).headers(headers).json(&body);
        let is_chat = matches!(endpoint, Endpoint::ChatCompletions);

        let stream = async_stream::stream! {
            yield Ok(StreamingEvent::Start);

            let mut event_source = match reqwest_eventsource::EventSource::new(req_builder) {
                Ok(es) => es,
                Err(e) => {
                    yield Err(BackendError::Transport(e.to_string()));
                    return;
                }
            };

            let mut running_total: u64 = 0;
            let mut prompt_tokens: Option<u64> = None;

            loop {
                let next = match deadline {
                    Some(at) => {
                        let tokio_deadline = tokio::time::Instant::from_std(at);
                        match tokio::time::timeout_at(tokio_deadline, next_event(&mut event_source)).await {
                            Ok(item) => item,
                            Err(_) => {
                                yield Err(BackendError::Deadline);
                                event_source.close();
                                return;
                            }
                        }
                    }
                    None => next_event(&mut event_source).await,
                };

                let Some(event) = next else { break };

                match event {
                    Ok(reqwest_eventsource::Event::Open) => continue,
                    Ok(reqwest_eventsource::Event::Message(message)) => {
                        if message.data == "[DONE]" {
                            yield Ok(StreamingEvent::Final {
                                usage: UsageTotals { prompt_tokens, output_tokens: running_total },
                            });
                            break;
                        }

                        let chunk: Value = match serde_json::from_str(&message.data) {
                            Ok(v) => v,
                            Err(e) => {
                                yield Err(BackendError::MalformedStream(e.to_string()));
                                break;
                            }
                        };

                        let text = if is_chat {
                            chunk
                                .get("choices")
                                .and_then(|c| c.get(0))
                                .and_then(|c| c.get("delta"))
                                .and_then(|d| d.get("content"))
                                .and_then(|v| v.as_str())
                                .map(str::to_string)
                        } else {
                            chunk
                                .get("choices")
                                .and_then(|c| c.get(0))
                                .and_then(|c| c.get("text"))
                                .and_then(|v| v.as_str())
                                .map(str::to_string)
                        };

                        if let Some(usage) = chunk.get("usage") {
                            if let Some(p) = usage.get("prompt_tokens").and_then(|v| v.as_u64()) {
                                prompt_tokens = Some(p);
                            }
                        }

                        let completion_tokens = chunk
                            .get("usage")
                            .and_then(|u| u.get("completion_tokens"))
                            .and_then(|v| v.as_u64());

                        let Some(text) = text else { continue };

                        let delta = match completion_tokens {
                            Some(total) => total as i64 - running_total as i64,
                            None => 1,
                        };

                        if delta < 1 {
                            tracing::debug!(delta, "dropping non-positive token delta chunk");
                            if let Some(total) = completion_tokens {
                                if (total as i64) < running_total as i64 {
                                    tracing::warn!(
                                        previous = running_total,
                                        reported = total,
                                        "server reported non-monotonic completion_tokens"
                                    );
                                }
                            }
                            continue;
                        }

                        for _ in 0..delta {
                            yield Ok(StreamingEvent::Iter { delta: text.clone() });
                        }

                        running_total = completion_tokens.unwrap_or(running_total + delta as u64);
                    }
                    Err(reqwest_eventsource::Error::InvalidStatusCode(status, response)) => {
                        let status_code = status.as_u16();
                        let body = response.text().await.unwrap_or_default();
                        yield Err(BackendError::from_response_body(status_code, body));
                        break;
                    }
                    Err(e) => {
                        yield Err(BackendError::Transport(e.to_string()));
                        break;
                    }
                }
            }

            event_source.close();
        };

        Box::pin(stream)
    }
}

async fn next_event(
    event_source: &mut reqwest_eventsource::EventSource,
) -> Option<std::result::Result<reqwest_eventsource::Event, reqwest_eventsource::Error>> {
    use futures::StreamExt;
    event_source.next().await
}

fn messages_to_wire(messages: &[Message]) -> Vec<Value> {
    messages
        .iter()
        .map(|m| {
            json!({
                "role": match m.role {
                    MessageRole::System => "system",
                    MessageRole::User => "user",
                    MessageRole::Assistant => "assistant",
                },
                "content": m.content,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BackendRequest;

    fn client(target: &str) -> BackendClient {
        BackendClient::new(BackendConfig {
            target: target.to_string(),
            ..Default::default()
        })
    }

    #[test]
    fn chat_body_sets_stream_and_usage_options() {
        let client = client("http://localhost:8000");
        let request = BackendRequest::chat("gpt-4o", vec![Message { role: MessageRole::User, content: "hi".into() }]);
        let body = client.build_body(&request);
        assert_eq!(body["stream"], json!(true));
        assert_eq!(body["stream_options"]["include_usage"], json!(true));
        assert_eq!(body["messages"][0]["role"], json!("user"));
    }

    #[test]
    fn text_body_uses_prompt_field() {
        let client = client("http://localhost:8000");
        let request = BackendRequest::text("gpt-3.5-turbo-instruct", "once upon a time");
        let body = client.build_body(&request);
        assert_eq!(body["prompt"], json!("once upon a time"));
        assert!(body.get("messages").is_none());
    }

    #[test]
    fn request_level_max_output_tokens_forces_ignore_eos() {
        let client = client("http://localhost:8000");
        let mut request = BackendRequest::chat("gpt-4o", vec![]);
        request.max_output_tokens = Some(64);
        let body = client.build_body(&request);
        assert_eq!(body["max_tokens"], json!(64));
        assert_eq!(body["ignore_eos"], json!(true));
        assert!(body["stop"].is_null());
    }

    #[test]
    fn instance_level_cap_does_not_force_ignore_eos() {
        let mut config = BackendConfig { target: "http://localhost:8000".into(), ..Default::default() };
        config.max_output_tokens = Some(128);
        let client = BackendClient::new(config);
        let request = BackendRequest::chat("gpt-4o", vec![]);
        let body = client.build_body(&request);
        assert_eq!(body["max_tokens"], json!(128));
        assert!(body.get("ignore_eos").is_none());
    }

    #[test]
    fn extra_query_merges_into_matching_endpoint() {
        let mut config = BackendConfig { target: "http://localhost:8000".into(), ..Default::default() };
        config.extra_query.insert("chat_completions".into(), [("beta".to_string(), "1".to_string())].into());
        let client = BackendClient::new(config);
        let url = client.build_url(Endpoint::ChatCompletions);
        assert!(url.query().unwrap().contains("beta=1"));
    }

    #[test]
    fn builds_bearer_auth_header() {
        let mut config = BackendConfig { target: "http://localhost:8000".into(), ..Default::default() };
        config.api_key = Some("sk-test".into());
        let client = BackendClient::new(config);
        let headers = client.build_headers();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer sk-test");
    }

    #[tokio::test]
    async fn http_503_surfaces_as_a_retryable_backend_error() {
        use futures::StreamExt;
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(503).set_body_string("service unavailable"))
            .mount(&server)
            .await;

        let client = client(&server.uri());
        let request = BackendRequest::chat("gpt-4o", vec![Message { role: MessageRole::User, content: "hi".into() }]);
        let mut stream = client.stream(request, None);

        let mut saw_status_error = false;
        while let Some(event) = stream.next().await {
            if let Err(err) = event {
                assert!(err.is_retryable(), "a 503 must be reported as retryable");
                assert!(matches!(err, BackendError::HttpStatus { status: 503, .. }));
                saw_status_error = true;
                break;
            }
        }
        assert!(saw_status_error, "expected an HttpStatus error for a 503 response");
    }

    #[tokio::test]
    async fn deadline_elapsing_mid_stream_yields_a_deadline_error() {
        use futures::StreamExt;
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string("data: {\"choices\":[{\"delta\":{\"content\":\"hi\"}}]}\n\n")
                    .set_delay(std::time::Duration::from_millis(300)),
            )
            .mount(&server)
            .await;

        let client = client(&server.uri());
        let request = BackendRequest::chat("gpt-4o", vec![Message { role: MessageRole::User, content: "hi".into() }]);
        let deadline = Instant::now() + std::time::Duration::from_millis(30);
        let mut stream = client.stream(request, Some(deadline));

        let mut saw_deadline = false;
        while let Some(event) = stream.next().await {
            if let Err(BackendError::Deadline) = event {
                saw_deadline = true;
                break;
            }
        }
        assert!(saw_deadline, "expected the stream to report BackendError::Deadline");
    }
}
