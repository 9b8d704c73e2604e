//! The Worker (C3): drives one `BackendClient::stream` call to completion
//! and collapses it into a `ResponseSummary`, never surfacing an `Err` —
//! backend failures are folded into `ResponseSummary::error` so the pool
//! keeps running.

use crate::request::{Request, ResponseSummary};
use futures::StreamExt;
use genbench_backend::{BackendClient, BackendRequest, StreamingEvent};
use genbench_core::{Clock, Timestamp};
use std::time::Instant as StdInstant;

/// Stateless driver around a `BackendClient`; cheap to clone per worker
/// task since the client itself holds the connection pool.
#[derive(Clone)]
pub struct Worker {
    client: std::sync::Arc<BackendClient>,
    clock: Clock,
}

impl Worker {
    pub fn new(client: std::sync::Arc<BackendClient>) -> Self {
        Self { client, clock: Clock::new() }
    }

    /// Resolve one request end to end. `deadline`, if set, is translated
    /// from the scheduler's `Timestamp` domain into `std::time::Instant`
    /// by measuring the remaining gap from `self.clock` at call time —
    /// the two clocks tick at the same rate but have different epochs.
    pub async fn resolve(&self, request: &Request, deadline: Option<Timestamp>) -> ResponseSummary {
        let std_deadline = deadline.map(|d| {
            let now = self.clock.now();
            let gap = if d <= now {
                std::time::Duration::ZERO
            } else {
                d.duration_since(now)
            };
            StdInstant::now() + gap
        });

        let backend_request = BackendRequest::chat(
            request.model.clone(),
            vec![genbench_backend::Message {
                role: genbench_backend::MessageRole::User,
                content: request.prompt.clone(),
            }],
        );

        let start_time = self.clock.now();
        let mut stream = self.client.stream(backend_request, std_deadline);

        let mut value = String::new();
        let mut first_iter_time = None;
        let mut last_iter_time = None;
        let mut iter_count = 0u64;
        let mut response_output_tokens = None;
        let mut response_prompt_tokens = None;
        let mut error = None;

        while let Some(event) = stream.next().await {
            match event {
                Ok(StreamingEvent::Start) => {}
                Ok(StreamingEvent::Iter { delta }) => {
                    let now = self.clock.now();
                    if first_iter_time.is_none() {
                        first_iter_time = Some(now);
                    }
                    last_iter_time = Some(now);
                    iter_count += 1;
                    value.push_str(&delta);
                }
                Ok(StreamingEvent::Final { usage }) => {
                    response_prompt_tokens = usage.prompt_tokens;
                    response_output_tokens = Some(usage.output_tokens);
                }
                Err(e) => {
                    error = Some(e);
                    break;
                }
            }
        }

        let end_time = self.clock.now();

        ResponseSummary {
            value,
            start_time,
            end_time,
            first_iter_time,
            last_iter_time,
            iter_count,
            request_prompt_tokens: request.prompt_tokens_hint,
            request_output_tokens: request.output_tokens_hint,
            response_prompt_tokens,
            response_output_tokens,
            request_id: request.id,
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use genbench_backend::BackendConfig;

    #[tokio::test]
    async fn resolve_against_an_unreachable_target_yields_a_transport_error() {
        let client = std::sync::Arc::new(BackendClient::new(BackendConfig {
            target: "http://127.0.0.1:1".into(),
            connect_timeout: std::time::Duration::from_millis(200),
            ..Default::default()
        }));
        let worker = Worker::new(client);
        let request = Request::new("hello");
        let response = worker.resolve(&request, None).await;
        assert!(!response.is_success());
        assert_eq!(response.iter_count, 0);
    }
}
