//! LLM-backed composer: one call to an OpenAI-compatible
//! chat-completions endpoint per (unit, target) pair.
//!
//! Prompt content stays minimal and mechanical; the interesting
//! guarantees (length enforcement, fallback, rate limiting) live in the
//! stack around this client, not in the prompt.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use herald_core::config::LlmConfig;
use herald_core::planner::AnnouncePhase;

use crate::{ComposeError, ComposeRequest, Composer};

pub struct LlmComposer {
    http: reqwest::Client,
    config: LlmConfig,
}

impl LlmComposer {
    pub fn new(http: reqwest::Client, config: LlmConfig) -> Self {
        Self { http, config }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

fn phase_instruction(phase: AnnouncePhase) -> &'static str {
    match phase {
        AnnouncePhase::Live => "announcing that the stream(s) just went live",
        AnnouncePhase::End => "announcing that the stream(s) just ended",
        AnnouncePhase::SessionEnd => {
            "thanking viewers now that every stream of the session has ended"
        }
    }
}

fn build_user_prompt(req: &ComposeRequest) -> String {
    let mut lines = vec![format!(
        "Write one social post (max {} characters, plain text, no hashtags) {}.",
        req.target_kind.max_chars(),
        phase_instruction(req.phase),
    )];
    for t in &req.transitions {
        let title = t.title.as_deref().unwrap_or("(no title)");
        lines.push(format!(
            "- {} on {}: {} ({})",
            t.source.handle,
            t.source.platform.display_name(),
            title,
            t.source.watch_url(),
        ));
    }
    lines.join("\n")
}

#[async_trait]
impl Composer for LlmComposer {
    async fn compose(&self, req: &ComposeRequest) -> Result<String, ComposeError> {
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        let body = json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "messages": [
                {
                    "role": "system",
                    "content": "You write short, friendly live-stream announcements."
                },
                { "role": "user", "content": build_user_prompt(req) }
            ],
        });

        let mut request = self.http.post(&url).json(&body);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ComposeError::Timeout
            } else {
                ComposeError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ComposeError::Http {
                status: status.as_u16(),
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ComposeError::InvalidResponse(e.to_string()))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();
        if content.trim().is_empty() {
            return Err(ComposeError::Empty);
        }
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_core::types::{Source, StreamPlatform, TargetId, TargetKind, Transition, TransitionKind};

    #[test]
    fn prompt_lists_every_stream_and_the_limit() {
        let req = ComposeRequest {
            phase: AnnouncePhase::Live,
            transitions: vec![
                Transition {
                    source: Source::new(StreamPlatform::Twitch, "ada"),
                    kind: TransitionKind::WentLive,
                    title: Some("Day 1".to_owned()),
                    target_ids: vec![TargetId::new("t")],
                },
                Transition {
                    source: Source::new(StreamPlatform::Kick, "grace"),
                    kind: TransitionKind::WentLive,
                    title: None,
                    target_ids: vec![TargetId::new("t")],
                },
            ],
            target_kind: TargetKind::Bluesky,
        };
        let prompt = build_user_prompt(&req);
        assert!(prompt.contains("max 300 characters"));
        assert!(prompt.contains("ada on Twitch: Day 1"));
        assert!(prompt.contains("grace on Kick: (no title)"));
        assert!(prompt.contains("went live"));
    }

    #[test]
    fn chat_response_parses_first_choice() {
        let parsed: ChatResponse = serde_json::from_str(
            r#"{"choices": [{"message": {"role": "assistant", "content": "We are live!"}}]}"#,
        )
        .expect("parse");
        assert_eq!(parsed.choices[0].message.content, "We are live!");
    }

    #[test]
    fn session_end_instruction_differs() {
        assert_ne!(
            phase_instruction(AnnouncePhase::Live),
            phase_instruction(AnnouncePhase::SessionEnd)
        );
    }
}
