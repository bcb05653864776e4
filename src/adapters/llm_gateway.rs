//! LLM adapter (§2 component 2): prompt→text and prompt→JSON through the external
//! gateway. Builder shape lifted from `discord/agent.rs`
//! (`rig-core`'s `CompletionModel::into_agent_builder()...build()`), swapped from
//! `providers::openai` to `providers::anthropic` per this system's configuration
//! (§9b). The tolerant JSON extraction cascade is grounded in the
//! `AnthropicClient.extract_json` four-tier fallback it replaces: direct parse →
//! fenced ```json → fenced ``` → first `{…}` substring → give up.

use async_trait::async_trait;
use rig::agent::Agent;
use rig::completion::Prompt;
use rig::providers::anthropic;
use serde_json::Value;

#[async_trait]
pub trait LlmGateway: Send + Sync {
    async fn complete(&self, prompt: &str) -> eyre::Result<String>;

    /// §9's "Wire compatibility" tolerant parsing: never errors on malformed output,
    /// returns `None` instead (§4.4's "fails soft").
    async fn complete_json(&self, prompt: &str) -> eyre::Result<Option<Value>> {
        let text = self.complete(prompt).await?;
        Ok(extract_json(&text))
    }
}

pub struct AnthropicGateway {
    agent: Agent<anthropic::completion::CompletionModel>,
    max_retries: u32,
}

impl AnthropicGateway {
    pub fn new(api_key: &str, model: &str, max_retries: u32) -> Self {
        let client = anthropic::Client::new(api_key);
        let completion_model = anthropic::completion::CompletionModel::new(client, model);
        let agent = completion_model
            .into_agent_builder()
            .preamble("You are a JSON-emitting assistant for a news pipeline. Follow the caller's instructions exactly and prefer returning pure JSON with no surrounding prose.")
            .build();
        AnthropicGateway { agent, max_retries }
    }
}

#[async_trait]
impl LlmGateway for AnthropicGateway {
    async fn complete(&self, prompt: &str) -> eyre::Result<String> {
        let mut last_err = None;
        // §7: LLM calls up to 2 attempts.
        for attempt in 0..=self.max_retries {
            match self.agent.prompt(prompt).await {
                Ok(text) => return Ok(text),
                Err(err) => {
                    tracing::warn!(attempt, ?err, "llm gateway call failed");
                    last_err = Some(err);
                }
            }
        }
        Err(eyre::eyre!(
            "llm gateway exhausted {} retries: {:?}",
            self.max_retries,
            last_err
        ))
    }
}

fn extract_json(text: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str::<Value>(text.trim()) {
        return Some(value);
    }

    if let Some(value) = extract_fenced(text, "```json") {
        return Some(value);
    }
    if let Some(value) = extract_fenced(text, "```") {
        return Some(value);
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

fn extract_fenced(text: &str, fence: &str) -> Option<Value> {
    let start = text.find(fence)? + fence.len();
    let rest = &text[start..];
    let end = rest.find("```")?;
    serde_json::from_str(rest[..end].trim()).ok()
}

/// Fixed fake used by component tests: echoes back a canned response per call,
/// never touching the network.
pub struct FakeLlmGateway {
    pub responses: std::sync::Mutex<std::collections::VecDeque<String>>,
}

impl FakeLlmGateway {
    pub fn new(responses: Vec<String>) -> Self {
        FakeLlmGateway {
            responses: std::sync::Mutex::new(responses.into()),
        }
    }
}

#[async_trait]
impl LlmGateway for FakeLlmGateway {
    async fn complete(&self, _prompt: &str) -> eyre::Result<String> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| eyre::eyre!("fake llm gateway has no more canned responses"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_plain_json() {
        let v = extract_json(r#"{"keywords": []}"#).unwrap();
        assert_eq!(v["keywords"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn extracts_fenced_json_block() {
        let text = "Here you go:\n```json\n{\"a\": 1}\n```\nThanks";
        let v = extract_json(text).unwrap();
        assert_eq!(v["a"], 1);
    }

    #[test]
    fn extracts_first_brace_substring_as_last_resort() {
        let text = "Sure, the result is {\"a\": 1} — let me know if you need more.";
        let v = extract_json(text).unwrap();
        assert_eq!(v["a"], 1);
    }

    #[test]
    fn gives_up_on_pure_prose() {
        assert!(extract_json("I cannot help with that.").is_none());
    }
}
