//! services/api/src/adapters/joke_llm.rs
//!
//! This module contains the adapter for the joke-generating LLM.
//! It implements the `JokeGenerationService` port from the `core` crate, talking
//! to any OpenAI-compatible chat endpoint (Gemini's by default).

const SYSTEM_INSTRUCTION: &str = r#"You are a witty Australian English teacher and comedian.
Your goal is to help a non-native English learner understand Australian culture and language through humour.
Generate a short, clean, legal joke that uses Australian English.
The joke can be about daily life, office work, trades (tradies), nature, or social situations.

Requirements:
1. content: The setup of the joke.
2. punchline: The punchline.
3. whyItsFunny: Explain the humour, specifically pointing out puns, wordplay, or cultural context.
4. slang: Extract any Australian slang terms used and define them.
5. vocabulary: Extract any difficult English words (IELTS Band 7+) and define them.
6. category: A short tag for the topic (e.g., "Workplace", "Nature", "Pub Culture").

Output must be valid JSON."#;

const USER_PROMPT: &str = "Tell me a new Australian joke suitable for learning English.";

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs, ResponseFormat, ResponseFormatJsonSchema,
    },
    Client,
};
use async_trait::async_trait;
use aussie_joke_core::{
    domain::{Joke, SlangTerm, VocabularyWord},
    ports::{JokeGenerationService, PortError, PortResult},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `JokeGenerationService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiJokeAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiJokeAdapter {
    /// Creates a new `OpenAiJokeAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

//=========================================================================================
// Response Schema
//=========================================================================================

/// The JSON schema the model must answer with.
pub fn joke_response_schema() -> serde_json::Value {
    let pair = |key: &str| {
        json!({
            "type": "object",
            "properties": {
                key: { "type": "string" },
                "definition": { "type": "string" }
            },
            "required": [key, "definition"],
            "additionalProperties": false
        })
    };

    json!({
        "type": "object",
        "properties": {
            "content": { "type": "string" },
            "punchline": { "type": "string" },
            "whyItsFunny": { "type": "string" },
            "containsWordplay": { "type": "boolean" },
            "containsSlang": { "type": "boolean" },
            "slang": { "type": "array", "items": pair("term") },
            "vocabulary": { "type": "array", "items": pair("word") },
            "category": { "type": "string" }
        },
        "required": [
            "content", "punchline", "whyItsFunny", "containsWordplay",
            "containsSlang", "slang", "vocabulary", "category"
        ],
        "additionalProperties": false
    })
}

#[derive(Deserialize)]
struct SlangPayload {
    term: String,
    definition: String,
}

#[derive(Deserialize)]
struct VocabularyPayload {
    word: String,
    definition: String,
}

/// The model's reply. Every field is required.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JokePayload {
    content: String,
    punchline: String,
    why_its_funny: String,
    contains_wordplay: bool,
    contains_slang: bool,
    slang: Vec<SlangPayload>,
    vocabulary: Vec<VocabularyPayload>,
    category: String,
}

/// Parses the model's reply into a `Joke` with a fresh id and the current time.
///
/// Fails with `PortError::Generation` on an empty reply or one that does not
/// match the response schema.
pub fn parse_joke_payload(text: &str) -> PortResult<Joke> {
    let text = text.trim();
    if text.is_empty() {
        return Err(PortError::Generation(
            "Joke LLM returned an empty response.".to_string(),
        ));
    }

    let payload: JokePayload = serde_json::from_str(text).map_err(|e| {
        PortError::Generation(format!("Joke LLM response did not match the schema: {}", e))
    })?;

    Ok(Joke {
        id: Uuid::new_v4().to_string(),
        content: payload.content,
        punchline: payload.punchline,
        why_its_funny: payload.why_its_funny,
        contains_wordplay: payload.contains_wordplay,
        contains_slang: payload.contains_slang,
        slang: payload
            .slang
            .into_iter()
            .map(|s| SlangTerm {
                term: s.term,
                definition: s.definition,
            })
            .collect(),
        vocabulary: payload
            .vocabulary
            .into_iter()
            .map(|v| VocabularyWord {
                word: v.word,
                definition: v.definition,
            })
            .collect(),
        category: payload.category,
        created_at: Utc::now(),
    })
}

//=========================================================================================
// `JokeGenerationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl JokeGenerationService for OpenAiJokeAdapter {
    /// Sends one structured-output request. Failures are not retried.
    async fn generate_joke(&self) -> PortResult<Joke> {
        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(SYSTEM_INSTRUCTION)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(USER_PROMPT)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .n(1)
            .response_format(ResponseFormat::JsonSchema {
                json_schema: ResponseFormatJsonSchema {
                    description: Some("An annotated Australian English joke.".to_string()),
                    name: "australian_joke".to_string(),
                    schema: Some(joke_response_schema()),
                    strict: Some(true),
                },
            })
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        // Call the API and manually map the error if it occurs, which respects the orphan rule.
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| {
                error!("Joke LLM request failed: {}", e);
                PortError::Generation(e.to_string())
            })?;

        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                PortError::Generation("Joke LLM returned no text content.".to_string())
            })?;
        debug!("Joke LLM replied with {} bytes", text.len());

        parse_joke_payload(&text)
    }
}
