//! Provider dispatch table
//!
//! One table maps each provider to its endpoint, auth scheme, and wire
//! format; the body builders and response parsers live next to it. Call
//! sites never branch on provider names.

use serde_json::{json, Value};

use stencil_domain::{ExtractionError, Provider, TokenUsage};

use crate::{ChatRequest, ChatResponse, ChatRole};

/// `max_tokens` sent to the Anthropic messages API when the caller does
/// not supply one (the API requires the field)
pub const DEFAULT_ANTHROPIC_MAX_TOKENS: u64 = 4096;

/// How a request body and response envelope are shaped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFormat {
    /// OpenAI-style `/chat/completions`
    OpenAiChat,
    /// Anthropic-style `/messages`
    AnthropicMessages,
}

/// How credentials are attached to a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    /// `Authorization: Bearer <token>`
    Bearer,
    /// `x-api-key: <token>` plus the Anthropic version header
    XApiKey,
    /// No auth header (local endpoints)
    None,
}

/// Dispatch entry for one provider
#[derive(Debug, Clone, Copy)]
pub struct Dispatch {
    /// Wire format of the request body and response envelope
    pub wire: WireFormat,

    /// Credential placement
    pub auth: AuthScheme,

    /// Base URL used when the configuration has none
    pub default_base_url: &'static str,

    /// Path appended to the base URL
    pub endpoint_path: &'static str,
}

/// Look up the dispatch entry for a provider
pub fn dispatch_for(provider: Provider) -> Dispatch {
    match provider {
        Provider::OpenAi => Dispatch {
            wire: WireFormat::OpenAiChat,
            auth: AuthScheme::Bearer,
            default_base_url: "https://api.openai.com/v1",
            endpoint_path: "/chat/completions",
        },
        Provider::Anthropic => Dispatch {
            wire: WireFormat::AnthropicMessages,
            auth: AuthScheme::XApiKey,
            default_base_url: "https://api.anthropic.com/v1",
            endpoint_path: "/messages",
        },
        Provider::OpenRouter => Dispatch {
            wire: WireFormat::OpenAiChat,
            auth: AuthScheme::Bearer,
            default_base_url: "https://openrouter.ai/api/v1",
            endpoint_path: "/chat/completions",
        },
        Provider::Google => Dispatch {
            wire: WireFormat::OpenAiChat,
            auth: AuthScheme::Bearer,
            default_base_url: "https://generativelanguage.googleapis.com/v1beta/openai",
            endpoint_path: "/chat/completions",
        },
        Provider::Mistral => Dispatch {
            wire: WireFormat::OpenAiChat,
            auth: AuthScheme::Bearer,
            default_base_url: "https://api.mistral.ai/v1",
            endpoint_path: "/chat/completions",
        },
        Provider::Ollama => Dispatch {
            wire: WireFormat::OpenAiChat,
            auth: AuthScheme::None,
            default_base_url: "http://localhost:11434/v1",
            endpoint_path: "/chat/completions",
        },
        // base_url is mandatory for custom endpoints; validated at
        // transport construction
        Provider::Custom => Dispatch {
            wire: WireFormat::OpenAiChat,
            auth: AuthScheme::Bearer,
            default_base_url: "",
            endpoint_path: "/chat/completions",
        },
    }
}

/// Build the JSON body for a request in the given wire format
///
/// Extra parameters are merged in last and never overwrite the core
/// keys the builder already set.
pub fn build_body(wire: WireFormat, request: &ChatRequest) -> Value {
    match wire {
        WireFormat::OpenAiChat => build_openai_body(request),
        WireFormat::AnthropicMessages => build_anthropic_body(request),
    }
}

fn build_openai_body(request: &ChatRequest) -> Value {
    let mut body = json!({
        "model": request.model,
        "messages": request.messages,
    });

    if request.response_schema.is_some() {
        body["response_format"] = json!({"type": "json_object"});
    }

    if let Some(obj) = body.as_object_mut() {
        for (key, value) in &request.extra {
            if !obj.contains_key(key) {
                obj.insert(key.clone(), value.clone());
            }
        }
    }
    body
}

fn build_anthropic_body(request: &ChatRequest) -> Value {
    // The messages API takes the system instruction as a top-level
    // parameter, not as a message
    let system = request
        .messages
        .iter()
        .filter(|m| m.role == ChatRole::System)
        .map(|m| m.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    let messages: Vec<_> = request
        .messages
        .iter()
        .filter(|m| m.role != ChatRole::System)
        .collect();

    let max_tokens = request
        .extra
        .get("max_tokens")
        .and_then(Value::as_u64)
        .unwrap_or(DEFAULT_ANTHROPIC_MAX_TOKENS);

    let mut body = json!({
        "model": request.model,
        "max_tokens": max_tokens,
        "messages": messages,
    });

    if !system.is_empty() {
        body["system"] = json!(system);
    }

    if let Some(obj) = body.as_object_mut() {
        for (key, value) in &request.extra {
            if !obj.contains_key(key) {
                obj.insert(key.clone(), value.clone());
            }
        }
    }
    body
}

/// Parse a success envelope into a `ChatResponse`
pub fn parse_response(wire: WireFormat, body: &Value) -> Result<ChatResponse, ExtractionError> {
    match wire {
        WireFormat::OpenAiChat => parse_openai_response(body),
        WireFormat::AnthropicMessages => parse_anthropic_response(body),
    }
}

fn parse_openai_response(body: &Value) -> Result<ChatResponse, ExtractionError> {
    let content = body["choices"]
        .get(0)
        .and_then(|choice| choice["message"]["content"].as_str())
        .ok_or_else(|| ExtractionError::ContentParsing {
            message: "No message content in provider response".to_string(),
            raw: Some(body.to_string()),
        })?;

    let usage = body["usage"].as_object().map(|u| TokenUsage {
        prompt_tokens: u.get("prompt_tokens").and_then(Value::as_u64).unwrap_or(0),
        completion_tokens: u
            .get("completion_tokens")
            .and_then(Value::as_u64)
            .unwrap_or(0),
        total_tokens: u.get("total_tokens").and_then(Value::as_u64).unwrap_or(0),
    });

    Ok(ChatResponse {
        content: content.to_string(),
        model: body["model"].as_str().map(String::from),
        usage,
    })
}

fn parse_anthropic_response(body: &Value) -> Result<ChatResponse, ExtractionError> {
    let content = body["content"]
        .get(0)
        .and_then(|block| block["text"].as_str())
        .ok_or_else(|| ExtractionError::ContentParsing {
            message: "No text content in provider response".to_string(),
            raw: Some(body.to_string()),
        })?;

    let usage = body["usage"].as_object().map(|u| {
        let prompt_tokens = u.get("input_tokens").and_then(Value::as_u64).unwrap_or(0);
        let completion_tokens = u.get("output_tokens").and_then(Value::as_u64).unwrap_or(0);
        TokenUsage {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    });

    Ok(ChatResponse {
        content: content.to_string(),
        model: body["model"].as_str().map(String::from),
        usage,
    })
}

/// Pull the provider's error message out of a non-2xx body
///
/// Both wire formats use an `{"error": {"message": ...}}` shape; when
/// the body is not that shape the raw text is returned unchanged.
pub fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(String::from))
        .unwrap_or_else(|| body.to_string())
}
