//! Request-body templates and response-path extraction for generic backends.
//!
//! Templates are JSON text with `{{name}}` placeholders. A placeholder that
//! fills a whole string literal (`"{{prompt}}"`) is replaced together with its
//! quotes, so the value is always encoded correctly. A placeholder inside a
//! longer literal (`"Say: {{prompt}}"`) receives the escaped text. An unquoted
//! placeholder receives the bare JSON value.

use relay_core::{Error, GenerateRequest, Result};
use serde_json::{Map, Value};

/// Fields tried, in order, when no extraction path is configured.
const CONVENTIONAL_TEXT_FIELDS: [&str; 6] = ["text", "content", "output", "result", "response", "data"];
/// Fields tried, in order, for embeddings when no extraction path is configured.
const CONVENTIONAL_EMBEDDING_FIELDS: [&str; 2] = ["embeddings", "data"];

/// Values available to a request template.
#[derive(Debug, Clone, Copy)]
pub struct TemplateFields<'req> {
    /// Model identifier
    pub model: &'req str,
    /// Prompt text
    pub prompt: &'req str,
    /// System instruction
    pub system_prompt: Option<&'req str>,
    /// Sampling temperature
    pub temperature: Option<f64>,
    /// Maximum output tokens
    pub max_tokens: Option<u32>,
    /// Nucleus sampling threshold
    pub top_p: Option<f64>,
    /// Inputs of an embedding request
    pub texts: Option<&'req [String]>,
}

impl<'req> TemplateFields<'req> {
    /// Fields of a generate request for the given model.
    pub fn from_request(request: &'req GenerateRequest, model: &'req str) -> Self {
        Self {
            model,
            prompt: &request.prompt,
            system_prompt: request.system_prompt.as_deref(),
            temperature: request.params.temperature,
            max_tokens: request.params.max_tokens,
            top_p: request.params.top_p,
            texts: None,
        }
    }

    /// Fields of an embedding request.
    pub fn for_texts(model: &'req str, texts: &'req [String]) -> Self {
        Self {
            model,
            prompt: "",
            system_prompt: None,
            temperature: None,
            max_tokens: None,
            top_p: None,
            texts: Some(texts),
        }
    }

    /// Value of a placeholder. `None` for unknown names, `Value::Null` for absent fields.
    pub fn value(&self, name: &str) -> Option<Value> {
        let value = match name {
            "model" => Value::from(self.model),
            "prompt" => Value::from(self.prompt),
            "systemPrompt" => self.system_prompt.map_or(Value::Null, Value::from),
            "temperature" => self.temperature.map_or(Value::Null, Value::from),
            "maxTokens" => self.max_tokens.map_or(Value::Null, Value::from),
            "topP" => self.top_p.map_or(Value::Null, Value::from),
            "texts" => self.texts.map_or(Value::Null, |texts| {
                Value::Array(texts.iter().map(|text| Value::from(text.as_str())).collect())
            }),
            _ => return None,
        };
        Some(value)
    }
}

/// Renders `template`, substituting every known placeholder.
pub fn render_template(template: &str, fields: &TemplateFields<'_>) -> String {
    let bytes = template.as_bytes();
    let mut output = String::with_capacity(template.len());
    let mut copied = 0;
    let mut index = 0;
    let mut in_string = false;
    let mut escaped = false;
    let mut string_start = 0;

    while index < bytes.len() {
        let byte = bytes[index];

        if byte == b'{'
            && bytes.get(index + 1) == Some(&b'{')
            && let Some((name, end)) = placeholder_at(template, index)
            && let Some(value) = fields.value(name)
        {
            let whole_literal =
                in_string && string_start + 1 == index && bytes.get(end) == Some(&b'"');

            if whole_literal {
                output.push_str(&template[copied..string_start]);
                output.push_str(&quoted_literal(&value));
                in_string = false;
                index = end + 1;
            } else {
                output.push_str(&template[copied..index]);
                if in_string {
                    output.push_str(&inline_fragment(&value));
                } else {
                    output.push_str(&value.to_string());
                }
                index = end;
            }
            escaped = false;
            copied = index;
            continue;
        }

        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
        } else if byte == b'"' {
            in_string = true;
            string_start = index;
        }
        index += 1;
    }

    output.push_str(&template[copied..]);
    output
}

/// Parses `{{name}}` starting at `start`; returns the name and the index after `}}`.
fn placeholder_at(template: &str, start: usize) -> Option<(&str, usize)> {
    let rest = template.get(start + 2..)?;
    let close = rest.find("}}")?;
    let name = &rest[..close];
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|character| character.is_ascii_alphanumeric() || character == '_');
    valid.then_some((name, start + 2 + close + 2))
}

/// Replacement for a placeholder that fills an entire string literal.
fn quoted_literal(value: &Value) -> String {
    match value {
        Value::Number(number) => Value::from(number.to_string()).to_string(),
        Value::String(_) | Value::Null | Value::Bool(_) | Value::Array(_) | Value::Object(_) => {
            value.to_string()
        }
    }
}

/// Replacement for a placeholder embedded in a longer string literal.
fn inline_fragment(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => escape_json_text(text),
        Value::Number(_) | Value::Bool(_) | Value::Array(_) | Value::Object(_) => {
            escape_json_text(&value.to_string())
        }
    }
}

/// JSON string escaping without the surrounding quotes.
fn escape_json_text(text: &str) -> String {
    let encoded = Value::from(text).to_string();
    encoded
        .get(1..encoded.len().saturating_sub(1))
        .unwrap_or_default()
        .to_owned()
}

/// Payload sent when no template is configured.
pub fn default_payload(fields: &TemplateFields<'_>) -> Value {
    let mut payload = Map::new();
    payload.insert("model".to_owned(), Value::from(fields.model));
    if let Some(texts) = fields.texts {
        payload.insert(
            "texts".to_owned(),
            Value::Array(texts.iter().map(|text| Value::from(text.as_str())).collect()),
        );
    } else {
        payload.insert("prompt".to_owned(), Value::from(fields.prompt));
    }
    if let Some(system_prompt) = fields.system_prompt {
        payload.insert("systemPrompt".to_owned(), Value::from(system_prompt));
    }
    if let Some(temperature) = fields.temperature {
        payload.insert("temperature".to_owned(), Value::from(temperature));
    }
    if let Some(max_tokens) = fields.max_tokens {
        payload.insert("maxTokens".to_owned(), Value::from(max_tokens));
    }
    if let Some(top_p) = fields.top_p {
        payload.insert("topP".to_owned(), Value::from(top_p));
    }
    Value::Object(payload)
}

/// Builds the outbound JSON body from an optional template.
///
/// # Errors
/// Returns [`Error::Provider`] when the rendered template is not valid JSON.
pub fn build_payload(template: Option<&str>, fields: &TemplateFields<'_>) -> Result<Value> {
    let Some(template) = template else {
        return Ok(default_payload(fields));
    };
    let rendered = render_template(template, fields);
    serde_json::from_str(&rendered).map_err(|error| {
        Error::Provider(format!("Rendered request template is not valid JSON: {error}"))
    })
}

/// Walks `value` along `path` (`choices[0].message.content`).
///
/// Returns `None` on a missing key, a non-object where a key is expected, a
/// non-array where an index is expected, an out-of-range index or a malformed path.
pub fn extract_path<'value>(value: &'value Value, path: &str) -> Option<&'value Value> {
    let mut current = value;
    for part in path.split('.') {
        let (key, mut indices) = part.find('[').map_or((part, ""), |open| part.split_at(open));
        if key.is_empty() && indices.is_empty() {
            return None;
        }
        if !key.is_empty() {
            current = current.as_object()?.get(key)?;
        }
        while !indices.is_empty() {
            let rest = indices.strip_prefix('[')?;
            let close = rest.find(']')?;
            let position: usize = rest[..close].trim().parse().ok()?;
            current = current.as_array()?.get(position)?;
            indices = &rest[close + 1..];
        }
    }
    Some(current)
}

/// Extracts the generated text from a response payload.
///
/// # Errors
/// Returns [`Error::InvalidResponse`] when the path (or every conventional
/// field) does not resolve to a string.
pub fn extract_text(response: &Value, path: Option<&str>) -> Result<String> {
    if let Some(path) = path {
        return extract_path(response, path)
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| {
                Error::InvalidResponse(format!("No string value at response path '{path}'"))
            });
    }

    if let Some(text) = response.as_str() {
        return Ok(text.to_owned());
    }
    CONVENTIONAL_TEXT_FIELDS
        .iter()
        .find_map(|field| response.get(field).and_then(Value::as_str))
        .map(str::to_owned)
        .ok_or_else(|| {
            Error::InvalidResponse(format!(
                "Response has no string in any of the fields {}",
                CONVENTIONAL_TEXT_FIELDS.join(", ")
            ))
        })
}

/// Extracts embedding vectors from a response payload.
///
/// Accepts an array of numeric arrays or an array of objects carrying an
/// `embedding` array.
///
/// # Errors
/// Returns [`Error::InvalidResponse`] when no vectors are found.
pub fn extract_embeddings(response: &Value, path: Option<&str>) -> Result<Vec<Vec<f32>>> {
    let found = match path {
        Some(path) => extract_path(response, path),
        None => CONVENTIONAL_EMBEDDING_FIELDS
            .iter()
            .find_map(|field| response.get(field)),
    };
    let location = path.unwrap_or("embeddings");

    let rows = found.and_then(Value::as_array).ok_or_else(|| {
        Error::InvalidResponse(format!("No embedding array at response path '{location}'"))
    })?;

    rows.iter()
        .map(|row| {
            let vector = row.get("embedding").unwrap_or(row);
            vector
                .as_array()
                .and_then(|numbers| {
                    numbers
                        .iter()
                        .map(|number| number.as_f64().map(|float| float as f32))
                        .collect::<Option<Vec<_>>>()
                })
                .ok_or_else(|| {
                    Error::InvalidResponse(format!(
                        "Embedding at response path '{location}' is not a numeric array"
                    ))
                })
        })
        .collect()
}
