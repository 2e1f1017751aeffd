//! Schema validation and required-field filling

use jsonschema::error::ValidationErrorKind;
use jsonschema::Validator;
use serde_json::{json, Map, Value};

use stencil_domain::ExtractionError;

/// Compile a JSON schema into a reusable validator
///
/// Done once at strategy construction; an uncompilable schema is a
/// configuration error, not an extraction error.
pub fn compile_schema(schema: &Value) -> Result<Validator, ExtractionError> {
    Validator::new(schema).map_err(|e| ExtractionError::Config(format!("Invalid schema: {}", e)))
}

/// Parse an assistant answer into a JSON object
///
/// Markdown code fences are stripped first. A non-object answer fails
/// with the raw text attached.
pub fn parse_fields(content: &str) -> Result<Map<String, Value>, ExtractionError> {
    let cleaned = strip_code_fences(content);
    let value: Value =
        serde_json::from_str(&cleaned).map_err(|e| ExtractionError::ContentParsing {
            message: format!("Provider answer is not valid JSON: {}", e),
            raw: Some(content.to_string()),
        })?;

    match value {
        Value::Object(map) => Ok(map),
        other => Err(ExtractionError::ContentParsing {
            message: format!(
                "Provider answer is not a JSON object (got {})",
                json_type_name(&other)
            ),
            raw: Some(content.to_string()),
        }),
    }
}

/// Validate parsed fields and fill missing root-level required keys
///
/// Validation collects every violation. Missing *root-level* required
/// properties are fillable (LLM output is best-effort); any other
/// violation fails with all errors listed and the raw answer attached.
/// The fill is a post-validation step: filled values satisfy presence,
/// they are not run back through value constraints.
pub fn validate_and_fill(
    schema: &Value,
    validator: &Validator,
    fields: Map<String, Value>,
    raw: &str,
) -> Result<Map<String, Value>, ExtractionError> {
    let instance = Value::Object(fields);
    let mut missing_required = Vec::new();
    let mut fatal = Vec::new();

    for error in validator.iter_errors(&instance) {
        match root_missing_property(&error) {
            Some(property) => missing_required.push(property),
            None => fatal.push(format!("At path '{}': {}", error.instance_path, error)),
        }
    }

    if !fatal.is_empty() {
        return Err(ExtractionError::ContentParsing {
            message: format!("Schema validation failed: {}", fatal.join("; ")),
            raw: Some(raw.to_string()),
        });
    }

    let mut fields = match instance {
        Value::Object(map) => map,
        _ => unreachable!(),
    };
    for property in missing_required {
        let default = typed_default(property_schema(schema, &property));
        fields.insert(property, default);
    }
    Ok(fields)
}

/// A `required` violation on the root object, with the property name
fn root_missing_property(error: &jsonschema::ValidationError<'_>) -> Option<String> {
    if !error.instance_path.to_string().is_empty() {
        return None;
    }
    match &error.kind {
        ValidationErrorKind::Required { property } => {
            property.as_str().map(|name| name.to_string())
        }
        _ => None,
    }
}

/// Typed default for a property schema: the neutral value of the
/// declared type
///
/// string `""`, array `[]`, object `{}`, number `0.0`, integer `0`,
/// boolean `false`; anything else (or no declared type) is `null`. For
/// a union type list the first entry decides.
pub fn typed_default(property_schema: Option<&Value>) -> Value {
    let type_name = property_schema
        .and_then(|schema| schema.get("type"))
        .and_then(|declared| match declared {
            Value::String(name) => Some(name.as_str()),
            Value::Array(names) => names.first().and_then(Value::as_str),
            _ => None,
        });

    match type_name {
        Some("string") => Value::String(String::new()),
        Some("array") => Value::Array(Vec::new()),
        Some("object") => Value::Object(Map::new()),
        Some("number") => json!(0.0),
        Some("integer") => json!(0),
        Some("boolean") => Value::Bool(false),
        _ => Value::Null,
    }
}

fn property_schema<'a>(schema: &'a Value, property: &str) -> Option<&'a Value> {
    schema.get("properties").and_then(|p| p.get(property))
}

/// Strip a markdown code fence from an answer, if present
///
/// LLMs routinely wrap JSON in ```json blocks even when told not to.
pub fn strip_code_fences(response: &str) -> String {
    let trimmed = response.trim();
    if !trimmed.starts_with("```") {
        return trimmed.to_string();
    }

    let lines: Vec<&str> = trimmed.lines().collect();
    if lines.len() < 2 {
        return String::new();
    }

    // Drop the opening ```json line, and the closing fence when present
    let end = if lines[lines.len() - 1].trim_start().starts_with("```") {
        lines.len() - 1
    } else {
        lines.len()
    };
    lines[1..end].join("\n")
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
