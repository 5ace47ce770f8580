use serde_json::{Map, Value};

use crate::core::errors::ApiError;

pub fn validate_config(config: &Value) -> Result<(), ApiError> {
    let root = config
        .as_object()
        .ok_or_else(|| config_type_error("root", "object"))?;

    if let Some(llm) = optional_section(root, "llm")? {
        required_if_present_string(llm, "llm.base_url", "base_url")?;
        required_if_present_string(llm, "llm.chat_model", "chat_model")?;
        required_if_present_string(llm, "llm.keyword_model", "keyword_model")?;
        required_if_present_string(llm, "llm.embedding_model", "embedding_model")?;
        optional_string(llm, "llm.api_key", "api_key")?;
        f64_in_range(llm, "llm.temperature", "temperature", 0.0, 2.0)?;
        u64_in_range(llm, "llm.request_timeout_secs", "request_timeout_secs", 1, 3_600)?;
    }

    if let Some(search) = optional_section(root, "search")? {
        u64_in_range(search, "search.top_k", "top_k", 1, 200)?;
        u64_in_range(search, "search.context_documents", "context_documents", 1, 200)?;
        u64_in_range(
            search,
            "search.summary_preview_chars",
            "summary_preview_chars",
            1,
            10_000,
        )?;
        u64_in_range(search, "search.lookup_timeout_ms", "lookup_timeout_ms", 1, 600_000)?;
        u64_in_range(search, "search.history_limit", "history_limit", 1, 1_000)?;
    }

    if let Some(ingest) = optional_section(root, "ingest")? {
        u64_in_range(ingest, "ingest.chunk_size", "chunk_size", 1, 100_000)?;
        u64_in_range(ingest, "ingest.chunk_overlap", "chunk_overlap", 0, 100_000)?;
        u64_in_range(ingest, "ingest.max_summary_chars", "max_summary_chars", 4, 100_000)?;
        u64_in_range(ingest, "ingest.max_input_chars", "max_input_chars", 1, 10_000_000)?;
        u64_in_range(ingest, "ingest.max_source_chunks", "max_source_chunks", 1, 1_000)?;

        let size = ingest.get("chunk_size").and_then(Value::as_u64);
        let overlap = ingest.get("chunk_overlap").and_then(Value::as_u64);
        if let (Some(size), Some(overlap)) = (size, overlap) {
            if overlap >= size {
                return Err(ApiError::BadRequest(
                    "Invalid config at 'ingest.chunk_overlap': must be smaller than chunk_size"
                        .to_string(),
                ));
            }
        }
    }

    if let Some(server) = optional_section(root, "server")? {
        optional_string(server, "server.host", "host")?;
        u64_in_range(server, "server.port", "port", 0, 65_535)?;
        string_array(server, "server.cors_allowed_origins", "cors_allowed_origins")?;
    }

    Ok(())
}

fn optional_section<'a>(
    root: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>, ApiError> {
    match root.get(key) {
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(config_type_error(key, "object")),
        None => Ok(None),
    }
}

fn u64_in_range(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: u64,
    max: u64,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_u64() else {
        return Err(config_type_error(path, "integer"));
    };
    if number < min || number > max {
        return Err(out_of_range(path, min, max));
    }
    Ok(())
}

fn f64_in_range(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: f64,
    max: f64,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_f64() else {
        return Err(config_type_error(path, "number"));
    };
    if !(min..=max).contains(&number) {
        return Err(out_of_range(path, min, max));
    }
    Ok(())
}

fn required_if_present_string(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(text) = value.as_str() else {
        return Err(config_type_error(path, "string"));
    };
    if text.trim().is_empty() {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': value cannot be empty",
            path
        )));
    }
    Ok(())
}

fn optional_string(section: &Map<String, Value>, path: &str, key: &str) -> Result<(), ApiError> {
    match section.get(key) {
        None | Some(Value::Null) | Some(Value::String(_)) => Ok(()),
        Some(_) => Err(config_type_error(path, "string")),
    }
}

fn string_array(section: &Map<String, Value>, path: &str, key: &str) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(items) = value.as_array() else {
        return Err(config_type_error(path, "array of strings"));
    };
    for (index, item) in items.iter().enumerate() {
        if item.as_str().map(|s| s.trim().is_empty()).unwrap_or(true) {
            return Err(config_type_error(
                &format!("{}[{}]", path, index),
                "non-empty string",
            ));
        }
    }
    Ok(())
}

fn out_of_range<T: std::fmt::Display>(path: &str, min: T, max: T) -> ApiError {
    ApiError::BadRequest(format!(
        "Invalid config at '{}': must be between {} and {}",
        path, min, max
    ))
}

fn config_type_error(path: &str, expected: &str) -> ApiError {
    ApiError::BadRequest(format!(
        "Invalid config at '{}': expected {}",
        path, expected
    ))
}
