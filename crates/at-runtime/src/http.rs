//! Templated HTTP handler shared by the `Request` action and the
//! `RequestStr` condition (spec.md §4.2.1). Two replacement passes: constant
//! replacers (`<env:NAME>`) resolved once at construction, per-call
//! replacers (`<change:attr>`) resolved at each invocation against a
//! [`ChangeTarget`].

use at_schema::ChangeTarget;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{RuntimeError, RuntimeReason, RuntimeResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

fn replace_env_tokens(value: &Value) -> Value {
    match value {
        Value::String(s) => {
            if let Some(name) = s.strip_prefix("<env:").and_then(|rest| rest.strip_suffix('>')) {
                Value::String(std::env::var(name).unwrap_or_default())
            } else {
                value.clone()
            }
        }
        Value::Object(map) => {
            Value::Object(map.iter().map(|(k, v)| (k.clone(), replace_env_tokens(v))).collect())
        }
        Value::Array(items) => Value::Array(items.iter().map(replace_env_tokens).collect()),
        other => other.clone(),
    }
}

/// Resolves `<change:attr>` against the subset of `ChangeTarget` accessors
/// that render naturally as strings (spec.md §4.2.1: `str(getattr(change,
/// attr))`).
fn change_attr(change: &dyn ChangeTarget, attr: &str) -> Option<String> {
    Some(match attr {
        "schema_name" => change.schema_name().to_string(),
        "state" => format!("{:?}", change.state()),
        "review_state" => format!("{:?}", change.review_state()),
        "test_state" => format!("{:?}", change.test_state()),
        "created_at" => change.created_at().to_string(),
        "updated_at" => change.updated_at().to_string(),
        "labels" => change.labels().join(","),
        "reviewers" => change.reviewers().join(","),
        "team_reviewers" => change.team_reviewers().join(","),
        _ => return None,
    })
}

fn replace_change_tokens(value: &Value, change: &dyn ChangeTarget) -> Value {
    match value {
        Value::String(s) => {
            if let Some(attr) = s.strip_prefix("<change:").and_then(|rest| rest.strip_suffix('>')) {
                Value::String(change_attr(change, attr).unwrap_or_default())
            } else {
                value.clone()
            }
        }
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), replace_change_tokens(v, change)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(|v| replace_change_tokens(v, change)).collect()),
        other => other.clone(),
    }
}

/// A parameterized HTTP request, constant-replaced once at construction and
/// change-replaced once per invocation (spec.md §4.2.1, "Caching": "The HTTP
/// handler caches header/param/data after constant-replacement").
#[derive(Clone, Debug)]
pub struct TemplatedHttp {
    url: String,
    method: HttpMethod,
    headers: Value,
    params: Value,
    data: Value,
}

impl TemplatedHttp {
    pub fn new(url: impl Into<String>, method: HttpMethod, headers: Value, params: Value, data: Value) -> Self {
        Self {
            url: url.into(),
            method,
            headers: replace_env_tokens(&headers),
            params: replace_env_tokens(&params),
            data: replace_env_tokens(&data),
        }
    }

    /// Issues the request with per-call `<change:attr>` substitution applied
    /// to the already constant-replaced headers/params/data, returning the
    /// response body as text.
    pub fn invoke(&self, change: &dyn ChangeTarget) -> RuntimeResult<String> {
        let headers = replace_change_tokens(&self.headers, change);
        let params = replace_change_tokens(&self.params, change);
        let data = replace_change_tokens(&self.data, change);

        let client = reqwest::blocking::Client::new();
        let mut builder = client.request(
            reqwest::Method::from_bytes(self.method.as_str().as_bytes())
                .expect("HttpMethod values are valid HTTP methods"),
            &self.url,
        );
        if let Value::Object(headers) = &headers {
            for (name, value) in headers {
                if let Some(value) = value.as_str() {
                    builder = builder.header(name, value);
                }
            }
        }
        if let Value::Object(params) = &params {
            let pairs: Vec<(String, String)> = params
                .iter()
                .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                .collect();
            builder = builder.query(&pairs);
        }
        if !data.is_null() {
            builder = builder.json(&data);
        }

        let response = builder
            .send()
            .map_err(|e| RuntimeError::from(RuntimeReason::component(e.into())))?;
        response
            .text()
            .map_err(|e| RuntimeError::from(RuntimeReason::component(e.into())))
    }

    /// `RequestStr`'s `response_field = "a//b//c"` descent: JSON-decode the
    /// response and walk the `//`-delimited path, or return the raw text
    /// when no `response_field` is given.
    pub fn invoke_str(&self, change: &dyn ChangeTarget, response_field: Option<&str>) -> RuntimeResult<String> {
        let body = self.invoke(change)?;
        let Some(path) = response_field else {
            return Ok(body);
        };
        let decoded: Value = serde_json::from_str(&body)
            .map_err(|e| RuntimeError::from(RuntimeReason::Component(format!("response not JSON: {e}"))))?;
        let mut cursor = &decoded;
        for segment in path.split("//") {
            cursor = cursor.get(segment).ok_or_else(|| {
                RuntimeError::from(RuntimeReason::Component(format!(
                    "response field '{segment}' missing from path '{path}'"
                )))
            })?;
        }
        Ok(match cursor {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use at_core::{Batch, Bundle, ChangeState, ReviewState, TestState};
    use serde_json::json;

    struct StubChange;

    impl ChangeTarget for StubChange {
        fn schema_name(&self) -> &str {
            "my-schema"
        }
        fn state(&self) -> ChangeState {
            ChangeState::Open
        }
        fn review_state(&self) -> ReviewState {
            ReviewState::Approved
        }
        fn test_state(&self) -> TestState {
            TestState::Success
        }
        fn labels(&self) -> &[String] {
            &[]
        }
        fn reviewers(&self) -> &[String] {
            &[]
        }
        fn team_reviewers(&self) -> &[String] {
            &[]
        }
        fn created_at(&self) -> i64 {
            0
        }
        fn updated_at(&self) -> i64 {
            0
        }
        fn batch(&self) -> anyhow::Result<Batch> {
            anyhow::bail!("unused")
        }
        fn schema_bundle(&self) -> anyhow::Result<Bundle> {
            anyhow::bail!("unused")
        }
        fn abandon(&self) -> anyhow::Result<bool> {
            Ok(true)
        }
        fn merge(&self) -> anyhow::Result<bool> {
            Ok(true)
        }
        fn add_labels(&self, _labels: &[String]) -> anyhow::Result<bool> {
            Ok(true)
        }
        fn remove_label(&self, _label: &str) -> anyhow::Result<bool> {
            Ok(true)
        }
        fn add_reviewers(&self, _r: &[String], _t: &[String]) -> anyhow::Result<bool> {
            Ok(true)
        }
        fn comment(&self, _body: &str) -> anyhow::Result<bool> {
            Ok(true)
        }
    }

    #[test]
    fn env_tokens_are_resolved_at_construction() {
        std::env::set_var("AT_HTTP_TEST_TOKEN", "secret-value");
        let http = TemplatedHttp::new(
            "http://example.invalid",
            HttpMethod::Get,
            json!({ "Authorization": "<env:AT_HTTP_TEST_TOKEN>" }),
            json!({}),
            Value::Null,
        );
        assert_eq!(http.headers["Authorization"], "secret-value");
        std::env::remove_var("AT_HTTP_TEST_TOKEN");
    }

    #[test]
    fn change_tokens_recurse_into_nested_objects() {
        let http = TemplatedHttp::new(
            "http://example.invalid",
            HttpMethod::Post,
            json!({}),
            json!({}),
            json!({ "nested": { "schema": "<change:schema_name>" } }),
        );
        let change = StubChange;
        let data = replace_change_tokens(&http.data, &change);
        assert_eq!(data["nested"]["schema"], "my-schema");
    }

    #[test]
    fn response_field_descends_double_slash_path() {
        let decoded: Value = serde_json::from_str(r#"{"a":{"b":{"c":"found"}}}"#).unwrap();
        let mut cursor = &decoded;
        for segment in "a//b//c".split("//") {
            cursor = cursor.get(segment).unwrap();
        }
        assert_eq!(cursor.as_str(), Some("found"));
    }
}
