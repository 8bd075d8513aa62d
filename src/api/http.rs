// Copyright 2025 the Feature Studio Authors
// SPDX-License-Identifier: Apache-2.0

//! Blocking HTTP implementation of [`FunctionApi`].
//!
//! Every response is wrapped by the server: success bodies carry
//! `{"result": ...}`, validation failures (400/404) carry
//! `{"reason": ...}`. Mutating request bodies are wrapped as
//! `{"data": ...}`. Connection-level failures on reads mean the session
//! cookie expired, reported as [`ApiError::Unauthorized`].

use reqwest::blocking::{Client, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::{
    ApiError, FunctionApi, FunctionContent, FunctionOverview, Library, SaveFunction,
};
use crate::model::{FeatureType, FunctionId, ParamSig};

#[derive(serde::Deserialize)]
struct ResultEnvelope<T> {
    result: T,
}

#[derive(serde::Deserialize)]
struct ReasonEnvelope {
    reason: String,
}

#[derive(Serialize)]
struct DataEnvelope<'a, T: Serialize> {
    data: &'a T,
}

#[derive(serde::Deserialize)]
struct SavedFunction {
    func_id: FunctionId,
}

#[derive(serde::Deserialize)]
struct LibraryList {
    library_list: Vec<Library>,
}

/// Encode a signature for a query-string parameter.
fn encode_params(params: &ParamSig) -> String {
    // Infallible: ParamSig is a list of strings.
    serde_json::to_string(params).unwrap_or_default()
}

/// Blocking client against the configured server.
pub struct HttpApi {
    base: String,
    account: String,
    client: Client,
}

impl HttpApi {
    pub fn new(base: impl Into<String>, account: impl Into<String>) -> Self {
        Self {
            base: base.into().trim_end_matches('/').to_string(),
            account: account.into(),
            client: Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path.trim_start_matches('/'))
    }

    fn handle<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let status = response.status();
        if status.is_success() {
            let envelope: ResultEnvelope<T> = response
                .json()
                .map_err(|e| ApiError::Envelope(e.to_string()))?;
            return Ok(envelope.result);
        }
        match status.as_u16() {
            400 | 404 => {
                let envelope: ReasonEnvelope = response
                    .json()
                    .map_err(|e| ApiError::Envelope(e.to_string()))?;
                Err(ApiError::Rejected {
                    reason: envelope.reason,
                })
            }
            other => Err(ApiError::Server { status: other }),
        }
    }

    fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        tracing::debug!("GET {}", path);
        let response = self
            .client
            .get(self.url(path))
            .query(query)
            .send()
            .map_err(|e| {
                // A read that cannot even connect means the session is gone.
                if e.is_connect() {
                    ApiError::Unauthorized
                } else {
                    ApiError::Transport(e)
                }
            })?;
        Self::handle(response)
    }

    fn send<T: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: &impl Serialize,
    ) -> Result<T, ApiError> {
        tracing::debug!("{} {}", method, path);
        let response = self
            .client
            .request(method, self.url(path))
            .json(&DataEnvelope { data: body })
            .send()?;
        Self::handle(response)
    }
}

impl FunctionApi for HttpApi {
    fn function_content(&self, id: FunctionId) -> Result<FunctionContent, ApiError> {
        self.get(&format!("api/function/S/{id}"), &[])
    }

    fn library_function_content(
        &self,
        id: FunctionId,
        feature_type: FeatureType,
        params: &ParamSig,
    ) -> Result<FunctionContent, ApiError> {
        self.get(
            &format!("api/function/L/{id}"),
            &[
                ("dftype", feature_type.as_str().to_string()),
                ("dfparam", encode_params(params)),
            ],
        )
    }

    fn function_skeleton(
        &self,
        language: &str,
        platform: &str,
        feature_type: FeatureType,
        params: &ParamSig,
    ) -> Result<FunctionContent, ApiError> {
        self.get(
            &format!("api/function/new/{language}/{platform}"),
            &[
                ("language", language.to_string()),
                ("dftype", feature_type.as_str().to_string()),
                ("dfparam", encode_params(params)),
            ],
        )
    }

    fn save_function(
        &self,
        id: Option<FunctionId>,
        function: &SaveFunction,
    ) -> Result<FunctionId, ApiError> {
        let saved: SavedFunction = match id {
            // Update in place.
            Some(id) => self.send(
                reqwest::Method::POST,
                &format!("api/function/S/{id}"),
                function,
            )?,
            // Create.
            None => self.send(reqwest::Method::PUT, "api/function/new", function)?,
        };
        Ok(saved.func_id)
    }

    fn function_overview(&self, libraries: &[i64]) -> Result<FunctionOverview, ApiError> {
        let libs = libraries
            .iter()
            .map(i64::to_string)
            .collect::<Vec<_>>()
            .join(",");
        self.get("api/function", &[("libs", libs)])
    }

    fn library_catalog(&self, language: &str, platform: &str) -> Result<Vec<Library>, ApiError> {
        let listing: LibraryList = self.get(
            &format!("api/library/{language}/{platform}"),
            &[("username", self.account.clone())],
        )?;
        Ok(listing.library_list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joining_normalizes_slashes() {
        let api = HttpApi::new("https://studio.example/", "alice");
        assert_eq!(
            api.url("/api/function/S/3"),
            "https://studio.example/api/function/S/3"
        );
        assert_eq!(api.url("api/function"), "https://studio.example/api/function");
    }

    #[test]
    fn test_result_envelope_parsing() {
        let body = r#"{"result": {"code": "x", "var_setup": "", "readonly_line": [0]}}"#;
        let envelope: ResultEnvelope<FunctionContent> = serde_json::from_str(body).unwrap();
        assert_eq!(envelope.result.code, "x");
        assert_eq!(envelope.result.read_only_lines, vec![0]);
        assert_eq!(envelope.result.library_ref, None);
    }

    #[test]
    fn test_reason_envelope_parsing() {
        let body = r#"{"reason": "Function name already existed."}"#;
        let envelope: ReasonEnvelope = serde_json::from_str(body).unwrap();
        assert_eq!(envelope.reason, "Function name already existed.");
    }

    #[test]
    fn test_data_envelope_wraps_body() {
        let function = SaveFunction {
            name: "blink".to_string(),
            feature_type: FeatureType::Input,
            params: ParamSig::new(["int"]),
            code: "code".to_string(),
            var_setup: String::new(),
            read_only_lines: vec![0, 1],
            library_ref: None,
        };
        let value = serde_json::to_value(DataEnvelope { data: &function }).unwrap();
        assert_eq!(value["data"]["func_name"], "blink");
        assert_eq!(value["data"]["dftype"], "idf");
        assert_eq!(value["data"]["readonly_line"][1], 1);
    }

    #[test]
    fn test_encode_params() {
        assert_eq!(encode_params(&ParamSig::new(["int", "int"])), r#"["int","int"]"#);
    }
}
