// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::engines::traits::{EngineError, FetchEngine, FetchRequest, FetchResponse};
use crate::utils::url_utils;
use async_trait::async_trait;
use rand::seq::IndexedRandom;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::redirect::Policy;
use std::time::Instant;

/// 静态抓取引擎
///
/// 基于reqwest实现的HTTP抓取引擎，每次请求轮换User-Agent
pub struct ReqwestEngine {
    /// 轮换使用的User-Agent列表
    user_agents: Vec<String>,
    /// URL最大长度
    max_url_length: usize,
}

impl ReqwestEngine {
    pub fn new(user_agents: Vec<String>, max_url_length: usize) -> Self {
        Self {
            user_agents,
            max_url_length,
        }
    }

    fn pick_user_agent(&self) -> &str {
        self.user_agents
            .choose(&mut rand::rng())
            .map(|s| s.as_str())
            .unwrap_or("Mozilla/5.0 (compatible; prospectrs/0.1)")
    }
}

#[async_trait]
impl FetchEngine for ReqwestEngine {
    /// 执行HTTP抓取
    ///
    /// # 参数
    ///
    /// * `request` - 抓取请求
    ///
    /// # 返回值
    ///
    /// * `Ok(FetchResponse)` - 抓取响应
    /// * `Err(EngineError)` - 抓取过程中出现的错误
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, EngineError> {
        if !url_utils::validate_url(&request.url, self.max_url_length) {
            return Err(EngineError::InvalidUrl(request.url.clone()));
        }

        // Build headers
        let mut headers = HeaderMap::new();
        for (k, v) in &request.headers {
            if let (Ok(k), Ok(v)) = (
                HeaderName::from_bytes(k.as_bytes()),
                HeaderValue::from_str(v),
            ) {
                headers.insert(k, v);
            }
        }

        // Each request gets a fresh client for cookie isolation
        let mut builder = reqwest::Client::builder()
            .user_agent(self.pick_user_agent())
            .timeout(request.timeout)
            .redirect(Policy::limited(request.max_redirects.max(1)))
            .cookie_store(true);

        // Handle proxy
        if let Some(proxy_url) = &request.proxy {
            let proxy = reqwest::Proxy::all(proxy_url)
                .map_err(|e| EngineError::Other(format!("Invalid proxy: {}", e)))?;
            builder = builder.proxy(proxy);
        }

        // Handle TLS verification
        if request.skip_tls_verification {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder.build()?;

        let start = Instant::now();
        let response = client.get(&request.url).headers(headers).send().await?;

        let status_code = response.status().as_u16();
        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("text/html")
            .to_string();

        // Ensure content_type is not empty
        let content_type = if content_type.trim().is_empty() {
            "text/html".to_string()
        } else {
            content_type
        };

        let mut response_headers = std::collections::HashMap::new();
        for (k, v) in response.headers() {
            if let Ok(v_str) = v.to_str() {
                response_headers.insert(k.as_str().to_string(), v_str.to_string());
            }
        }

        if !(200..300).contains(&status_code) {
            return Err(EngineError::BadStatus(status_code));
        }

        let content = response.text().await?;

        Ok(FetchResponse {
            status_code,
            content,
            content_type,
            headers: response_headers,
            final_url,
            response_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// 获取引擎名称
    fn name(&self) -> &'static str {
        "reqwest"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn engine() -> ReqwestEngine {
        ReqwestEngine::new(vec!["test-agent/1.0".to_string()], 2000)
    }

    #[tokio::test]
    async fn test_fetch_returns_body_and_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/contact"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<html>info@acme.example</html>")
                    .insert_header("content-type", "text/html; charset=utf-8"),
            )
            .mount(&server)
            .await;

        let request = FetchRequest::new(format!("{}/contact", server.uri()));
        let response = engine().fetch(&request).await.unwrap();

        assert_eq!(response.status_code, 200);
        assert!(response.is_html());
        assert!(response.content.contains("info@acme.example"));
    }

    #[tokio::test]
    async fn test_fetch_maps_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let request = FetchRequest::new(format!("{}/missing", server.uri()));
        let err = engine().fetch(&request).await.unwrap_err();
        assert!(matches!(err, EngineError::BadStatus(404)));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_fetch_rejects_invalid_url() {
        let request = FetchRequest::new("javascript:alert(1)");
        let err = engine().fetch(&request).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn test_fetch_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let mut request = FetchRequest::new(format!("{}/slow", server.uri()));
        request.timeout = Duration::from_millis(200);
        let err = engine().fetch(&request).await.unwrap_err();
        assert!(err.is_retryable());
    }
}
