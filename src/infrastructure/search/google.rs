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

use crate::domain::models::search_hit::SearchHit;
use crate::domain::search::engine::{SearchEngine, SearchError};
use crate::infrastructure::search::rate_gate::SearchRateGate;
use crate::utils::retry_policy::RetryPolicy;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_ENDPOINT: &str = "https://www.googleapis.com/customsearch/v1";

/// Custom Search JSON API响应
#[derive(Debug, Deserialize)]
struct CseResponse {
    #[serde(default)]
    items: Vec<CseItem>,
}

/// Custom Search结果条目
#[derive(Debug, Deserialize)]
struct CseItem {
    link: String,
    #[serde(default)]
    title: String,
    snippet: Option<String>,
}

/// Google搜索引擎实现
///
/// 基于Custom Search JSON API；所有调用经过全局速率闸门，
/// 瞬时失败按指数退避加抖动重试，重试耗尽后向调用方报告
pub struct GoogleSearchEngine {
    /// API密钥
    api_key: String,
    /// 搜索引擎ID
    cx: String,
    /// API端点
    endpoint: String,
    /// 全局速率闸门
    gate: Arc<SearchRateGate>,
    /// 重试策略
    retry_policy: RetryPolicy,
    /// HTTP客户端
    client: reqwest::Client,
}

impl GoogleSearchEngine {
    /// 创建新的Google搜索引擎实例
    ///
    /// # 参数
    ///
    /// * `api_key` - API密钥
    /// * `cx` - 搜索引擎ID
    /// * `gate` - 全局速率闸门
    /// * `max_retries` - 最大尝试次数
    pub fn new(
        api_key: impl Into<String>,
        cx: impl Into<String>,
        gate: Arc<SearchRateGate>,
        max_retries: u32,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            cx: cx.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            gate,
            retry_policy: RetryPolicy {
                max_retries,
                initial_backoff: Duration::from_secs(2),
                max_backoff: Duration::from_secs(120),
                ..Default::default()
            },
            client: reqwest::Client::new(),
        }
    }

    /// 覆盖API端点，用于测试
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    async fn request(&self, query: &str, limit: u32) -> Result<Vec<SearchHit>, SearchError> {
        let num = limit.to_string();
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.cx.as_str()),
                ("q", query),
                ("num", num.as_str()),
            ])
            .timeout(Duration::from_secs(15))
            .send()
            .await
            .map_err(|e| SearchError::NetworkError(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 429 || status.as_u16() == 403 {
            return Err(SearchError::RateLimitExceeded);
        }
        if status.is_server_error() {
            return Err(SearchError::NetworkError(format!(
                "Server error: {}",
                status
            )));
        }
        if !status.is_success() {
            return Err(SearchError::EngineError(format!(
                "Unexpected status: {}",
                status
            )));
        }

        let body: CseResponse = response
            .json()
            .await
            .map_err(|e| SearchError::EngineError(format!("Malformed response: {}", e)))?;

        Ok(body
            .items
            .into_iter()
            .map(|item| SearchHit {
                url: item.link,
                title: item.title,
                snippet: item.snippet,
            })
            .collect())
    }
}

#[async_trait]
impl SearchEngine for GoogleSearchEngine {
    /// 执行搜索
    ///
    /// 有界的尝试状态机：每次尝试先过速率闸门，
    /// 可重试错误按退避等待后继续，直到成功或尝试耗尽
    ///
    /// # 参数
    ///
    /// * `query` - 查询词
    /// * `limit` - 返回结果数量
    ///
    /// # 返回值
    ///
    /// * `Ok(Vec<SearchHit>)` - 按相关度排列的搜索结果
    /// * `Err(SearchError)` - 搜索失败
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<SearchHit>, SearchError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            self.gate.acquire().await;

            match self.request(query, limit).await {
                Ok(hits) => {
                    debug!("Google search for {:?} returned {} hits", query, hits.len());
                    return Ok(hits);
                }
                Err(e) if e.is_retryable() => {
                    if !self.retry_policy.should_retry(attempt) {
                        warn!(
                            "Google search for {:?} failed after {} attempts: {}",
                            query, attempt, e
                        );
                        return Err(SearchError::RetriesExhausted(attempt));
                    }
                    let backoff = self.retry_policy.calculate_backoff(attempt);
                    warn!(
                        "Google search attempt {}/{} failed ({}), backing off {:?}",
                        attempt, self.retry_policy.max_retries, e, backoff
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// 获取引擎名称
    fn name(&self) -> &'static str {
        "google"
    }
}
