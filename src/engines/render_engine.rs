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

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// 渲染错误类型
#[derive(Error, Debug)]
pub enum RenderError {
    /// 渲染请求失败
    #[error("Render request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    /// 渲染服务返回非成功状态
    #[error("Render service returned status {0}")]
    BadStatus(u16),
    /// 渲染服务未配置
    #[error("Render service not configured")]
    NotConfigured,
}

/// 渲染回退服务特质
///
/// 仅在静态提取一无所获时使用，以延迟换取召回
#[async_trait]
pub trait RenderService: Send + Sync {
    /// 渲染页面并返回HTML
    async fn render(&self, url: &str) -> Result<String, RenderError>;
}

/// 基于外部HTTP渲染服务的实现
///
/// 服务端完成浏览器渲染，本进程只消费返回的HTML
pub struct HttpRenderService {
    /// 渲染服务端点
    endpoint: String,
    /// 渲染请求超时
    timeout: Duration,
}

impl HttpRenderService {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout,
        }
    }
}

#[async_trait]
impl RenderService for HttpRenderService {
    /// 渲染页面
    ///
    /// # 参数
    ///
    /// * `url` - 待渲染的页面地址
    ///
    /// # 返回值
    ///
    /// * `Ok(String)` - 渲染后的HTML
    /// * `Err(RenderError)` - 渲染失败
    async fn render(&self, url: &str) -> Result<String, RenderError> {
        let render_url = format!(
            "{}?url={}",
            self.endpoint.trim_end_matches('/'),
            urlencoding::encode(url)
        );
        debug!("Rendering {} via {}", url, self.endpoint);

        let client = reqwest::Client::builder().timeout(self.timeout).build()?;
        let response = client.get(&render_url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RenderError::BadStatus(status.as_u16()));
        }

        Ok(response.text().await?)
    }
}
