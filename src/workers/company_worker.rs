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

use crate::config::settings::Settings;
use crate::domain::models::company::{CompanyInput, CompanyResult, CompanyStatus};
use crate::domain::models::email::EmailSet;
use crate::domain::models::page::PageResult;
use crate::domain::models::resolved_domain::ResolvedDomain;
use crate::domain::services::crawl_planner::CrawlPlanner;
use crate::domain::services::domain_resolver::{DomainResolver, Resolution};
use crate::domain::services::email_extractor::HybridEmailExtractor;
use crate::engines::traits::{EngineError, FetchEngine, FetchRequest, FetchResponse};
use crate::infrastructure::stats::RunStats;
use anyhow::Result;
use scraper::{Html, Selector};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// 公司处理工作器
///
/// 一个工作器一次完整地处理一家公司：解析域名、规划爬取、
/// 顺序抓取各页面（同域抓取间随机限速）、提取合并邮箱并
/// 分类终态。页面级与公司级失败都在此边界内消化
pub struct CompanyWorker {
    settings: Arc<Settings>,
    resolver: Arc<DomainResolver>,
    planner: Arc<CrawlPlanner>,
    extractor: Arc<HybridEmailExtractor>,
    fetcher: Arc<dyn FetchEngine>,
    stats: Arc<RunStats>,
    worker_id: Uuid,
}

impl CompanyWorker {
    /// 创建新的公司处理工作器实例
    pub fn new(
        settings: Arc<Settings>,
        resolver: Arc<DomainResolver>,
        planner: Arc<CrawlPlanner>,
        extractor: Arc<HybridEmailExtractor>,
        fetcher: Arc<dyn FetchEngine>,
        stats: Arc<RunStats>,
    ) -> Self {
        Self {
            settings,
            resolver,
            planner,
            extractor,
            fetcher,
            stats,
            worker_id: Uuid::new_v4(),
        }
    }

    pub fn worker_id(&self) -> Uuid {
        self.worker_id
    }

    /// 处理一家公司
    ///
    /// 终态恰好赋值一次；任何意外失败都折算为
    /// `processing_error`，公司仍被计数，绝不丢弃
    #[instrument(skip(self, input), fields(company = %input.name, worker = %self.worker_id))]
    pub async fn process_company(&self, input: CompanyInput) -> CompanyResult {
        info!("Processing company");

        let resolved = match self.resolver.resolve(&input).await {
            Resolution::Resolved(resolved) => resolved,
            Resolution::SearchFailed => {
                let result = CompanyResult::unresolved(input, CompanyStatus::NoGoogle);
                self.stats.record_company(&result);
                return result;
            }
            Resolution::Unclear => {
                let result = CompanyResult::unresolved(input, CompanyStatus::DomainUnclear);
                self.stats.record_company(&result);
                return result;
            }
        };

        let result = match self.crawl_domain(&input, &resolved).await {
            Ok(result) => result,
            Err(e) => {
                error!("Unexpected error processing {}: {}", input.name, e);
                let mut result = CompanyResult::unresolved(input, CompanyStatus::ProcessingError);
                result.domain = Some(resolved.domain.clone());
                result
            }
        };

        self.stats.record_company(&result);
        result
    }

    /// 按计划抓取域名下的页面并提取邮箱
    async fn crawl_domain(
        &self,
        input: &CompanyInput,
        resolved: &ResolvedDomain,
    ) -> Result<CompanyResult> {
        let plan = self.planner.plan(&resolved.domain).await;
        let priority_band = self.settings.crawl.priority_path_parts.len() as i32;

        let mut pages: Vec<PageResult> = Vec::new();
        let mut emails = EmailSet::new();

        for (index, task) in plan.tasks.iter().enumerate() {
            if index > 0 {
                self.crawl_delay().await;
            }

            let Some(response) = self.fetch_page(&task.url).await else {
                // Failed pages are skipped and absent from results
                continue;
            };

            let on_priority_page = task.priority > 0 && task.priority <= priority_band;
            let candidates = self
                .extractor
                .extract(&response.content, &task.url, on_priority_page)
                .await;

            let mut page = build_page_result(&task.url, &response);
            page.discovered_emails = candidates.clone();
            if !candidates.is_empty() {
                debug!("Found {} emails on {}", candidates.len(), task.url);
            }
            emails.merge_all(candidates);
            pages.push(page);
        }

        let status = if emails.is_empty() {
            CompanyStatus::WithoutEmail
        } else {
            CompanyStatus::WithEmail
        };
        if status == CompanyStatus::WithEmail {
            info!("Found {} emails for {}", emails.len(), input.name);
        } else {
            info!("No emails found for {}", input.name);
        }

        Ok(CompanyResult {
            company: input.clone(),
            domain: Some(resolved.domain.clone()),
            status,
            page_count: pages.len(),
            used_sitemap: plan.used_sitemap,
            pages,
            emails,
        })
    }

    async fn fetch_page(&self, url: &str) -> Option<FetchResponse> {
        let mut request = FetchRequest::new(url);
        request.timeout = self.settings.request_timeout();
        request.max_redirects = self.settings.http.max_redirects;
        request.proxy = self.settings.http.proxy.clone();
        request.skip_tls_verification = self.settings.http.insecure_ssl;

        match self.fetcher.fetch(&request).await {
            Ok(response) => {
                self.stats.record_request(response.status_code);
                Some(response)
            }
            Err(EngineError::BadStatus(code)) => {
                self.stats.record_request(code);
                debug!("Skipping {} (status {})", url, code);
                None
            }
            Err(EngineError::InvalidUrl(url)) => {
                debug!("Skipping invalid URL: {}", url);
                None
            }
            Err(e) => {
                warn!("Fetch failed for {}: {}", url, e);
                self.stats.record_request_error();
                None
            }
        }
    }

    /// 同域连续抓取之间的随机礼貌延迟
    async fn crawl_delay(&self) {
        let min = self.settings.crawl.min_crawl_delay_secs;
        let max = self.settings.crawl.max_crawl_delay_secs;
        if max <= 0.0 {
            return;
        }
        let secs = if max > min {
            rand::random_range(min..max)
        } else {
            min
        };
        tokio::time::sleep(Duration::from_secs_f64(secs)).await;
    }
}

/// 从抓取响应构建页面结果（标题、meta与有界正文）
fn build_page_result(url: &str, response: &FetchResponse) -> PageResult {
    let mut page = PageResult::new(url, response.status_code);

    if response.is_html() {
        let document = Html::parse_document(&response.content);
        page.title = select_text(&document, "title");
        page.meta_description = select_meta(&document, "description");
        page.meta_keywords = select_meta(&document, "keywords");
        let text = document.root_element().text().collect::<Vec<_>>().join(" ");
        page.set_text(text);
    } else {
        page.set_text(response.content.clone());
    }

    page
}

fn select_text(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    let text: String = document.select(&selector).next()?.text().collect();
    let text = text.trim().to_string();
    (!text.is_empty()).then_some(text)
}

fn select_meta(document: &Html, name: &str) -> Option<String> {
    let selector = Selector::parse(&format!(r#"meta[name="{}"]"#, name)).ok()?;
    document
        .select(&selector)
        .next()?
        .value()
        .attr("content")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
