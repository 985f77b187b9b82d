// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::Settings;
use crate::domain::models::crawl_task::{CrawlTask, TaskOrigin};
use crate::engines::traits::{EngineError, FetchEngine, FetchRequest, FetchResponse};
use crate::infrastructure::stats::RunStats;
use crate::utils::{sitemap, url_utils};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 单个站点地图索引允许下钻的嵌套地图数量
const MAX_NESTED_SITEMAPS: usize = 4;

/// 爬取计划
#[derive(Debug, Default)]
pub struct CrawlPlan {
    /// 按优先级升序排列的任务
    pub tasks: Vec<CrawlTask>,
    /// 是否来自站点地图
    pub used_sitemap: bool,
}

impl CrawlPlan {
    /// 空计划（黑名单域名）
    pub fn empty() -> Self {
        Self::default()
    }
}

/// 计算URL的抓取优先级
///
/// 命中第i个优先路径关键词得`1 + i`；未命中落入更低的
/// 优先级带，带内按路径深度排列。数值越小越先抓取。
/// 纯函数，相同输入产生相同排序
pub fn priority_for(url: &str, parts: &[String]) -> i32 {
    let lower = url.to_lowercase();
    for (i, part) in parts.iter().enumerate() {
        if lower.contains(part.as_str()) {
            return 1 + i as i32;
        }
    }
    1 + parts.len() as i32 + url_utils::path_depth(url) as i32
}

/// 无站点地图时的启发式候选：每个优先关键词一个路径猜测
pub fn fallback_frontier(domain: &str, parts: &[String]) -> Vec<String> {
    parts
        .iter()
        .map(|part| format!("https://{}/{}", domain, part))
        .collect()
}

fn same_site(url: &str, naked_domain: &str) -> bool {
    let host = url_utils::normalise_domain(url);
    host == naked_domain || host.ends_with(&format!(".{}", naked_domain))
}

/// 爬取规划服务
///
/// 先尝试站点地图（常见文件名，再退回robots.txt指令），
/// 解析失败或零条目时降级为启发式候选；输出有界、有序、
/// 去重的任务序列
pub struct CrawlPlanner {
    fetcher: Arc<dyn FetchEngine>,
    settings: Arc<Settings>,
    stats: Arc<RunStats>,
}

impl CrawlPlanner {
    pub fn new(fetcher: Arc<dyn FetchEngine>, settings: Arc<Settings>, stats: Arc<RunStats>) -> Self {
        Self {
            fetcher,
            settings,
            stats,
        }
    }

    /// 为域名生成爬取计划
    ///
    /// 黑名单域名产出零任务。规划自身不抛错：
    /// 所有网络与解析失败都降级处理
    ///
    /// # 参数
    ///
    /// * `domain` - 规范化域名
    pub async fn plan(&self, domain: &str) -> CrawlPlan {
        if self.settings.is_domain_blocked(domain) {
            info!("Domain {} is blocklisted, planning zero tasks", domain);
            return CrawlPlan::empty();
        }

        let parts = &self.settings.crawl.priority_path_parts;
        let root_url = format!("https://{}/", domain);

        let sitemap_urls = self.collect_sitemap_urls(domain).await;
        let used_sitemap = !sitemap_urls.is_empty();

        let (candidates, origin) = if used_sitemap {
            (sitemap_urls, TaskOrigin::Sitemap)
        } else {
            debug!("No usable sitemap for {}, using fallback frontier", domain);
            (fallback_frontier(domain, parts), TaskOrigin::FallbackHeuristic)
        };

        // The domain root is always the seed page
        let mut tasks = vec![CrawlTask::new(
            root_url.clone(),
            0,
            TaskOrigin::FallbackHeuristic,
        )];
        let mut seen: HashSet<String> = HashSet::new();
        seen.insert(url_utils::canonicalise(&root_url));

        let mut ranked: Vec<CrawlTask> = candidates
            .iter()
            .map(|url| CrawlTask::new(url.clone(), priority_for(url, parts), origin))
            .collect();
        // Stable sort keeps document order as the tie-break within a band
        ranked.sort_by_key(|task| task.priority);

        for task in ranked {
            if seen.insert(url_utils::canonicalise(&task.url)) {
                tasks.push(task);
            }
        }

        tasks.truncate(self.settings.crawl.max_fallback_pages);
        debug!(
            "Planned {} tasks for {} (sitemap: {})",
            tasks.len(),
            domain,
            used_sitemap
        );
        CrawlPlan {
            tasks,
            used_sitemap,
        }
    }

    /// 发现并解析站点地图，返回文档顺序的同站URL
    async fn collect_sitemap_urls(&self, domain: &str) -> Vec<String> {
        let naked = domain.strip_prefix("www.").unwrap_or(domain);
        let hosts: Vec<String> = if naked.split('.').count() > 2 {
            vec![naked.to_string()]
        } else {
            vec![naked.to_string(), format!("www.{}", naked)]
        };
        let limit = self.settings.crawl.max_urls_per_sitemap;

        for host in &hosts {
            for filename in &self.settings.crawl.sitemap_filenames {
                let url = format!("https://{}/{}", host, filename);
                if let Some(urls) = self.try_sitemap(&url, naked, limit).await {
                    if !urls.is_empty() {
                        info!("Found sitemap via well-known filename: {}", url);
                        return urls;
                    }
                }
            }
        }

        // robots.txt fallback
        let robots_url = format!("https://{}/robots.txt", naked);
        if let Some(response) = self.fetch(&robots_url).await {
            for sm_url in sitemap::sitemaps_from_robots(&response.content) {
                // Relative directives are resolved against the domain root
                let sm_url = url_utils::join_domain(naked, &sm_url);
                if !same_site(&sm_url, naked) {
                    continue;
                }
                if let Some(urls) = self.try_sitemap(&sm_url, naked, limit).await {
                    if !urls.is_empty() {
                        info!("Found sitemap via robots.txt: {}", sm_url);
                        return urls;
                    }
                }
            }
        }

        Vec::new()
    }

    /// 抓取并解析一个站点地图候选
    ///
    /// 返回`None`表示该候选不可用；索引地图下钻一层，
    /// 与顶层共享条目上限
    async fn try_sitemap(&self, url: &str, naked: &str, limit: usize) -> Option<Vec<String>> {
        let response = self.fetch(url).await?;
        let contents = match sitemap::parse_sitemap(response.content.as_bytes(), limit) {
            Ok(contents) => contents,
            Err(e) => {
                debug!("Sitemap candidate {} unusable: {}", url, e);
                return None;
            }
        };

        let mut urls = contents.urls;
        if urls.is_empty() && !contents.nested.is_empty() {
            for nested_url in contents.nested.iter().take(MAX_NESTED_SITEMAPS) {
                if urls.len() >= limit {
                    break;
                }
                if !same_site(nested_url, naked) {
                    continue;
                }
                if let Some(nested_response) = self.fetch(nested_url).await {
                    match sitemap::parse_sitemap(
                        nested_response.content.as_bytes(),
                        limit - urls.len(),
                    ) {
                        Ok(nested) => urls.extend(nested.urls),
                        Err(e) => warn!("Error parsing nested sitemap {}: {}", nested_url, e),
                    }
                }
            }
        }

        // Cross-domain entries are discarded
        urls.retain(|u| {
            same_site(u, naked) && url_utils::validate_url(u, self.settings.http.max_url_length)
        });
        Some(urls)
    }

    async fn fetch(&self, url: &str) -> Option<FetchResponse> {
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
                None
            }
            Err(EngineError::InvalidUrl(_)) => None,
            Err(e) => {
                debug!("Fetch failed for {}: {}", url, e);
                self.stats.record_request_error();
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct StubFetcher {
        routes: HashMap<String, (u16, &'static str, String)>,
    }

    impl StubFetcher {
        fn new() -> Self {
            Self {
                routes: HashMap::new(),
            }
        }

        fn route(mut self, url: &str, content_type: &'static str, body: &str) -> Self {
            self.routes
                .insert(url.to_string(), (200, content_type, body.to_string()));
            self
        }
    }

    #[async_trait]
    impl FetchEngine for StubFetcher {
        async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, EngineError> {
            match self.routes.get(&request.url) {
                Some((status, content_type, body)) => Ok(FetchResponse {
                    status_code: *status,
                    content: body.clone(),
                    content_type: content_type.to_string(),
                    headers: HashMap::new(),
                    final_url: request.url.clone(),
                    response_time_ms: 1,
                }),
                None => Err(EngineError::BadStatus(404)),
            }
        }

        fn name(&self) -> &'static str {
            "stub"
        }
    }

    fn test_settings() -> Settings {
        let mut settings = Settings::new().unwrap();
        settings.search.api_key = Some("k".to_string());
        settings.search.cx = Some("c".to_string());
        settings
    }

    fn planner_with(fetcher: StubFetcher, settings: Settings) -> CrawlPlanner {
        CrawlPlanner::new(
            Arc::new(fetcher),
            Arc::new(settings),
            Arc::new(RunStats::new()),
        )
    }

    const ACME_SITEMAP: &str = r#"<?xml version="1.0"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>https://acme.example/products</loc></url>
  <url><loc>https://acme.example/contact</loc></url>
  <url><loc>https://acme.example/about</loc></url>
  <url><loc>https://elsewhere.example/contact</loc></url>
</urlset>"#;

    #[tokio::test]
    async fn test_blocklisted_domain_plans_zero_tasks() {
        let mut settings = test_settings();
        settings.crawl.blocked_domains = vec!["blocked.example".to_string()];
        let planner = planner_with(StubFetcher::new(), settings);

        let plan = planner.plan("blocked.example").await;
        assert!(plan.tasks.is_empty());
        assert!(!plan.used_sitemap);
    }

    #[tokio::test]
    async fn test_sitemap_priority_ordering_and_cross_domain_filter() {
        let fetcher = StubFetcher::new().route(
            "https://acme.example/sitemap.xml",
            "application/xml",
            ACME_SITEMAP,
        );
        let planner = planner_with(fetcher, test_settings());

        let plan = planner.plan("acme.example").await;
        assert!(plan.used_sitemap);

        let urls: Vec<&str> = plan.tasks.iter().map(|t| t.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://acme.example/",
                "https://acme.example/contact",
                "https://acme.example/about",
                "https://acme.example/products",
            ]
        );
        assert_eq!(plan.tasks[0].priority, 0);
        assert!(plan.tasks[1].priority < plan.tasks[3].priority);
        assert_eq!(plan.tasks[1].origin, TaskOrigin::Sitemap);
    }

    #[tokio::test]
    async fn test_plan_respects_fallback_page_cap() {
        let mut body = String::from(
            r#"<?xml version="1.0"?><urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">"#,
        );
        for i in 0..50 {
            body.push_str(&format!("<url><loc>https://acme.example/page{}</loc></url>", i));
        }
        body.push_str("</urlset>");

        let fetcher =
            StubFetcher::new().route("https://acme.example/sitemap.xml", "application/xml", &body);
        let mut settings = test_settings();
        settings.crawl.max_fallback_pages = 5;
        let planner = planner_with(fetcher, settings);

        let plan = planner.plan("acme.example").await;
        assert_eq!(plan.tasks.len(), 5);
    }

    #[tokio::test]
    async fn test_sitemap_entry_cap() {
        let mut body = String::from(
            r#"<?xml version="1.0"?><urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">"#,
        );
        for i in 0..50 {
            body.push_str(&format!("<url><loc>https://acme.example/page{}</loc></url>", i));
        }
        body.push_str("</urlset>");

        let fetcher =
            StubFetcher::new().route("https://acme.example/sitemap.xml", "application/xml", &body);
        let mut settings = test_settings();
        settings.crawl.max_urls_per_sitemap = 7;
        settings.crawl.max_fallback_pages = 100;
        let planner = planner_with(fetcher, settings);

        let plan = planner.plan("acme.example").await;
        // Root seed plus at most seven sitemap entries
        assert_eq!(plan.tasks.len(), 8);
    }

    #[tokio::test]
    async fn test_fallback_frontier_when_no_sitemap() {
        let planner = planner_with(StubFetcher::new(), test_settings());

        let plan = planner.plan("acme.example").await;
        assert!(!plan.used_sitemap);
        assert_eq!(plan.tasks[0].url, "https://acme.example/");
        assert_eq!(plan.tasks[1].url, "https://acme.example/contact");
        assert!(plan
            .tasks
            .iter()
            .skip(1)
            .all(|t| t.origin == TaskOrigin::FallbackHeuristic));
        assert!(plan.tasks.len() <= 12);
    }

    #[tokio::test]
    async fn test_malformed_sitemap_degrades_to_fallback() {
        let fetcher = StubFetcher::new().route(
            "https://acme.example/sitemap.xml",
            "text/html",
            "<html>not a sitemap</html>",
        );
        let planner = planner_with(fetcher, test_settings());

        let plan = planner.plan("acme.example").await;
        assert!(!plan.used_sitemap);
        assert!(!plan.tasks.is_empty());
    }

    #[tokio::test]
    async fn test_robots_txt_sitemap_fallback() {
        let fetcher = StubFetcher::new()
            .route(
                "https://acme.example/robots.txt",
                "text/plain",
                "User-agent: *\nSitemap: https://acme.example/custom-map.xml\n",
            )
            .route(
                "https://acme.example/custom-map.xml",
                "application/xml",
                ACME_SITEMAP,
            );
        let planner = planner_with(fetcher, test_settings());

        let plan = planner.plan("acme.example").await;
        assert!(plan.used_sitemap);
        assert_eq!(plan.tasks[1].url, "https://acme.example/contact");
    }

    #[tokio::test]
    async fn test_nested_sitemap_index() {
        let index = r#"<?xml version="1.0"?>
<sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <sitemap><loc>https://acme.example/sitemap-pages.xml</loc></sitemap>
</sitemapindex>"#;
        let fetcher = StubFetcher::new()
            .route("https://acme.example/sitemap.xml", "application/xml", index)
            .route(
                "https://acme.example/sitemap-pages.xml",
                "application/xml",
                ACME_SITEMAP,
            );
        let planner = planner_with(fetcher, test_settings());

        let plan = planner.plan("acme.example").await;
        assert!(plan.used_sitemap);
        assert!(plan.tasks.iter().any(|t| t.url.ends_with("/contact")));
    }

    #[tokio::test]
    async fn test_planning_is_deterministic() {
        let settings = test_settings();
        let mut first: Option<Vec<CrawlTask>> = None;
        for _ in 0..2 {
            let fetcher = StubFetcher::new().route(
                "https://acme.example/sitemap.xml",
                "application/xml",
                ACME_SITEMAP,
            );
            let planner = planner_with(fetcher, settings.clone());
            let plan = planner.plan("acme.example").await;
            if let Some(expected) = &first {
                assert_eq!(&plan.tasks, expected);
            } else {
                first = Some(plan.tasks);
            }
        }
    }

    #[test]
    fn test_priority_for_bands() {
        let parts: Vec<String> = vec!["contact".to_string(), "about".to_string()];
        let contact = priority_for("https://acme.example/contact", &parts);
        let about = priority_for("https://acme.example/about-us", &parts);
        let deep = priority_for("https://acme.example/blog/2024/post", &parts);
        let shallow = priority_for("https://acme.example/pricing", &parts);

        assert_eq!(contact, 1);
        assert_eq!(about, 2);
        assert!(shallow < deep);
        assert!(about < shallow);
    }
}
