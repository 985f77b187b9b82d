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

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;

/// 应用程序配置设置
///
/// 包含搜索API、爬取、HTTP、渲染回退、邮箱评分和输出等所有配置项
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// 搜索API配置
    pub search: SearchSettings,
    /// 爬取配置
    pub crawl: CrawlSettings,
    /// HTTP配置
    pub http: HttpSettings,
    /// 渲染回退配置
    pub render: RenderSettings,
    /// 邮箱评分配置
    pub scoring: ScoringSettings,
    /// 输出配置
    pub output: OutputSettings,
}

/// 搜索API配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct SearchSettings {
    /// Google Custom Search API密钥
    pub api_key: Option<String>,
    /// Google Custom Search引擎ID
    pub cx: Option<String>,
    /// 最大重试次数
    pub max_retries: u32,
    /// 全局最小调用间隔（秒），由所有工作器共享
    pub min_interval_secs: f64,
    /// 每次查询返回的结果数量
    pub result_limit: u32,
}

/// 爬取配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlSettings {
    /// 工作器数量
    pub max_workers: usize,
    /// 每个域名允许抓取的最大页面数
    pub max_fallback_pages: usize,
    /// 每个站点地图消费的最大`<loc>`条目数
    pub max_urls_per_sitemap: usize,
    /// 同域抓取之间的最小延迟（秒）
    pub min_crawl_delay_secs: f64,
    /// 同域抓取之间的最大延迟（秒）
    pub max_crawl_delay_secs: f64,
    /// 域名匹配分数阈值 (0-100)
    pub domain_score_threshold: f64,
    /// 优先路径关键词，顺序即优先级
    pub priority_path_parts: Vec<String>,
    /// 域名黑名单，永不爬取
    pub blocked_domains: Vec<String>,
    /// 尝试的站点地图文件名
    pub sitemap_filenames: Vec<String>,
}

/// HTTP配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct HttpSettings {
    /// 单次请求超时（秒）
    pub request_timeout_secs: u64,
    /// 最大重定向次数
    pub max_redirects: usize,
    /// URL最大长度
    pub max_url_length: usize,
    /// 是否允许不安全TLS
    pub insecure_ssl: bool,
    /// 代理地址（可选）
    pub proxy: Option<String>,
    /// 轮换使用的User-Agent列表
    pub user_agents: Vec<String>,
}

/// 渲染回退配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct RenderSettings {
    /// 外部渲染服务端点；为空时禁用混合提取
    pub endpoint: Option<String>,
    /// 渲染请求超时（秒）
    pub timeout_secs: u64,
}

/// 邮箱评分配置设置
///
/// 评分权重是策略数据而非代码，可通过配置调整
#[derive(Debug, Clone, Deserialize)]
pub struct ScoringSettings {
    /// 基础分
    pub base: u32,
    /// mailto来源加分
    pub mailto_bonus: u32,
    /// 优先页面加分
    pub priority_page_bonus: u32,
    /// 关键词邻近加分
    pub keyword_bonus: u32,
    /// 邻近判定关键词
    pub proximity_keywords: Vec<String>,
    /// 邻近判定窗口（字符数）
    pub proximity_window: usize,
}

/// 输出配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct OutputSettings {
    /// 只输出找到邮箱的公司；默认每个输入公司都有一行
    pub emails_only: bool,
}

const DEFAULT_PRIORITY_PARTS: &[&str] = &[
    "contact", "about", "impress", "impressum", "kontakt", "privacy", "sales", "investor",
    "procurement", "suppliers",
];

const DEFAULT_SITEMAP_FILENAMES: &[&str] = &[
    "sitemap.xml",
    "sitemap_index.xml",
    "sitemap-index.xml",
    "sitemap1.xml",
];

const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 13_4) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:124.0) Gecko/20100101 Firefox/124.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 13_4) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.5 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36 Edg/124.0.0.0",
];

const DEFAULT_PROXIMITY_KEYWORDS: &[&str] = &["contact", "email", "e-mail", "mail", "reach", "write"];

impl Settings {
    /// 创建新的配置实例
    ///
    /// 从代码默认值、可选的`config/default`文件和环境变量加载配置
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        let priority_parts: Vec<String> =
            DEFAULT_PRIORITY_PARTS.iter().map(|s| s.to_string()).collect();
        let sitemap_filenames: Vec<String> = DEFAULT_SITEMAP_FILENAMES
            .iter()
            .map(|s| s.to_string())
            .collect();
        let user_agents: Vec<String> = DEFAULT_USER_AGENTS.iter().map(|s| s.to_string()).collect();
        let proximity_keywords: Vec<String> = DEFAULT_PROXIMITY_KEYWORDS
            .iter()
            .map(|s| s.to_string())
            .collect();

        let builder = Config::builder()
            // Default Search settings
            .set_default("search.max_retries", 5)?
            .set_default("search.min_interval_secs", 0.8)?
            .set_default("search.result_limit", 10)?
            // Default Crawl settings
            .set_default("crawl.max_workers", 4)?
            .set_default("crawl.max_fallback_pages", 12)?
            .set_default("crawl.max_urls_per_sitemap", 10_000)?
            .set_default("crawl.min_crawl_delay_secs", 0.5)?
            .set_default("crawl.max_crawl_delay_secs", 2.0)?
            .set_default("crawl.domain_score_threshold", 60.0)?
            .set_default("crawl.priority_path_parts", priority_parts)?
            .set_default("crawl.blocked_domains", Vec::<String>::new())?
            .set_default("crawl.sitemap_filenames", sitemap_filenames)?
            // Default HTTP settings
            .set_default("http.request_timeout_secs", 20)?
            .set_default("http.max_redirects", 5)?
            .set_default("http.max_url_length", 2000)?
            .set_default("http.insecure_ssl", false)?
            .set_default("http.user_agents", user_agents)?
            // Default Render settings
            .set_default("render.timeout_secs", 45)?
            // Default Scoring settings
            .set_default("scoring.base", 10)?
            .set_default("scoring.mailto_bonus", 30)?
            .set_default("scoring.priority_page_bonus", 20)?
            .set_default("scoring.keyword_bonus", 15)?
            .set_default("scoring.proximity_keywords", proximity_keywords)?
            .set_default("scoring.proximity_window", 120)?
            // Default Output settings
            .set_default("output.emails_only", false)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix("PROSPECTRS").separator("__"));

        builder.build()?.try_deserialize()
    }

    /// 校验配置
    ///
    /// 拒绝缺失的凭据和越界数值，而不是静默修正。
    /// 必须在任何工作开始前调用，校验失败即终止运行
    ///
    /// # Returns
    ///
    /// * `Ok(())` - 配置有效
    /// * `Err(ConfigError)` - 汇总的校验错误
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.search.api_key.as_deref().unwrap_or("").is_empty() {
            errors.push("search.api_key is missing".to_string());
        }
        if self.search.cx.as_deref().unwrap_or("").is_empty() {
            errors.push("search.cx is missing".to_string());
        }
        if self.search.max_retries < 1 {
            errors.push("search.max_retries must be at least 1".to_string());
        }
        if self.search.min_interval_secs <= 0.0 {
            errors.push("search.min_interval_secs must be positive".to_string());
        }
        if self.search.result_limit < 1 {
            errors.push("search.result_limit must be at least 1".to_string());
        }
        if self.crawl.max_workers < 1 {
            errors.push("crawl.max_workers must be at least 1".to_string());
        }
        if self.crawl.max_fallback_pages < 1 {
            errors.push("crawl.max_fallback_pages must be at least 1".to_string());
        }
        if self.crawl.max_urls_per_sitemap < 1 {
            errors.push("crawl.max_urls_per_sitemap must be at least 1".to_string());
        }
        if self.crawl.min_crawl_delay_secs < 0.0 {
            errors.push("crawl.min_crawl_delay_secs must not be negative".to_string());
        }
        if self.crawl.max_crawl_delay_secs < self.crawl.min_crawl_delay_secs {
            errors.push(
                "crawl.max_crawl_delay_secs must not be below crawl.min_crawl_delay_secs"
                    .to_string(),
            );
        }
        if !(0.0..=100.0).contains(&self.crawl.domain_score_threshold) {
            errors.push("crawl.domain_score_threshold must be within 0-100".to_string());
        }
        if self.http.request_timeout_secs < 1 {
            errors.push("http.request_timeout_secs must be at least 1".to_string());
        }
        if self.http.max_url_length < 100 {
            errors.push("http.max_url_length must be at least 100".to_string());
        }
        if self.http.user_agents.is_empty() {
            errors.push("http.user_agents must not be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Message(format!(
                "Configuration errors: {}",
                errors.join(", ")
            )))
        }
    }

    /// 域名是否在黑名单中
    ///
    /// 比较时忽略大小写和`www.`前缀，并匹配子域名后缀
    pub fn is_domain_blocked(&self, domain: &str) -> bool {
        let domain = domain.to_lowercase();
        let domain = domain.strip_prefix("www.").unwrap_or(&domain);
        self.crawl.blocked_domains.iter().any(|blocked| {
            let blocked = blocked.to_lowercase();
            let blocked = blocked.strip_prefix("www.").unwrap_or(&blocked);
            domain == blocked || domain.ends_with(&format!(".{}", blocked))
        })
    }

    /// 搜索调用的全局最小间隔
    pub fn search_interval(&self) -> Duration {
        Duration::from_secs_f64(self.search.min_interval_secs)
    }

    /// HTTP请求超时
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.http.request_timeout_secs)
    }
}
