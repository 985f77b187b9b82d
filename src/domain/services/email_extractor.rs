// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::ScoringSettings;
use crate::domain::models::email::{EmailCandidate, EmailSet};
use crate::engines::render_engine::RenderService;
use lru::LruCache;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use scraper::{Html, Selector};
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::{debug, warn};

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)[A-Z0-9._%+-]+@(?:[A-Z0-9-]+\.)+[A-Z0-9]{2,63}").unwrap()
});

static OBFUSCATED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?P<user>[A-Z0-9._%+-]+)\s*(?:\[\s*at\s*\]|\(\s*at\s*\)|\bat\b)\s*(?P<host>[A-Z0-9-]+(?:\s*(?:\[\s*dot\s*\]|\(\s*dot\s*\)|\bdot\b)\s*[A-Z0-9-]+)+)",
    )
    .unwrap()
});

static OBFUSCATED_DOT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\[\s*dot\s*\]|\(\s*dot\s*\)|\bdot\b").unwrap());

static HEX_LOCAL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9a-f]{20,}$").unwrap());

/// 占位域名，永远不是真实联系方式
const DOMAIN_BLACKLIST: &[&str] = &[
    "example.com",
    "test.com",
    "domain.com",
    "email.com",
    "yourcompany.com",
    "company.com",
    "localhost",
];

/// 可疑的本地部分，表明不是有意发布的联系邮箱
const SUSPICIOUS_LOCAL_PARTS: &[&str] = &[
    "noreply",
    "no-reply",
    "donotreply",
    "webmaster",
    "hostmaster",
    "postmaster",
];

const IMAGE_SUFFIXES: &[&str] = &[".png", ".jpg", ".jpeg", ".gif"];

/// 评分上下文
///
/// 输入完全显式，评分函数不读取任何隐藏全局状态
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreContext {
    /// 来源页面是否为优先页面
    pub on_priority_page: bool,
    /// 是否来自mailto引用
    pub via_mailto: bool,
    /// 是否邻近联系类关键词
    pub near_keyword: bool,
}

/// 计算邮箱候选的启发式分数
///
/// 权重来自配置，是策略数据而非代码
pub fn score_candidate(weights: &ScoringSettings, ctx: &ScoreContext) -> u32 {
    let mut score = weights.base;
    if ctx.via_mailto {
        score += weights.mailto_bonus;
    }
    if ctx.on_priority_page {
        score += weights.priority_page_bonus;
    }
    if ctx.near_keyword {
        score += weights.keyword_bonus;
    }
    score
}

/// 把`user [at] host [dot] tld`风格的混淆还原为普通地址
pub fn deobfuscate(text: &str) -> String {
    OBFUSCATED_RE
        .replace_all(text, |caps: &regex::Captures| {
            let host = OBFUSCATED_DOT_RE.replace_all(&caps["host"], ".");
            let host: String = host.split_whitespace().collect::<Vec<_>>().join("");
            format!("{}@{}", &caps["user"], host)
        })
        .into_owned()
}

/// 解码Cloudflare`data-cfemail`属性值
fn decode_cfemail(cf: &str) -> Option<String> {
    if cf.len() < 4 || cf.len() % 2 != 0 {
        return None;
    }
    let bytes: Vec<u8> = (0..cf.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&cf[i..i + 2], 16).ok())
        .collect::<Option<_>>()?;
    let key = bytes[0];
    Some(bytes[1..].iter().map(|b| (b ^ key) as char).collect())
}

/// 清洗原始token为规范化地址
///
/// 去掉`mailto:`前缀和查询参数，剥离宿主尾部杂质，统一小写
pub fn clean_email(raw: &str) -> Option<String> {
    let mut email = raw.trim();
    if email.len() > 320 {
        return None;
    }
    if email.to_lowercase().starts_with("mailto:") {
        email = &email[7..];
    }
    let email = email.split('?').next().unwrap_or(email);

    let (local, host) = email.rsplit_once('@')?;
    let host = host.trim().trim_end_matches(['%', ';', ',', ':', ')', '}', ']', '>', '"', '\'', '`']);

    let cleaned = format!("{}@{}", local, host).to_lowercase();
    is_valid_email(&cleaned).then_some(cleaned)
}

/// 校验规范化后的地址是否可信
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.rsplit_once('@') else {
        return false;
    };

    if local.is_empty() || local.len() > 64 {
        return false;
    }
    if domain.is_empty() || domain.len() > 255 || !domain.contains('.') {
        return false;
    }
    if DOMAIN_BLACKLIST.contains(&domain) {
        return false;
    }
    if SUSPICIOUS_LOCAL_PARTS.iter().any(|p| local == *p) {
        return false;
    }
    // Asset filename artifacts such as logo@2x.png
    if IMAGE_SUFFIXES
        .iter()
        .any(|suffix| domain.ends_with(suffix) || local.ends_with(suffix))
    {
        return false;
    }
    if local.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    if HEX_LOCAL_RE.is_match(local) {
        return false;
    }
    let Some(tld) = domain.rsplit('.').next() else {
        return false;
    };
    if tld.len() < 2 || !tld.chars().all(|c| c.is_ascii_alphabetic()) {
        return false;
    }

    true
}

fn near_keyword(text: &str, start: usize, end: usize, keywords: &[String], window: usize) -> bool {
    let mut from = start.saturating_sub(window);
    while from > 0 && !text.is_char_boundary(from) {
        from -= 1;
    }
    let mut to = (end + window).min(text.len());
    while to < text.len() && !text.is_char_boundary(to) {
        to += 1;
    }
    let surrounding = text[from..to].to_lowercase();
    keywords.iter().any(|k| surrounding.contains(k.as_str()))
}

/// 静态邮箱提取器
///
/// 对格式损坏的输入返回空集合，从不报错
pub struct EmailExtractor {
    scoring: ScoringSettings,
}

impl EmailExtractor {
    pub fn new(scoring: ScoringSettings) -> Self {
        Self { scoring }
    }

    /// 从页面HTML提取邮箱候选
    ///
    /// 扫描顺序：Cloudflare混淆属性、可见文本（含反混淆）、
    /// mailto锚点。页面内部先按地址去重
    ///
    /// # 参数
    ///
    /// * `html` - 页面内容
    /// * `source_url` - 来源页面地址
    /// * `on_priority_page` - 来源是否为优先页面
    pub fn extract_static(
        &self,
        html: &str,
        source_url: &str,
        on_priority_page: bool,
    ) -> Vec<EmailCandidate> {
        let mut found = EmailSet::new();
        let document = Html::parse_document(html);

        // Cloudflare data-cfemail attributes
        if let Ok(selector) = Selector::parse("[data-cfemail]") {
            for element in document.select(&selector) {
                if let Some(cf) = element.value().attr("data-cfemail") {
                    if let Some(decoded) = decode_cfemail(cf) {
                        if let Some(address) = clean_email(&decoded) {
                            let ctx = ScoreContext {
                                on_priority_page,
                                via_mailto: true,
                                near_keyword: false,
                            };
                            found.merge(EmailCandidate::new(
                                address,
                                source_url,
                                score_candidate(&self.scoring, &ctx),
                            ));
                        }
                    }
                }
            }
        }

        // Visible text
        let text = document
            .root_element()
            .text()
            .collect::<Vec<_>>()
            .join(" ");
        let text = html_escape::decode_html_entities(&text).into_owned();
        let text = deobfuscate(&text);

        for m in EMAIL_RE.find_iter(&text) {
            if let Some(address) = clean_email(m.as_str()) {
                let ctx = ScoreContext {
                    on_priority_page,
                    via_mailto: false,
                    near_keyword: near_keyword(
                        &text,
                        m.start(),
                        m.end(),
                        &self.scoring.proximity_keywords,
                        self.scoring.proximity_window,
                    ),
                };
                found.merge(EmailCandidate::new(
                    address,
                    source_url,
                    score_candidate(&self.scoring, &ctx),
                ));
            }
        }

        // mailto anchors
        if let Ok(selector) = Selector::parse("a[href]") {
            for element in document.select(&selector) {
                let Some(href) = element.value().attr("href") else {
                    continue;
                };
                if !href.to_lowercase().starts_with("mailto:") {
                    continue;
                }
                if let Some(address) = clean_email(href) {
                    let ctx = ScoreContext {
                        on_priority_page,
                        via_mailto: true,
                        near_keyword: false,
                    };
                    found.merge(EmailCandidate::new(
                        address,
                        source_url,
                        score_candidate(&self.scoring, &ctx),
                    ));
                }
            }
        }

        let hits = found.into_vec();
        debug!("{} email candidates on {}", hits.len(), source_url);
        hits
    }
}

/// 混合邮箱提取器
///
/// 静态提取为零且页面非空时，才调用渲染回退重抓重扫，
/// 以延迟换取召回；渲染结果经LRU缓存避免重复渲染
pub struct HybridEmailExtractor {
    extractor: EmailExtractor,
    render: Option<Arc<dyn RenderService>>,
    render_cache: Mutex<LruCache<String, Vec<EmailCandidate>>>,
}

impl HybridEmailExtractor {
    pub fn new(extractor: EmailExtractor, render: Option<Arc<dyn RenderService>>) -> Self {
        Self {
            extractor,
            render,
            render_cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(256).unwrap_or(NonZeroUsize::MIN),
            )),
        }
    }

    /// 提取页面上的邮箱候选
    ///
    /// # 参数
    ///
    /// * `html` - 已抓取的页面内容
    /// * `source_url` - 来源页面地址
    /// * `on_priority_page` - 来源是否为优先页面
    pub async fn extract(
        &self,
        html: &str,
        source_url: &str,
        on_priority_page: bool,
    ) -> Vec<EmailCandidate> {
        let hits = self.extractor.extract_static(html, source_url, on_priority_page);
        if !hits.is_empty() || html.trim().is_empty() {
            return hits;
        }

        let Some(render) = &self.render else {
            return hits;
        };

        let cached = self.render_cache.lock().get(source_url).cloned();
        if let Some(hits) = cached {
            debug!("Render cache hit for {}", source_url);
            return hits;
        }

        debug!("Static pass found nothing on {}, rendering", source_url);
        match render.render(source_url).await {
            Ok(rendered) => {
                let hits = self
                    .extractor
                    .extract_static(&rendered, source_url, on_priority_page);
                self.render_cache
                    .lock()
                    .put(source_url.to_string(), hits.clone());
                hits
            }
            Err(e) => {
                warn!("Render fallback failed for {}: {}", source_url, e);
                Vec::new()
            }
        }
    }
}
