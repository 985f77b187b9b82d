// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::search_hit::SearchHit;
use crate::utils::url_utils;

/// 社交平台与聚合站点，命中时扣分
const PENALTY_DOMAINS: &[&str] = &[
    "linkedin.com",
    "facebook.com",
    "instagram.com",
    "twitter.com",
    "youtube.com",
    "medium.com",
    "github.com",
    "glassdoor.com",
    "indeed.com",
    "crunchbase.com",
    "bloomberg.com",
    "wikipedia.org",
];

/// 社交平台扣分值
const SOCIAL_PENALTY: f64 = 25.0;

/// 参与可靠评分的公司名最小长度
const MIN_COMPANY_LENGTH: usize = 3;

/// 中性分，公司名过短时返回
const NEUTRAL_SCORE: f64 = 50.0;

const LEGAL_SUFFIXES: &[&str] = &[
    " inc", " inc.", " incorporated", " llc", " ltd", " ltd.", " limited", " gmbh", " ag",
    " corp", " corp.", " corporation", " co", " co.",
];

/// 清理公司名用于比较
///
/// 去掉常见法律后缀与非字母数字字符，统一小写
pub fn clean_company_name(company: &str) -> String {
    let mut cleaned = company.to_lowercase();
    for suffix in LEGAL_SUFFIXES {
        if cleaned.ends_with(suffix) {
            cleaned.truncate(cleaned.len() - suffix.len());
            break;
        }
    }
    cleaned
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

/// 取主机名中最可能代表组织的标签
///
/// 例如`shop.acme.example`取`acme`；单标签主机取其本身
fn registrable_label(host: &str) -> (&str, &str) {
    let labels: Vec<&str> = host.split('.').filter(|l| !l.is_empty()).collect();
    match labels.len() {
        0 => ("", ""),
        1 => (labels[0], ""),
        n => (labels[n - 2], labels[..n - 2].last().copied().unwrap_or("")),
    }
}

/// 计算域名与公司名的相关性分数 (0-100)
///
/// 纯函数：输入完全显式，便于用字面量夹具做单元测试
pub fn score_domain(company: &str, url: &str) -> f64 {
    if company.is_empty() || url.is_empty() {
        return 0.0;
    }

    let host = url_utils::normalise_domain(url);
    let base = clean_company_name(company);

    if base.len() < MIN_COMPANY_LENGTH {
        return NEUTRAL_SCORE;
    }

    let penalty = if PENALTY_DOMAINS.iter().any(|p| host.contains(p)) {
        SOCIAL_PENALTY
    } else {
        0.0
    };

    let (domain_label, subdomain_label) = registrable_label(&host);
    let domain_score = strsim::jaro_winkler(&base, domain_label) * 100.0;
    let subdomain_score = if subdomain_label.is_empty() {
        0.0
    } else {
        strsim::jaro_winkler(&base, subdomain_label) * 100.0
    };

    (domain_score.max(subdomain_score) - penalty).max(0.0)
}

/// 从搜索结果中选出得分最高的候选
///
/// # 返回值
///
/// * `Some((score, url))` - 最佳候选及其分数
/// * `None` - 没有可用候选
pub fn find_best_domain(company: &str, hits: &[SearchHit]) -> Option<(f64, String)> {
    hits.iter()
        .filter(|hit| !hit.url.is_empty())
        .map(|hit| (score_domain(company, &hit.url), hit.url.clone()))
        .max_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal))
}
