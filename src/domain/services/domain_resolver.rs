// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::Settings;
use crate::domain::models::company::CompanyInput;
use crate::domain::models::resolved_domain::ResolvedDomain;
use crate::domain::search::engine::SearchEngine;
use crate::domain::services::domain_scorer;
use crate::utils::url_utils;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 域名解析结果
#[derive(Debug, Clone)]
pub enum Resolution {
    /// 解析成功
    Resolved(ResolvedDomain),
    /// 搜索调用失败或无结果，对应终态`no_google`
    SearchFailed,
    /// 有候选但没有一个达到阈值，对应终态`domain_unclear`
    Unclear,
}

/// 域名解析服务
///
/// 输入已提供域名时直接返回并跳过全部外部搜索调用；
/// 否则通过搜索引擎查询，过滤黑名单候选并按相关性评分
pub struct DomainResolver {
    search: Arc<dyn SearchEngine>,
    settings: Arc<Settings>,
}

impl DomainResolver {
    pub fn new(search: Arc<dyn SearchEngine>, settings: Arc<Settings>) -> Self {
        Self { search, settings }
    }

    /// 解析公司的规范域名
    ///
    /// # 参数
    ///
    /// * `input` - 公司输入
    ///
    /// # 返回值
    ///
    /// 解析结果；失败被映射为状态分类而不是错误
    pub async fn resolve(&self, input: &CompanyInput) -> Resolution {
        if let Some(domain) = input.domain.as_deref() {
            let domain = domain.trim();
            if !domain.is_empty() {
                let normalised = url_utils::normalise_domain(domain);
                debug!("Domain supplied for {}: {}", input.name, normalised);
                return Resolution::Resolved(ResolvedDomain::supplied(normalised));
            }
        }

        let hits = match self
            .search
            .search(&input.name, self.settings.search.result_limit)
            .await
        {
            Ok(hits) if hits.is_empty() => {
                warn!("No search results for {}", input.name);
                return Resolution::SearchFailed;
            }
            Ok(hits) => hits,
            Err(e) => {
                warn!("Search failed for {}: {}", input.name, e);
                return Resolution::SearchFailed;
            }
        };

        // Blocklisted candidates are rejected before scoring
        let surviving: Vec<_> = hits
            .into_iter()
            .filter(|hit| {
                let host = url_utils::normalise_domain(&hit.url);
                if self.settings.is_domain_blocked(&host) {
                    debug!("Rejecting blocklisted candidate {}", host);
                    false
                } else {
                    true
                }
            })
            .collect();

        if surviving.is_empty() {
            info!("All candidates for {} were blocklisted", input.name);
            return Resolution::Unclear;
        }

        match domain_scorer::find_best_domain(&input.name, &surviving) {
            Some((score, url)) if score >= self.settings.crawl.domain_score_threshold => {
                let domain = url_utils::normalise_domain(&url);
                info!("Found domain for {}: {} (score: {:.0})", input.name, domain, score);
                Resolution::Resolved(ResolvedDomain::searched(domain, score))
            }
            Some((score, url)) => {
                info!(
                    "Domain score too low ({:.0} < {:.0}): {} for {}",
                    score, self.settings.crawl.domain_score_threshold, url, input.name
                );
                Resolution::Unclear
            }
            None => Resolution::Unclear,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::resolved_domain::ResolutionMethod;
    use crate::domain::models::search_hit::SearchHit;
    use crate::domain::search::engine::SearchError;
    use async_trait::async_trait;

    struct StubSearch {
        response: Result<Vec<SearchHit>, SearchError>,
    }

    #[async_trait]
    impl SearchEngine for StubSearch {
        async fn search(&self, _query: &str, _limit: u32) -> Result<Vec<SearchHit>, SearchError> {
            self.response.clone()
        }

        fn name(&self) -> &'static str {
            "stub"
        }
    }

    struct PanickingSearch;

    #[async_trait]
    impl SearchEngine for PanickingSearch {
        async fn search(&self, _query: &str, _limit: u32) -> Result<Vec<SearchHit>, SearchError> {
            panic!("search must not be called for supplied domains");
        }

        fn name(&self) -> &'static str {
            "panicking"
        }
    }

    fn settings() -> Arc<Settings> {
        let mut settings = Settings::new().unwrap();
        settings.search.api_key = Some("k".to_string());
        settings.search.cx = Some("c".to_string());
        Arc::new(settings)
    }

    fn resolver(response: Result<Vec<SearchHit>, SearchError>) -> DomainResolver {
        DomainResolver::new(Arc::new(StubSearch { response }), settings())
    }

    #[tokio::test]
    async fn test_supplied_domain_skips_search() {
        let resolver = DomainResolver::new(Arc::new(PanickingSearch), settings());
        let input = CompanyInput::with_domain("Acme Corp", "WWW.Acme.Example");

        match resolver.resolve(&input).await {
            Resolution::Resolved(resolved) => {
                assert_eq!(resolved.domain, "acme.example");
                assert_eq!(resolved.method, ResolutionMethod::Supplied);
            }
            other => panic!("unexpected resolution: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_search_error_maps_to_search_failed() {
        let resolver = resolver(Err(SearchError::RetriesExhausted(5)));
        let input = CompanyInput::new("Ghost Inc");
        assert!(matches!(resolver.resolve(&input).await, Resolution::SearchFailed));
    }

    #[tokio::test]
    async fn test_empty_results_map_to_search_failed() {
        let resolver = resolver(Ok(vec![]));
        let input = CompanyInput::new("Ghost Inc");
        assert!(matches!(resolver.resolve(&input).await, Resolution::SearchFailed));
    }

    #[tokio::test]
    async fn test_low_score_maps_to_unclear() {
        let resolver = resolver(Ok(vec![SearchHit::new(
            "https://zzzqqqxxx.example/",
            "Something else",
        )]));
        let input = CompanyInput::new("Acme Corporation");
        assert!(matches!(resolver.resolve(&input).await, Resolution::Unclear));
    }

    #[tokio::test]
    async fn test_good_match_resolves() {
        let resolver = resolver(Ok(vec![
            SearchHit::new("https://www.acme.example/", "Acme Corp"),
            SearchHit::new("https://jobs.example/acme", "Acme jobs"),
        ]));
        let input = CompanyInput::new("Acme Corp");

        match resolver.resolve(&input).await {
            Resolution::Resolved(resolved) => {
                assert_eq!(resolved.domain, "acme.example");
                assert_eq!(resolved.method, ResolutionMethod::Searched);
                assert!(resolved.confidence >= 60.0);
            }
            other => panic!("unexpected resolution: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_all_blocklisted_candidates_map_to_unclear() {
        let mut settings = Settings::new().unwrap();
        settings.search.api_key = Some("k".to_string());
        settings.search.cx = Some("c".to_string());
        settings.crawl.blocked_domains = vec!["acme.example".to_string()];

        let resolver = DomainResolver::new(
            Arc::new(StubSearch {
                response: Ok(vec![SearchHit::new("https://acme.example/", "Acme Corp")]),
            }),
            Arc::new(settings),
        );
        let input = CompanyInput::new("Acme Corp");
        assert!(matches!(resolver.resolve(&input).await, Resolution::Unclear));
    }
}
