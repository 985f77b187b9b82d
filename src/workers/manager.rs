// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::Settings;
use crate::domain::models::company::{CompanyInput, CompanyResult};
use crate::domain::services::crawl_planner::CrawlPlanner;
use crate::domain::services::domain_resolver::DomainResolver;
use crate::domain::services::email_extractor::HybridEmailExtractor;
use crate::engines::traits::FetchEngine;
use crate::infrastructure::stats::RunStats;
use crate::workers::company_worker::CompanyWorker;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::{mpsc, Mutex};
use tracing::{info, warn};

/// 收到中断信号后等待在途工作器完成的时间窗口
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// 工作池管理器
///
/// 固定大小的工作池从共享队列消费公司，一家公司完整地
/// 归一个工作器所有；结果按完成顺序收集。中断信号触发后
/// 停止消费新任务，限时等待在途工作器，超时则中止，
/// 已完成的结果全部保留且不会重复上报
pub struct WorkerManager {
    settings: Arc<Settings>,
    resolver: Arc<DomainResolver>,
    planner: Arc<CrawlPlanner>,
    extractor: Arc<HybridEmailExtractor>,
    fetcher: Arc<dyn FetchEngine>,
    stats: Arc<RunStats>,
}

impl WorkerManager {
    /// 创建新的工作池管理器
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
        }
    }

    /// 处理全部公司并返回完成顺序的结果
    ///
    /// # 参数
    ///
    /// * `companies` - 输入公司列表
    pub async fn run(&self, companies: Vec<CompanyInput>) -> Vec<CompanyResult> {
        let worker_count = self.settings.crawl.max_workers;
        let total = companies.len();
        info!("Starting {} workers for {} companies", worker_count, total);

        let (task_tx, task_rx) = mpsc::channel::<CompanyInput>(total.max(1));
        for company in companies {
            // The queue is pre-filled and then closed; workers drain it
            let _ = task_tx.send(company).await;
        }
        drop(task_tx);

        let task_rx = Arc::new(Mutex::new(task_rx));
        let (result_tx, mut result_rx) = mpsc::unbounded_channel::<CompanyResult>();
        let shutdown = Arc::new(AtomicBool::new(false));

        let mut handles = Vec::with_capacity(worker_count);
        for _ in 0..worker_count {
            let worker = CompanyWorker::new(
                self.settings.clone(),
                self.resolver.clone(),
                self.planner.clone(),
                self.extractor.clone(),
                self.fetcher.clone(),
                self.stats.clone(),
            );
            let task_rx = task_rx.clone();
            let result_tx = result_tx.clone();
            let shutdown = shutdown.clone();

            handles.push(tokio::spawn(async move {
                info!("Worker {} started", worker.worker_id());
                loop {
                    if shutdown.load(Ordering::SeqCst) {
                        break;
                    }
                    let next = { task_rx.lock().await.recv().await };
                    let Some(input) = next else { break };
                    let result = worker.process_company(input).await;
                    if result_tx.send(result).is_err() {
                        break;
                    }
                }
                info!("Worker {} finished", worker.worker_id());
            }));
        }
        drop(result_tx);

        let mut results = Vec::with_capacity(total);
        let mut drain_deadline: Option<tokio::time::Instant> = None;

        loop {
            match drain_deadline {
                None => {
                    tokio::select! {
                        maybe = result_rx.recv() => match maybe {
                            Some(result) => results.push(result),
                            None => break,
                        },
                        _ = signal::ctrl_c() => {
                            info!("Shutdown signal received, draining in-flight workers");
                            shutdown.store(true, Ordering::SeqCst);
                            drain_deadline =
                                Some(tokio::time::Instant::now() + DRAIN_TIMEOUT);
                        }
                    }
                }
                Some(deadline) => {
                    tokio::select! {
                        maybe = result_rx.recv() => match maybe {
                            Some(result) => results.push(result),
                            None => break,
                        },
                        _ = tokio::time::sleep_until(deadline) => {
                            warn!("Drain window expired, aborting in-flight workers");
                            for handle in &handles {
                                handle.abort();
                            }
                            break;
                        }
                    }
                }
            }
        }

        // Aborted handles resolve with a cancellation error; nothing to do
        let _ = futures::future::join_all(handles).await;

        info!("Processed {} of {} companies", results.len(), total);
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::company::CompanyStatus;
    use crate::domain::models::search_hit::SearchHit;
    use crate::domain::search::engine::{SearchEngine, SearchError};
    use crate::domain::services::email_extractor::EmailExtractor;
    use crate::engines::traits::{EngineError, FetchRequest, FetchResponse};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::collections::HashSet;

    struct FailingSearch;

    #[async_trait]
    impl SearchEngine for FailingSearch {
        async fn search(&self, _query: &str, _limit: u32) -> Result<Vec<SearchHit>, SearchError> {
            Err(SearchError::RetriesExhausted(3))
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    struct EmptyFetcher;

    #[async_trait]
    impl FetchEngine for EmptyFetcher {
        async fn fetch(&self, _request: &FetchRequest) -> Result<FetchResponse, EngineError> {
            Err(EngineError::BadStatus(404))
        }

        fn name(&self) -> &'static str {
            "empty"
        }
    }

    struct ContactPageFetcher;

    #[async_trait]
    impl FetchEngine for ContactPageFetcher {
        async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, EngineError> {
            if request.url.ends_with("/contact") {
                Ok(FetchResponse {
                    status_code: 200,
                    content: "<p>info@acme.example</p>".to_string(),
                    content_type: "text/html".to_string(),
                    headers: HashMap::new(),
                    final_url: request.url.clone(),
                    response_time_ms: 1,
                })
            } else {
                Err(EngineError::BadStatus(404))
            }
        }

        fn name(&self) -> &'static str {
            "contact-page"
        }
    }

    fn manager_with(fetcher: Arc<dyn FetchEngine>, workers: usize) -> (WorkerManager, Arc<RunStats>) {
        let mut settings = Settings::new().unwrap();
        settings.search.api_key = Some("k".to_string());
        settings.search.cx = Some("c".to_string());
        settings.crawl.max_workers = workers;
        settings.crawl.min_crawl_delay_secs = 0.0;
        settings.crawl.max_crawl_delay_secs = 0.0;
        let settings = Arc::new(settings);

        let stats = Arc::new(RunStats::new());
        let search: Arc<dyn SearchEngine> = Arc::new(FailingSearch);
        let resolver = Arc::new(DomainResolver::new(search, settings.clone()));
        let planner = Arc::new(CrawlPlanner::new(
            fetcher.clone(),
            settings.clone(),
            stats.clone(),
        ));
        let extractor = Arc::new(HybridEmailExtractor::new(
            EmailExtractor::new(settings.scoring.clone()),
            None,
        ));

        (
            WorkerManager::new(settings, resolver, planner, extractor, fetcher, stats.clone()),
            stats,
        )
    }

    #[tokio::test]
    async fn test_every_company_processed_exactly_once() {
        let (manager, stats) = manager_with(Arc::new(EmptyFetcher), 3);

        // More companies than workers
        let companies: Vec<CompanyInput> = (0..10)
            .map(|i| CompanyInput::new(format!("Company {}", i)))
            .collect();
        let results = manager.run(companies).await;

        assert_eq!(results.len(), 10);
        let names: HashSet<String> = results.iter().map(|r| r.company.name.clone()).collect();
        assert_eq!(names.len(), 10);

        // Per-status counts sum to the company total
        let by_status: u64 = CompanyStatus::ALL
            .iter()
            .map(|s| stats.status_count(*s))
            .sum();
        assert_eq!(by_status, 10);
        assert_eq!(stats.leads(), 10);
    }

    #[tokio::test]
    async fn test_statuses_are_exhaustive_and_exclusive() {
        let (manager, _) = manager_with(Arc::new(EmptyFetcher), 2);

        let companies = vec![
            CompanyInput::new("Ghost Inc"),
            CompanyInput::with_domain("Acme Corp", "acme.example"),
        ];
        let results = manager.run(companies).await;

        for result in &results {
            // Every company ends in exactly one of the defined statuses
            assert!(CompanyStatus::ALL.contains(&result.status));
        }
        let ghost = results.iter().find(|r| r.company.name == "Ghost Inc").unwrap();
        assert_eq!(ghost.status, CompanyStatus::NoGoogle);
        let acme = results.iter().find(|r| r.company.name == "Acme Corp").unwrap();
        assert_eq!(acme.status, CompanyStatus::WithoutEmail);
    }

    #[tokio::test]
    async fn test_emails_found_through_fallback_frontier() {
        let (manager, _) = manager_with(Arc::new(ContactPageFetcher), 2);

        let results = manager
            .run(vec![CompanyInput::with_domain("Acme Corp", "acme.example")])
            .await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status, CompanyStatus::WithEmail);
        assert!(results[0].emails.contains("info@acme.example"));
    }
}
