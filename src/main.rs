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

use clap::Parser;
use prospectrs::cli::Cli;
use prospectrs::config::settings::Settings;
use prospectrs::domain::search::engine::SearchEngine;
use prospectrs::domain::services::crawl_planner::CrawlPlanner;
use prospectrs::domain::services::domain_resolver::DomainResolver;
use prospectrs::domain::services::email_extractor::{EmailExtractor, HybridEmailExtractor};
use prospectrs::engines::render_engine::{HttpRenderService, RenderService};
use prospectrs::engines::reqwest_engine::ReqwestEngine;
use prospectrs::engines::traits::FetchEngine;
use prospectrs::infrastructure::report;
use prospectrs::infrastructure::search::google::GoogleSearchEngine;
use prospectrs::infrastructure::search::rate_gate::SearchRateGate;
use prospectrs::infrastructure::stats::RunStats;
use prospectrs::utils::telemetry;
use prospectrs::workers::manager::WorkerManager;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// 主函数
///
/// 应用程序入口点，负责初始化所有组件并驱动整个运行
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 1. Initialize logging
    telemetry::init_telemetry(cli.verbose);
    info!("Starting prospectrs...");

    // 2. Load and validate configuration; invalid settings abort before any work
    let mut settings = Settings::new()?;
    if let Some(workers) = cli.workers {
        settings.crawl.max_workers = workers;
    }
    if cli.emails_only {
        settings.output.emails_only = true;
    }
    settings.validate()?;
    let settings = Arc::new(settings);
    info!("Configuration loaded");

    // 3. Read input companies
    let companies = report::read_companies(&cli.input_file)?;
    if companies.is_empty() {
        info!("No companies to process");
        return Ok(());
    }

    // 4. Initialize components
    let stats = Arc::new(RunStats::new());
    let gate = Arc::new(SearchRateGate::new(settings.search_interval()));
    let search: Arc<dyn SearchEngine> = Arc::new(GoogleSearchEngine::new(
        settings.search.api_key.clone().unwrap_or_default(),
        settings.search.cx.clone().unwrap_or_default(),
        gate,
        settings.search.max_retries,
    ));
    let fetcher: Arc<dyn FetchEngine> = Arc::new(ReqwestEngine::new(
        settings.http.user_agents.clone(),
        settings.http.max_url_length,
    ));
    let render: Option<Arc<dyn RenderService>> = settings.render.endpoint.as_ref().map(|endpoint| {
        Arc::new(HttpRenderService::new(
            endpoint.clone(),
            Duration::from_secs(settings.render.timeout_secs),
        )) as Arc<dyn RenderService>
    });

    let resolver = Arc::new(DomainResolver::new(search, settings.clone()));
    let planner = Arc::new(CrawlPlanner::new(
        fetcher.clone(),
        settings.clone(),
        stats.clone(),
    ));
    let extractor = Arc::new(HybridEmailExtractor::new(
        EmailExtractor::new(settings.scoring.clone()),
        render,
    ));

    // 5. Run the worker pool
    let manager = WorkerManager::new(
        settings.clone(),
        resolver,
        planner,
        extractor,
        fetcher,
        stats.clone(),
    );
    let results = manager.run(companies).await;

    // 6. Write the report and print the summary
    report::write_results(&cli.output_file, &results, settings.output.emails_only)?;
    let summary = stats.summary(report::unique_email_count(&results));
    println!("{}", summary);

    Ok(())
}
