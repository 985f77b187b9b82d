// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::company::{CompanyResult, CompanyStatus};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// 运行期全局统计
///
/// 运行开始时创建，所有工作器通过原子递增更新，
/// 运行结束时读取一次用于打印汇总，之后丢弃。
/// 工作器拿不到可自由修改的共享容器
pub struct RunStats {
    started_at: DateTime<Utc>,
    start: Instant,
    leads: AtomicU64,
    with_email: AtomicU64,
    without_email: AtomicU64,
    no_google: AtomicU64,
    domain_unclear: AtomicU64,
    processing_error: AtomicU64,
    sitemap_used: AtomicU64,
    total_requests: AtomicU64,
    error_requests: AtomicU64,
    /// 各HTTP状态码出现次数
    http_status: DashMap<u16, u64>,
}

impl Default for RunStats {
    fn default() -> Self {
        Self::new()
    }
}

impl RunStats {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            start: Instant::now(),
            leads: AtomicU64::new(0),
            with_email: AtomicU64::new(0),
            without_email: AtomicU64::new(0),
            no_google: AtomicU64::new(0),
            domain_unclear: AtomicU64::new(0),
            processing_error: AtomicU64::new(0),
            sitemap_used: AtomicU64::new(0),
            total_requests: AtomicU64::new(0),
            error_requests: AtomicU64::new(0),
            http_status: DashMap::new(),
        }
    }

    /// 记录一次HTTP响应
    pub fn record_request(&self, status: u16) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        *self.http_status.entry(status).or_insert(0) += 1;
        if !(200..300).contains(&status) {
            self.error_requests.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// 记录一次传输层失败（没有拿到状态码）
    pub fn record_request_error(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.error_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// 记录一个完成的公司结果
    pub fn record_company(&self, result: &CompanyResult) {
        self.leads.fetch_add(1, Ordering::Relaxed);
        self.status_counter(result.status).fetch_add(1, Ordering::Relaxed);
        if result.used_sitemap {
            self.sitemap_used.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn status_counter(&self, status: CompanyStatus) -> &AtomicU64 {
        match status {
            CompanyStatus::WithEmail => &self.with_email,
            CompanyStatus::WithoutEmail => &self.without_email,
            CompanyStatus::NoGoogle => &self.no_google,
            CompanyStatus::DomainUnclear => &self.domain_unclear,
            CompanyStatus::ProcessingError => &self.processing_error,
        }
    }

    /// 指定终态的计数
    pub fn status_count(&self, status: CompanyStatus) -> u64 {
        self.status_counter(status).load(Ordering::Relaxed)
    }

    /// 已处理公司总数
    pub fn leads(&self) -> u64 {
        self.leads.load(Ordering::Relaxed)
    }

    /// 生成一次性汇总快照
    ///
    /// `unique_emails`由调用方在全部结果上去重后给出
    pub fn summary(&self, unique_emails: usize) -> RunSummary {
        let mut status_codes: Vec<(u16, u64)> = self
            .http_status
            .iter()
            .map(|entry| (*entry.key(), *entry.value()))
            .collect();
        status_codes.sort_by_key(|(code, _)| *code);

        RunSummary {
            started_at: self.started_at,
            leads: self.leads.load(Ordering::Relaxed),
            domain: self.with_email.load(Ordering::Relaxed)
                + self.without_email.load(Ordering::Relaxed)
                + self.processing_error.load(Ordering::Relaxed),
            no_google: self.no_google.load(Ordering::Relaxed),
            domain_unclear: self.domain_unclear.load(Ordering::Relaxed),
            sitemap_used: self.sitemap_used.load(Ordering::Relaxed),
            with_email: self.with_email.load(Ordering::Relaxed),
            without_email: self.without_email.load(Ordering::Relaxed),
            processing_error: self.processing_error.load(Ordering::Relaxed),
            total_requests: self.total_requests.load(Ordering::Relaxed),
            error_requests: self.error_requests.load(Ordering::Relaxed),
            status_codes,
            unique_emails: unique_emails as u64,
            elapsed_secs: self.start.elapsed().as_secs_f64(),
        }
    }
}

/// 运行结束时的汇总
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub leads: u64,
    pub domain: u64,
    pub no_google: u64,
    pub domain_unclear: u64,
    pub sitemap_used: u64,
    pub with_email: u64,
    pub without_email: u64,
    pub processing_error: u64,
    pub total_requests: u64,
    pub error_requests: u64,
    pub status_codes: Vec<(u16, u64)>,
    pub unique_emails: u64,
    pub elapsed_secs: f64,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "+--------------------------------------------------+")?;
        writeln!(f, "| RUN SUMMARY                                      |")?;
        writeln!(f, "+--------------------------------------------------+")?;
        writeln!(f, "| Started         : {}", self.started_at.format("%Y-%m-%d %H:%M:%S UTC"))?;
        writeln!(f, "| Leads           : {:>5}", self.leads)?;
        writeln!(f, "| Domain found    : {:>5}", self.domain)?;
        writeln!(f, "| No Google hits  : {:>5}", self.no_google)?;
        writeln!(f, "| Domain unclear  : {:>5}", self.domain_unclear)?;
        writeln!(f, "| Sitemap used    : {:>5}", self.sitemap_used)?;
        writeln!(f, "| With e-mail     : {:>5}", self.with_email)?;
        writeln!(f, "| Without e-mail  : {:>5}", self.without_email)?;
        writeln!(f, "| Processing err  : {:>5}", self.processing_error)?;
        writeln!(f, "| HTTP requests   : {:>5}", self.total_requests)?;
        writeln!(f, "| HTTP errors     : {:>5}", self.error_requests)?;
        writeln!(f, "| Unique e-mails  : {:>5}", self.unique_emails)?;
        writeln!(f, "| Runtime         : {:>7.1} s", self.elapsed_secs)?;
        write!(f, "+--------------------------------------------------+")
    }
}
