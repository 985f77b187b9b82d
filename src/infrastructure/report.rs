// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::company::{CompanyInput, CompanyResult};
use anyhow::{bail, Context, Result};
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

/// 读取输入CSV
///
/// 要求`Company`列，`Domain`列可选；提供了非空Domain的行
/// 跳过域名解析。空公司名的行被忽略
pub fn read_companies(path: &Path) -> Result<Vec<CompanyInput>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open input file {}", path.display()))?;

    let headers = reader.headers()?.clone();
    let Some(company_idx) = headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case("company"))
    else {
        bail!("Input needs a 'Company' column");
    };
    let domain_idx = headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case("domain"));

    let mut companies = Vec::new();
    for record in reader.records() {
        let record = record?;
        let name = record.get(company_idx).unwrap_or("").trim();
        if name.is_empty() {
            continue;
        }
        let domain = domain_idx
            .and_then(|i| record.get(i))
            .map(str::trim)
            .filter(|d| !d.is_empty());
        companies.push(match domain {
            Some(domain) => CompanyInput::with_domain(name, domain),
            None => CompanyInput::new(name),
        });
    }

    info!("Read {} companies from {}", companies.len(), path.display());
    Ok(companies)
}

/// 写出结果CSV
///
/// 每个邮箱一行；未找到邮箱的公司输出一行空邮箱，
/// 除非开启`emails_only`。完全相同的(Company, Domain, Email)
/// 行在写出前去重
///
/// # 返回值
///
/// 实际写出的行数
pub fn write_results(path: &Path, results: &[CompanyResult], emails_only: bool) -> Result<usize> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create output file {}", path.display()))?;
    writer.write_record(["Company", "Domain", "Email", "Status"])?;

    let mut seen: HashSet<(String, String, String)> = HashSet::new();
    let mut written = 0usize;

    for result in results {
        let domain = result.domain.clone().unwrap_or_default();
        let status = result.status.to_string();

        if result.emails.is_empty() {
            if emails_only {
                continue;
            }
            let key = (result.company.name.clone(), domain.clone(), String::new());
            if seen.insert(key) {
                writer.write_record([result.company.name.as_str(), domain.as_str(), "", status.as_str()])?;
                written += 1;
            }
            continue;
        }

        for email in result.emails.iter() {
            let key = (
                result.company.name.clone(),
                domain.clone(),
                email.address.clone(),
            );
            if seen.insert(key) {
                writer.write_record([&result.company.name, &domain, &email.address, &status])?;
                written += 1;
            }
        }
    }

    writer.flush()?;
    info!("Saved {} rows -> {}", written, path.display());
    Ok(written)
}

/// 全部结果中的唯一邮箱地址数
pub fn unique_email_count(results: &[CompanyResult]) -> usize {
    let mut unique: HashSet<&str> = HashSet::new();
    for result in results {
        for email in result.emails.iter() {
            unique.insert(email.address.as_str());
        }
    }
    unique.len()
}
