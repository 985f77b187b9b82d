// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::email::EmailSet;
use crate::domain::models::page::PageResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 公司输入
///
/// 每个输入行创建一次，之后不再修改。
/// 提供了域名的行跳过搜索解析
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompanyInput {
    /// 公司名称
    pub name: String,
    /// 预先提供的域名（可选）
    pub domain: Option<String>,
}

impl CompanyInput {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            domain: None,
        }
    }

    pub fn with_domain(name: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            domain: Some(domain.into()),
        }
    }
}

/// 公司处理终态
///
/// 每个公司恰好分配一个终态，在该公司的全部页面处理完成
/// 或尝试被放弃之后一次性赋值
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompanyStatus {
    /// 域名解析成功且合并后的邮箱集合非空
    WithEmail,
    /// 域名解析成功但未找到邮箱
    WithoutEmail,
    /// 搜索API在重试耗尽后仍失败或无结果
    NoGoogle,
    /// 有候选域名但没有一个达到分数阈值
    DomainUnclear,
    /// 域名已解析但爬取或提取过程中出现意外失败
    ProcessingError,
}

impl CompanyStatus {
    /// 全部终态，用于统计汇总
    pub const ALL: [CompanyStatus; 5] = [
        CompanyStatus::WithEmail,
        CompanyStatus::WithoutEmail,
        CompanyStatus::NoGoogle,
        CompanyStatus::DomainUnclear,
        CompanyStatus::ProcessingError,
    ];

    /// 域名解析是否成功
    pub fn domain_resolved(&self) -> bool {
        matches!(
            self,
            CompanyStatus::WithEmail | CompanyStatus::WithoutEmail | CompanyStatus::ProcessingError
        )
    }
}

impl fmt::Display for CompanyStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CompanyStatus::WithEmail => write!(f, "with_email"),
            CompanyStatus::WithoutEmail => write!(f, "without_email"),
            CompanyStatus::NoGoogle => write!(f, "no_google"),
            CompanyStatus::DomainUnclear => write!(f, "domain_unclear"),
            CompanyStatus::ProcessingError => write!(f, "processing_error"),
        }
    }
}

impl FromStr for CompanyStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "with_email" => Ok(CompanyStatus::WithEmail),
            "without_email" => Ok(CompanyStatus::WithoutEmail),
            "no_google" => Ok(CompanyStatus::NoGoogle),
            "domain_unclear" => Ok(CompanyStatus::DomainUnclear),
            "processing_error" => Ok(CompanyStatus::ProcessingError),
            _ => Err(()),
        }
    }
}

/// 单个公司的处理结果
///
/// 交给输出落盘的最小单元
#[derive(Debug, Clone)]
pub struct CompanyResult {
    /// 公司输入
    pub company: CompanyInput,
    /// 解析出的域名
    pub domain: Option<String>,
    /// 终态
    pub status: CompanyStatus,
    /// 实际抓取的页面数
    pub page_count: usize,
    /// 是否使用了站点地图
    pub used_sitemap: bool,
    /// 抓取顺序排列的页面结果
    pub pages: Vec<PageResult>,
    /// 合并去重后的邮箱集合
    pub emails: EmailSet,
}

impl CompanyResult {
    /// 未能解析域名时的空结果
    pub fn unresolved(company: CompanyInput, status: CompanyStatus) -> Self {
        Self {
            company,
            domain: None,
            status,
            page_count: 0,
            used_sitemap: false,
            pages: Vec::new(),
            emails: EmailSet::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in CompanyStatus::ALL {
            let parsed: CompanyStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn test_domain_resolved() {
        assert!(CompanyStatus::WithEmail.domain_resolved());
        assert!(CompanyStatus::WithoutEmail.domain_resolved());
        assert!(CompanyStatus::ProcessingError.domain_resolved());
        assert!(!CompanyStatus::NoGoogle.domain_resolved());
        assert!(!CompanyStatus::DomainUnclear.domain_resolved());
    }
}
