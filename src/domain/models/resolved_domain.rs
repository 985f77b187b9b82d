// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use std::fmt;

/// 域名解析方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMethod {
    /// 输入行直接提供了域名，跳过搜索
    Supplied,
    /// 通过搜索API解析得到
    Searched,
}

impl fmt::Display for ResolutionMethod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ResolutionMethod::Supplied => write!(f, "supplied"),
            ResolutionMethod::Searched => write!(f, "searched"),
        }
    }
}

/// 解析得到的规范域名
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedDomain {
    /// 规范化域名（小写，无`www.`前缀）
    pub domain: String,
    /// 解析方式
    pub method: ResolutionMethod,
    /// 匹配置信度 (0-100)
    pub confidence: f64,
}

impl ResolvedDomain {
    pub fn supplied(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            method: ResolutionMethod::Supplied,
            confidence: 100.0,
        }
    }

    pub fn searched(domain: impl Into<String>, confidence: f64) -> Self {
        Self {
            domain: domain.into(),
            method: ResolutionMethod::Searched,
            confidence,
        }
    }
}
