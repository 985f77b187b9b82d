// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use std::fmt;

/// 任务来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskOrigin {
    /// 站点地图条目
    Sitemap,
    /// 启发式回退候选
    FallbackHeuristic,
}

impl fmt::Display for TaskOrigin {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TaskOrigin::Sitemap => write!(f, "sitemap"),
            TaskOrigin::FallbackHeuristic => write!(f, "fallback_heuristic"),
        }
    }
}

/// 爬取任务
///
/// 按优先级升序抓取，数值越小越先抓取。
/// 优先级来自路径关键词匹配位置与路径深度
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CrawlTask {
    /// 目标地址
    pub url: String,
    /// 抓取优先级，越小越靠前
    pub priority: i32,
    /// 任务来源，用于观测
    pub origin: TaskOrigin,
}

impl CrawlTask {
    pub fn new(url: impl Into<String>, priority: i32, origin: TaskOrigin) -> Self {
        Self {
            url: url.into(),
            priority,
            origin,
        }
    }
}
