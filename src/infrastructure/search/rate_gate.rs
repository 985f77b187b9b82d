// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::time::Duration;

/// 全局搜索速率闸门
///
/// 单槽闸门：每个配置的最小间隔只放行一次搜索调用，
/// 被所有并发工作器共享，也是除统计外唯一的共享状态
pub struct SearchRateGate {
    limiter: DefaultDirectRateLimiter,
}

impl SearchRateGate {
    /// 创建新的速率闸门
    ///
    /// # 参数
    ///
    /// * `min_interval` - 两次调用之间的最小间隔
    pub fn new(min_interval: Duration) -> Self {
        let quota = Quota::with_period(min_interval)
            .unwrap_or_else(|| Quota::with_period(Duration::from_secs(1)).unwrap());
        Self {
            limiter: RateLimiter::direct(quota),
        }
    }

    /// 等待直到获得一个调用许可
    pub async fn acquire(&self) {
        self.limiter.until_ready().await;
    }
}
