// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 邮箱候选
///
/// 地址已规范化为小写；同一域名下按地址去重
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmailCandidate {
    /// 规范化地址（小写）
    pub address: String,
    /// 发现该地址的页面
    pub source_url: String,
    /// 启发式评分
    pub score: u32,
}

impl EmailCandidate {
    pub fn new(address: impl Into<String>, source_url: impl Into<String>, score: u32) -> Self {
        Self {
            address: address.into(),
            source_url: source_url.into(),
            score,
        }
    }
}

/// 按地址去重的邮箱集合
///
/// 跨页面合并时保留最高分和最早来源；迭代顺序按地址稳定排序
#[derive(Debug, Clone, Default)]
pub struct EmailSet {
    entries: BTreeMap<String, EmailCandidate>,
}

impl EmailSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 合并一个候选
    ///
    /// 已存在的地址只提升分数，来源保持首次发现的页面
    pub fn merge(&mut self, candidate: EmailCandidate) {
        match self.entries.get_mut(&candidate.address) {
            Some(existing) => {
                if candidate.score > existing.score {
                    existing.score = candidate.score;
                }
            }
            None => {
                self.entries.insert(candidate.address.clone(), candidate);
            }
        }
    }

    /// 合并多个候选
    pub fn merge_all(&mut self, candidates: impl IntoIterator<Item = EmailCandidate>) {
        for candidate in candidates {
            self.merge(candidate);
        }
    }

    pub fn contains(&self, address: &str) -> bool {
        self.entries.contains_key(address)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EmailCandidate> {
        self.entries.values()
    }

    pub fn into_vec(self) -> Vec<EmailCandidate> {
        self.entries.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_keeps_highest_score_and_earliest_source() {
        let mut set = EmailSet::new();
        set.merge(EmailCandidate::new("info@acme.example", "https://acme.example/", 10));
        set.merge(EmailCandidate::new(
            "info@acme.example",
            "https://acme.example/contact",
            40,
        ));

        assert_eq!(set.len(), 1);
        let entry = set.iter().next().unwrap();
        assert_eq!(entry.score, 40);
        assert_eq!(entry.source_url, "https://acme.example/");
    }

    #[test]
    fn test_merge_is_idempotent() {
        let candidates = vec![
            EmailCandidate::new("a@acme.example", "https://acme.example/", 10),
            EmailCandidate::new("b@acme.example", "https://acme.example/contact", 20),
            EmailCandidate::new("a@acme.example", "https://acme.example/about", 30),
        ];

        let mut once = EmailSet::new();
        once.merge_all(candidates.clone());

        let mut twice = EmailSet::new();
        twice.merge_all(candidates.clone());
        twice.merge_all(candidates);

        assert_eq!(once.into_vec(), twice.into_vec());
    }
}
