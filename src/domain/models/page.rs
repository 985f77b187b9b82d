// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::email::EmailCandidate;
use serde::{Deserialize, Serialize};

/// 页面正文保留的最大字符数
pub const MAX_EXTRACTED_TEXT_LEN: usize = 100_000;

/// 单个页面的抓取与提取结果
///
/// 由抓取它的处理步骤产出后不再修改
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResult {
    /// 页面地址
    pub url: String,
    /// HTTP状态码
    pub http_status: u16,
    /// 页面标题
    pub title: Option<String>,
    /// meta description
    pub meta_description: Option<String>,
    /// meta keywords
    pub meta_keywords: Option<String>,
    /// 提取的可见文本（有界长度）
    pub extracted_text: String,
    /// 该页面上发现的邮箱候选
    pub discovered_emails: Vec<EmailCandidate>,
}

impl PageResult {
    pub fn new(url: impl Into<String>, http_status: u16) -> Self {
        Self {
            url: url.into(),
            http_status,
            title: None,
            meta_description: None,
            meta_keywords: None,
            extracted_text: String::new(),
            discovered_emails: Vec::new(),
        }
    }

    /// 设置正文文本，超出上限时在字符边界截断
    pub fn set_text(&mut self, text: String) {
        self.extracted_text = bound_text(text, MAX_EXTRACTED_TEXT_LEN);
    }
}

/// 在字符边界处把文本截断到`max_len`字节以内
pub fn bound_text(mut text: String, max_len: usize) -> String {
    if text.len() > max_len {
        let mut end = max_len;
        while end > 0 && !text.is_char_boundary(end) {
            end -= 1;
        }
        text.truncate(end);
    }
    text
}
