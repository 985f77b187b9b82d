// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use flate2::read::GzDecoder;
use sitemap::reader::{SiteMapEntity, SiteMapReader};
use std::io::{Cursor, Read};
use thiserror::Error;

/// 单个站点地图允许的最大字节数
pub const MAX_SITEMAP_SIZE: usize = 50 * 1024 * 1024;

/// 站点地图解析错误
#[derive(Error, Debug)]
pub enum SitemapError {
    /// 内容为空或超过大小限制
    #[error("Sitemap size out of bounds: {0} bytes")]
    SizeOutOfBounds(usize),
    /// gzip解压失败
    #[error("Gzip decode failed: {0}")]
    GzipDecode(String),
    /// 内容不是XML站点地图
    #[error("Content does not look like an XML sitemap")]
    NotXml,
}

/// 站点地图解析结果
#[derive(Debug, Default)]
pub struct SitemapContents {
    /// `<url><loc>`条目
    pub urls: Vec<String>,
    /// `<sitemap><loc>`嵌套索引条目
    pub nested: Vec<String>,
}

/// 内容是否像XML站点地图
///
/// 检查前200字节是否以XML声明开头或包含关键标签
pub fn looks_like_xml(content: &[u8]) -> bool {
    let head: Vec<u8> = content
        .iter()
        .skip_while(|b| b.is_ascii_whitespace())
        .take(200)
        .map(|b| b.to_ascii_lowercase())
        .collect();
    head.starts_with(b"<?xml")
        || head.windows(7).any(|w| w == b"<urlset")
        || head.windows(13).any(|w| w == b"<sitemapindex")
}

fn decompress_if_gzip(content: &[u8]) -> Result<Vec<u8>, SitemapError> {
    if content.starts_with(&[0x1f, 0x8b]) {
        let mut decoder = GzDecoder::new(content);
        let mut out = Vec::new();
        decoder
            .by_ref()
            .take(MAX_SITEMAP_SIZE as u64 + 1)
            .read_to_end(&mut out)
            .map_err(|e| SitemapError::GzipDecode(e.to_string()))?;
        if out.len() > MAX_SITEMAP_SIZE {
            return Err(SitemapError::SizeOutOfBounds(out.len()));
        }
        Ok(out)
    } else {
        Ok(content.to_vec())
    }
}

/// 解析站点地图内容，最多提取`limit`个URL条目
///
/// 透明处理gzip压缩；嵌套的sitemapindex条目单独返回，
/// 由调用方决定是否继续下钻
pub fn parse_sitemap(content: &[u8], limit: usize) -> Result<SitemapContents, SitemapError> {
    if content.is_empty() || content.len() > MAX_SITEMAP_SIZE {
        return Err(SitemapError::SizeOutOfBounds(content.len()));
    }

    let xml = decompress_if_gzip(content)?;
    if !looks_like_xml(&xml) {
        return Err(SitemapError::NotXml);
    }

    let mut contents = SitemapContents::default();
    for entity in SiteMapReader::new(Cursor::new(xml)) {
        match entity {
            SiteMapEntity::Url(entry) => {
                if contents.urls.len() >= limit {
                    break;
                }
                if let Some(loc) = entry.loc.get_url() {
                    contents.urls.push(loc.to_string());
                }
            }
            SiteMapEntity::SiteMap(entry) => {
                if let Some(loc) = entry.loc.get_url() {
                    contents.nested.push(loc.to_string());
                }
            }
            SiteMapEntity::Err(_) => {
                // Recoverable reader errors: keep whatever parsed so far
            }
        }
    }

    Ok(contents)
}

/// 从robots.txt文本提取`Sitemap:`指令指向的地址
pub fn sitemaps_from_robots(robots: &str) -> Vec<String> {
    robots
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            let lower = line.to_lowercase();
            lower
                .starts_with("sitemap:")
                .then(|| line[8..].trim().to_string())
        })
        .filter(|u| !u.is_empty())
        .collect()
}
