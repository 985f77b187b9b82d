// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use url::Url;

/// 规范化域名：小写并去掉`www.`前缀
///
/// 输入可以是完整URL或裸域名
pub fn normalise_domain(input: &str) -> String {
    let host = if input.starts_with("http://") || input.starts_with("https://") {
        Url::parse(input)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_string()))
            .unwrap_or_else(|| input.to_string())
    } else {
        input.split('/').next().unwrap_or(input).to_string()
    };

    let host = host.to_lowercase();
    host.strip_prefix("www.").unwrap_or(&host).to_string()
}

/// 规范化URL用于去重：小写主机、去`www.`、去末尾斜杠、丢弃查询和片段
pub fn canonicalise(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(url) => {
            let host = url
                .host_str()
                .map(|h| {
                    let h = h.to_lowercase();
                    h.strip_prefix("www.").unwrap_or(&h).to_string()
                })
                .unwrap_or_default();
            let path = url.path().trim_end_matches('/');
            let path = if path.is_empty() { "/" } else { path };
            format!("{}://{}{}", url.scheme(), host, path)
        }
        Err(_) => raw.trim_end_matches('/').to_lowercase(),
    }
}

/// 校验URL是否可抓取
///
/// 仅允许http/https，主机非空，且不超过长度上限
pub fn validate_url(raw: &str, max_len: usize) -> bool {
    if raw.is_empty() || raw.len() > max_len {
        return false;
    }
    match Url::parse(raw) {
        Ok(url) => {
            (url.scheme() == "http" || url.scheme() == "https") && url.host_str().is_some()
        }
        Err(_) => false,
    }
}

/// 将可能为相对路径的地址拼接到域名上
pub fn join_domain(domain: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    format!("https://{}/{}", domain, path.trim_start_matches('/'))
}

/// URL路径深度（非空路径段数量）
pub fn path_depth(raw: &str) -> usize {
    match Url::parse(raw) {
        Ok(url) => url
            .path_segments()
            .map(|segments| segments.filter(|s| !s.is_empty()).count())
            .unwrap_or(0),
        Err(_) => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalise_domain_strips_www_and_scheme() {
        assert_eq!(normalise_domain("https://www.Acme.Example/about"), "acme.example");
        assert_eq!(normalise_domain("WWW.ACME.EXAMPLE"), "acme.example");
        assert_eq!(normalise_domain("acme.example"), "acme.example");
    }

    #[test]
    fn test_canonicalise_ignores_trailing_slash_and_query() {
        assert_eq!(
            canonicalise("https://www.acme.example/contact/?utm=1#top"),
            "https://acme.example/contact"
        );
        assert_eq!(canonicalise("https://acme.example"), "https://acme.example/");
    }

    #[test]
    fn test_validate_url_rejects_bad_schemes_and_length() {
        assert!(validate_url("https://acme.example/contact", 2000));
        assert!(!validate_url("javascript:alert(1)", 2000));
        assert!(!validate_url("ftp://acme.example", 2000));
        assert!(!validate_url("https://acme.example", 10));
        assert!(!validate_url("", 2000));
    }

    #[test]
    fn test_join_domain() {
        assert_eq!(join_domain("acme.example", "contact"), "https://acme.example/contact");
        assert_eq!(join_domain("acme.example", "/contact"), "https://acme.example/contact");
        assert_eq!(
            join_domain("acme.example", "https://other.example/x"),
            "https://other.example/x"
        );
    }

    #[test]
    fn test_path_depth() {
        assert_eq!(path_depth("https://acme.example/"), 0);
        assert_eq!(path_depth("https://acme.example/a/b"), 2);
    }
}
