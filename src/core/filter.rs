//! 文件过滤
//!
//! 通配符规则与 Windows 文件过滤一致：`*` 任意字符（包括 `/`）、`?` 单个字符、
//! `#` 单个数字、`[abc]` / `[!abc]` 字符集合，多个模式用 `;` 分隔。
//! 比较按字节进行，不做大小写折叠。

use crate::error::{Result, SyncError};
use crate::model::schema::parse_utc;
use chrono::{DateTime, Utc};
use regex::Regex;

/// 编译后的通配符过滤器
#[derive(Debug, Clone, Default)]
pub struct FileFilter {
    source: String,
    patterns: Vec<Regex>,
}

impl FileFilter {
    /// 编译 `;` 分隔的模式，空模式表示匹配全部
    pub fn new(pattern: &str) -> Result<Self> {
        let patterns = pattern
            .split(';')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(like_to_regex)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            source: pattern.to_string(),
            patterns,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// 针对根相对路径（而不只是文件名）求值
    pub fn matches(&self, relative_path: &str) -> bool {
        self.patterns.is_empty() || self.patterns.iter().any(|re| re.is_match(relative_path))
    }
}

/// 未设置阈值，或修改时间不早于阈值
pub fn within_window(modified_utc: DateTime<Utc>, threshold_utc: Option<DateTime<Utc>>) -> bool {
    threshold_utc.map_or(true, |threshold| modified_utc >= threshold)
}

/// 解析 "modified since" 阈值，空串表示不限制；没有时区的时间一律按 UTC 处理
pub fn parse_threshold(value: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    let value = match value.map(str::trim) {
        Some(v) if !v.is_empty() => v,
        _ => return Ok(None),
    };

    if let Some(dt) = parse_utc(value) {
        return Ok(Some(dt));
    }

    Err(SyncError::Config(format!(
        "无法解析修改时间阈值 '{}'，格式应为 yyyy-MM-dd HH:mm:ss",
        value
    )))
}

/// 把单个通配符模式转换为锚定的正则
fn like_to_regex(pattern: &str) -> Result<Regex> {
    let mut re = String::from("(?s)^");
    let mut chars = pattern.chars();
    let mut buf = [0u8; 4];

    while let Some(c) = chars.next() {
        match c {
            '*' => re.push_str(".*"),
            '?' => re.push('.'),
            '#' => re.push_str("[0-9]"),
            '[' => {
                let mut class = String::new();
                let mut closed = false;
                let mut first = true;
                for c in chars.by_ref() {
                    if c == ']' {
                        closed = true;
                        break;
                    }
                    if first && c == '!' {
                        class.push('^');
                    } else if c == '-' {
                        class.push('-');
                    } else {
                        class.push_str(&regex::escape(c.encode_utf8(&mut buf)));
                    }
                    first = false;
                }
                if !closed {
                    return Err(SyncError::Config(format!(
                        "过滤模式 '{}' 中的 '[' 没有闭合",
                        pattern
                    )));
                }
                match class.as_str() {
                    // "[]" 匹配空串
                    "" => {}
                    "^" => re.push('!'),
                    _ => {
                        re.push('[');
                        re.push_str(&class);
                        re.push(']');
                    }
                }
            }
            other => re.push_str(&regex::escape(other.encode_utf8(&mut buf))),
        }
    }
    re.push('$');

    Regex::new(&re)
        .map_err(|e| SyncError::Config(format!("无效的过滤模式 '{}': {}", pattern, e)))
}
