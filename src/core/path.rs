//! 远程路径规范化
//!
//! 远程绝对路径与相对于根路径的逻辑路径之间的转换，全部为纯函数。

const SEPARATORS: [char; 2] = ['/', '\\'];

/// 去掉开头的一个路径分隔符
pub fn strip_start_slash(path: &str) -> &str {
    path.strip_prefix(SEPARATORS).unwrap_or(path)
}

/// 去掉根路径前缀和随后的一个分隔符
///
/// 前缀不匹配（或只匹配到半个路径段）时原样返回。
pub fn strip_root(full_path: &str, root_path: &str) -> String {
    let root = root_path.trim_end_matches(SEPARATORS);
    match full_path.strip_prefix(root) {
        Some(rest) if rest.is_empty() || rest.starts_with(SEPARATORS) => {
            strip_start_slash(rest).to_string()
        }
        _ => full_path.to_string(),
    }
}

/// 统一使用 `/` 作为分隔符
pub fn ensure_web_path(path: &str) -> String {
    path.replace('\\', "/")
}

/// 对外展示的路径，web-friendly 模式下把反斜杠换成正斜杠
pub fn to_display_path(path: &str, web_friendly: bool) -> String {
    if web_friendly {
        ensure_web_path(path)
    } else {
        path.to_string()
    }
}

/// 拼接根路径与相对路径，`strip_root` 的逆操作
pub fn combine(root_path: &str, relative: &str) -> String {
    let root = root_path.trim_end_matches(SEPARATORS);
    let relative = relative.trim_start_matches(SEPARATORS);

    match (root.is_empty(), relative.is_empty()) {
        (true, true) => "/".to_string(),
        (false, true) => root.to_string(),
        _ => format!("{}/{}", root, relative),
    }
}

/// 父目录，根目录下的文件返回 `/`，没有分隔符时返回空串
pub fn parent_dir(path: &str) -> &str {
    let trimmed = path.trim_end_matches(SEPARATORS);
    match trimmed.rfind(SEPARATORS) {
        Some(0) => &trimmed[..1],
        Some(idx) => &trimmed[..idx],
        None => "",
    }
}

/// 最后一段名称
pub fn file_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches(SEPARATORS);
    match trimmed.rfind(SEPARATORS) {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    }
}

/// 按 `/` 切分出非空的路径段
pub fn segments(path: &str) -> Vec<&str> {
    path.split(SEPARATORS).filter(|s| !s.is_empty()).collect()
}

/// 同 `segments`，但拒绝 `.` 和 `..`，用于把远程路径映射到本地目录
pub fn checked_segments(path: &str) -> Option<Vec<&str>> {
    let parts = segments(path);
    if parts.iter().any(|s| *s == "." || *s == "..") {
        return None;
    }
    Some(parts)
}

/// 由前 `count` 个路径段组成的绝对路径
pub fn prefix_path(segments: &[&str], count: usize) -> String {
    format!("/{}", segments[..count].join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_root() {
        assert_eq!(strip_root("/data/x.csv", "/data"), "x.csv");
        assert_eq!(strip_root("/data/x.csv", "/data/"), "x.csv");
        assert_eq!(strip_root("/data/sub/x.csv", "/data"), "sub/x.csv");
        assert_eq!(strip_root("/x.csv", "/"), "x.csv");
        assert_eq!(strip_root("/x.csv", ""), "x.csv");
        assert_eq!(strip_root("\\data\\x.csv", "\\data"), "x.csv");
    }

    #[test]
    fn test_strip_root_of_root_is_empty() {
        assert_eq!(strip_root("/data", "/data"), "");
        assert_eq!(strip_root("/data/", "/data"), "");
    }

    #[test]
    fn test_strip_root_non_matching_prefix_is_noop() {
        assert_eq!(strip_root("/other/x.csv", "/data"), "/other/x.csv");
        assert_eq!(strip_root("/database/x.csv", "/data"), "/database/x.csv");
    }

    #[test]
    fn test_combine_round_trip() {
        for root in ["/data", "/data/", "/", "", "/a/b"] {
            for relative in ["x.csv", "sub/x.csv", "sub/deep/y.txt"] {
                let full = combine(root, relative);
                assert_eq!(combine(root, &strip_root(&full, root)), full);
            }
        }
        assert_eq!(combine("/data", ""), "/data");
        assert_eq!(combine("", ""), "/");
        assert_eq!(combine("/", "/x.csv"), "/x.csv");
    }

    #[test]
    fn test_display_path() {
        assert_eq!(to_display_path("sub\\x.csv", true), "sub/x.csv");
        assert_eq!(to_display_path("sub\\x.csv", false), "sub\\x.csv");
    }

    #[test]
    fn test_parent_and_name() {
        assert_eq!(parent_dir("/data/sub/x.csv"), "/data/sub");
        assert_eq!(parent_dir("/x.csv"), "/");
        assert_eq!(parent_dir("x.csv"), "");
        assert_eq!(file_name("/data/sub/x.csv"), "x.csv");
        assert_eq!(file_name("/data/sub/"), "sub");
        assert_eq!(file_name("x.csv"), "x.csv");
    }

    #[test]
    fn test_segments_and_prefix() {
        let parts = segments("/a/b//c/");
        assert_eq!(parts, vec!["a", "b", "c"]);
        assert_eq!(prefix_path(&parts, 2), "/a/b");
        assert_eq!(prefix_path(&parts, 0), "/");
    }

    #[test]
    fn test_checked_segments_rejects_relative_parts() {
        assert_eq!(checked_segments("/a/b.csv"), Some(vec!["a", "b.csv"]));
        assert_eq!(checked_segments("/"), Some(vec![]));
        assert_eq!(checked_segments("/../victim.txt"), None);
        assert_eq!(checked_segments("a\\..\\b"), None);
        assert_eq!(checked_segments("/a/./b"), None);
        assert_eq!(checked_segments("/a/..b/c"), Some(vec!["a", "..b", "c"]));
    }
}
