#![forbid(unsafe_code)]

//! DOM classification rules, kept free of `web-sys` types.

/// Whether a focused element accepts text entry.
///
/// `tag_name` is the DOM `tagName` (upper-case in HTML documents). The body
/// is never text-like, even in a `contenteditable` document.
#[must_use]
pub fn is_text_entry(tag_name: &str, content_editable: bool, is_body: bool) -> bool {
    if is_body {
        return false;
    }
    tag_name.eq_ignore_ascii_case("input")
        || tag_name.eq_ignore_ascii_case("textarea")
        || content_editable
}

/// Best-effort iOS detection.
///
/// Device names match in any case. iPadOS 13+ reports a desktop Mac user
/// agent; the touch point count gives it away.
#[must_use]
pub fn is_probably_ios(user_agent: &str, platform: &str, max_touch_points: i32) -> bool {
    let user_agent = user_agent.to_ascii_lowercase();
    ["ipad", "iphone", "ipod"]
        .iter()
        .any(|device| user_agent.contains(device))
        || (platform == "MacIntel" && max_touch_points > 1)
}

/// Media query matching devices without a fine pointer or hover.
pub const TOUCH_PRIMARY_QUERY: &str = "(hover: none) and (pointer: coarse)";
