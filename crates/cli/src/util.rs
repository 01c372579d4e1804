use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Display width of a string, accounting for CJK double-width, emoji, etc.
pub(crate) fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Truncate to at most `width` display columns, ending in ".." when cut.
pub(crate) fn truncate_display(s: &str, width: usize) -> String {
    if display_width(s) <= width {
        return s.to_string();
    }
    if width < 3 {
        return s
            .chars()
            .next()
            .filter(|ch| ch.width().unwrap_or(0) <= width)
            .map(|ch| ch.to_string())
            .unwrap_or_default();
    }

    let budget = width - 2;
    let mut used = 0;
    let mut out = String::new();
    for ch in s.chars() {
        let cw = ch.width().unwrap_or(0);
        if used + cw > budget {
            break;
        }
        used += cw;
        out.push(ch);
    }
    out.push_str("..");
    out
}

/// Pad or truncate to exactly `width` display columns.
pub(crate) fn pad_right(s: &str, width: usize) -> String {
    let truncated = truncate_display(s, width);
    let w = display_width(&truncated);
    format!("{truncated}{}", " ".repeat(width.saturating_sub(w)))
}

/// `0.8125` → `"81.2%"`.
pub(crate) fn percent(rate: f64) -> String {
    format!("{:.1}%", rate * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_width_cjk() {
        assert_eq!(display_width("西湖"), 4);
        assert_eq!(display_width("abc"), 3);
    }

    #[test]
    fn truncate_cuts_on_char_boundary() {
        assert_eq!(truncate_display("abcdef", 5), "abc..");
        // 4 columns of budget fit exactly two ideographs
        let t = truncate_display("灵隐寺景区", 6);
        assert_eq!(t, "灵隐..");
        assert!(display_width(&t) <= 6);
    }

    #[test]
    fn truncate_narrow() {
        assert_eq!(truncate_display("abc", 2), "a");
        assert_eq!(truncate_display("西湖", 1), "");
        assert_eq!(truncate_display("", 0), "");
    }

    #[test]
    fn pad_right_pads_by_display_width() {
        assert_eq!(pad_right("ab", 5), "ab   ");
        assert_eq!(pad_right("西湖", 6), "西湖  ");
        assert_eq!(pad_right("abcdef", 5), "abc..");
    }

    #[test]
    fn percent_formatting() {
        assert_eq!(percent(1.0), "100.0%");
        assert_eq!(percent(0.0), "0.0%");
        assert_eq!(percent(0.8125), "81.2%");
    }
}
