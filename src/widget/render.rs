use regex::Regex;
use std::sync::OnceLock;

use super::TranscriptEntry;
use crate::models::chat::Role;

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const ITALIC: &str = "\x1b[3m";
const UNDERLINE: &str = "\x1b[4m";
const CYAN: &str = "\x1b[36m";
const DIM: &str = "\x1b[2m";

fn re_header() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(#{1,6})\s+(.*)$").expect("header pattern compiles"))
}

fn re_unordered_list() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\s*)[-*+]\s+(.*)$").expect("unordered list pattern compiles"))
}

fn re_ordered_list() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\s*)(\d+[.)])\s+(.*)$").expect("ordered list pattern compiles"))
}

fn re_code() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"`([^`]+)`").expect("code pattern compiles"))
}

fn re_bold() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\*\*([^*]+)\*\*|__([^_]+)__").expect("bold pattern compiles"))
}

fn re_italic() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\*([^*\s][^*]*)\*|\b_([^_]+)_\b").expect("italic pattern compiles"))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderOptions {
    pub color: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self { color: true }
    }
}

fn styled(options: RenderOptions, style: &str, text: &str) -> String {
    if options.color { format!("{}{}{}", style, text, RESET) } else { text.to_string() }
}

fn replace_span(re: &Regex, line: &str, options: RenderOptions, style: &str) -> String {
    re.replace_all(line, |caps: &regex::Captures| {
        let inner = caps
            .iter()
            .skip(1)
            .flatten()
            .next()
            .map(|m| m.as_str())
            .unwrap_or("");
        styled(options, style, inner)
    }).into_owned()
}

pub fn render_inline(line: &str, options: RenderOptions) -> String {
    let line = replace_span(re_code(), line, options, CYAN);
    let line = replace_span(re_bold(), &line, options, BOLD);
    replace_span(re_italic(), &line, options, ITALIC)
}

pub fn render_markdown_line(line: &str, options: RenderOptions) -> String {
    if let Some(caps) = re_header().captures(line) {
        let content = render_inline(&caps[2], options);
        let style = if caps[1].len() <= 2 { format!("{}{}", BOLD, UNDERLINE) } else { BOLD.to_string() };
        return styled(options, &style, &content);
    }
    if let Some(caps) = re_unordered_list().captures(line) {
        return format!("{}  • {}", &caps[1], render_inline(&caps[2], options));
    }
    if let Some(caps) = re_ordered_list().captures(line) {
        return format!("{}  {} {}", &caps[1], &caps[2], render_inline(&caps[3], options));
    }
    render_inline(line, options)
}

pub fn render_markdown(text: &str, options: RenderOptions) -> String {
    text.lines()
        .map(|line| render_markdown_line(line, options))
        .collect::<Vec<_>>()
        .join("\n")
}

/// One transcript entry prefixed with its local `[HH:MM]` time. Only
/// assistant text goes through the markdown renderer.
pub fn render_entry(entry: &TranscriptEntry, options: RenderOptions) -> String {
    let stamp = styled(options, DIM, &entry.timestamp.format("[%H:%M]").to_string());
    match entry.role {
        Role::User => format!("{} {} {}", stamp, styled(options, BOLD, "you>"), entry.text),
        Role::Assistant => {
            format!(
                "{} {}\n{}",
                stamp,
                styled(options, BOLD, "assistant>"),
                render_markdown(&entry.text, options)
            )
        }
    }
}

pub fn render_loading(options: RenderOptions) -> String {
    styled(options, DIM, super::LOADING_INDICATOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{ Local, TimeZone };

    const PLAIN: RenderOptions = RenderOptions { color: false };
    const COLOR: RenderOptions = RenderOptions { color: true };

    #[test]
    fn plain_mode_strips_emphasis_markers() {
        assert_eq!(render_inline("a **bold** and *soft* `code`", PLAIN), "a bold and soft code");
        assert_eq!(render_inline("__strong__ _em_", PLAIN), "strong em");
    }

    #[test]
    fn color_mode_wraps_spans() {
        assert_eq!(render_inline("**LTV**", COLOR), format!("{}LTV{}", BOLD, RESET));
        assert_eq!(render_inline("*maybe*", COLOR), format!("{}maybe{}", ITALIC, RESET));
        assert_eq!(render_inline("`fico`", COLOR), format!("{}fico{}", CYAN, RESET));
    }

    #[test]
    fn snake_case_is_not_italicised() {
        assert_eq!(render_inline("loan_to_value ratio", PLAIN), "loan_to_value ratio");
    }

    #[test]
    fn headings_and_lists() {
        let text = "## Checklist\n- Pay stubs\n  * W-2 **forms**\n1. Submit\n2) Wait";
        assert_eq!(
            render_markdown(text, PLAIN),
            "Checklist\n  • Pay stubs\n    • W-2 forms\n  1. Submit\n  2) Wait"
        );
    }

    #[test]
    fn heading_is_styled_in_color_mode() {
        let out = render_markdown_line("# Rates", COLOR);
        assert!(out.starts_with(BOLD));
        assert!(out.contains("Rates"));
        assert!(out.ends_with(RESET));
    }

    fn entry(role: Role, text: &str) -> TranscriptEntry {
        let timestamp = Local.with_ymd_and_hms(2024, 3, 5, 14, 2, 37).unwrap();
        TranscriptEntry { role, text: text.into(), timestamp }
    }

    #[test]
    fn user_entries_are_verbatim() {
        let entry = entry(Role::User, "**not** markdown");
        assert_eq!(render_entry(&entry, PLAIN), "[14:02] you> **not** markdown");
    }

    #[test]
    fn assistant_entries_are_rendered() {
        let entry = entry(Role::Assistant, "- **one**");
        assert_eq!(render_entry(&entry, PLAIN), "[14:02] assistant>\n  • one");
    }

    #[test]
    fn timestamp_is_dimmed_in_color_mode() {
        let out = render_entry(&entry(Role::Assistant, "hi"), COLOR);
        assert!(out.starts_with(&format!("{}[14:02]{}", DIM, RESET)));
    }

    #[test]
    fn loading_indicator() {
        assert_eq!(render_loading(PLAIN), "Thinking...");
    }
}
