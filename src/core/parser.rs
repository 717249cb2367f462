//! Cisco port-manager syslog 辨識。
//!
//! 只處理兩種訊息：
//! `%PM-4-ERR_DISABLE: <reason> error detected on <interface>` 以及
//! `%PM-4-ERR_RECOVER: Attempting to recover from <reason> err-disable state on <interface>`。

use crate::domain::model::{EventKind, ExtractedEvent};
use crate::utils::error::Result;
use regex::Regex;

// `\x1C`-`\x1F` 也算空白
const ERR_DISABLE_PATTERN: &str =
    r"(?i)%PM-4-ERR_DISABLE:[\s\x1C-\x1F]*(\w+)[\s\x1C-\x1F]*error detected on[\s\x1C-\x1F]*([^\s\x1C-\x1F]+)";
const ERR_RECOVER_PATTERN: &str = r"(?i)%PM-4-ERR_RECOVER:[\s\x1C-\x1F]*Attempting to recover from[\s\x1C-\x1F]*(\w+)[\s\x1C-\x1F]*err-disable state on[\s\x1C-\x1F]*([^\s\x1C-\x1F]+)";
const DEVICE_PATTERN: &str = r"(?i)(\w+[-\w]*)[\s\x1C-\x1F]*%PM-4";

pub const UNKNOWN_DEVICE: &str = "unknown";

/// Unicode 空白加上 `\x1C`-`\x1F` 分隔字元
pub fn is_space(c: char) -> bool {
    c.is_whitespace() || ('\u{1c}'..='\u{1f}').contains(&c)
}

pub fn strip(text: &str) -> &str {
    text.trim_matches(is_space)
}

/// 小寫化並去除前後空白；空字串直接回傳空字串
pub fn preprocess_text(raw_log: &str) -> String {
    if raw_log.is_empty() {
        return String::new();
    }
    strip(&raw_log.to_lowercase()).to_string()
}

fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r'
            | '\u{0b}'
            | '\u{0c}'
            | '\u{1c}'
            | '\u{1d}'
            | '\u{1e}'
            | '\u{85}'
            | '\u{2028}'
            | '\u{2029}'
    )
}

/// 依所有 Unicode 換行字元切行，`\r\n` 視為一個分隔；結尾的換行不產生空行
pub fn split_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((idx, ch)) = chars.next() {
        if !is_line_break(ch) {
            continue;
        }
        lines.push(&text[start..idx]);
        let mut end = idx + ch.len_utf8();
        if ch == '\r' {
            if let Some(&(_, '\n')) = chars.peek() {
                chars.next();
                end += 1;
            }
        }
        start = end;
    }

    if start < text.len() {
        lines.push(&text[start..]);
    }
    lines
}

#[derive(Debug, Clone)]
pub struct LogParser {
    err_disable: Regex,
    err_recover: Regex,
    device: Regex,
}

impl LogParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            err_disable: Regex::new(ERR_DISABLE_PATTERN)?,
            err_recover: Regex::new(ERR_RECOVER_PATTERN)?,
            device: Regex::new(DEVICE_PATTERN)?,
        })
    }

    /// 在原始（未小寫化）的 log 中找出裝置名稱
    pub fn extract_device_name(&self, raw_log: &str) -> String {
        if raw_log.is_empty() {
            return UNKNOWN_DEVICE.to_string();
        }

        self.device
            .captures(raw_log)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| UNKNOWN_DEVICE.to_string())
    }

    /// ERR_DISABLE 優先於 ERR_RECOVER
    pub fn extract_fields(&self, preprocessed: &str, raw_log: &str) -> Option<ExtractedEvent> {
        if preprocessed.is_empty() {
            return None;
        }

        let (event_kind, caps) = if let Some(caps) = self.err_disable.captures(preprocessed) {
            (EventKind::ErrDisable, caps)
        } else if let Some(caps) = self.err_recover.captures(preprocessed) {
            (EventKind::ErrRecover, caps)
        } else {
            return None;
        };

        Some(ExtractedEvent {
            event_kind,
            device_name: self.extract_device_name(raw_log),
            reason: caps[1].to_string(),
            interface: caps[2].to_string(),
        })
    }

    pub fn parse_line(&self, raw_log: &str) -> Option<ExtractedEvent> {
        let cleaned = preprocess_text(raw_log);
        self.extract_fields(&cleaned, raw_log)
    }
}
