//! Pipeline progress logs.
//!
//! Entries go to stderr so stdout stays free for JSON output. Nested steps
//! are indented under the step that started them.

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl LogLevel {
    fn prefix(self) -> &'static str {
        match self {
            LogLevel::Info => "   ",
            LogLevel::Success => "   ✓",
            LogLevel::Warning => "   ⚠️",
            LogLevel::Error => "   ❌",
        }
    }
}

/// One printed line: indentation, level prefix, message.
pub fn format_entry(level: LogLevel, message: &str, indent: u8) -> String {
    format!("{}{} {}", "   ".repeat(indent as usize), level.prefix(), message)
}

pub fn log(level: LogLevel, message: impl Into<String>, indent: u8) {
    eprintln!("{}", format_entry(level, &message.into(), indent));
}

/// Convenient logging functions
pub fn log_info(msg: impl Into<String>) {
    log(LogLevel::Info, msg, 0);
}

pub fn log_success(msg: impl Into<String>) {
    log(LogLevel::Success, msg, 0);
}

pub fn log_warning(msg: impl Into<String>) {
    log(LogLevel::Warning, msg, 0);
}

pub fn log_error(msg: impl Into<String>) {
    log(LogLevel::Error, msg, 0);
}

pub fn log_info_indent(msg: impl Into<String>, indent: u8) {
    log(LogLevel::Info, msg, indent);
}

pub fn log_success_indent(msg: impl Into<String>, indent: u8) {
    log(LogLevel::Success, msg, indent);
}
