//! Console reporting for the `keel` binary.
//! `keel` 可执行文件的控制台报告。
//!
//! Colors are plain ANSI escapes, disabled when `NO_COLOR` is set so
//! scripted callers get clean text.
//! 颜色为普通 ANSI 转义序列;设置 `NO_COLOR` 时禁用,脚本调用方得到纯文本。

use std::env;

const GREEN: &str = "32";
const YELLOW: &str = "33";
const RED: &str = "31";
const BLUE: &str = "34";

fn colored(code: &str, text: &str) -> String {
    if env::var_os("NO_COLOR").is_some() {
        return text.to_string();
    }
    format!("\x1b[{code}m{text}\x1b[0m")
}

/// Restore milestones and other good news.
/// 恢复完成等正面消息。
pub fn success(msg: &str) {
    println!("{}", colored(GREEN, msg));
}

/// Non-fatal problems: unresolved dependencies, ignored sources.
/// 非致命问题:未解析的依赖、被忽略的源。
pub fn warning(msg: &str) {
    eprintln!("{} {msg}", colored(YELLOW, "warning:"));
}

/// Hard failures, always on stderr.
/// 硬性失败,始终输出到 stderr。
pub fn error(msg: &str) {
    eprintln!("{} {msg}", colored(RED, "error:"));
}

/// Progress detail shown outside quiet mode.
/// 非安静模式下显示的进度详情。
pub fn info(msg: &str) {
    println!("{} {msg}", colored(BLUE, "info:"));
}
