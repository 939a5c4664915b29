//! # 美化输出工具
//!
//! 提供统一的终端输出样式：`[OK]`、`[*]`、`[WARN]`、`[ERR]`、`[SKIP]`、`[DONE]` 前缀。
//! 错误写到 stderr，其余写到 stdout。
//!
//! ## 依赖关系
//! - 被 `commands/` 模块和 `main.rs` 使用
//! - 使用 `colored` crate

use colored::{ColoredString, Colorize};

/// 标题栏和分隔线宽度
const RULE_WIDTH: usize = 60;

fn tagged(tag: ColoredString, msg: &str) -> String {
    format!("{} {}", tag, msg)
}

fn rule() -> ColoredString {
    "─".repeat(RULE_WIDTH).dimmed()
}

/// 打印成功消息
pub fn print_success(msg: &str) {
    println!("{}", tagged("[OK]".green().bold(), msg));
}

/// 打印错误消息
pub fn print_error(msg: &str) {
    eprintln!("{}", tagged("[ERR]".red().bold(), msg));
}

/// 打印警告消息
pub fn print_warning(msg: &str) {
    println!("{}", tagged("[WARN]".yellow().bold(), msg));
}

/// 打印信息消息
pub fn print_info(msg: &str) {
    println!("{}", tagged("[*]".blue().bold(), msg));
}

/// 打印跳过消息（退化的 bin）
pub fn print_skip(msg: &str) {
    println!("{}", tagged("[SKIP]".dimmed(), msg));
}

/// 打印完成消息
pub fn print_done(msg: &str) {
    println!("{}", tagged("[DONE]".green().bold(), msg));
}

/// 打印单个 bin 的失败原因
pub fn print_failure(name: &str, reason: &str) {
    eprintln!("{}", tagged("[ERR]".red().bold(), &format!("  {}: {}", name.bold(), reason)));
}

/// 打印标题栏
pub fn print_header(title: &str) {
    println!("\n{}", rule());
    println!("  {}", title.bold());
    println!("{}\n", rule());
}

/// 打印分隔线
pub fn print_separator() {
    println!("{}", rule());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tagged_plain() {
        colored::control::set_override(false);
        assert_eq!(tagged("[OK]".green(), "saved"), "[OK] saved");
        assert_eq!(rule().to_string().chars().count(), RULE_WIDTH);
    }
}
