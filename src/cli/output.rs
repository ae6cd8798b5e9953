//! CLI output formatting utilities.

use crate::cache::CacheSummary;
use crate::rag::ContextChunk;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a retrieval step.
    pub fn step(msg: &str) {
        println!("  {} {}", style("~").dim(), style(msg).dim());
    }

    /// Print a cached index.
    pub fn cache_entry(summary: &CacheSummary) {
        println!(
            "  {} {} ({} chunks, {}, {})",
            style("*").cyan(),
            style(&summary.source_id).bold(),
            summary.chunk_count,
            format_size(summary.size_bytes),
            style(summary.created_at.format("%Y-%m-%d %H:%M")).dim()
        );
    }

    /// Print a retrieved passage.
    pub fn source_result(chunk: &ContextChunk, max_len: usize) {
        println!(
            "\n{} {} #{} (score: {:.2})",
            style(">>").green(),
            style(&chunk.source).bold(),
            chunk.order,
            chunk.score
        );
        println!("   {}", content_preview(&chunk.content, max_len));
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(spinner_style);
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// Format a byte count for humans.
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Truncate content with ellipsis.
fn content_preview(content: &str, max_chars: usize) -> String {
    let content = content.replace('\n', " ");
    match content.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &content[..cut]),
        None => content,
    }
}
