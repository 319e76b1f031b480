use anyhow::Result;
use std::fs;
use std::path::Path;

use crate::config::ChangeClassConfig;
use crate::dataset::{file_name_of, list_files_with_extensions, require_dir, LABEL_EXTENSION};
use crate::report::{log_outcome, BatchStats, ItemOutcome};

/// Replace the class token of every label line with `target`.
///
/// Only lines whose first token is all ASCII digits are touched. Tokens are
/// re-joined with single spaces and blank lines stay blank. Returns the new
/// text and the number of lines whose class changed.
pub fn rewrite_class_ids(text: &str, target: u32) -> (String, usize) {
    let target_str = target.to_string();
    let mut changed = 0;
    let mut out = String::with_capacity(text.len());

    for line in text.lines() {
        let mut tokens: Vec<&str> = line.split_whitespace().collect();
        if let Some(first) = tokens.first() {
            let is_class = !first.is_empty() && first.bytes().all(|b| b.is_ascii_digit());
            if is_class && first.parse::<u64>().ok() != Some(target as u64) {
                tokens[0] = &target_str;
                changed += 1;
            }
        }
        out.push_str(&tokens.join(" "));
        out.push('\n');
    }

    (out, changed)
}

/// Rewrite the class id of every `*.txt` label in `config.dir`, in place
pub fn change_class_ids(config: &ChangeClassConfig) -> Result<BatchStats> {
    require_dir(&config.dir)?;
    let mut stats = BatchStats::new();

    for path in list_files_with_extensions(&config.dir, &[LABEL_EXTENSION])? {
        let outcome = rewrite_file(&path, config.target_class);
        log_outcome(&file_name_of(&path), &outcome);
        stats.record(&outcome);
    }

    Ok(stats)
}

fn rewrite_file(path: &Path, target: u32) -> ItemOutcome {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => return ItemOutcome::Failed(format!("cannot read: {}", e)),
    };
    let (rewritten, changed) = rewrite_class_ids(&text, target);
    log::debug!("{:?}: {} lines relabeled", path, changed);

    match fs::write(path, rewritten) {
        Ok(()) => ItemOutcome::Processed,
        Err(e) => ItemOutcome::Failed(format!("cannot write: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rewrite_class_ids() {
        let text = "3 0.5 0.5 0.1 0.1\n0  0.2 0.2 0.1 0.1\n\nx 1 2 3 4\n";
        let (out, changed) = rewrite_class_ids(text, 0);
        assert_eq!(out, "0 0.5 0.5 0.1 0.1\n0 0.2 0.2 0.1 0.1\n\nx 1 2 3 4\n");
        assert_eq!(changed, 1);
    }

    #[test]
    fn test_rewrite_empty_text() {
        assert_eq!(rewrite_class_ids("", 5), (String::new(), 0));
    }

    #[test]
    fn test_float_class_is_left_alone() {
        let (out, changed) = rewrite_class_ids("1.0 0.5 0.5 0.1 0.1", 0);
        assert_eq!(out, "1.0 0.5 0.5 0.1 0.1\n");
        assert_eq!(changed, 0);
    }
}
