//! Output file naming.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

/// Timestamp format appended to the input's stem.
const STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// `<stem>_<YYYYmmdd_HHMMSS><.ext>` for `input`, keeping its extension.
pub fn output_file_name(input: &Path, now: DateTime<Local>) -> String {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let stamp = now.format(STAMP_FORMAT);

    match input.extension() {
        Some(ext) => format!("{}_{}.{}", stem, stamp, ext.to_string_lossy()),
        None => format!("{}_{}", stem, stamp),
    }
}

/// Full output path for `input` inside `output_dir`.
pub fn output_path(input: &Path, output_dir: &Path, now: DateTime<Local>) -> PathBuf {
    output_dir.join(output_file_name(input, now))
}
