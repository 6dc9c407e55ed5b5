// CSV export of the report table.

use anyhow::Context;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::models::BucketRecord;

pub const FILE_EXTENSION: &str = "csv";

/// Column order of the report file (matches `BucketRecord` field order).
pub const COLUMNS: [&str; 13] = [
    "bucket_name",
    "region",
    "project_id",
    "request_total",
    "request_percent_change",
    "sent_total",
    "sent_percent_change",
    "received_total",
    "received_percent_change",
    "total_GB_latest",
    "total_bytes_percent_change",
    "total_objects_total",
    "total_objects_percent_change",
];

/// `<dir>/<prefix><project_id>.csv`
pub fn report_path(output_dir: &Path, prefix: &str, project_id: &str) -> PathBuf {
    output_dir.join(format!("{}{}.{}", prefix, project_id, FILE_EXTENSION))
}

/// Writes the header and one row per record, replacing any existing file.
/// The header is written even when there are no records.
///
/// Rows go to a temp file in the target directory which is then renamed over
/// `path`, so a failed write leaves the previous report intact.
pub fn write_report(path: &Path, records: &[BucketRecord]) -> anyhow::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("create temp file in {}", dir.display()))?;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(tmp);
    writer.write_record(COLUMNS)?;
    for r in records {
        writer.serialize(r)?;
    }
    let tmp = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("flush {}: {}", path.display(), e.error()))?;
    tmp.as_file()
        .sync_all()
        .with_context(|| format!("sync {}", path.display()))?;
    tmp.persist(path)
        .with_context(|| format!("replace {}", path.display()))?;
    Ok(())
}

/// Parses a report file written by `write_report`.
pub fn read_report(path: &Path) -> anyhow::Result<Vec<BucketRecord>> {
    let mut reader =
        csv::Reader::from_path(path).with_context(|| format!("open {}", path.display()))?;
    let headers = reader.headers()?.clone();
    anyhow::ensure!(
        headers.iter().eq(COLUMNS.iter().copied()),
        "unexpected report header in {}: {:?}",
        path.display(),
        headers
    );
    let mut out: Vec<BucketRecord> = Vec::new();
    for row in reader.deserialize() {
        out.push(row?);
    }
    Ok(out)
}
