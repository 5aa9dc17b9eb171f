//! Archive index views
//!
//! The three views the HTTP layer consumes: the HTML table embedded in the
//! index page, the JSON listing, and a stream for a single log file.

use std::sync::Arc;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::storage::{join_path, StorageDevice, StorageError};

use super::enumerate::LogEntryJson;
use super::{ArchiveEnumerator, ArchiveError, ContentNegotiator, FileStreamResponse, LogEntries};

const TABLE_HEAD: &str = concat!(
    "<table class=\"table table-bordered table-condensed table-striped table-hover\">",
    "<thead><tr><th scope=\"col\">#</th><th scope=\"col\">Name</th>",
    "<th scope=\"col\">Size [kB]</th><th scope=\"col\">Time</th></tr></thead><tbody>"
);
/// Characters left as-is in a row's `data-href` segment
const HREF_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');

const TABLE_TAIL: &str = "</tbody></table>";
const STORAGE_MISSING: &str =
    "<div class=\"alert alert-danger\" role=\"alert\">SD card not present!</div>";

pub struct ArchiveIndex {
    storage: Arc<dyn StorageDevice>,
    archive_dir: String,
    enumerator: ArchiveEnumerator,
    negotiator: ContentNegotiator,
}

impl ArchiveIndex {
    pub fn new(storage: Arc<dyn StorageDevice>, archive_dir: impl Into<String>) -> Self {
        Self {
            enumerator: ArchiveEnumerator::new(storage.clone()),
            negotiator: ContentNegotiator::new(storage.clone()),
            storage,
            archive_dir: archive_dir.into(),
        }
    }

    pub fn archive_dir(&self) -> &str {
        &self.archive_dir
    }

    pub fn entries(&self) -> Result<LogEntries, ArchiveError> {
        self.enumerator.list(&self.archive_dir)
    }

    /// Table markup, one row per entry. A notice fragment replaces the table
    /// when the card or the archive directory is unavailable.
    pub fn render_html_table(&self) -> String {
        let entries = match self.entries() {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Log table unavailable: {}", e);
                return STORAGE_MISSING.to_string();
            }
        };

        let mut table = String::from(TABLE_HEAD);
        for (idx, entry) in entries.enumerate() {
            let name = escape_html(&entry.name);
            let href = utf8_percent_encode(&entry.name, HREF_SEGMENT);
            table.push_str(&format!(
                "<tr class=\"table-row\" data-href=\"logs/{href}\"><th scope=\"row\">{}</th>\
                 <td>{name}</td><td>{}</td><td>{}</td></tr>",
                idx + 1,
                entry.size_kib(),
                entry.timestamp,
            ));
        }
        table.push_str(TABLE_TAIL);
        table
    }

    /// JSON array of `{name, date, size}` objects.
    pub fn render_json(&self) -> Result<String, ArchiveError> {
        let entries: Vec<LogEntryJson> = self.entries()?.map(|e| LogEntryJson::from(&e)).collect();
        serde_json::to_string(&entries).map_err(|e| ArchiveError::Io(e.into()))
    }

    /// Open one archived log for streaming.
    pub fn serve_entry(
        &self,
        name: &str,
        force_download: bool,
    ) -> Result<FileStreamResponse, ArchiveError> {
        validate_name(name)?;
        let path = join_path(&self.archive_dir, name);
        tracing::debug!("Get log {}", path);

        let handle = self.storage.open(&path).map_err(|e| match e {
            StorageError::NotFound(_) => {
                tracing::debug!("{} not found", path);
                ArchiveError::NotFound(name.to_string())
            }
            other => other.into(),
        })?;

        let descriptor = self
            .negotiator
            .resolve_opened(&path, None, force_download);
        Ok(FileStreamResponse::from_handle(handle, descriptor))
    }
}

/// A log name is a single path segment.
fn validate_name(name: &str) -> Result<(), ArchiveError> {
    let invalid = name.is_empty()
        || name == "."
        || name.contains("..")
        || name.contains(['/', '\\', '\0']);
    if invalid {
        return Err(ArchiveError::InvalidName(name.to_string()));
    }
    Ok(())
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
