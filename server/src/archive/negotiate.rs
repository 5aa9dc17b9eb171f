//! Content negotiation for files served from storage
//!
//! Decides MIME type, gzip-variant fallback and `Content-Disposition` for a
//! requested path before any bytes are streamed.

use std::sync::Arc;

use crate::storage::StorageDevice;

const DEFAULT_MIME: &str = "application/octet-stream";
const GZIP_SUFFIX: &str = ".gz";

/// Suffix table, matched in order against the end of the requested path.
const MIME_TABLE: &[(&str, &str)] = &[
    (".html", "text/html"),
    (".htm", "text/html"),
    (".css", "text/css"),
    (".csv", "text/csv"),
    (".json", "text/json"),
    (".js", "application/javascript"),
    (".png", "image/png"),
    (".gif", "image/gif"),
    (".jpg", "image/jpeg"),
    (".ico", "image/x-icon"),
    (".svg", "image/svg+xml"),
    (".eot", "font/eot"),
    (".woff", "font/woff"),
    (".woff2", "font/woff2"),
    (".ttf", "font/ttf"),
    (".txt", "text/plain"),
    (".xml", "text/xml"),
    (".pdf", "application/pdf"),
    (".zip", "application/zip"),
    (".gz", "application/x-gzip"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Identity,
    Gzip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Inline,
    Attachment,
}

impl Disposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Disposition::Inline => "inline",
            Disposition::Attachment => "attachment",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDescriptor {
    pub mime_type: String,
    pub encoding: Encoding,
    pub disposition: Disposition,
    /// Path actually opened: the requested path or its `.gz` variant
    pub resolved_path: String,
    /// Basename of the requested path
    pub download_filename: String,
}

impl ContentDescriptor {
    /// `Content-Disposition` header value. The filename is not escaped.
    pub fn content_disposition(&self) -> String {
        format!(
            "{}; filename=\"{}\"",
            self.disposition.as_str(),
            self.download_filename
        )
    }

    /// `Content-Encoding` header value, if one must be sent.
    pub fn content_encoding(&self) -> Option<&'static str> {
        match self.encoding {
            Encoding::Gzip => Some("gzip"),
            Encoding::Identity => None,
        }
    }
}

/// Look up the MIME type for a path by suffix.
pub fn mime_type_for(path: &str) -> &'static str {
    MIME_TABLE
        .iter()
        .find(|(suffix, _)| path.ends_with(suffix))
        .map(|(_, mime)| *mime)
        .unwrap_or(DEFAULT_MIME)
}

/// Substring after the last `/`, or the whole path.
pub fn download_filename(path: &str) -> &str {
    match path.rfind('/') {
        Some(pos) => &path[pos + 1..],
        None => path,
    }
}

/// Existence test by opening and immediately closing the file.
///
/// The driver's native `exists` has been seen to reset the logger hardware,
/// so keep probing this way unless that primitive is verified on the target.
pub fn probe(storage: &dyn StorageDevice, path: &str) -> bool {
    match storage.open(path) {
        Ok(handle) => {
            handle.close();
            true
        }
        Err(_) => false,
    }
}

pub struct ContentNegotiator {
    storage: Arc<dyn StorageDevice>,
}

impl ContentNegotiator {
    pub fn new(storage: Arc<dyn StorageDevice>) -> Self {
        Self { storage }
    }

    /// Negotiate a path that has not been opened yet.
    ///
    /// Without `force_download`, a missing file whose `.gz` variant exists
    /// is served from the variant with gzip encoding.
    pub fn resolve(
        &self,
        requested_path: &str,
        explicit_type: Option<&str>,
        force_download: bool,
    ) -> ContentDescriptor {
        let mut resolved_path = requested_path.to_string();
        let mut encoding = Encoding::Identity;

        if !force_download && !probe(self.storage.as_ref(), requested_path) {
            let gz_path = format!("{}{}", requested_path, GZIP_SUFFIX);
            if probe(self.storage.as_ref(), &gz_path) {
                tracing::debug!("Serving {} from gzip variant {}", requested_path, gz_path);
                resolved_path = gz_path;
                encoding = Encoding::Gzip;
            }
        }

        describe(requested_path, resolved_path, encoding, explicit_type, force_download)
    }

    /// Describe a path the caller already opened exactly as requested. No
    /// gzip variant is looked up and the device is not touched.
    pub fn resolve_opened(
        &self,
        requested_path: &str,
        explicit_type: Option<&str>,
        force_download: bool,
    ) -> ContentDescriptor {
        describe(
            requested_path,
            requested_path.to_string(),
            Encoding::Identity,
            explicit_type,
            force_download,
        )
    }
}

fn describe(
    requested_path: &str,
    resolved_path: String,
    encoding: Encoding,
    explicit_type: Option<&str>,
    force_download: bool,
) -> ContentDescriptor {
    let mime_type = match explicit_type {
        Some(t) if !t.is_empty() => t.to_string(),
        _ => mime_type_for(requested_path).to_string(),
    };

    ContentDescriptor {
        mime_type,
        encoding,
        disposition: if force_download {
            Disposition::Attachment
        } else {
            Disposition::Inline
        },
        resolved_path,
        download_filename: download_filename(requested_path).to_string(),
    }
}
