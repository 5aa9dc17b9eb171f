//! Streamed file bodies
//!
//! Adapts a [`FileStreamResponse`] to an axum body. The transport polls the
//! stream whenever it has room; each poll performs one bounded read.

use crate::archive::FileStreamResponse;
use axum::{
    body::{Body, Bytes},
    http::{header, StatusCode},
    response::Response,
};
use tokio::sync::OwnedMutexGuard;

use super::error::AppError;

/// Build a `200 OK` response that streams `session` with headers taken from
/// its content descriptor. The device guard is held until the body finishes
/// or is dropped by the transport (client disconnect), and dropping the body
/// drops the session, which releases its handle.
pub fn stream_response(
    session: FileStreamResponse,
    chunk_size: usize,
    device_guard: OwnedMutexGuard<()>,
) -> Result<Response, AppError> {
    let descriptor = session.descriptor().clone();
    let declared_length = session.declared_length();

    let stream = async_stream::stream! {
        let _device_guard = device_guard;
        let mut session = session;
        let mut buf = vec![0u8; chunk_size];
        loop {
            match session.fill_buffer(&mut buf) {
                Ok(0) => break,
                Ok(n) => yield Ok::<_, std::io::Error>(Bytes::copy_from_slice(&buf[..n])),
                Err(e) => {
                    tracing::warn!("Aborting body for {}: {}", session.descriptor().resolved_path, e);
                    yield Err(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()));
                    break;
                }
            }
        }
        tracing::debug!(
            "Body for {} done: {:?}, {} of {} bytes",
            session.descriptor().resolved_path,
            session.state(),
            session.bytes_delivered(),
            session.declared_length()
        );
        session.close();
    };

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, descriptor.mime_type.as_str())
        .header(header::CONTENT_LENGTH, declared_length.to_string())
        .header(header::CONTENT_DISPOSITION, descriptor.content_disposition());
    if let Some(encoding) = descriptor.content_encoding() {
        builder = builder.header(header::CONTENT_ENCODING, encoding);
    }

    builder
        .body(Body::from_stream(stream))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)))
}

/// Read a whole (small) file through a session, e.g. a page template.
pub fn read_to_end(session: &mut FileStreamResponse, chunk_size: usize) -> Result<Vec<u8>, AppError> {
    let mut content = Vec::with_capacity(session.declared_length() as usize);
    let mut buf = vec![0u8; chunk_size];
    loop {
        let n = session.fill_buffer(&mut buf)?;
        if n == 0 {
            break;
        }
        content.extend_from_slice(&buf[..n]);
    }
    session.close();
    Ok(content)
}
