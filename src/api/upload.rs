//! Multipart upload handling shared by the spreadsheet import endpoints.

use std::io::Write;

use actix_multipart::Multipart;
use actix_web::web;
use futures_util::TryStreamExt;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::{
    config::Config,
    error::{AppError, AppResult},
};

const UPLOAD_FIELD: &str = "file";

/// Streams the `file` part of the upload into a temp file under the upload
/// directory and returns its contents. File I/O runs on the blocking pool;
/// the temp file is deleted whether or not the upload completes.
pub(crate) async fn read_upload(payload: &mut Multipart, config: &Config) -> AppResult<Vec<u8>> {
    while let Some(mut field) = payload.try_next().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let dir = config.upload_dir.clone();
        let mut file = web::block(move || {
            std::fs::create_dir_all(&dir)?;
            NamedTempFile::new_in(&dir)
        })
        .await??;
        let mut written = 0usize;

        while let Some(chunk) = field.try_next().await? {
            written += chunk.len();
            if written > config.max_upload_bytes {
                return Err(AppError::BadRequest(format!(
                    "file exceeds the {} byte upload limit",
                    config.max_upload_bytes
                )));
            }
            file = web::block(move || {
                let mut file = file;
                file.write_all(&chunk)?;
                Ok::<_, std::io::Error>(file)
            })
            .await??;
        }

        debug!(bytes = written, path = %file.path().display(), "Upload spooled");
        let bytes = web::block(move || {
            let mut file = file;
            file.flush()?;
            std::fs::read(file.path())
        })
        .await??;

        if bytes.is_empty() {
            return Err(AppError::BadRequest("uploaded file is empty".into()));
        }
        return Ok(bytes);
    }

    Err(AppError::BadRequest("no file uploaded".into()))
}
