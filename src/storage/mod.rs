//! Upload storage
//!
//! Copies an uploaded part into the configured upload directory under the
//! name the client supplied. The directory is never created here; a missing
//! directory surfaces as an I/O error. Files with the same name are
//! overwritten, last writer wins.
//!
//! The part is first streamed into a hidden staging file in the same
//! directory and renamed onto the target only once the last chunk arrived,
//! so a failed or aborted upload leaves an existing file untouched.

use std::path::{Component, Path, PathBuf};

use multer::Field;
use tempfile::NamedTempFile;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::extract::{RequestError, ValidationError};
use crate::logger;

/// Destination of uploaded files
#[derive(Debug, Clone)]
pub struct FileSink {
    dir: PathBuf,
}

impl FileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Resolve the on-disk path for `filename`
    ///
    /// The name is used as given, but only if it is a single plain path
    /// component, so a write can never land outside the upload directory.
    pub fn target_path(&self, filename: &str) -> Result<PathBuf, RequestError> {
        let mut components = Path::new(filename).components();
        let single_normal = matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        );
        if !single_normal || filename.contains(['/', '\\']) {
            return Err(ValidationError::new(
                vec!["body".into(), "uploaded_file".into()],
                format!("filename {filename:?} is not a plain file name"),
                "value_error.filename",
            )
            .into());
        }
        Ok(self.dir.join(filename))
    }

    /// Stream `field` to disk, returning the number of bytes written
    pub async fn save(&self, filename: &str, mut field: Field<'static>) -> Result<u64, RequestError> {
        let path = self.target_path(filename)?;
        let (staged, staged_path) = self.stage()?.into_parts();
        let mut file = File::from_std(staged);

        // Any early return drops `staged_path`, which removes the staging file
        let mut written = 0u64;
        while let Some(chunk) = field.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        drop(file);

        staged_path.persist(&path).map_err(|e| e.error)?;

        logger::log_debug(&format!("Stored upload {} ({written} bytes)", path.display()));
        Ok(written)
    }

    fn stage(&self) -> std::io::Result<NamedTempFile> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(".upload-").suffix(".part");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            builder.permissions(std::fs::Permissions::from_mode(0o644));
        }
        builder.tempfile_in(&self.dir)
    }
}
