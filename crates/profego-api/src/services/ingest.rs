//! Batch orchestrator for uploads.
//!
//! Every file runs the same pipeline on its own: validate, stage, store the original,
//! probe and convert, store the text. A failure at any step becomes one [`FileError`]
//! for that file and the batch carries on. Files may overlap up to the configured
//! concurrency, but their outcomes are folded in submission order.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use bytes::Bytes;
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use profego_core::{
    extension_of, processed_name, FileError, FileErrorKind, ProcessingResult, Tier,
};
use profego_processing::{ConversionDispatcher, ConversionOutcome, FileValidator, Staging};
use profego_storage::ArtifactStore;

/// One file taken from the request.
#[derive(Debug, Clone)]
pub struct SubmittedFile {
    pub filename: String,
    pub size_bytes: u64,
    pub data: Bytes,
}

impl SubmittedFile {
    pub fn new(filename: impl Into<String>, data: Bytes) -> Self {
        Self {
            filename: filename.into(),
            size_bytes: data.len() as u64,
            data,
        }
    }

    /// A file whose bytes were discarded while reading because it outgrew the ceiling.
    pub fn discarded(filename: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            filename: filename.into(),
            size_bytes,
            data: Bytes::new(),
        }
    }
}

#[derive(Debug, Default)]
struct FileOutcome {
    uploaded: bool,
    processed: bool,
    error: Option<FileError>,
}

impl FileOutcome {
    fn rejected(error: FileError) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }
}

pub struct IngestService {
    validator: FileValidator,
    staging: Arc<dyn Staging>,
    dispatcher: ConversionDispatcher,
    artifacts: ArtifactStore,
    concurrency: usize,
}

impl IngestService {
    pub fn new(
        validator: FileValidator,
        staging: Arc<dyn Staging>,
        dispatcher: ConversionDispatcher,
        artifacts: ArtifactStore,
        concurrency: usize,
    ) -> Self {
        Self {
            validator,
            staging,
            dispatcher,
            artifacts,
            concurrency: concurrency.max(1),
        }
    }

    /// Run a batch for `user`. Never fails: per-file problems end up in the result.
    pub async fn ingest(&self, user: &str, files: Vec<SubmittedFile>) -> ProcessingResult {
        let total = files.len();
        let start = std::time::Instant::now();

        let outcomes: Vec<FileOutcome> = stream::iter(files)
            .map(|file| self.process_guarded(user, file))
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut uploaded = 0;
        let mut processed = 0;
        let mut errors = Vec::new();
        for outcome in outcomes {
            uploaded += usize::from(outcome.uploaded);
            processed += usize::from(outcome.processed);
            errors.extend(outcome.error);
        }

        tracing::info!(
            user = %user,
            files = total,
            files_uploaded = uploaded,
            files_processed = processed,
            errors = errors.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Batch ingested"
        );

        ProcessingResult::finalize(uploaded, processed, errors)
    }

    async fn process_guarded(&self, user: &str, file: SubmittedFile) -> FileOutcome {
        let filename = file.filename.clone();
        match AssertUnwindSafe(self.process_file(user, file))
            .catch_unwind()
            .await
        {
            Ok(outcome) => outcome,
            Err(panic) => {
                let reason = panic_message(panic.as_ref());
                tracing::error!(user = %user, filename = %filename, reason = %reason, "File pipeline panicked");
                FileOutcome::rejected(FileError::new(
                    FileErrorKind::Internal,
                    filename,
                    format!("Internal error: {}", reason),
                ))
            }
        }
    }

    async fn process_file(&self, user: &str, file: SubmittedFile) -> FileOutcome {
        let SubmittedFile {
            filename,
            size_bytes,
            data,
        } = file;

        if let Err(e) = self.validator.validate_extension(&filename) {
            tracing::debug!(filename = %filename, error = %e, "Rejected file");
            return FileOutcome::rejected(FileError::new(
                FileErrorKind::Validation,
                filename,
                e.to_string(),
            ));
        }
        if let Err(e) = self.validator.validate_size(size_bytes) {
            tracing::debug!(filename = %filename, error = %e, "Rejected file");
            return FileOutcome::rejected(FileError::new(
                FileErrorKind::Validation,
                filename,
                e.to_string(),
            ));
        }

        let suffix = extension_of(&filename)
            .map(|ext| format!(".{}", ext))
            .unwrap_or_default();
        let staged = match self.staging.stage(data.clone(), &suffix).await {
            Ok(staged) => staged,
            Err(e) => {
                tracing::warn!(filename = %filename, error = %e, "Staging failed");
                return FileOutcome::rejected(FileError::new(
                    FileErrorKind::Staging,
                    filename,
                    e.to_string(),
                ));
            }
        };

        if let Err(e) = self
            .artifacts
            .put(user, &filename, data, Tier::Original)
            .await
        {
            tracing::error!(user = %user, filename = %filename, error = %e, "Failed to store original");
            return FileOutcome::rejected(FileError::new(
                FileErrorKind::Storage,
                filename,
                format!("Failed to store file: {}", e),
            ));
        }

        let mut outcome = FileOutcome {
            uploaded: true,
            ..FileOutcome::default()
        };

        match self.dispatcher.convert(&staged).await {
            ConversionOutcome::Unsupported => {
                tracing::debug!(
                    filename = %filename,
                    converter = self.dispatcher.converter_name(),
                    "No conversion for this file"
                );
            }
            ConversionOutcome::Failed(reason) => {
                tracing::warn!(filename = %filename, reason = %reason, "Conversion failed");
                outcome.error = Some(FileError::new(
                    FileErrorKind::Conversion,
                    filename.as_str(),
                    format!("Conversion failed: {}", reason),
                ));
            }
            ConversionOutcome::Converted(text) => match text.read().await {
                Err(e) => {
                    outcome.error = Some(FileError::new(
                        FileErrorKind::Conversion,
                        filename.as_str(),
                        format!("Failed to read converted text: {}", e),
                    ));
                }
                Ok(content) => {
                    let name = processed_name(&filename);
                    match self
                        .artifacts
                        .put(user, &name, Bytes::from(content), Tier::Processed)
                        .await
                    {
                        Ok(stored) => {
                            tracing::info!(
                                user = %user,
                                filename = %filename,
                                processed = %stored.name,
                                size_bytes = stored.size_bytes,
                                "Processed text stored"
                            );
                            outcome.processed = true;
                        }
                        Err(e) => {
                            tracing::error!(user = %user, filename = %filename, error = %e, "Failed to store processed text");
                            outcome.error = Some(FileError::new(
                                FileErrorKind::Storage,
                                filename.as_str(),
                                format!("Failed to store processed text: {}", e),
                            ));
                        }
                    }
                }
            },
        }

        if let Err(e) = staged.release() {
            tracing::warn!(filename = %filename, error = %e, "Failed to remove staged file");
        }

        outcome
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use profego_core::constants::BYTES_PER_MIB;
    use profego_processing::{BuiltinConverter, StagedFile, StagingError, TempStaging};
    use profego_storage::{LocalStorage, ObjectMeta, Storage, StorageBackend, StorageError, StorageResult};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    const USER: &str = "ana@example.com";

    fn allowed() -> Vec<String> {
        ["pdf", "doc", "docx", "txt", "jpg", "jpeg", "png", "xlsx", "xls", "csv", "json", "xml"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    struct Fixture {
        dir: TempDir,
        artifacts: ArtifactStore,
        service: IngestService,
    }

    async fn fixture_with(
        storage: Option<Arc<dyn Storage>>,
        staging: Option<Arc<dyn Staging>>,
        concurrency: usize,
    ) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let storage = match storage {
            Some(storage) => storage,
            None => Arc::new(LocalStorage::new(dir.path().join("store")).await.unwrap()),
        };
        let staging =
            staging.unwrap_or_else(|| Arc::new(TempStaging::new(dir.path().join("staging"))));
        let artifacts = ArtifactStore::new(storage);
        let dispatcher = ConversionDispatcher::new(Arc::new(BuiltinConverter::new(
            dir.path().join("converted"),
        )));
        let service = IngestService::new(
            FileValidator::new(20 * BYTES_PER_MIB, allowed()),
            staging,
            dispatcher,
            artifacts.clone(),
            concurrency,
        );
        Fixture {
            dir,
            artifacts,
            service,
        }
    }

    async fn fixture() -> Fixture {
        fixture_with(None, None, 1).await
    }

    #[tokio::test]
    async fn test_mixed_batch_keeps_going() {
        let f = fixture().await;
        let files = vec![
            SubmittedFile::new("virus.exe", Bytes::from_static(b"MZ")),
            SubmittedFile::discarded("big.pdf", 25 * BYTES_PER_MIB),
            SubmittedFile::new("notes.txt", Bytes::from(vec![b'a'; 1024])),
        ];

        let result = f.service.ingest(USER, files).await;

        assert!(result.success);
        assert_eq!(result.files_uploaded, 1);
        assert_eq!(result.files_processed, 1);
        assert_eq!(result.errors.len(), 2);
        assert!(result.errors[0].starts_with("virus.exe: "));
        assert!(result.errors[1].starts_with("big.pdf: "));
        assert!(result
            .error_details
            .iter()
            .all(|e| e.kind == FileErrorKind::Validation));

        let processed = f
            .artifacts
            .get(USER, "notes_procesado.txt", Tier::Processed)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(processed.len(), 1024);
    }

    #[tokio::test]
    async fn test_exact_ceiling_accepted() {
        let f = fixture().await;
        let data = Bytes::from(vec![0u8; (20 * BYTES_PER_MIB) as usize]);
        let result = f
            .service
            .ingest(USER, vec![SubmittedFile::new("scan.jpg", data)])
            .await;
        assert_eq!(result.files_uploaded, 1);
        assert!(result.errors.is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_conversion_is_not_an_error() {
        let f = fixture().await;
        let result = f
            .service
            .ingest(
                USER,
                vec![SubmittedFile::new("photo.png", Bytes::from_static(b"\x89PNG"))],
            )
            .await;

        assert_eq!(result.files_uploaded, 1);
        assert_eq!(result.files_processed, 0);
        assert!(result.errors.is_empty());
        assert_eq!(result.message, "Files uploaded: 1");
        assert!(f
            .artifacts
            .list(USER, Tier::Processed)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_conversion_failure_keeps_upload() {
        let f = fixture().await;
        let result = f
            .service
            .ingest(
                USER,
                vec![SubmittedFile::new("broken.pdf", Bytes::from_static(b"not a pdf"))],
            )
            .await;

        assert!(result.success);
        assert_eq!(result.files_uploaded, 1);
        assert_eq!(result.files_processed, 0);
        assert_eq!(result.error_details.len(), 1);
        assert_eq!(result.error_details[0].kind, FileErrorKind::Conversion);
        assert!(f
            .artifacts
            .get(USER, "broken.pdf", Tier::Original)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_reupload_overwrites() {
        let f = fixture().await;
        for body in [&b"first"[..], &b"second"[..]] {
            f.service
                .ingest(
                    USER,
                    vec![SubmittedFile::new("notes.txt", Bytes::copy_from_slice(body))],
                )
                .await;
        }

        let originals = f.artifacts.list(USER, Tier::Original).await.unwrap();
        assert_eq!(originals.len(), 1);
        let text = f
            .artifacts
            .get(USER, "notes_procesado.txt", Tier::Processed)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&text[..], b"second");
    }

    /// Storage that refuses every write into the original tier.
    struct NoOriginals;

    #[async_trait]
    impl Storage for NoOriginals {
        async fn put(&self, key: &str, _data: Bytes) -> StorageResult<()> {
            if key.contains("/uploads/") {
                return Err(StorageError::UploadFailed("disk full".to_string()));
            }
            Ok(())
        }
        async fn get(&self, key: &str) -> StorageResult<Bytes> {
            Err(StorageError::NotFound(key.to_string()))
        }
        async fn delete(&self, key: &str) -> StorageResult<()> {
            Err(StorageError::NotFound(key.to_string()))
        }
        async fn list(&self, _prefix: &str) -> StorageResult<Vec<ObjectMeta>> {
            Ok(Vec::new())
        }
        async fn exists(&self, _key: &str) -> StorageResult<bool> {
            Ok(false)
        }
        async fn ensure_prefix(&self, _prefix: &str) -> StorageResult<()> {
            Ok(())
        }
        async fn health_check(&self) -> StorageResult<()> {
            Ok(())
        }
        fn backend_type(&self) -> StorageBackend {
            StorageBackend::Local
        }
    }

    #[tokio::test]
    async fn test_failed_original_upload_skips_conversion() {
        let f = fixture_with(Some(Arc::new(NoOriginals)), None, 1).await;
        let result = f
            .service
            .ingest(
                USER,
                vec![SubmittedFile::new("notes.txt", Bytes::from_static(b"hola"))],
            )
            .await;

        assert!(!result.success);
        assert_eq!(result.files_uploaded, 0);
        assert_eq!(result.files_processed, 0);
        assert_eq!(result.error_details[0].kind, FileErrorKind::Storage);
    }

    /// Local storage that refuses every write into the processed tier.
    struct NoProcessed {
        inner: LocalStorage,
    }

    #[async_trait]
    impl Storage for NoProcessed {
        async fn put(&self, key: &str, data: Bytes) -> StorageResult<()> {
            if key.contains("/processed/") {
                return Err(StorageError::UploadFailed("quota exceeded".to_string()));
            }
            self.inner.put(key, data).await
        }
        async fn get(&self, key: &str) -> StorageResult<Bytes> {
            self.inner.get(key).await
        }
        async fn delete(&self, key: &str) -> StorageResult<()> {
            self.inner.delete(key).await
        }
        async fn list(&self, prefix: &str) -> StorageResult<Vec<ObjectMeta>> {
            self.inner.list(prefix).await
        }
        async fn exists(&self, key: &str) -> StorageResult<bool> {
            self.inner.exists(key).await
        }
        async fn ensure_prefix(&self, prefix: &str) -> StorageResult<()> {
            self.inner.ensure_prefix(prefix).await
        }
        async fn health_check(&self) -> StorageResult<()> {
            self.inner.health_check().await
        }
        fn backend_type(&self) -> StorageBackend {
            self.inner.backend_type()
        }
    }

    #[tokio::test]
    async fn test_failed_processed_upload_keeps_original_credit() {
        let store_dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(NoProcessed {
            inner: LocalStorage::new(store_dir.path()).await.unwrap(),
        });
        let f = fixture_with(Some(storage), None, 1).await;

        let result = f
            .service
            .ingest(
                USER,
                vec![SubmittedFile::new("notes.txt", Bytes::from_static(b"hola"))],
            )
            .await;

        assert!(result.success);
        assert_eq!(result.files_uploaded, 1);
        assert_eq!(result.files_processed, 0);
        let kinds: Vec<FileErrorKind> = result.error_details.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![FileErrorKind::Storage]);
        assert!(result.errors[0].starts_with("notes.txt: Failed to store processed text"));

        assert!(f
            .artifacts
            .get(USER, "notes.txt", Tier::Original)
            .await
            .unwrap()
            .is_some());
        assert!(f
            .artifacts
            .list(USER, Tier::Processed)
            .await
            .unwrap()
            .is_empty());

        // Converter output is removed even though it was never persisted.
        let converted = f.dir.path().join("converted");
        let leftovers = std::fs::read_dir(&converted)
            .map(|entries| entries.count())
            .unwrap_or(0);
        assert_eq!(leftovers, 0);
    }

    /// Staging that fails its first call and delegates afterwards.
    struct FlakyStaging {
        calls: AtomicUsize,
        inner: TempStaging,
    }

    #[async_trait]
    impl Staging for FlakyStaging {
        async fn stage(&self, data: Bytes, suffix: &str) -> Result<StagedFile, StagingError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(StagingError::TaskFailed("no space left".to_string()));
            }
            self.inner.stage(data, suffix).await
        }
    }

    #[tokio::test]
    async fn test_staging_failure_is_isolated() {
        let staging_dir = tempfile::tempdir().unwrap();
        let staging = Arc::new(FlakyStaging {
            calls: AtomicUsize::new(0),
            inner: TempStaging::new(staging_dir.path()),
        });
        let f = fixture_with(None, Some(staging), 1).await;

        let result = f
            .service
            .ingest(
                USER,
                vec![
                    SubmittedFile::new("a.txt", Bytes::from_static(b"a")),
                    SubmittedFile::new("b.txt", Bytes::from_static(b"b")),
                ],
            )
            .await;

        assert_eq!(result.files_uploaded, 1);
        assert_eq!(result.files_processed, 1);
        assert_eq!(result.error_details.len(), 1);
        assert_eq!(result.error_details[0].kind, FileErrorKind::Staging);
        assert_eq!(result.error_details[0].filename, "a.txt");
        assert_eq!(std::fs::read_dir(staging_dir.path()).unwrap().count(), 0);
    }

    struct PanickingStaging;

    #[async_trait]
    impl Staging for PanickingStaging {
        async fn stage(&self, _data: Bytes, _suffix: &str) -> Result<StagedFile, StagingError> {
            panic!("staging exploded");
        }
    }

    #[tokio::test]
    async fn test_panic_recorded_as_internal_error() {
        let f = fixture_with(None, Some(Arc::new(PanickingStaging)), 1).await;
        let result = f
            .service
            .ingest(
                USER,
                vec![SubmittedFile::new("a.txt", Bytes::from_static(b"a"))],
            )
            .await;

        assert_eq!(result.files_uploaded, 0);
        assert_eq!(result.error_details[0].kind, FileErrorKind::Internal);
        assert!(result.errors[0].contains("staging exploded"));
    }

    #[tokio::test]
    async fn test_concurrent_batch_reports_in_submission_order() {
        let f = fixture_with(None, None, 4).await;
        let files = vec![
            SubmittedFile::new("one.exe", Bytes::from_static(b"x")),
            SubmittedFile::new("two.txt", Bytes::from_static(b"two")),
            SubmittedFile::new("three.bin", Bytes::from_static(b"x")),
            SubmittedFile::new("four.csv", Bytes::from_static(b"a,b")),
            SubmittedFile::new("five", Bytes::from_static(b"x")),
        ];

        let result = f.service.ingest(USER, files).await;

        assert_eq!(result.files_uploaded, 2);
        assert_eq!(result.files_processed, 2);
        let failed: Vec<&str> = result
            .error_details
            .iter()
            .map(|e| e.filename.as_str())
            .collect();
        assert_eq!(failed, vec!["one.exe", "three.bin", "five"]);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let f = fixture().await;
        let result = f.service.ingest(USER, Vec::new()).await;
        assert!(!result.success);
        assert_eq!(result.message, "Files uploaded: 0");
    }
}
