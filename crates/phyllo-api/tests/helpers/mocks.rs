//! In-memory collaborators for HTTP-level tests.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use phyllo_core::models::{
    ClassificationOutcome, ClassificationRecord, ClassificationUpdate, InferenceResult,
    NewClassification, VerificationStatus,
};
use phyllo_core::AppError;
use phyllo_db::{ClassificationRecordStore, Page};
use phyllo_services::{Classifier, InferenceError};
use phyllo_storage::{FallbackStore, LocalFallbackStore, ObjectStore, StorageResult, UploadResult};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

pub const PUBLIC_BASE_URL: &str = "https://images.test";

pub fn plant(species: &str) -> ClassificationOutcome {
    ClassificationOutcome::Plant(InferenceResult {
        species: species.to_string(),
        species_confidence: 0.93,
        shape: "elliptic".to_string(),
        shape_confidence: 0.81,
    })
}

/// What the mock classifier answers with.
#[derive(Clone)]
pub enum ClassifierReply {
    Outcome(ClassificationOutcome),
    Unavailable,
    Malformed,
}

pub struct MockClassifier {
    reply: Mutex<ClassifierReply>,
    pub calls: AtomicUsize,
}

impl MockClassifier {
    pub fn new() -> Self {
        MockClassifier {
            reply: Mutex::new(ClassifierReply::Outcome(plant("zea-mays"))),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn reply_with(&self, reply: ClassifierReply) {
        *self.reply.lock().unwrap() = reply;
    }
}

#[async_trait]
impl Classifier for MockClassifier {
    async fn classify(
        &self,
        image: Vec<u8>,
        _filename: &str,
        _content_type: &str,
    ) -> Result<ClassificationOutcome, InferenceError> {
        assert!(!image.is_empty(), "classifier must receive the image bytes");
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.reply.lock().unwrap().clone() {
            ClassifierReply::Outcome(outcome) => Ok(outcome),
            ClassifierReply::Unavailable => Err(InferenceError::Unavailable(
                "connection refused".to_string(),
            )),
            ClassifierReply::Malformed => Err(InferenceError::MalformedResponse(
                "missing model2".to_string(),
            )),
        }
    }
}

/// Remote tier that keeps uploaded keys in memory, or fails with a scripted message.
pub struct MockObjectStore {
    failure: Mutex<Option<String>>,
    pub uploaded: Mutex<Vec<String>>,
}

impl MockObjectStore {
    pub fn new() -> Self {
        MockObjectStore {
            failure: Mutex::new(None),
            uploaded: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_with(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(message.to_string());
    }

    pub fn uploaded_keys(&self) -> Vec<String> {
        self.uploaded.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStore for MockObjectStore {
    async fn upload(&self, file_path: &Path, key: &str, _content_type: &str) -> UploadResult {
        if !file_path.exists() {
            return UploadResult::failure("scratch file missing");
        }
        if let Some(message) = self.failure.lock().unwrap().clone() {
            return UploadResult::failure(message);
        }
        self.uploaded.lock().unwrap().push(key.to_string());
        UploadResult::Success {
            key: key.to_string(),
            url: self.public_url(key),
        }
    }

    async fn rename_object(&self, old_key: &str, new_key: &str) -> UploadResult {
        let mut uploaded = self.uploaded.lock().unwrap();
        match uploaded.iter().position(|k| k == old_key) {
            Some(index) => {
                uploaded[index] = new_key.to_string();
                UploadResult::Success {
                    key: new_key.to_string(),
                    url: self.public_url(new_key),
                }
            }
            None => UploadResult::failure(format!("NoSuchKey: {}", old_key)),
        }
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", PUBLIC_BASE_URL, key)
    }
}

/// The real local tier, with a call counter.
pub struct CountingFallbackStore {
    inner: LocalFallbackStore,
    pub calls: AtomicUsize,
}

impl CountingFallbackStore {
    pub fn new(uploads_dir: &Path) -> Self {
        CountingFallbackStore {
            inner: LocalFallbackStore::new(uploads_dir),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FallbackStore for CountingFallbackStore {
    async fn store(&self, file_path: &Path, key: &str) -> StorageResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.store(file_path, key).await
    }
}

#[derive(Default)]
pub struct MemoryRecordStore {
    rows: Mutex<Vec<ClassificationRecord>>,
    pub fail_writes: AtomicBool,
    pub fail_ping: AtomicBool,
}

impl MemoryRecordStore {
    pub fn rows(&self) -> Vec<ClassificationRecord> {
        self.rows.lock().unwrap().clone()
    }

    /// Insert a record directly, `age_minutes` in the past.
    pub fn seed(&self, user_id: &str, species: &str, age_minutes: i64) -> ClassificationRecord {
        let created_at = Utc::now() - Duration::minutes(age_minutes);
        let record = ClassificationRecord {
            id: Uuid::new_v4(),
            original_filename: format!("{}.jpg", species),
            image_path: format!("{}_0000001.jpg", species),
            species: species.to_string(),
            shape: "lobed".to_string(),
            species_confidence: 0.7,
            shape_confidence: 0.6,
            user_id: user_id.to_string(),
            is_archived: false,
            status: VerificationStatus::Pending,
            storage_tier: phyllo_core::StorageTier::Remote,
            created_at,
            updated_at: created_at,
        };
        self.rows.lock().unwrap().push(record.clone());
        record
    }
}

#[async_trait]
impl ClassificationRecordStore for MemoryRecordStore {
    async fn create(&self, new: NewClassification) -> Result<ClassificationRecord, AppError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Internal("database unavailable".to_string()));
        }
        let now = Utc::now();
        let record = ClassificationRecord {
            id: Uuid::new_v4(),
            original_filename: new.original_filename,
            image_path: new.image_path,
            species: new.species,
            shape: new.shape,
            species_confidence: new.species_confidence,
            shape_confidence: new.shape_confidence,
            user_id: new.user_id,
            is_archived: false,
            status: VerificationStatus::Pending,
            storage_tier: new.storage_tier,
            created_at: now,
            updated_at: now,
        };
        self.rows.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ClassificationRecord>, AppError> {
        Ok(self.rows.lock().unwrap().iter().find(|r| r.id == id).cloned())
    }

    async fn update(
        &self,
        id: Uuid,
        update: ClassificationUpdate,
    ) -> Result<Option<ClassificationRecord>, AppError> {
        let mut rows = self.rows.lock().unwrap();
        Ok(rows.iter_mut().find(|r| r.id == id).map(|record| {
            update.apply_to(record);
            record.updated_at = Utc::now();
            record.clone()
        }))
    }

    async fn list_by_user(&self, user_id: &str, limit: i64, offset: i64) -> Result<Page, AppError> {
        let mut items: Vec<_> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = items.len() as i64;
        let items = items
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok(Page { items, total })
    }

    async fn ping(&self) -> Result<(), AppError> {
        if self.fail_ping.load(Ordering::SeqCst) {
            return Err(AppError::Internal("connection refused".to_string()));
        }
        Ok(())
    }
}
