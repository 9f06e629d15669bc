use crate::models::{CreatePostRequest, MediaKind, PostId, StorageId};

use super::batch::{UploadBatch, UploadItem};
use super::client::GalleryApi;
use super::error::UploadError;
use super::normalize::{compress_image, pass_through, CompressionOptions, NormalizedMedia};

/// Where the current item is in its upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemPhase {
    Processing,
    Transferring,
    Committing,
    Committed,
}

/// Snapshot handed to the progress observer after every advance
#[derive(Debug, Clone, Copy)]
pub struct BatchProgress {
    pub item_index: usize,
    pub total: usize,
    pub phase: ItemPhase,
    /// Whole-batch fraction in 0..=1. Never regresses.
    pub overall: f32,
}

/// The item the run stopped on and why
#[derive(Debug)]
pub struct BatchFailure {
    pub index: usize,
    pub name: String,
    pub error: UploadError,
}

/// A post that made it all the way through
#[derive(Debug, Clone)]
pub struct CommittedItem {
    pub post_id: PostId,
    pub storage_id: StorageId,
    pub live_photo_video_id: Option<StorageId>,
}

/// Outcome of one sequencer run
#[derive(Debug)]
pub struct BatchReport {
    pub total: usize,
    pub committed: Vec<CommittedItem>,
    pub failure: Option<BatchFailure>,
}

impl BatchReport {
    /// True when every staged item became a post
    pub fn is_complete(&self) -> bool {
        self.failure.is_none() && self.committed.len() == self.total
    }
}

/// Folds per-item fractions into one whole-batch number and clamps it
/// monotonic, so observers can drive a progress bar directly.
struct ProgressTracker<F> {
    observer: F,
    total: usize,
    completed: usize,
    last_overall: f32,
}

impl<F: FnMut(BatchProgress)> ProgressTracker<F> {
    fn new(observer: F, total: usize) -> Self {
        Self {
            observer,
            total,
            completed: 0,
            last_overall: 0.0,
        }
    }

    fn update(&mut self, item_index: usize, phase: ItemPhase, fraction: f32) {
        let raw = if self.total == 0 {
            1.0
        } else {
            (self.completed as f32 + fraction.clamp(0.0, 1.0)) / self.total as f32
        };
        let overall = raw.max(self.last_overall);
        self.last_overall = overall;
        (self.observer)(BatchProgress {
            item_index,
            total: self.total,
            phase,
            overall,
        });
    }

    fn item_done(&mut self, item_index: usize) {
        self.completed += 1;
        self.update(item_index, ItemPhase::Committed, 0.0);
    }
}

/// Drives a staged batch through normalize, transfer, and commit, one item
/// at a time in staging order. The first terminal error stops the queue;
/// posts committed before it stay committed.
pub struct UploadSequencer<'a> {
    api: &'a dyn GalleryApi,
    options: CompressionOptions,
}

impl<'a> UploadSequencer<'a> {
    pub fn new(api: &'a dyn GalleryApi) -> Self {
        Self {
            api,
            options: CompressionOptions::default(),
        }
    }

    pub fn with_options(api: &'a dyn GalleryApi, options: CompressionOptions) -> Self {
        Self { api, options }
    }

    /// Consumes the batch: on full success the staged state is simply gone,
    /// which is what clearing the tray after upload means here.
    pub async fn run<F>(&self, batch: UploadBatch, observer: F) -> BatchReport
    where
        F: FnMut(BatchProgress),
    {
        let (items, caption) = batch.into_parts();
        let total = items.len();
        let mut tracker = ProgressTracker::new(observer, total);
        let mut committed = Vec::with_capacity(total);
        let mut failure = None;

        for (index, item) in items.into_iter().enumerate() {
            let name = item.primary().name.clone();
            tracker.update(index, ItemPhase::Processing, 0.0);

            match self
                .upload_item(index, item, caption.as_deref(), &mut tracker)
                .await
            {
                Ok(item) => {
                    committed.push(item);
                    tracker.item_done(index);
                }
                Err(error) => {
                    tracing::warn!("Upload halted at \"{}\": {}", name, error);
                    failure = Some(BatchFailure { index, name, error });
                    break;
                }
            }
        }

        BatchReport {
            total,
            committed,
            failure,
        }
    }

    async fn upload_item<F>(
        &self,
        index: usize,
        item: UploadItem,
        caption: Option<&str>,
        tracker: &mut ProgressTracker<F>,
    ) -> Result<CommittedItem, UploadError>
    where
        F: FnMut(BatchProgress),
    {
        match item {
            UploadItem::LivePhoto { image, video } => {
                let media = compress_image(&image, &self.options, |p| {
                    tracker.update(index, ItemPhase::Processing, 0.45 * p)
                });
                let storage_id = self.transfer(&media).await?;
                tracker.update(index, ItemPhase::Transferring, 0.70);

                let companion = pass_through(&video);
                let video_id = self.transfer(&companion).await?;
                tracker.update(index, ItemPhase::Transferring, 0.90);

                let request = CreatePostRequest {
                    storage_id: storage_id.clone(),
                    live_photo_video_id: Some(video_id.clone()),
                    caption: caption.map(str::to_string),
                    media_type: MediaKind::Image,
                    width: media.width,
                    height: media.height,
                };
                tracker.update(index, ItemPhase::Committing, 0.90);
                let created = self.api.create_post(&request).await?;

                Ok(CommittedItem {
                    post_id: created.id,
                    storage_id,
                    live_photo_video_id: Some(video_id),
                })
            }
            UploadItem::Standalone(file) => {
                let kind = if file.is_video() {
                    MediaKind::Video
                } else {
                    MediaKind::Image
                };
                let media = if file.is_image() {
                    compress_image(&file, &self.options, |p| {
                        tracker.update(index, ItemPhase::Processing, 0.90 * p)
                    })
                } else {
                    pass_through(&file)
                };
                tracker.update(index, ItemPhase::Processing, 0.90);

                let storage_id = self.transfer(&media).await?;
                tracker.update(index, ItemPhase::Transferring, 0.95);

                let request = CreatePostRequest {
                    storage_id: storage_id.clone(),
                    live_photo_video_id: None,
                    caption: caption.map(str::to_string),
                    media_type: kind,
                    width: media.width,
                    height: media.height,
                };
                tracker.update(index, ItemPhase::Committing, 0.95);
                let created = self.api.create_post(&request).await?;

                Ok(CommittedItem {
                    post_id: created.id,
                    storage_id,
                    live_photo_video_id: None,
                })
            }
        }
    }

    async fn transfer(&self, media: &NormalizedMedia) -> Result<StorageId, UploadError> {
        let target = self.api.issue_upload_target().await?;
        self.api
            .transfer_bytes(&target.upload_url, &media.content_type, media.data.clone())
            .await
    }
}
