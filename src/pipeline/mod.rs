//! Client-side upload and export pipeline: selection staging, media
//! normalization, the sequential upload loop, and the bulk-export packager.
//! Talks to the server only through the [`client`] seams, so everything here
//! is testable without a running gallery.

pub mod batch;
pub mod client;
pub mod error;
pub mod export;
pub mod normalize;
pub mod sequencer;

pub use batch::{SelectedFile, UploadBatch, UploadItem, ALLOWED_MEDIA_TYPES, MAX_BATCH_UNITS};
pub use client::{CreatedPost, GalleryApi, HttpGalleryClient, MediaFetcher};
pub use error::{ExportError, FetchError, StageError, UploadError};
pub use export::{build_archive, ExportOutcome, ExportPost};
pub use normalize::{
    compress_image, pass_through, probe_dimensions, CompressionOptions, NormalizedMedia,
};
pub use sequencer::{
    BatchFailure, BatchProgress, BatchReport, CommittedItem, ItemPhase, UploadSequencer,
};
