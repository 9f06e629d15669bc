use bytes::Bytes;
use std::path::Path;

use super::error::StageError;

/// MIME types guests may upload. Anything else rejects the whole selection.
pub const ALLOWED_MEDIA_TYPES: [&str; 8] = [
    "image/jpeg",
    "image/png",
    "image/webp",
    "image/heic",
    "image/heif",
    "video/mp4",
    "video/quicktime",
    "video/webm",
];

/// Upper bound on staged items, counted after live-photo pairing.
pub const MAX_BATCH_UNITS: usize = 10;

/// A file picked for upload
#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, data: Bytes) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            data,
        }
    }

    /// Load a selection entry from disk, guessing the MIME type from the
    /// file name.
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unnamed".to_string());
        let content_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();

        Ok(Self {
            name,
            content_type,
            data: Bytes::from(data),
        })
    }

    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }

    pub fn is_video(&self) -> bool {
        self.content_type.starts_with("video/")
    }

    /// File name without its final extension, lowercased. Live-photo pairing
    /// keys on this.
    pub fn base_name(&self) -> String {
        match self.name.rfind('.') {
            Some(idx) if idx > 0 => self.name[..idx].to_lowercase(),
            _ => self.name.to_lowercase(),
        }
    }
}

fn is_allowed(content_type: &str) -> bool {
    ALLOWED_MEDIA_TYPES
        .iter()
        .any(|t| t.eq_ignore_ascii_case(content_type))
}

/// One unit of upload work: a live photo (image plus companion video) or a
/// single file.
#[derive(Debug, Clone)]
pub enum UploadItem {
    LivePhoto {
        image: SelectedFile,
        video: SelectedFile,
    },
    Standalone(SelectedFile),
}

impl UploadItem {
    pub fn is_live_photo(&self) -> bool {
        matches!(self, UploadItem::LivePhoto { .. })
    }

    /// The file whose kind names the post (the image half of a pair)
    pub fn primary(&self) -> &SelectedFile {
        match self {
            UploadItem::LivePhoto { image, .. } => image,
            UploadItem::Standalone(file) => file,
        }
    }
}

/// Staged upload state: items plus the caption shared by all of them.
/// Holds everything the upload flow needs, with explicit transitions
/// instead of ambient UI state.
#[derive(Debug, Default)]
pub struct UploadBatch {
    items: Vec<UploadItem>,
    caption: Option<String>,
}

impl UploadBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a selection. Validates every file's type, pairs live photos,
    /// and enforces the batch cap counting already-staged items. On any
    /// error nothing is staged.
    ///
    /// Pairing is first-match: each image takes the first not-yet-consumed
    /// video whose base name matches (case-insensitive). Extra files with
    /// the same base name stay standalone.
    pub fn stage(&mut self, files: Vec<SelectedFile>) -> Result<(), StageError> {
        let unsupported = files
            .iter()
            .filter(|f| !is_allowed(&f.content_type))
            .count();
        if unsupported > 0 {
            return Err(StageError::UnsupportedType { count: unsupported });
        }

        let new_items = pair_selection(files);
        let attempted = self.items.len() + new_items.len();
        if attempted > MAX_BATCH_UNITS {
            return Err(StageError::TooManyItems {
                attempted,
                limit: MAX_BATCH_UNITS,
            });
        }

        self.items.extend(new_items);
        Ok(())
    }

    pub fn set_caption(&mut self, caption: Option<String>) {
        self.caption = caption.filter(|c| !c.trim().is_empty());
    }

    pub fn caption(&self) -> Option<&str> {
        self.caption.as_deref()
    }

    pub fn items(&self) -> &[UploadItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Discard everything staged
    pub fn clear(&mut self) {
        self.items.clear();
        self.caption = None;
    }

    pub(crate) fn into_parts(self) -> (Vec<UploadItem>, Option<String>) {
        (self.items, self.caption)
    }
}

/// Pair images with matching videos; pairs come first (in image selection
/// order), then the remaining files in selection order.
fn pair_selection(files: Vec<SelectedFile>) -> Vec<UploadItem> {
    let mut slots: Vec<Option<SelectedFile>> = files.into_iter().map(Some).collect();
    let mut items: Vec<UploadItem> = Vec::new();

    for i in 0..slots.len() {
        let base = match slots[i].as_ref() {
            Some(f) if f.is_image() => f.base_name(),
            _ => continue,
        };

        let matched = (0..slots.len()).find(|&j| {
            j != i
                && slots[j]
                    .as_ref()
                    .is_some_and(|f| f.is_video() && f.base_name() == base)
        });

        if let Some(j) = matched {
            if let (Some(image), Some(video)) = (slots[i].take(), slots[j].take()) {
                items.push(UploadItem::LivePhoto { image, video });
            }
        }
    }

    items.extend(slots.into_iter().flatten().map(UploadItem::Standalone));
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, content_type: &str) -> SelectedFile {
        SelectedFile::new(name, content_type, Bytes::from_static(b"x"))
    }

    #[test]
    fn pairs_image_and_video_sharing_a_base_name() {
        let mut batch = UploadBatch::new();
        batch
            .stage(vec![
                file("IMG_0042.HEIC", "image/heic"),
                file("img_0042.mov", "video/quicktime"),
            ])
            .unwrap();

        assert_eq!(batch.len(), 1);
        assert!(batch.items()[0].is_live_photo());
    }

    #[test]
    fn every_file_lands_in_exactly_one_item() {
        let mut batch = UploadBatch::new();
        batch
            .stage(vec![
                file("a.jpg", "image/jpeg"),
                file("a.mov", "video/quicktime"),
                file("b.jpg", "image/jpeg"),
                file("c.mp4", "video/mp4"),
            ])
            .unwrap();

        // One pair plus two standalones
        assert_eq!(batch.len(), 3);
        let live: Vec<_> = batch.items().iter().map(|i| i.is_live_photo()).collect();
        assert_eq!(live, vec![true, false, false]);
    }

    #[test]
    fn first_matching_video_wins_and_both_are_consumed() {
        let mut batch = UploadBatch::new();
        batch
            .stage(vec![
                file("a.jpg", "image/jpeg"),
                file("a.mp4", "video/mp4"),
                file("a.mov", "video/quicktime"),
                file("a.png", "image/png"),
            ])
            .unwrap();

        // a.jpg pairs with a.mp4; a.png takes the remaining a.mov
        assert_eq!(batch.len(), 2);
        match &batch.items()[0] {
            UploadItem::LivePhoto { image, video } => {
                assert_eq!(image.name, "a.jpg");
                assert_eq!(video.name, "a.mp4");
            }
            other => panic!("expected a pair, got {:?}", other),
        }
        match &batch.items()[1] {
            UploadItem::LivePhoto { image, video } => {
                assert_eq!(image.name, "a.png");
                assert_eq!(video.name, "a.mov");
            }
            other => panic!("expected a pair, got {:?}", other),
        }
    }

    #[test]
    fn leftover_image_with_a_shared_base_stays_standalone() {
        let mut batch = UploadBatch::new();
        batch
            .stage(vec![
                file("a.jpg", "image/jpeg"),
                file("a.png", "image/png"),
                file("a.mp4", "video/mp4"),
            ])
            .unwrap();

        assert_eq!(batch.len(), 2);
        assert!(batch.items()[0].is_live_photo());
        assert_eq!(batch.items()[0].primary().name, "a.jpg");
        assert!(!batch.items()[1].is_live_photo());
        assert_eq!(batch.items()[1].primary().name, "a.png");
    }

    #[test]
    fn pairs_come_before_standalones() {
        let mut batch = UploadBatch::new();
        batch
            .stage(vec![
                file("solo1.jpg", "image/jpeg"),
                file("pair.jpg", "image/jpeg"),
                file("solo2.webm", "video/webm"),
                file("pair.mov", "video/quicktime"),
            ])
            .unwrap();

        let names: Vec<_> = batch.items().iter().map(|i| i.primary().name.as_str()).collect();
        assert_eq!(names, vec!["pair.jpg", "solo1.jpg", "solo2.webm"]);
    }

    #[test]
    fn an_unsupported_type_rejects_the_whole_selection() {
        let mut batch = UploadBatch::new();
        let result = batch.stage(vec![
            file("ok.jpg", "image/jpeg"),
            file("nope.pdf", "application/pdf"),
            file("nope.gif", "image/gif"),
        ]);

        assert!(matches!(result, Err(StageError::UnsupportedType { count: 2 })));
        assert!(batch.is_empty());
    }

    #[test]
    fn the_cap_counts_pairs_as_single_units() {
        let mut files = Vec::new();
        for i in 0..MAX_BATCH_UNITS {
            files.push(file(&format!("clip{}.jpg", i), "image/jpeg"));
            files.push(file(&format!("clip{}.mov", i), "video/quicktime"));
        }

        let mut batch = UploadBatch::new();
        batch.stage(files).unwrap();
        assert_eq!(batch.len(), MAX_BATCH_UNITS);

        let result = batch.stage(vec![file("extra.jpg", "image/jpeg")]);
        assert!(matches!(result, Err(StageError::TooManyItems { attempted: 11, .. })));
        assert_eq!(batch.len(), MAX_BATCH_UNITS);
    }

    #[test]
    fn staging_accumulates_across_calls() {
        let mut batch = UploadBatch::new();
        for i in 0..9 {
            batch
                .stage(vec![file(&format!("p{}.jpg", i), "image/jpeg")])
                .unwrap();
        }
        batch
            .stage(vec![
                file("last.jpg", "image/jpeg"),
                file("last.mov", "video/quicktime"),
            ])
            .unwrap();
        assert_eq!(batch.len(), 10);

        let result = batch.stage(vec![file("over.jpg", "image/jpeg")]);
        assert!(result.is_err());
    }

    #[test]
    fn clear_discards_items_and_caption() {
        let mut batch = UploadBatch::new();
        batch.stage(vec![file("a.jpg", "image/jpeg")]).unwrap();
        batch.set_caption(Some("hello".to_string()));

        batch.clear();
        assert!(batch.is_empty());
        assert_eq!(batch.caption(), None);
    }

    #[test]
    fn blank_captions_are_dropped() {
        let mut batch = UploadBatch::new();
        batch.set_caption(Some("   ".to_string()));
        assert_eq!(batch.caption(), None);
    }

    #[tokio::test]
    async fn loading_from_disk_guesses_the_content_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dance.jpg");
        tokio::fs::write(&path, b"not really a jpeg").await.unwrap();

        let selected = SelectedFile::from_path(&path).await.unwrap();
        assert_eq!(selected.name, "dance.jpg");
        assert_eq!(selected.content_type, "image/jpeg");
        assert!(selected.is_image());
        assert_eq!(selected.base_name(), "dance");
    }
}
