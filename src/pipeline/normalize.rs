use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageReader, ImageResult};
use std::io::Cursor;

use super::batch::SelectedFile;

/// Descending JPEG qualities tried until the output fits the byte target.
const QUALITY_LADDER: [u8; 4] = [85, 75, 65, 55];

/// Recompression targets. Defaults follow the app: about 1 MiB per photo,
/// nothing longer than 1920 px.
#[derive(Debug, Clone, Copy)]
pub struct CompressionOptions {
    pub max_bytes: usize,
    pub max_edge_px: u32,
}

impl Default for CompressionOptions {
    fn default() -> Self {
        Self {
            max_bytes: 1024 * 1024,
            max_edge_px: 1920,
        }
    }
}

/// Bytes ready for transfer, with probed display dimensions when known
#[derive(Debug, Clone)]
pub struct NormalizedMedia {
    pub data: Bytes,
    pub content_type: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Read just enough of an image to learn its dimensions
pub fn probe_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    let reader = ImageReader::new(Cursor::new(data)).with_guessed_format().ok()?;
    reader.into_dimensions().ok()
}

/// Pass bytes through untouched. Videos are never re-encoded here and
/// carry no dimensions.
pub fn pass_through(file: &SelectedFile) -> NormalizedMedia {
    let dims = if file.is_image() {
        probe_dimensions(&file.data)
    } else {
        None
    };

    NormalizedMedia {
        data: file.data.clone(),
        content_type: file.content_type.clone(),
        width: dims.map(|(w, _)| w),
        height: dims.map(|(_, h)| h),
    }
}

/// Recompress an image for upload. Total: any decode or encode failure
/// falls back to the original bytes, so an exotic format (HEIC straight
/// off a phone) still uploads. Progress is reported as a 0..1 fraction.
pub fn compress_image<F>(
    file: &SelectedFile,
    options: &CompressionOptions,
    mut progress: F,
) -> NormalizedMedia
where
    F: FnMut(f32),
{
    let result = try_compress(file, options, &mut progress);
    progress(1.0);

    match result {
        Ok(media) => media,
        Err(e) => {
            tracing::debug!("Keeping original bytes for {}: {}", file.name, e);
            pass_through(file)
        }
    }
}

fn try_compress<F>(
    file: &SelectedFile,
    options: &CompressionOptions,
    progress: &mut F,
) -> ImageResult<NormalizedMedia>
where
    F: FnMut(f32),
{
    let reader = ImageReader::new(Cursor::new(file.data.as_ref())).with_guessed_format()?;
    let mut decoder = reader.into_decoder()?;
    let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);
    let mut image = DynamicImage::from_decoder(decoder)?;
    progress(0.2);

    // Bake the EXIF orientation into pixels; the re-encoded JPEG carries none
    image.apply_orientation(orientation);
    let (source_w, source_h) = (image.width(), image.height());

    // Small enough already: keep the original bytes and just report dims
    if file.data.len() <= options.max_bytes && source_w.max(source_h) <= options.max_edge_px {
        return Ok(NormalizedMedia {
            data: file.data.clone(),
            content_type: file.content_type.clone(),
            width: Some(source_w),
            height: Some(source_h),
        });
    }

    if source_w.max(source_h) > options.max_edge_px {
        image = image.resize(options.max_edge_px, options.max_edge_px, FilterType::Lanczos3);
    }
    progress(0.4);

    // JPEG output; flatten any alpha channel first
    let image = DynamicImage::ImageRgb8(image.to_rgb8());
    let (width, height) = (image.width(), image.height());

    let steps = QUALITY_LADDER.len();
    let mut encoded = encode_jpeg(&image, QUALITY_LADDER[0])?;
    progress(0.4 + 0.5 / steps as f32);
    for (i, quality) in QUALITY_LADDER.iter().enumerate().skip(1) {
        if encoded.len() <= options.max_bytes {
            break;
        }
        encoded = encode_jpeg(&image, *quality)?;
        progress(0.4 + 0.5 * (i + 1) as f32 / steps as f32);
    }

    // Recompression that grows the file is worse than no recompression
    if encoded.len() >= file.data.len() {
        return Ok(NormalizedMedia {
            data: file.data.clone(),
            content_type: file.content_type.clone(),
            width: Some(source_w),
            height: Some(source_h),
        });
    }

    Ok(NormalizedMedia {
        data: Bytes::from(encoded),
        content_type: "image/jpeg".to_string(),
        width: Some(width),
        height: Some(height),
    })
}

fn encode_jpeg(image: &DynamicImage, quality: u8) -> ImageResult<Vec<u8>> {
    let mut out = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut out, quality);
    image.write_with_encoder(encoder)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbImage};

    fn png_file(name: &str, width: u32, height: u32) -> SelectedFile {
        let img = RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        });
        encode_png(name, img)
    }

    // Pixel noise defeats PNG compression, so the file is genuinely large
    // and recompression is guaranteed to shrink it
    fn noisy_png_file(name: &str, width: u32, height: u32) -> SelectedFile {
        let img = RgbImage::from_fn(width, height, |x, y| {
            let mut h = x.wrapping_mul(0x9E37_79B1) ^ y.wrapping_mul(0x85EB_CA77);
            h ^= h >> 13;
            h = h.wrapping_mul(0xC2B2_AE3D);
            h ^= h >> 16;
            image::Rgb([h as u8, (h >> 8) as u8, (h >> 16) as u8])
        });
        encode_png(name, img)
    }

    fn encode_png(name: &str, img: RgbImage) -> SelectedFile {
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        SelectedFile::new(name, "image/png", Bytes::from(buf))
    }

    #[test]
    fn probe_returns_none_for_garbage() {
        assert_eq!(probe_dimensions(b"definitely not an image"), None);
    }

    #[test]
    fn probe_reads_png_dimensions() {
        let file = png_file("p.png", 320, 200);
        assert_eq!(probe_dimensions(&file.data), Some((320, 200)));
    }

    #[test]
    fn undecodable_input_passes_through_byte_identical() {
        let file = SelectedFile::new("weird.heic", "image/heic", Bytes::from_static(b"\x00\x01\x02"));
        let out = compress_image(&file, &CompressionOptions::default(), |_| {});

        assert_eq!(out.data, file.data);
        assert_eq!(out.content_type, "image/heic");
        assert_eq!(out.width, None);
        assert_eq!(out.height, None);
    }

    #[test]
    fn small_images_keep_their_original_bytes() {
        let file = png_file("small.png", 100, 50);
        let out = compress_image(&file, &CompressionOptions::default(), |_| {});

        assert_eq!(out.data, file.data);
        assert_eq!(out.content_type, "image/png");
        assert_eq!(out.width, Some(100));
        assert_eq!(out.height, Some(50));
    }

    #[test]
    fn oversized_images_are_resized_under_the_edge_cap() {
        let file = noisy_png_file("wide.png", 2400, 1200);
        let out = compress_image(&file, &CompressionOptions::default(), |_| {});

        assert_eq!(out.content_type, "image/jpeg");
        assert_eq!(out.width, Some(1920));
        assert_eq!(out.height, Some(960));
        assert!(out.data.len() < file.data.len());
        assert_eq!(probe_dimensions(&out.data), Some((1920, 960)));
    }

    #[test]
    fn progress_is_monotonic_and_ends_at_one() {
        let file = png_file("wide.png", 2400, 1200);
        let mut seen: Vec<f32> = Vec::new();
        compress_image(&file, &CompressionOptions::default(), |p| seen.push(p));

        assert!(!seen.is_empty());
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*seen.last().unwrap(), 1.0);
    }

    #[test]
    fn videos_pass_through_without_dimensions() {
        let file = SelectedFile::new("clip.mp4", "video/mp4", Bytes::from_static(b"frames"));
        let out = pass_through(&file);

        assert_eq!(out.data, file.data);
        assert_eq!(out.content_type, "video/mp4");
        assert_eq!(out.width, None);
    }
}
