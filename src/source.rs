//! Turning uploaded files into a bitmap plus intrinsic dimensions.
//!
//! Raster images are decoded as-is. PDFs are rasterized (first page only)
//! at twice their size while the reported dimensions stay at 1x, so drawn
//! coordinates line up with the document's own point space.

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, RgbaImage};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use tracing::{debug, info, warn};

use crate::error::SourceError;
use crate::transform::ImageDimensions;

/// Supersampling factor used when rasterizing PDF pages.
pub const PDF_RENDER_SCALE: f32 = 2.0;

/// Output format for converted pages.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RasterFormat {
    /// Lossless
    #[default]
    Png,
    /// Lossy, smaller
    Jpeg,
}

impl RasterFormat {
    pub fn label(&self) -> &'static str {
        match self {
            RasterFormat::Png => "PNG (lossless)",
            RasterFormat::Jpeg => "JPEG (lossy)",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceKind {
    Raster,
    Pdf,
}

pub struct LoadedImage {
    pub file_name: String,
    pub kind: SourceKind,
    pub bitmap: RgbaImage,
    pub dimensions: ImageDimensions,
}

impl std::fmt::Debug for LoadedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedImage")
            .field("file_name", &self.file_name)
            .field("kind", &self.kind)
            .field("bitmap", &(self.bitmap.width(), self.bitmap.height()))
            .field("dimensions", &self.dimensions)
            .finish()
    }
}

pub fn detect_kind(file_name: &str, bytes: &[u8]) -> SourceKind {
    let has_pdf_extension = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
    if bytes.starts_with(b"%PDF") || has_pdf_extension {
        SourceKind::Pdf
    } else {
        SourceKind::Raster
    }
}

pub fn decode_raster(file_name: &str, bytes: &[u8]) -> Result<LoadedImage, SourceError> {
    let image = image::load_from_memory(bytes).map_err(|source| SourceError::Decode {
        file_name: file_name.to_owned(),
        source,
    })?;
    let bitmap = image.to_rgba8();
    let dimensions = ImageDimensions::new(bitmap.width() as f64, bitmap.height() as f64);
    Ok(LoadedImage {
        file_name: file_name.to_owned(),
        kind: SourceKind::Raster,
        bitmap,
        dimensions,
    })
}

/// Encodes `bitmap` in `format` and decodes it again, so the displayed page
/// carries the chosen format's artifacts.
fn reencode(bitmap: RgbaImage, format: RasterFormat, jpeg_quality: u8) -> Result<RgbaImage, SourceError> {
    let mut buf = Vec::new();
    let image = DynamicImage::ImageRgba8(bitmap);
    match format {
        RasterFormat::Png => image
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .map_err(SourceError::Encode)?,
        RasterFormat::Jpeg => {
            // JPEG has no alpha channel
            let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
            let encoder = JpegEncoder::new_with_quality(&mut buf, jpeg_quality);
            rgb.write_with_encoder(encoder).map_err(SourceError::Encode)?;
        }
    }
    debug!(?format, encoded_bytes = buf.len(), "page encoded");
    let decoded = image::load_from_memory(&buf).map_err(SourceError::Encode)?;
    Ok(decoded.to_rgba8())
}

#[cfg(feature = "pdf")]
pub fn convert_pdf(
    file_name: &str,
    bytes: &[u8],
    format: RasterFormat,
    jpeg_quality: u8,
) -> Result<LoadedImage, SourceError> {
    use pdfium_render::prelude::*;

    let pdf_error = |e: PdfiumError| SourceError::Pdf {
        file_name: file_name.to_owned(),
        reason: format!("{e:?}"),
    };

    let bindings = Pdfium::bind_to_system_library()
        .map_err(|e| SourceError::RendererUnavailable(format!("{e:?}")))?;
    let pdfium = Pdfium::new(bindings);
    let document = pdfium
        .load_pdf_from_byte_slice(bytes, None)
        .map_err(pdf_error)?;
    let pages = document.pages();
    if pages.len() == 0 {
        return Err(SourceError::EmptyPdf(file_name.to_owned()));
    }
    let page = pages.get(0).map_err(pdf_error)?;

    let dimensions = ImageDimensions::new(page.width().value as f64, page.height().value as f64);
    let config = PdfRenderConfig::new().scale_page_by_factor(PDF_RENDER_SCALE);
    let rendered = page.render_with_config(&config).map_err(pdf_error)?;
    let (width, height) = (rendered.width() as u32, rendered.height() as u32);
    let bitmap = RgbaImage::from_raw(width, height, rendered.as_rgba_bytes()).ok_or_else(|| {
        SourceError::Pdf {
            file_name: file_name.to_owned(),
            reason: "rendered bitmap has an unexpected size".into(),
        }
    })?;
    let bitmap = reencode(bitmap, format, jpeg_quality)?;

    info!(
        file_name,
        page_width = dimensions.width,
        page_height = dimensions.height,
        raster_width = bitmap.width(),
        raster_height = bitmap.height(),
        ?format,
        "PDF page rasterized"
    );
    Ok(LoadedImage {
        file_name: file_name.to_owned(),
        kind: SourceKind::Pdf,
        bitmap,
        dimensions,
    })
}

#[cfg(not(feature = "pdf"))]
pub fn convert_pdf(
    _file_name: &str,
    _bytes: &[u8],
    _format: RasterFormat,
    _jpeg_quality: u8,
) -> Result<LoadedImage, SourceError> {
    Err(SourceError::PdfUnsupported)
}

/// An upload waiting to be decoded.
#[derive(Debug)]
pub struct PendingUpload {
    pub path: PathBuf,
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub kind: SourceKind,
}

impl PendingUpload {
    pub fn read(path: &Path) -> Result<Self, SourceError> {
        let bytes = std::fs::read(path).map_err(|source| SourceError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let kind = detect_kind(&file_name, &bytes);
        Ok(Self {
            path: path.to_path_buf(),
            file_name,
            bytes,
            kind,
        })
    }

    pub fn load(self, format: RasterFormat, jpeg_quality: u8) -> Result<LoadedImage, SourceError> {
        match self.kind {
            SourceKind::Raster => decode_raster(&self.file_name, &self.bytes),
            SourceKind::Pdf => convert_pdf(&self.file_name, &self.bytes, format, jpeg_quality),
        }
    }
}

/// One decode/convert running on a worker thread.
///
/// There is no cancellation: once spawned, the job runs to completion.
pub struct ConversionJob {
    file_name: String,
    receiver: Receiver<Result<LoadedImage, SourceError>>,
}

impl ConversionJob {
    pub fn spawn(
        upload: PendingUpload,
        format: RasterFormat,
        jpeg_quality: u8,
        ctx: egui::Context,
    ) -> Self {
        let (sender, receiver) = mpsc::channel();
        let file_name = upload.file_name.clone();
        info!(%file_name, kind = ?upload.kind, "conversion started");
        std::thread::spawn(move || {
            let result = upload.load(format, jpeg_quality);
            if sender.send(result).is_err() {
                warn!("conversion finished after its receiver was dropped");
            }
            ctx.request_repaint();
        });
        Self {
            file_name,
            receiver,
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// `None` while the worker is still running.
    pub fn poll(&self) -> Option<Result<LoadedImage, SourceError>> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(SourceError::WorkerDisconnected)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let mut buf = Vec::new();
        DynamicImage::ImageRgba8(RgbaImage::new(width, height))
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn test_detect_kind_by_magic_and_extension() {
        assert_eq!(detect_kind("scan.bin", b"%PDF-1.7\n"), SourceKind::Pdf);
        assert_eq!(detect_kind("Scan.PDF", b"garbage"), SourceKind::Pdf);
        assert_eq!(detect_kind("photo.png", &png_bytes(1, 1)), SourceKind::Raster);
    }

    #[test]
    fn test_decode_raster_reports_pixel_dimensions() {
        let loaded = decode_raster("a.png", &png_bytes(64, 32)).unwrap();
        assert_eq!(loaded.dimensions, ImageDimensions::new(64.0, 32.0));
        assert_eq!(loaded.kind, SourceKind::Raster);
        assert_eq!(loaded.bitmap.dimensions(), (64, 32));
    }

    #[test]
    fn test_corrupt_raster_is_an_error() {
        assert_matches!(
            decode_raster("broken.png", b"not an image"),
            Err(SourceError::Decode { .. })
        );
    }

    const DEFAULT_QUALITY: u8 = crate::config::DEFAULT_JPEG_QUALITY;

    #[test]
    fn test_reencode_keeps_size_for_both_formats() {
        for format in [RasterFormat::Png, RasterFormat::Jpeg] {
            let out = reencode(RgbaImage::new(20, 10), format, DEFAULT_QUALITY).unwrap();
            assert_eq!(out.dimensions(), (20, 10));
        }
    }

    #[test]
    fn test_job_reports_result() {
        let upload = PendingUpload {
            path: PathBuf::from("a.png"),
            file_name: "a.png".into(),
            bytes: png_bytes(8, 8),
            kind: SourceKind::Raster,
        };
        let job = ConversionJob::spawn(upload, RasterFormat::Png, DEFAULT_QUALITY, egui::Context::default());
        assert_eq!(job.file_name(), "a.png");
        let result = loop {
            if let Some(result) = job.poll() {
                break result;
            }
            std::thread::yield_now();
        };
        assert_eq!(result.unwrap().dimensions, ImageDimensions::new(8.0, 8.0));
    }
}
