//! QR marker recognition
//!
//! Runs two independent decode backends over a ladder of preprocessed
//! frames. A frame only counts as a marker when its text parses as an
//! identity payload; venue signage and stray QR codes stay invisible to the
//! pipeline.

use fotoflow_common::{Error, Result};
use image::imageops::FilterType;
use image::GrayImage;
use std::path::Path;

use crate::models::IdentityPayload;
use crate::services::preprocess::{
    Transform, BINARIZATION_LADDER, ENHANCEMENT_LADDER, FULL_RES_LADDER,
};

/// How much preprocessing effort to spend per photo
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeMode {
    /// Single decode pass on the downscaled frame
    Fast,
    /// Full enhancement, full-resolution retry, and binarization ladders
    Thorough,
}

/// Outcome of scanning one photo
#[derive(Debug, Clone)]
pub struct QrScan {
    /// True only when a QR code decoded AND its text parsed as an identity
    pub detected: bool,
    /// Raw decoded text, kept even when it failed identity parsing
    pub raw: Option<String>,
    /// Parsed identity payload when detection succeeded
    pub payload: Option<IdentityPayload>,
    /// Name of the preprocessing pass that produced the decode
    pub strategy: Option<&'static str>,
}

impl QrScan {
    fn miss(raw: Option<String>) -> Self {
        Self {
            detected: false,
            raw,
            payload: None,
            strategy: None,
        }
    }
}

/// Marker scanner over image files
#[derive(Debug, Clone)]
pub struct QrDecoder {
    max_dimension: u32,
    mode: DecodeMode,
}

impl QrDecoder {
    pub fn new(max_dimension: u32, mode: DecodeMode) -> Self {
        Self {
            max_dimension,
            mode,
        }
    }

    /// Scan an image file on disk.
    ///
    /// A missing file is `NotFound` and an unreadable file is `Image`; the
    /// caller decides whether either is fatal for the batch.
    pub fn decode_path(&self, path: &Path) -> Result<QrScan> {
        if !path.exists() {
            return Err(Error::NotFound(format!(
                "photo file missing: {}",
                path.display()
            )));
        }
        let img = image::open(path)
            .map_err(|e| Error::Image(format!("{}: {e}", path.display())))?;
        Ok(self.decode_image(&img.to_luma8()))
    }

    /// Scan an in-memory grayscale frame
    pub fn decode_image(&self, full: &GrayImage) -> QrScan {
        let work = self.downscale(full);
        let was_downscaled = work.dimensions() != full.dimensions();
        let mut last_raw = None;

        if let Some(scan) = self.attempt("plain", &work, &mut last_raw) {
            return scan;
        }
        if self.mode == DecodeMode::Fast {
            return QrScan::miss(last_raw);
        }

        if let Some(scan) = self.run_ladder(ENHANCEMENT_LADDER, &work, &mut last_raw) {
            return scan;
        }
        // Downscaling can blur small markers below decodability; retry on
        // the untouched frame before the expensive binarization passes.
        if was_downscaled {
            if let Some(scan) = self.run_ladder(FULL_RES_LADDER, full, &mut last_raw) {
                return scan;
            }
        }
        if let Some(scan) = self.run_ladder(BINARIZATION_LADDER, &work, &mut last_raw) {
            return scan;
        }

        QrScan::miss(last_raw)
    }

    fn run_ladder(
        &self,
        ladder: &[Transform],
        frame: &GrayImage,
        last_raw: &mut Option<String>,
    ) -> Option<QrScan> {
        for (name, transform) in ladder {
            if let Some(scan) = self.attempt(name, &transform(frame), last_raw) {
                return Some(scan);
            }
        }
        None
    }

    fn attempt(
        &self,
        strategy: &'static str,
        frame: &GrayImage,
        last_raw: &mut Option<String>,
    ) -> Option<QrScan> {
        let raw = scan_frame(frame)?;
        match IdentityPayload::decode(&raw) {
            Some(payload) => {
                tracing::debug!(strategy, "QR marker decoded");
                Some(QrScan {
                    detected: true,
                    raw: Some(raw),
                    payload: Some(payload),
                    strategy: Some(strategy),
                })
            }
            None => {
                tracing::debug!(strategy, raw = %raw, "QR text did not parse as identity");
                *last_raw = Some(raw);
                None
            }
        }
    }

    fn downscale(&self, img: &GrayImage) -> GrayImage {
        let (w, h) = img.dimensions();
        let longest = w.max(h);
        if longest <= self.max_dimension {
            return img.clone();
        }
        let scale = self.max_dimension as f32 / longest as f32;
        let nw = ((w as f32 * scale).round() as u32).max(1);
        let nh = ((h as f32 * scale).round() as u32).max(1);
        image::imageops::resize(img, nw, nh, FilterType::Triangle)
    }
}

/// Run both decode backends over one frame, first hit wins
fn scan_frame(frame: &GrayImage) -> Option<String> {
    if let Some(text) = scan_rqrr(frame) {
        return Some(text);
    }
    scan_quircs(frame)
}

fn scan_rqrr(frame: &GrayImage) -> Option<String> {
    let w = frame.width() as usize;
    let h = frame.height() as usize;
    let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(w, h, |x, y| {
        frame.get_pixel(x as u32, y as u32).0[0]
    });
    for grid in prepared.detect_grids() {
        if let Ok((_, text)) = grid.decode() {
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    None
}

fn scan_quircs(frame: &GrayImage) -> Option<String> {
    let mut decoder = quircs::Quirc::default();
    let codes = decoder.identify(
        frame.width() as usize,
        frame.height() as usize,
        frame.as_raw(),
    );
    for code in codes {
        let Ok(code) = code else { continue };
        let Ok(data) = code.decode() else { continue };
        if let Ok(text) = String::from_utf8(data.payload) {
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use qrcode::QrCode;

    fn marker_image(text: &str) -> GrayImage {
        QrCode::new(text.as_bytes())
            .unwrap()
            .render::<Luma<u8>>()
            .min_dimensions(300, 300)
            .build()
    }

    #[test]
    fn decodes_identity_marker() {
        let decoder = QrDecoder::new(1200, DecodeMode::Fast);
        let img = marker_image("Alice|Smith|alice@example.com|7|tok-alice");
        let scan = decoder.decode_image(&img);
        assert!(scan.detected);
        let payload = scan.payload.unwrap();
        assert_eq!(payload.registration_id, 7);
        assert_eq!(payload.first_name, "Alice");
        assert_eq!(scan.strategy, Some("plain"));
    }

    #[test]
    fn foreign_qr_is_not_a_marker() {
        let decoder = QrDecoder::new(1200, DecodeMode::Fast);
        let scan = decoder.decode_image(&marker_image("https://example.com/menu"));
        assert!(!scan.detected);
        assert_eq!(scan.raw.as_deref(), Some("https://example.com/menu"));
        assert!(scan.payload.is_none());
    }

    #[test]
    fn blank_frame_is_a_clean_miss() {
        let decoder = QrDecoder::new(1200, DecodeMode::Thorough);
        let blank = GrayImage::from_pixel(200, 200, Luma([200]));
        let scan = decoder.decode_image(&blank);
        assert!(!scan.detected);
        assert!(scan.raw.is_none());
    }

    #[test]
    fn oversized_frame_is_downscaled_and_still_decodes() {
        let decoder = QrDecoder::new(1200, DecodeMode::Thorough);
        let img = marker_image("Bob|Jones|bob@example.com|9|tok-bob");
        let big = image::imageops::resize(&img, 2400, 2400, FilterType::Nearest);
        let scan = decoder.decode_image(&big);
        assert!(scan.detected);
        assert_eq!(scan.payload.unwrap().registration_id, 9);
    }

    #[test]
    fn missing_file_is_not_found() {
        let decoder = QrDecoder::new(1200, DecodeMode::Fast);
        let err = decoder
            .decode_path(Path::new("/nonexistent/photo.jpg"))
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
