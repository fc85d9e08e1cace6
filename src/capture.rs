//! Capture-provider boundary
//!
//! The engine never touches pixels or image codecs itself; everything that
//! grabs, encodes, or writes image data sits behind [`CaptureProvider`]. This
//! module defines that seam plus the value types that cross it.

use std::fmt;
use std::path::Path;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Component selector handed to the provider and the macro engine for region
/// grabs (screens use 0 for the active window and 1..N for displays).
pub const REGION_COMPONENT: i32 = -1;

/// Errors a capture provider can report outside the normal
/// success/failure bookkeeping. These abort the current pass.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Capture error: {0}")]
    CaptureFailed(String),

    #[error("Encoding error: {0}")]
    EncodingFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for capture operations
pub type CaptureResult<T> = Result<T, CaptureError>;

/// Raw pixel data from a capture source (BGRA)
#[derive(Debug, Clone)]
pub struct CapturedImage {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Bytes per row (may include padding)
    pub bytes_per_row: u32,
}

/// An explicit rectangle on the virtual desktop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// What to grab on a capture attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureSource {
    /// The currently focused window, bounds resolved by the provider.
    ActiveWindow,
    /// An enumerated display (1-based index).
    Display(u32),
    /// An explicit rectangle.
    Area(Rect),
}

impl CaptureSource {
    /// The component selector this source presents to the provider and the
    /// macro engine.
    pub fn component(&self) -> i32 {
        match self {
            CaptureSource::ActiveWindow => 0,
            CaptureSource::Display(index) => *index as i32,
            CaptureSource::Area(_) => REGION_COMPONENT,
        }
    }
}

/// Output image format selector. The canonical lowercase name is what the
/// store persists and the macro engine substitutes for `%format%`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Bmp,
    Gif,
    #[default]
    Jpeg,
    Png,
    Tiff,
}

impl ImageFormat {
    pub fn name(&self) -> &'static str {
        match self {
            ImageFormat::Bmp => "bmp",
            ImageFormat::Gif => "gif",
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Png => "png",
            ImageFormat::Tiff => "tiff",
        }
    }

    /// Parse a canonical format name, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "bmp" => Some(ImageFormat::Bmp),
            "gif" => Some(ImageFormat::Gif),
            "jpeg" => Some(ImageFormat::Jpeg),
            "png" => Some(ImageFormat::Png),
            "tiff" => Some(ImageFormat::Tiff),
            _ => None,
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a persisted screenshot represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScreenshotKind {
    ActiveWindow,
    Screen,
    Region,
}

/// Everything the provider needs to persist one captured image.
#[derive(Debug, Clone)]
pub struct SaveRequest {
    pub path: String,
    pub format: ImageFormat,
    pub quality: u8,
    pub kind: ScreenshotKind,
    pub component: i32,
    /// Correlates the write back to the target that produced it.
    pub view_id: Uuid,
    /// Only populated when the labeling feature is enabled.
    pub label: Option<String>,
    pub window_title: String,
    pub process_name: String,
}

/// One entry in the screenshot log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenshotRecord {
    pub view_id: Uuid,
    pub path: String,
    pub kind: ScreenshotKind,
    pub component: i32,
    pub format: ImageFormat,
    pub taken_at: DateTime<Local>,
    pub window_title: String,
    pub process_name: String,
    pub label: Option<String>,
}

impl ScreenshotRecord {
    pub fn from_request(request: &SaveRequest) -> Self {
        Self {
            view_id: request.view_id,
            path: request.path.clone(),
            kind: request.kind,
            component: request.component,
            format: request.format,
            taken_at: Local::now(),
            window_title: request.window_title.clone(),
            process_name: request.process_name.clone(),
            label: request.label.clone(),
        }
    }
}

/// Append-only log of screenshots taken this session. The provider appends a
/// record for every successful write; the shell reads it for the interface
/// and can export it as JSON.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ScreenshotLog {
    entries: Vec<ScreenshotRecord>,
}

impl ScreenshotLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, record: ScreenshotRecord) {
        self.entries.push(record);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ScreenshotRecord> {
        self.entries.iter()
    }

    pub fn last(&self) -> Option<&ScreenshotRecord> {
        self.entries.last()
    }

    pub fn export_json(&self, path: &Path) -> CaptureResult<()> {
        let data = serde_json::to_vec_pretty(&self.entries)
            .map_err(|e| CaptureError::EncodingFailed(e.to_string()))?;
        std::fs::write(path, data)?;
        Ok(())
    }
}

/// A detected physical display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayInfo {
    /// 1-based index, matching the Screen component selector.
    pub index: u32,
    pub bounds: Rect,
}

/// The capture provider the engine drives.
///
/// `acquire` returning `Ok(None)` means there was nothing to grab (for
/// example an unplugged display); the engine skips the target without
/// counting a failure. `persist` returning `Ok(false)` is the counted
/// per-target failure; `Err` from either aborts the whole pass.
pub trait CaptureProvider {
    fn displays(&self) -> Vec<DisplayInfo>;

    fn active_window_title(&self) -> String;

    fn active_window_process(&self) -> String;

    fn acquire(
        &mut self,
        source: CaptureSource,
        mouse: bool,
        scale: u32,
    ) -> CaptureResult<Option<CapturedImage>>;

    fn persist(
        &mut self,
        request: &SaveRequest,
        image: CapturedImage,
        log: &mut ScreenshotLog,
    ) -> CaptureResult<bool>;
}
