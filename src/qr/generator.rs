//! QR code rendering.

use image::{DynamicImage, Luma};
use qrcode::render::svg;
use qrcode::{EcLevel, QrCode};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while rendering a QR code.
#[derive(Error, Debug)]
pub enum QrError {
    #[error("QR code generation failed: {0}")]
    QrGenerationError(String),

    #[error("Image save error: {0}")]
    ImageSaveError(String),

    #[error("Payload serialization failed: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Output format for QR codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QrFormat {
    /// PNG image (default)
    #[default]
    Png,
    /// SVG vector image
    Svg,
    /// ASCII art (for terminal display)
    Ascii,
}

impl QrFormat {
    /// Picks the format from a file extension: `.svg`, `.txt` for ASCII,
    /// PNG for anything else.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .as_deref()
        {
            Some("svg") => Self::Svg,
            Some("txt") => Self::Ascii,
            _ => Self::Png,
        }
    }
}

/// Configuration for QR code generation.
#[derive(Debug, Clone)]
pub struct QrConfig {
    /// Error correction level (default: Medium)
    pub ec_level: EcLevel,
    /// Module size in pixels (default: 10)
    pub module_size: u32,
    /// Draw the quiet zone border (default: true)
    pub quiet_zone: bool,
    /// Output format
    pub format: QrFormat,
}

impl Default for QrConfig {
    fn default() -> Self {
        Self {
            ec_level: EcLevel::M,
            module_size: 10,
            quiet_zone: true,
            format: QrFormat::Png,
        }
    }
}

/// Output from QR code generation.
pub enum QrOutput {
    /// PNG/image output
    Image(DynamicImage),
    /// SVG string output
    Svg(String),
    /// ASCII art output
    Ascii(String),
}

/// Renders `text` as a QR code in the configured format.
pub fn generate_qr(text: &str, config: &QrConfig) -> Result<QrOutput, QrError> {
    let qr = QrCode::with_error_correction_level(text.as_bytes(), config.ec_level)
        .map_err(|e| QrError::QrGenerationError(e.to_string()))?;

    match config.format {
        QrFormat::Png => {
            let image = qr
                .render::<Luma<u8>>()
                .min_dimensions(100, 100)
                .quiet_zone(config.quiet_zone)
                .module_dimensions(config.module_size, config.module_size)
                .build();

            Ok(QrOutput::Image(DynamicImage::ImageLuma8(image)))
        }
        QrFormat::Svg => {
            let svg_string = qr
                .render()
                .min_dimensions(200, 200)
                .quiet_zone(config.quiet_zone)
                .dark_color(svg::Color("#000000"))
                .light_color(svg::Color("#ffffff"))
                .build();

            Ok(QrOutput::Svg(svg_string))
        }
        QrFormat::Ascii => {
            let ascii = qr
                .render::<char>()
                .quiet_zone(config.quiet_zone)
                .module_dimensions(2, 1)
                .build();

            Ok(QrOutput::Ascii(ascii))
        }
    }
}

/// Renders `text` and writes it to `path`, creating parent directories.
pub fn generate_qr_to_file<P: AsRef<Path>>(
    text: &str,
    path: P,
    config: &QrConfig,
) -> Result<(), QrError> {
    let path = path.as_ref();
    let output = generate_qr(text, config)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    match output {
        QrOutput::Image(img) => {
            img.save_with_format(path, image::ImageFormat::Png)
                .map_err(|e| QrError::ImageSaveError(e.to_string()))?;
        }
        QrOutput::Svg(text) | QrOutput::Ascii(text) => {
            std::fs::write(path, text)?;
        }
    }

    Ok(())
}
