use std::io::{Cursor, Write};

use image::imageops::{self, FilterType};
use image::{ImageFormat, Rgba, RgbaImage};
use qrcode::{Color, EcLevel, QrCode};
use serde::Deserialize;
use tempfile::NamedTempFile;
use thiserror::Error;

pub const DEFAULT_FOREGROUND: u32 = 0xFF00_0000;
pub const DEFAULT_BACKGROUND: u32 = 0xFFFF_FFFF;
pub const DEFAULT_SIZE: u32 = 300;

const QUIET_ZONE_MODULES: u32 = 4;
const LOGO_QUIET_ZONE_MODULES: u32 = 1;

#[derive(Debug, Error)]
#[error("malformed color value {input:?}: expected hexadecimal ARGB such as 0xFF000000")]
pub struct ColorParseError {
    pub input: String,
}

#[derive(Debug, Error)]
pub enum LogoLoadError {
    #[error("failed to fetch logo from {url}: {source}")]
    Fetch {
        url: String,
        source: reqwest::Error,
    },
    #[error("logo request to {url} returned status {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("failed to read logo file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("logo is not a decodable image: {0}")]
    Decode(#[from] image::ImageError),
}

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("width and height must be positive, got {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("requested {width}x{height} cannot fit a {modules}-module symbol")]
    TooSmall {
        width: u32,
        height: u32,
        modules: u32,
    },
    #[error("text cannot be represented as a QR symbol: {0}")]
    Symbology(#[from] qrcode::types::QrError),
    #[error("failed to encode PNG image: {0}")]
    Image(#[from] image::ImageError),
    #[error("failed to write encoded image: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Logo(#[from] LogoLoadError),
}

/// Packed 32-bit ARGB foreground/background pair.
#[derive(Debug, Clone, Copy)]
pub struct QrStyle {
    pub foreground: u32,
    pub background: u32,
}

impl Default for QrStyle {
    fn default() -> Self {
        Self {
            foreground: DEFAULT_FOREGROUND,
            background: DEFAULT_BACKGROUND,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogoStyle {
    #[default]
    Plain,
    Circle,
}

#[derive(Debug, Clone)]
pub struct Logo {
    pub bytes: Vec<u8>,
    pub style: LogoStyle,
}

/// Parses an optionally `0x`-prefixed hexadecimal ARGB color.
pub fn parse_hex_color(input: &str) -> Result<u32, ColorParseError> {
    let hex = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .unwrap_or(input);
    if hex.is_empty() {
        return Err(ColorParseError {
            input: input.to_string(),
        });
    }
    u32::from_str_radix(hex, 16).map_err(|_| ColorParseError {
        input: input.to_string(),
    })
}

/// Loads logo bytes from an HTTP(S) URL or a local file path.
pub async fn fetch_logo(location: &str) -> Result<Vec<u8>, LogoLoadError> {
    if location.starts_with("http://") || location.starts_with("https://") {
        let response = reqwest::Client::new()
            .get(location)
            .send()
            .await
            .map_err(|source| LogoLoadError::Fetch {
                url: location.to_string(),
                source,
            })?;
        if !response.status().is_success() {
            return Err(LogoLoadError::Status {
                url: location.to_string(),
                status: response.status(),
            });
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|source| LogoLoadError::Fetch {
                url: location.to_string(),
                source,
            })?;
        Ok(bytes.to_vec())
    } else {
        tokio::fs::read(location)
            .await
            .map_err(|source| LogoLoadError::Read {
                path: location.to_string(),
                source,
            })
    }
}

/// Encodes `text` into a PNG of exactly `width` x `height` pixels. The module
/// matrix plus quiet zone is scaled by an integer factor and centered; the
/// background color fills the remainder.
pub fn encode_png(
    text: &str,
    width: u32,
    height: u32,
    style: &QrStyle,
    logo: Option<&Logo>,
) -> Result<Vec<u8>, EncodeError> {
    let image = render_image(text, width, height, style, logo)?;
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

/// Same encoding with the default visual, streamed into a fresh temporary
/// file. The caller owns the handle; the file is removed on drop.
pub fn encode_to_temp_file(
    text: &str,
    width: u32,
    height: u32,
) -> Result<NamedTempFile, EncodeError> {
    let bytes = encode_png(text, width, height, &QrStyle::default(), None)?;
    let mut file = tempfile::Builder::new()
        .prefix("qr-code")
        .suffix(".png")
        .tempfile()?;
    file.write_all(&bytes)?;
    file.flush()?;
    Ok(file)
}

fn render_image(
    text: &str,
    width: u32,
    height: u32,
    style: &QrStyle,
    logo: Option<&Logo>,
) -> Result<RgbaImage, EncodeError> {
    if width == 0 || height == 0 {
        return Err(EncodeError::InvalidDimensions { width, height });
    }

    // Higher error correction when a logo will cover part of the symbol.
    let ec_level = if logo.is_some() {
        EcLevel::H
    } else {
        EcLevel::M
    };
    let code = QrCode::with_error_correction_level(text, ec_level)?;

    let modules = code.width() as u32;
    let margin = if logo.is_some() {
        LOGO_QUIET_ZONE_MODULES
    } else {
        QUIET_ZONE_MODULES
    };
    let total = modules + 2 * margin;
    let scale = width.min(height) / total;
    if scale == 0 {
        return Err(EncodeError::TooSmall {
            width,
            height,
            modules: total,
        });
    }

    let foreground = argb_to_rgba(style.foreground);
    let background = argb_to_rgba(style.background);

    let mut canvas = RgbaImage::from_pixel(width, height, background);
    // Centering the matrix leaves at least `margin * scale` pixels of quiet
    // zone on every side.
    let offset_x = (width - modules * scale) / 2;
    let offset_y = (height - modules * scale) / 2;

    for y in 0..modules {
        for x in 0..modules {
            if code[(x as usize, y as usize)] == Color::Dark {
                for dy in 0..scale {
                    for dx in 0..scale {
                        canvas.put_pixel(
                            offset_x + x * scale + dx,
                            offset_y + y * scale + dy,
                            foreground,
                        );
                    }
                }
            }
        }
    }

    if let Some(logo) = logo {
        composite_logo(&mut canvas, logo)?;
    }

    Ok(canvas)
}

fn composite_logo(canvas: &mut RgbaImage, logo: &Logo) -> Result<(), EncodeError> {
    let decoded = image::load_from_memory(&logo.bytes).map_err(LogoLoadError::Decode)?;
    let (width, height) = canvas.dimensions();

    match logo.style {
        LogoStyle::Plain => {
            let logo_width = (width / 5).max(1);
            let logo_height = (height / 5).max(1);
            let resized = decoded
                .resize_exact(logo_width, logo_height, FilterType::Triangle)
                .to_rgba8();
            let x = i64::from((width - logo_width) / 2);
            let y = i64::from((height - logo_height) / 2);
            imageops::overlay(canvas, &resized, x, y);
        }
        LogoStyle::Circle => {
            let badge_diameter = (width.min(height) / 5).max(1);
            draw_filled_circle(
                canvas,
                width as f32 / 2.0,
                height as f32 / 2.0,
                badge_diameter as f32 / 2.0,
                Rgba([255, 255, 255, 255]),
            );

            let logo_size = (width.min(height) / 6).max(1);
            let resized = decoded
                .resize_exact(logo_size, logo_size, FilterType::Triangle)
                .to_rgba8();
            let clipped = clip_to_circle(resized);
            let x = i64::from((width - logo_size) / 2);
            let y = i64::from((height - logo_size) / 2);
            imageops::overlay(canvas, &clipped, x, y);
        }
    }

    Ok(())
}

fn draw_filled_circle(canvas: &mut RgbaImage, cx: f32, cy: f32, radius: f32, color: Rgba<u8>) {
    let (width, height) = canvas.dimensions();
    let min_x = (cx - radius).floor().max(0.0) as u32;
    let max_x = ((cx + radius).ceil() as u32).min(width.saturating_sub(1));
    let min_y = (cy - radius).floor().max(0.0) as u32;
    let max_y = ((cy + radius).ceil() as u32).min(height.saturating_sub(1));

    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let dx = x as f32 + 0.5 - cx;
            let dy = y as f32 + 0.5 - cy;
            if dx * dx + dy * dy <= radius * radius {
                canvas.put_pixel(x, y, color);
            }
        }
    }
}

fn clip_to_circle(mut image: RgbaImage) -> RgbaImage {
    let (width, height) = image.dimensions();
    let cx = width as f32 / 2.0;
    let cy = height as f32 / 2.0;
    let radius = width.min(height) as f32 / 2.0;

    for y in 0..height {
        for x in 0..width {
            let dx = x as f32 + 0.5 - cx;
            let dy = y as f32 + 0.5 - cy;
            if dx * dx + dy * dy > radius * radius {
                image.get_pixel_mut(x, y).0[3] = 0;
            }
        }
    }

    image
}

fn argb_to_rgba(argb: u32) -> Rgba<u8> {
    Rgba([
        (argb >> 16) as u8,
        (argb >> 8) as u8,
        argb as u8,
        (argb >> 24) as u8,
    ])
}
