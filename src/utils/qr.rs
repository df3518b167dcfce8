use image::{DynamicImage, GrayImage, ImageOutputFormat, Luma};
use qrcode::{Color, QrCode};
use std::io::Cursor;

use crate::errors::{BotError, Result};

const MODULE_PIXELS: u32 = 8;
const QUIET_ZONE_MODULES: u32 = 4;

/// Render data as a PNG QR code suitable for a Telegram photo
pub fn render_qr_png(data: &str) -> Result<Vec<u8>> {
    let code = QrCode::new(data.as_bytes())
        .map_err(|e| BotError::internal(format!("QR encoding failed: {}", e)))?;

    let width = code.width() as u32;
    let colors = code.to_colors();
    let size = (width + 2 * QUIET_ZONE_MODULES) * MODULE_PIXELS;

    let image = GrayImage::from_fn(size, size, |x, y| {
        let mx = x / MODULE_PIXELS;
        let my = y / MODULE_PIXELS;
        let inside = (QUIET_ZONE_MODULES..QUIET_ZONE_MODULES + width).contains(&mx)
            && (QUIET_ZONE_MODULES..QUIET_ZONE_MODULES + width).contains(&my);
        if !inside {
            return Luma([255u8]);
        }
        let idx = ((my - QUIET_ZONE_MODULES) * width + (mx - QUIET_ZONE_MODULES)) as usize;
        match colors[idx] {
            Color::Dark => Luma([0u8]),
            Color::Light => Luma([255u8]),
        }
    });

    let mut bytes = Vec::new();
    DynamicImage::ImageLuma8(image)
        .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)
        .map_err(|e| BotError::internal(format!("PNG encoding failed: {}", e)))?;

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renders_png() {
        let png = render_qr_png("https://app.tonkeeper.com/ton-connect?v=2&id=00").unwrap();
        assert_eq!(&png[..8], &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
    }
}
