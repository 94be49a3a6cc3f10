//! Two-color raster output for colony snapshots.

use anyhow::{Context, Result, bail};
use image::{GrayImage, ImageFormat, Luma};
use notch_core::Fate;
use std::{fs, io::Cursor, path::Path};

/// Gray level used for committed (Black) cells.
pub const BLACK_LEVEL: u8 = 0;
/// Gray level used for uncommitted (White) cells.
pub const WHITE_LEVEL: u8 = 255;

#[must_use]
pub const fn fate_luma(fate: Fate) -> Luma<u8> {
    match fate {
        Fate::Black => Luma([BLACK_LEVEL]),
        Fate::White => Luma([WHITE_LEVEL]),
    }
}

/// Rasterizes a color snapshot with each cell drawn as a `scale × scale` block.
///
/// Row `r` of the snapshot becomes the `r`-th band of pixels from the top.
pub fn rasterize(colors: &[Vec<Fate>], scale: u32) -> Result<GrayImage> {
    let Some(first) = colors.first() else {
        bail!("cannot render an empty colony snapshot");
    };
    let columns = first.len();
    if columns == 0 {
        bail!("cannot render a colony snapshot with zero columns");
    }
    if let Some((row, bad)) = colors
        .iter()
        .enumerate()
        .find(|(_, row)| row.len() != columns)
    {
        bail!(
            "ragged colony snapshot: row {row} has {} cells, expected {columns}",
            bad.len()
        );
    }
    let scale = scale.max(1);
    let width = u32::try_from(columns)
        .ok()
        .and_then(|c| c.checked_mul(scale))
        .context("snapshot too wide to rasterize")?;
    let height = u32::try_from(colors.len())
        .ok()
        .and_then(|r| r.checked_mul(scale))
        .context("snapshot too tall to rasterize")?;

    Ok(GrayImage::from_fn(width, height, |x, y| {
        let row = (y / scale) as usize;
        let col = (x / scale) as usize;
        fate_luma(colors[row][col])
    }))
}

/// Encodes a color snapshot as PNG bytes.
pub fn render_png(colors: &[Vec<Fate>], scale: u32) -> Result<Vec<u8>> {
    let image = rasterize(colors, scale)?;
    let mut bytes = Vec::new();
    {
        let mut cursor = Cursor::new(&mut bytes);
        image.write_to(&mut cursor, ImageFormat::Png)?;
    }
    Ok(bytes)
}

/// Renders a color snapshot and writes it to `path` as PNG.
pub fn save_png(colors: &[Vec<Fate>], scale: u32, path: &Path) -> Result<()> {
    let bytes = render_png(colors, scale)?;
    fs::write(path, bytes).with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker(rows: usize, columns: usize) -> Vec<Vec<Fate>> {
        (0..rows)
            .map(|r| {
                (0..columns)
                    .map(|c| {
                        if (r + c) % 2 == 0 {
                            Fate::Black
                        } else {
                            Fate::White
                        }
                    })
                    .collect()
            })
            .collect()
    }

    #[test]
    fn renders_png_with_valid_header() -> Result<()> {
        let png = render_png(&checker(10, 12), 3)?;
        assert_eq!(&png[0..8], b"\x89PNG\r\n\x1a\n", "invalid PNG header");

        let decoded = image::load_from_memory(&png)?.to_luma8();
        assert_eq!(decoded.dimensions(), (36, 30));
        assert_eq!(decoded.get_pixel(0, 0), &Luma([BLACK_LEVEL]));
        assert_eq!(decoded.get_pixel(2, 2), &Luma([BLACK_LEVEL]));
        assert_eq!(decoded.get_pixel(3, 0), &Luma([WHITE_LEVEL]));
        Ok(())
    }

    #[test]
    fn rows_map_top_down() -> Result<()> {
        let mut colors = vec![vec![Fate::White; 4]; 3];
        colors[2][1] = Fate::Black;
        let image = rasterize(&colors, 1)?;
        assert_eq!(image.dimensions(), (4, 3));
        assert_eq!(image.get_pixel(1, 2), &Luma([BLACK_LEVEL]));
        assert_eq!(image.get_pixel(1, 0), &Luma([WHITE_LEVEL]));
        Ok(())
    }

    #[test]
    fn zero_scale_is_treated_as_one() -> Result<()> {
        let image = rasterize(&checker(2, 5), 0)?;
        assert_eq!(image.dimensions(), (5, 2));
        Ok(())
    }

    #[test]
    fn rejects_empty_and_ragged_snapshots() {
        assert!(rasterize(&[], 1).is_err());
        assert!(rasterize(&[Vec::new()], 1).is_err());
        let ragged = vec![vec![Fate::White; 3], vec![Fate::White; 2]];
        let err = rasterize(&ragged, 1).expect_err("ragged");
        assert!(err.to_string().contains("row 1"));
    }

    #[test]
    fn save_png_writes_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("colony.png");
        save_png(&checker(4, 4), 2, &path)?;
        let written = fs::read(&path)?;
        assert_eq!(&written[0..4], b"\x89PNG");

        let missing = dir.path().join("missing").join("colony.png");
        assert!(save_png(&checker(4, 4), 2, &missing).is_err());
        Ok(())
    }
}
