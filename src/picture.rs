//! Converts pictures to the card's 64-colour pixel ROM format: one byte per
//! pixel, `0b00RRGGBB`, 128 addresses per scan line.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use image::imageops::{self, ColorMap, FilterType};
use image::{DynamicImage, ImageError, Rgb, RgbImage};
use thiserror::Error;
use tracing::{debug, info};

use crate::prom::timing::TimingConstants;

/// Addresses per scan line, fixed by the 7 column address lines.
pub const ROW_STRIDE: u32 = 128;

/// The four intensities each 2-bit channel can produce.
pub const LEVELS: [u8; 4] = [0x00, 0x55, 0xaa, 0xff];

#[derive(Debug, Error)]
pub enum PictureError {
    #[error("failed to open image {path:?}")]
    Open {
        path: PathBuf,
        #[source]
        source: ImageError,
    },

    #[error("picture is {width}x{height} but the visible window is {columns}x{rows}")]
    LargerThanVisible {
        width: u32,
        height: u32,
        columns: u16,
        rows: u16,
    },

    #[error("picture width {width} exceeds the 128-address scan line")]
    WiderThanRow { width: u32 },

    #[error("picture height {height} exceeds the {rows} rows of a {size_kib} KiB image")]
    TallerThanImage {
        height: u32,
        rows: u32,
        size_kib: u32,
    },

    #[error("failed to write {path:?}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to save {path:?}")]
    Save {
        path: PathBuf,
        #[source]
        source: ImageError,
    },
}

/// The card's fixed palette, for Floyd-Steinberg dithering.
#[derive(Clone, Copy, Debug, Default)]
pub struct Palette64;

fn nearest_level(value: u8) -> usize {
    (value as usize + 42) / 85
}

impl ColorMap for Palette64 {
    type Color = Rgb<u8>;

    fn index_of(&self, color: &Rgb<u8>) -> usize {
        let [r, g, b] = color.0.map(nearest_level);
        16 * r + 4 * g + b
    }

    fn lookup(&self, index: usize) -> Option<Rgb<u8>> {
        (index < 64).then(|| {
            Rgb([
                LEVELS[(index >> 4) & 3],
                LEVELS[(index >> 2) & 3],
                LEVELS[index & 3],
            ])
        })
    }

    fn has_lookup(&self) -> bool {
        true
    }

    fn map_color(&self, color: &mut Rgb<u8>) {
        for channel in color.0.iter_mut() {
            *channel = LEVELS[nearest_level(*channel)];
        }
    }
}

/// Pixel byte for a colour already on the palette.
pub fn encode_pixel(pixel: &Rgb<u8>) -> u8 {
    let [r, g, b] = pixel.0;
    16 * (r / 64) + 4 * (g / 64) + b / 64
}

/// One row of every palette colour, handy for checking the DAC wiring.
pub fn palette_image() -> RgbImage {
    RgbImage::from_fn(64, 1, |x, _| Palette64.lookup(x as usize).unwrap_or(Rgb([0, 0, 0])))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PictureLayout {
    pub width: u32,
    pub height: u32,
    /// Output image size; EPROM programmers often want the full device.
    pub size_kib: u32,
}

impl Default for PictureLayout {
    fn default() -> Self {
        Self {
            width: 100,
            height: 75,
            size_kib: 32,
        }
    }
}

impl PictureLayout {
    pub fn rows(&self) -> u32 {
        self.size_kib * 1024 / ROW_STRIDE
    }

    pub fn byte_len(&self) -> usize {
        self.size_kib as usize * 1024
    }

    /// The picture must fit the window the sync table displays.
    pub fn validate(&self, timing: &TimingConstants) -> Result<(), PictureError> {
        let (columns, rows) = timing.visible();
        if self.width > columns as u32 || self.height > rows as u32 {
            return Err(PictureError::LargerThanVisible {
                width: self.width,
                height: self.height,
                columns,
                rows,
            });
        }
        if self.width > ROW_STRIDE {
            return Err(PictureError::WiderThanRow { width: self.width });
        }
        if self.height > self.rows() {
            return Err(PictureError::TallerThanImage {
                height: self.height,
                rows: self.rows(),
                size_kib: self.size_kib,
            });
        }
        Ok(())
    }
}

pub struct Converted {
    pub bytes: Vec<u8>,
    /// The dithered picture as the monitor should show it.
    pub preview: RgbImage,
}

pub fn convert(image: &DynamicImage, layout: &PictureLayout) -> Converted {
    let rgb = image.to_rgb8();
    let mut preview = if rgb.dimensions() == (layout.width, layout.height) {
        rgb
    } else {
        debug!(
            "Resizing {:?} to {}x{}",
            rgb.dimensions(),
            layout.width,
            layout.height
        );
        imageops::resize(&rgb, layout.width, layout.height, FilterType::Triangle)
    };
    imageops::dither(&mut preview, &Palette64);

    let mut bytes = vec![0u8; layout.byte_len()];
    for (x, y, pixel) in preview.enumerate_pixels() {
        bytes[(y * ROW_STRIDE + x) as usize] = encode_pixel(pixel);
    }
    Converted { bytes, preview }
}

pub fn convert_file(
    input: &Path,
    output: &Path,
    layout: &PictureLayout,
    preview: Option<&Path>,
    palette: Option<&Path>,
) -> Result<(), PictureError> {
    let image = image::open(input).map_err(|source| PictureError::Open {
        path: input.to_owned(),
        source,
    })?;
    info!(
        "Converting {:?} ({}x{}) to {}x{}",
        input,
        image.width(),
        image.height(),
        layout.width,
        layout.height
    );
    let converted = convert(&image, layout);

    if let Some(path) = palette {
        palette_image()
            .save(path)
            .map_err(|source| PictureError::Save {
                path: path.to_owned(),
                source,
            })?;
    }
    if let Some(path) = preview {
        converted
            .preview
            .save(path)
            .map_err(|source| PictureError::Save {
                path: path.to_owned(),
                source,
            })?;
    }

    fs::write(output, &converted.bytes).map_err(|source| PictureError::Write {
        path: output.to_owned(),
        source,
    })?;
    info!("Wrote {} bytes to {:?}", converted.bytes.len(), output);
    Ok(())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::prom::timing::TIMING_VGA_HALVED;

    #[rstest]
    #[case([0x00, 0x00, 0x00], 0)]
    #[case([0xff, 0xff, 0xff], 63)]
    #[case([0xff, 0x00, 0x00], 0b11_00_00)]
    #[case([0x00, 0xaa, 0x00], 0b00_10_00)]
    #[case([0x00, 0x00, 0x55], 0b00_00_01)]
    fn test_encode_pixel(#[case] rgb: [u8; 3], #[case] byte: u8) {
        assert_eq!(encode_pixel(&Rgb(rgb)), byte);
        assert_eq!(Palette64.index_of(&Rgb(rgb)), byte as usize);
    }

    #[test]
    fn test_map_color() {
        let mut color = Rgb([40, 50, 200]);
        Palette64.map_color(&mut color);
        assert_eq!(color, Rgb([0x00, 0x55, 0xaa]));
    }

    #[test]
    fn test_palette_image() {
        let palette = palette_image();
        assert_eq!(palette.dimensions(), (64, 1));
        for (x, _, pixel) in palette.enumerate_pixels() {
            assert_eq!(encode_pixel(pixel) as u32, x);
        }
    }

    #[test]
    fn test_convert_layout() {
        let colors = [
            Rgb([0xff, 0x00, 0x00]),
            Rgb([0x00, 0xff, 0x00]),
            Rgb([0x00, 0x00, 0xff]),
            Rgb([0xff, 0xff, 0xff]),
        ];
        let image = RgbImage::from_fn(2, 2, |x, y| colors[(y * 2 + x) as usize]);
        let layout = PictureLayout {
            width: 2,
            height: 2,
            size_kib: 1,
        };
        let converted = convert(&DynamicImage::ImageRgb8(image), &layout);

        assert_eq!(converted.bytes.len(), 1024);
        assert_eq!(&converted.bytes[0..3], &[0x30, 0x0c, 0x00]);
        assert_eq!(&converted.bytes[128..131], &[0x03, 0x3f, 0x00]);
        assert_eq!(converted.bytes.iter().filter(|&&b| b != 0).count(), 4);
    }

    #[test]
    fn test_validate() {
        PictureLayout::default().validate(&TIMING_VGA_HALVED).unwrap();
        assert_eq!(PictureLayout::default().rows(), 256);

        let wide = PictureLayout {
            width: 101,
            ..Default::default()
        };
        assert!(matches!(
            wide.validate(&TIMING_VGA_HALVED),
            Err(PictureError::LargerThanVisible { columns: 100, .. })
        ));

        let small = PictureLayout {
            size_kib: 8,
            height: 75,
            ..Default::default()
        };
        assert!(matches!(
            small.validate(&TIMING_VGA_HALVED),
            Err(PictureError::TallerThanImage { rows: 64, .. })
        ));
    }
}
