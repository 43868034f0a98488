use std::path::Path;

use dicom_dictionary_std::tags;
use dicom_object::open_file;
use dicom_pixeldata::PixelDecoder;

use super::error::ConvertError;

/// Raw intensity values for one image, row-major, in the floating-point
/// domain (modality rescale already applied by the decoder).
#[derive(Debug, Clone)]
pub struct PixelMatrix {
    pub rows: u32,
    pub cols: u32,
    pub data: Vec<f32>,
}

impl PixelMatrix {
    pub fn new(rows: u32, cols: u32, data: Vec<f32>) -> Result<Self, ConvertError> {
        if rows == 0 || cols == 0 {
            return Err(ConvertError::EmptyPixelMatrix { rows, cols });
        }
        if data.len() != rows as usize * cols as usize {
            return Err(ConvertError::Pixels(format!(
                "pixel buffer holds {} values for a {rows}x{cols} matrix",
                data.len()
            )));
        }
        Ok(Self { rows, cols, data })
    }
}

/// Read one DICOM file and extract its intensity matrix.
///
/// Only the first frame is used. Multi-sample (color) frames are collapsed
/// to a single intensity by channel average, so downstream normalization
/// always sees one value per pixel.
pub fn decode_pixels(path: &Path) -> Result<PixelMatrix, ConvertError> {
    let obj = open_file(path).map_err(|e| ConvertError::Decode(e.to_string()))?;

    if obj.element(tags::PIXEL_DATA).is_err() {
        return Err(ConvertError::MissingPixelData);
    }

    let decoded = obj
        .decode_pixel_data()
        .map_err(|e| ConvertError::Pixels(e.to_string()))?;

    let rows = decoded.rows();
    let cols = decoded.columns();
    let samples = decoded.samples_per_pixel().max(1) as usize;

    let raw = decoded
        .to_vec::<f32>()
        .map_err(|e| ConvertError::Pixels(e.to_string()))?;

    let frame_len = rows as usize * cols as usize * samples;
    if frame_len == 0 || raw.len() < frame_len {
        return Err(ConvertError::EmptyPixelMatrix { rows, cols });
    }
    let frame = &raw[..frame_len];

    let data = if samples == 1 {
        frame.to_vec()
    } else {
        frame
            .chunks_exact(samples)
            .map(|px| px.iter().sum::<f32>() / samples as f32)
            .collect()
    };

    PixelMatrix::new(rows, cols, data)
}
