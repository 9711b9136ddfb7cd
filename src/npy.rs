use crate::error::PipelineError;
use crate::labeling::LabelGrid;
use regex::Regex;
use std::path::Path;

const NPY_MAGIC: &[u8] = b"\x93NUMPY";

/// Read a precomputed label grid from a NumPy `.npy` file.
///
/// Supports format versions 1.0 and 2.0, C-order 2-D arrays with shape
/// `(height, width)`, and little-endian integer dtypes up to 64 bits.
/// Labels must be non-negative and fit in `u32`.
pub fn load_label_grid(path: &Path) -> Result<LabelGrid, PipelineError> {
    let bytes = std::fs::read(path)?;
    parse_label_grid(&bytes)
}

pub fn parse_label_grid(bytes: &[u8]) -> Result<LabelGrid, PipelineError> {
    if bytes.len() < NPY_MAGIC.len() + 4 || &bytes[..NPY_MAGIC.len()] != NPY_MAGIC {
        return Err(PipelineError::InvalidInput(
            "not an npy file (bad magic)".to_string(),
        ));
    }

    let major = bytes[6];
    let (header_len, header_start) = match major {
        1 => {
            let len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
            (len, 10)
        }
        2 => {
            if bytes.len() < 12 {
                return Err(PipelineError::InvalidInput(
                    "npy header is truncated".to_string(),
                ));
            }
            let len = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize;
            (len, 12)
        }
        other => {
            return Err(PipelineError::InvalidInput(format!(
                "unsupported npy format version {}",
                other
            )));
        }
    };

    let data_start = header_start + header_len;
    if bytes.len() < data_start {
        return Err(PipelineError::InvalidInput(
            "npy header is truncated".to_string(),
        ));
    }
    let header = std::str::from_utf8(&bytes[header_start..data_start])
        .map_err(|_| PipelineError::InvalidInput("npy header is not ascii".to_string()))?;

    let fields = Regex::new(
        r"'descr':\s*'([^']+)',\s*'fortran_order':\s*(True|False),\s*'shape':\s*\(([^)]*)\)",
    )
    .map_err(|e| PipelineError::InvalidInput(format!("npy header pattern: {}", e)))?;
    let captures = fields.captures(header).ok_or_else(|| {
        PipelineError::InvalidInput("npy header is missing descr/fortran_order/shape".to_string())
    })?;

    let descr = &captures[1];
    if &captures[2] == "True" {
        return Err(PipelineError::InvalidInput(
            "fortran-order npy arrays are not supported".to_string(),
        ));
    }

    let dims = captures[3]
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<usize>().map_err(|_| {
                PipelineError::InvalidInput(format!("npy shape value '{}' is not a number", part))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    let (height, width) = match dims.as_slice() {
        [h, w] => (*h, *w),
        _ => {
            return Err(PipelineError::InvalidInput(format!(
                "label grid must be 2-D, got shape ({})",
                captures[3].trim()
            )));
        }
    };

    let (item_size, signed) = match descr {
        "|u1" | "<u1" => (1, false),
        "<u2" => (2, false),
        "<u4" => (4, false),
        "<u8" => (8, false),
        "<i4" => (4, true),
        "<i8" => (8, true),
        other => {
            return Err(PipelineError::InvalidInput(format!(
                "unsupported npy dtype '{}'",
                other
            )));
        }
    };

    // Shape values come straight from the file; the byte count must not
    // be allowed to wrap.
    let cells = height.checked_mul(width).ok_or_else(|| {
        PipelineError::InvalidInput(format!("npy shape ({}, {}) is too large", height, width))
    })?;
    let expected = cells.checked_mul(item_size).ok_or_else(|| {
        PipelineError::InvalidInput(format!(
            "npy shape ({}, {}) with dtype {} is too large",
            height, width, descr
        ))
    })?;

    let data = &bytes[data_start..];
    if data.len() != expected {
        return Err(PipelineError::InvalidInput(format!(
            "npy payload is {} bytes, shape ({}, {}) with dtype {} needs {}",
            data.len(),
            height,
            width,
            descr,
            expected
        )));
    }

    let mut labels = Vec::with_capacity(cells);
    for chunk in data.chunks_exact(item_size) {
        labels.push(decode_label(chunk, signed)?);
    }

    LabelGrid::from_raw(width as u32, height as u32, labels)
}

fn decode_label(chunk: &[u8], signed: bool) -> Result<u32, PipelineError> {
    let raw = match chunk.len() {
        1 => chunk[0] as u64,
        2 => u16::from_le_bytes([chunk[0], chunk[1]]) as u64,
        4 if signed => {
            let value = i32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            if value < 0 {
                return Err(PipelineError::InvalidInput(format!(
                    "label grid contains negative value {}",
                    value
                )));
            }
            value as u64
        }
        4 => u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]) as u64,
        8 if signed => {
            let value = i64::from_le_bytes([
                chunk[0], chunk[1], chunk[2], chunk[3], chunk[4], chunk[5], chunk[6], chunk[7],
            ]);
            if value < 0 {
                return Err(PipelineError::InvalidInput(format!(
                    "label grid contains negative value {}",
                    value
                )));
            }
            value as u64
        }
        8 => u64::from_le_bytes([
            chunk[0], chunk[1], chunk[2], chunk[3], chunk[4], chunk[5], chunk[6], chunk[7],
        ]),
        _ => unreachable!("item sizes are fixed above"),
    };

    u32::try_from(raw).map_err(|_| {
        PipelineError::InvalidInput(format!("label value {} does not fit in u32", raw))
    })
}
