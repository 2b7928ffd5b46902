//! NumPy `.npy` (format 1.0) encoding for the array artifacts
//!
//! Only the dtypes the pipeline writes are supported: little-endian `f64`
//! (`<f8`), little-endian `i64` (`<i8`) and fixed-width unicode (`<U{n}`),
//! all in C order.

use regex::Regex;

use crate::error::{PipelineError, Result};
use crate::pipeline::FeatureMatrix;

const MAGIC: &[u8] = b"\x93NUMPY";
const VERSION: [u8; 2] = [1, 0];
/// Magic, version and the u16 header length
const PREAMBLE_LEN: usize = MAGIC.len() + 2 + 2;
const HEADER_ALIGN: usize = 64;

/// Typed array buffer
#[derive(Debug, Clone, PartialEq)]
pub enum NpyData {
    F64(Vec<f64>),
    I64(Vec<i64>),
    /// Strings stored as `width` UCS-4 code points each
    Unicode { values: Vec<String>, width: usize },
}

impl NpyData {
    fn len(&self) -> usize {
        match self {
            NpyData::F64(v) => v.len(),
            NpyData::I64(v) => v.len(),
            NpyData::Unicode { values, .. } => values.len(),
        }
    }

    /// NumPy dtype descriptor
    pub fn descr(&self) -> String {
        match self {
            NpyData::F64(_) => "<f8".to_string(),
            NpyData::I64(_) => "<i8".to_string(),
            NpyData::Unicode { width, .. } => format!("<U{}", width),
        }
    }
}

/// An n-dimensional array in C order
#[derive(Debug, Clone, PartialEq)]
pub struct NpyArray {
    pub shape: Vec<usize>,
    pub data: NpyData,
}

impl NpyArray {
    /// 2-D `<f8` array
    pub fn from_matrix(matrix: &FeatureMatrix) -> Self {
        Self {
            shape: vec![matrix.rows(), matrix.cols()],
            data: NpyData::F64(matrix.as_slice().to_vec()),
        }
    }

    /// 1-D `<i8` array
    pub fn from_labels(labels: &[i64]) -> Self {
        Self {
            shape: vec![labels.len()],
            data: NpyData::I64(labels.to_vec()),
        }
    }

    /// 1-D `<U{n}` array, `n` being the longest string (at least 1)
    pub fn from_strings(values: &[String]) -> Self {
        let width = values
            .iter()
            .map(|s| s.chars().count())
            .max()
            .unwrap_or(0)
            .max(1);
        Self {
            shape: vec![values.len()],
            data: NpyData::Unicode {
                values: values.to_vec(),
                width,
            },
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Convert a 2-D `<f8` array back into a matrix
    pub fn to_matrix(&self) -> Result<FeatureMatrix> {
        match (&self.data, self.shape.as_slice()) {
            (NpyData::F64(values), &[rows, cols]) => FeatureMatrix::from_vec(rows, cols, values.clone()),
            _ => Err(PipelineError::Serialization(format!(
                "Expected a 2-D <f8 array, found {} with shape {:?}",
                self.data.descr(),
                self.shape
            ))),
        }
    }

    pub fn to_npy_bytes(&self) -> Result<Vec<u8>> {
        let expected: usize = self.shape.iter().product();
        if expected != self.data.len() {
            return Err(PipelineError::Serialization(format!(
                "Array shape {:?} holds {} values but buffer has {}",
                self.shape,
                expected,
                self.data.len()
            )));
        }

        let header = self.header();
        let mut out = Vec::with_capacity(header.len() + self.data.len() * 8);
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&VERSION);
        out.extend_from_slice(&(header.len() as u16).to_le_bytes());
        out.extend_from_slice(header.as_bytes());

        match &self.data {
            NpyData::F64(values) => {
                for v in values {
                    out.extend_from_slice(&v.to_le_bytes());
                }
            }
            NpyData::I64(values) => {
                for v in values {
                    out.extend_from_slice(&v.to_le_bytes());
                }
            }
            NpyData::Unicode { values, width } => {
                for s in values {
                    let chars: Vec<char> = s.chars().collect();
                    if chars.len() > *width {
                        return Err(PipelineError::Serialization(format!(
                            "String '{}' longer than dtype width {}",
                            s, width
                        )));
                    }
                    for i in 0..*width {
                        let code = chars.get(i).map_or(0u32, |&c| c as u32);
                        out.extend_from_slice(&code.to_le_bytes());
                    }
                }
            }
        }

        Ok(out)
    }

    /// Header dict padded with spaces and a trailing newline so the data
    /// starts on a 64-byte boundary.
    fn header(&self) -> String {
        let shape = match self.shape.as_slice() {
            [n] => format!("({},)", n),
            dims => format!(
                "({})",
                dims.iter()
                    .map(|d| d.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        };
        let mut header = format!(
            "{{'descr': '{}', 'fortran_order': False, 'shape': {}, }}",
            self.data.descr(),
            shape
        );
        let unpadded = PREAMBLE_LEN + header.len() + 1;
        let padding = (HEADER_ALIGN - unpadded % HEADER_ALIGN) % HEADER_ALIGN;
        header.push_str(&" ".repeat(padding));
        header.push('\n');
        header
    }

    pub fn from_npy_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < PREAMBLE_LEN || &bytes[..MAGIC.len()] != MAGIC {
            return Err(invalid("missing NUMPY magic string"));
        }
        let major = bytes[MAGIC.len()];
        if major != 1 {
            return Err(invalid(&format!("unsupported format version {}", major)));
        }
        let header_len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
        let data_start = PREAMBLE_LEN + header_len;
        if bytes.len() < data_start {
            return Err(invalid("truncated header"));
        }
        let header = std::str::from_utf8(&bytes[PREAMBLE_LEN..data_start])
            .map_err(|_| invalid("header is not valid text"))?;
        let (descr, shape) = parse_header(header)?;

        let count: usize = shape.iter().product();
        let body = &bytes[data_start..];

        let data = match descr.as_str() {
            "<f8" => NpyData::F64(read_words(body, count, f64::from_le_bytes)?),
            "<i8" => NpyData::I64(read_words(body, count, i64::from_le_bytes)?),
            d if d.starts_with("<U") => {
                let width: usize = d[2..]
                    .parse()
                    .map_err(|_| invalid(&format!("bad unicode width in '{}'", d)))?;
                let item = width * 4;
                if body.len() < count * item {
                    return Err(invalid("truncated data"));
                }
                let mut values = Vec::with_capacity(count);
                for chunk in body.chunks_exact(item.max(1)).take(count) {
                    let mut s = String::with_capacity(width);
                    for code in chunk.chunks_exact(4) {
                        let code = u32::from_le_bytes([code[0], code[1], code[2], code[3]]);
                        if code == 0 {
                            break;
                        }
                        s.push(char::from_u32(code).ok_or_else(|| invalid("bad code point"))?);
                    }
                    values.push(s);
                }
                NpyData::Unicode { values, width }
            }
            other => return Err(invalid(&format!("unsupported dtype '{}'", other))),
        };

        Ok(Self { shape, data })
    }
}

fn invalid(reason: &str) -> PipelineError {
    PipelineError::Serialization(format!("Invalid .npy data: {}", reason))
}

fn parse_header(header: &str) -> Result<(String, Vec<usize>)> {
    let descr_re = Regex::new(r"'descr':\s*'([^']+)'").map_err(|e| invalid(&e.to_string()))?;
    let order_re =
        Regex::new(r"'fortran_order':\s*(True|False)").map_err(|e| invalid(&e.to_string()))?;
    let shape_re = Regex::new(r"'shape':\s*\(([^)]*)\)").map_err(|e| invalid(&e.to_string()))?;

    let descr = descr_re
        .captures(header)
        .map(|c| c[1].to_string())
        .ok_or_else(|| invalid("header has no descr"))?;

    match order_re.captures(header) {
        Some(c) if &c[1] == "False" => {}
        Some(_) => return Err(invalid("Fortran-ordered arrays are not supported")),
        None => return Err(invalid("header has no fortran_order")),
    }

    let dims = shape_re
        .captures(header)
        .map(|c| c[1].to_string())
        .ok_or_else(|| invalid("header has no shape"))?;
    let shape = dims
        .split(',')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(|d| d.parse::<usize>().map_err(|_| invalid(&format!("bad dimension '{}'", d))))
        .collect::<Result<Vec<_>>>()?;

    Ok((descr, shape))
}

fn read_words<T>(body: &[u8], count: usize, decode: fn([u8; 8]) -> T) -> Result<Vec<T>> {
    if body.len() < count * 8 {
        return Err(invalid("truncated data"));
    }
    Ok(body
        .chunks_exact(8)
        .take(count)
        .map(|w| {
            let mut word = [0u8; 8];
            word.copy_from_slice(w);
            decode(word)
        })
        .collect())
}
