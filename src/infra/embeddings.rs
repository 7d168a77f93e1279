// ============================================================
// Layer 6 — Pretrained Embedding Archive
// ============================================================
// Reads the word-vector matrix from a numpy .npz archive once at
// startup. Row i is the vector for vocabulary id i.
//
// numpy's savez stores an array named "glove" as the member
// "glove.npy"; both spellings are accepted. float64 archives are
// narrowed to f32.

use anyhow::{anyhow, Context, Result};
use ndarray::Array2;
use ndarray_npy::NpzReader;
use std::{fs::File, io::{Read, Seek}, path::Path};

/// Dense [rows, cols] matrix in row-major order
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingMatrix {
    pub rows:   usize,
    pub cols:   usize,
    pub values: Vec<f32>,
}

impl EmbeddingMatrix {
    fn from_array(array: Array2<f32>) -> Self {
        let (rows, cols) = array.dim();
        // iter() walks in logical row-major order regardless of memory layout
        let values = array.iter().copied().collect();
        Self { rows, cols, values }
    }

    #[cfg(test)]
    pub fn row(&self, id: usize) -> Option<&[f32]> {
        (id < self.rows).then(|| &self.values[id * self.cols..(id + 1) * self.cols])
    }
}

/// Load the named 2-D array from an .npz archive.
pub fn load_embedding_matrix(path: impl AsRef<Path>, array_name: &str) -> Result<EmbeddingMatrix> {
    let path = path.as_ref();
    tracing::info!("Loading embedding matrix '{}' from '{}'", array_name, path.display());

    let file = File::open(path)
        .with_context(|| format!("Cannot open embedding archive '{}'", path.display()))?;
    let mut npz = NpzReader::new(file)
        .with_context(|| format!("'{}' is not an npz archive", path.display()))?;

    let candidates = [array_name.to_string(), format!("{array_name}.npy")];
    for name in &candidates {
        if let Some(array) = read_f32(&mut npz, name) {
            let matrix = EmbeddingMatrix::from_array(array);
            tracing::info!("Embedding matrix: {} x {}", matrix.rows, matrix.cols);
            return Ok(matrix);
        }
    }

    let available = npz.names().unwrap_or_default();
    Err(anyhow!(
        "No 2-D float array '{}' in '{}' (members: {:?})",
        array_name,
        path.display(),
        available
    ))
}

fn read_f32<R: Read + Seek>(npz: &mut NpzReader<R>, name: &str) -> Option<Array2<f32>> {
    let single: Result<Array2<f32>, _> = npz.by_name(name);
    if let Ok(array) = single {
        return Some(array);
    }
    let double: Result<Array2<f64>, _> = npz.by_name(name);
    double.ok().map(|array| array.mapv(|v| v as f32))
}
