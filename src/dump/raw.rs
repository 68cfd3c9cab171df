use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::data::iris::IrisDataset;
use crate::error::{Error, Result};

/// Unscaled feature matrix, row-major.
pub const DATA_FILE: &str = "iris_data.dat";
/// Class labels, one `f32` per sample.
pub const LABELS_FILE: &str = "iris_labels.dat";

const FLOAT_SIZE: usize = std::mem::size_of::<f32>();

/// Writes `values` as consecutive little-endian IEEE-754 `f32`, no header.
pub fn write_f32_le<I>(path: &Path, values: I) -> Result<()>
where
    I: IntoIterator<Item = f32>,
{
    let mut writer = BufWriter::new(File::create(path)?);
    for value in values {
        writer.write_all(&value.to_le_bytes())?;
    }
    writer.flush()?;
    Ok(())
}

/// Reads a file written by [`write_f32_le`].
pub fn read_f32_le(path: &Path) -> Result<Vec<f32>> {
    let bytes = std::fs::read(path)?;
    if bytes.len() % FLOAT_SIZE != 0 {
        return Err(Error::InvalidDump(format!(
            "{} is {} bytes, not a whole number of floats",
            path.display(),
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(FLOAT_SIZE)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

/// Dumps the full, unscaled dataset into `dir`: features to [`DATA_FILE`]
/// and labels (as `f32`) to [`LABELS_FILE`]. Returns both paths.
pub fn dump_dataset(dataset: &IrisDataset, dir: &Path) -> Result<(PathBuf, PathBuf)> {
    let data_path = dir.join(DATA_FILE);
    let labels_path = dir.join(LABELS_FILE);

    write_f32_le(&data_path, dataset.features().as_slice().iter().map(|&x| x as f32))?;
    write_f32_le(&labels_path, dataset.labels().iter().map(|&l| l as f32))?;

    log::info!(
        "dumped {} samples to {} and {}",
        dataset.len(),
        data_path.display(),
        labels_path.display()
    );
    Ok((data_path, labels_path))
}
