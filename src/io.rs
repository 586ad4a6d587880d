// Tab-separated matrix input and packed-triangle output for the command line.

use std::{
    collections::HashSet,
    error::Error,
    fs::File,
    io::{Cursor, Read, Write},
    path::Path,
};

use csv::{ReaderBuilder, WriterBuilder};
use flate2::{
    read::{GzDecoder, MultiGzDecoder},
    write::GzEncoder,
    Compression,
};
use ndarray::Array2;
use strum_macros::{Display, EnumString};
use tar::{Archive, Builder, Header};

use crate::upper::UpperTriangle;

/// Row ids in file order plus the `rows x observations` values.
pub struct LabeledMatrix {
    pub row_ids: Vec<String>,
    pub data: Array2<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(ascii_case_insensitive)]
pub enum OutputLayout {
    /// One `row_a  row_b  r` line per pair.
    #[strum(serialize = "pairs", serialize = "long", to_string = "pairs")]
    Pairs,
    /// Row ids on the header line, then one packed value per line.
    #[strum(serialize = "packed", serialize = "flat", to_string = "packed")]
    Packed,
}

pub fn read_matrix_data<R: Read>(reader: R) -> Result<LabeledMatrix, Box<dyn Error>> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .from_reader(reader);

    // Row ID column plus at least one observation
    let header_len = rdr.headers()?.len();
    if header_len < 2 {
        return Err("Input file must contain a row ID column and at least one observation".into());
    }
    let n_obs = header_len - 1;

    let mut seen = HashSet::new();
    let mut row_ids = Vec::new();
    let mut values = Vec::new();

    for (idx, record) in rdr.records().enumerate() {
        let record = record?;

        let raw_row_id = record.get(0).unwrap_or("").trim();
        if raw_row_id.is_empty() {
            return Err(format!(
                "Empty row ID encountered on line {}",
                idx + 2 /* header offset */
            )
            .into());
        }
        if !seen.insert(raw_row_id.to_string()) {
            return Err(format!(
                "Duplicate row ID '{}' encountered on line {}",
                raw_row_id,
                idx + 2
            )
            .into());
        }

        values.extend(
            record
                .iter()
                .skip(1)
                .map(|s| s.trim().parse().unwrap_or(f64::NAN)),
        );
        row_ids.push(raw_row_id.to_string());
    }

    let data = Array2::from_shape_vec((row_ids.len(), n_obs), values)?;
    Ok(LabeledMatrix { row_ids, data })
}

/// Loads a plain, `.gz` or `.tar.gz` (first regular file) TSV matrix.
pub fn load_matrix(file_path: &str) -> Result<LabeledMatrix, Box<dyn Error>> {
    if file_path.ends_with(".tar.gz") {
        let file = File::open(file_path)?;
        let mut archive = Archive::new(GzDecoder::new(file));
        for entry in archive.entries()? {
            let mut entry = entry?;
            if entry.header().entry_type().is_file() {
                return read_matrix_data(&mut entry);
            }
        }
        Err("No readable file found in tar archive".into())
    } else if file_path.ends_with(".gz") {
        let file = File::open(file_path)?;
        read_matrix_data(MultiGzDecoder::new(file))
    } else {
        read_matrix_data(File::open(file_path)?)
    }
}

pub fn write_triangle<W: Write>(
    writer: W,
    row_ids: &[String],
    triangle: &UpperTriangle,
    layout: OutputLayout,
) -> Result<(), Box<dyn Error>> {
    if row_ids.len() != triangle.n_vars() {
        return Err(format!(
            "{} row IDs given for a triangle over {} variables",
            row_ids.len(),
            triangle.n_vars()
        )
        .into());
    }

    let mut wtr = WriterBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .from_writer(writer);

    match layout {
        OutputLayout::Pairs => {
            wtr.write_record(["row_a", "row_b", "r"])?;
            for (i, k, r) in triangle.iter() {
                let r = r.to_string();
                wtr.write_record([row_ids[i].as_str(), row_ids[k].as_str(), r.as_str()])?;
            }
        }
        OutputLayout::Packed => {
            wtr.write_record(row_ids.iter().map(String::as_str))?;
            for r in triangle.as_slice() {
                wtr.write_record([r.to_string()])?;
            }
        }
    }
    wtr.flush()?;
    Ok(())
}

/// Strips directories and `.gz` / `.tar.gz` / `.tsv`-style extensions.
pub fn input_basename(file_path: &str) -> &str {
    let stem = Path::new(file_path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("data");
    let stem = stem.strip_suffix(".tar").unwrap_or(stem);
    match stem.rsplit_once('.') {
        Some((base, _)) if !base.is_empty() => base,
        _ => stem,
    }
}

/// Writes `payload` as the single file `inner_name` of a gzipped tarball.
pub fn write_tar_gz(path: &str, inner_name: &str, payload: Vec<u8>) -> Result<(), Box<dyn Error>> {
    let file = File::create(path)?;
    let enc = GzEncoder::new(file, Compression::default());
    let mut tar_builder = Builder::new(enc);

    let mut header = Header::new_gnu();
    header.set_size(payload.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();

    tar_builder.append_data(&mut header, inner_name, &mut Cursor::new(payload))?;
    tar_builder.into_inner()?.finish()?;
    Ok(())
}
