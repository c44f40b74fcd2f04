//! I/O adapters (C9): read the three whitespace-delimited integer input tables and write the
//! final FASTA.

use std::fs;
use std::path::Path;

use ndarray::Array2;

use crate::error::{CoreError, CoreResult};
use crate::postprocess::Strain;

/// Read an `N x L` whitespace-delimited integer matrix. A file with a single row still comes
/// back as a `1 x L` matrix rather than collapsing to a vector.
pub fn read_snv_matrix(path: impl AsRef<Path>) -> CoreResult<Array2<i32>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| CoreError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let rows: Vec<Vec<i32>> = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| parse_int_row(path, line))
        .collect::<CoreResult<Vec<_>>>()?;

    if rows.is_empty() {
        return Ok(Array2::<i32>::zeros((0, 0)));
    }
    let ncols = rows[0].len();
    if rows.iter().any(|r| r.len() != ncols) {
        return Err(CoreError::Parse {
            path: path.display().to_string(),
            reason: "rows have inconsistent lengths".to_string(),
        });
    }

    let mut out = Array2::<i32>::zeros((rows.len(), ncols));
    for (i, row) in rows.into_iter().enumerate() {
        for (j, v) in row.into_iter().enumerate() {
            out[[i, j]] = v;
        }
    }
    Ok(out)
}

/// Read a whitespace-delimited vector of genomic SNV positions (1-based in the file), returned
/// as 0-based offsets into the homogeneous reference.
pub fn read_snv_positions(path: impl AsRef<Path>) -> CoreResult<Vec<usize>> {
    let values = read_int_vector(path)?;
    Ok(values.into_iter().map(|v| (v - 1).max(0) as usize).collect())
}

/// Read the homogeneous reference sequence (0..=4 gap/ACGT codes over the full region).
pub fn read_homogeneous_sequence(path: impl AsRef<Path>) -> CoreResult<Vec<i32>> {
    read_int_vector(path)
}

/// Validate that the number of SNV positions matches the SNV matrix's column count.
pub fn check_shape_match(
    positions_path: &str,
    matrix_path: &str,
    positions: &[usize],
    matrix: &Array2<i32>,
) -> CoreResult<()> {
    if positions.len() != matrix.ncols() {
        return Err(CoreError::ShapeMismatch {
            positions_file: positions_path.to_string(),
            matrix_file: matrix_path.to_string(),
            n_positions: positions.len(),
            n_columns: matrix.ncols(),
        });
    }
    Ok(())
}

/// Write the final FASTA: one record per retained strain, in the order given (callers pass
/// strains already sorted by descending frequency).
pub fn write_fasta(
    path: impl AsRef<Path>,
    homo_seq: &[i32],
    positions: &[usize],
    strains: &[Strain],
) -> CoreResult<()> {
    let path = path.as_ref();
    let mut out = String::new();
    for (i, strain) in strains.iter().enumerate() {
        let sequence = embed_and_render(homo_seq, positions, &strain.sequence);
        out.push_str(&format!(">strain_{idx} freq: {freq:.6}\n", idx = i + 1, freq = strain.frequency));
        out.push_str(&sequence);
        out.push('\n');
    }
    fs::write(path, out).map_err(|source| CoreError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Embed a haplotype's SNV-position calls into the homogeneous reference, then render to
/// A/C/G/T/`*` text, trimming a trailing run of gaps that extends past the reference length.
fn embed_and_render(homo_seq: &[i32], positions: &[usize], snv_calls: &[i32]) -> String {
    let glen = homo_seq.len();
    let full_len = positions.iter().cloned().chain(std::iter::once(0)).max().unwrap_or(0) + 1;
    let full_len = full_len.max(glen);

    let mut full = vec![0i32; full_len];
    full[..glen].copy_from_slice(homo_seq);
    for (&pos, &call) in positions.iter().zip(snv_calls.iter()) {
        full[pos] = call;
    }

    let mut seq = String::with_capacity(full_len);
    for (j, &symbol) in full.iter().enumerate() {
        if j + 1 > glen && symbol == 0 {
            break;
        }
        seq.push(match symbol {
            1 => 'A',
            2 => 'C',
            3 => 'G',
            4 => 'T',
            _ => '*',
        });
    }
    seq
}

fn read_int_vector(path: impl AsRef<Path>) -> CoreResult<Vec<i32>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| CoreError::Io {
        path: path.display().to_string(),
        source,
    })?;
    text.split_whitespace()
        .map(|tok| {
            tok.parse::<f64>()
                .map(|v| v as i32)
                .map_err(|_| CoreError::Parse {
                    path: path.display().to_string(),
                    reason: format!("could not parse token {tok:?} as a number"),
                })
        })
        .collect()
}

fn parse_int_row(path: &Path, line: &str) -> CoreResult<Vec<i32>> {
    line.split_whitespace()
        .map(|tok| {
            tok.parse::<f64>()
                .map(|v| v as i32)
                .map_err(|_| CoreError::Parse {
                    path: path.display().to_string(),
                    reason: format!("could not parse token {tok:?} as a number"),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> std::path::PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("quasirecon-io-test-{}.txt", contents.len()));
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn reads_multi_row_matrix() {
        let path = write_temp("1 2 3 4\n4 3 2 1\n");
        let m = read_snv_matrix(&path).unwrap();
        assert_eq!(m.shape(), &[2, 4]);
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn single_row_stays_two_dimensional() {
        let path = write_temp("1 2 3 4\n");
        let m = read_snv_matrix(&path).unwrap();
        assert_eq!(m.shape(), &[1, 4]);
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn empty_file_is_an_empty_matrix() {
        let path = write_temp("");
        let m = read_snv_matrix(&path).unwrap();
        assert_eq!(m.nrows(), 0);
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn shape_mismatch_between_positions_and_matrix_is_an_error() {
        let matrix = Array2::<i32>::zeros((3, 4));
        let positions = vec![0usize, 1, 2];
        let err = check_shape_match("pos.txt", "matrix.txt", &positions, &matrix).unwrap_err();
        assert!(matches!(err, CoreError::ShapeMismatch { .. }));
    }

    #[test]
    fn embed_and_render_maps_symbols_and_trims_trailing_gap() {
        let homo_seq = vec![1, 1, 1, 1];
        let positions = vec![1usize, 2];
        let seq = embed_and_render(&homo_seq, &positions, &[2, 3]);
        assert_eq!(seq, "ACGA");
    }
}
