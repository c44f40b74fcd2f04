use thiserror::Error;

/// Every fatal condition the solver can raise. Empty input is deliberately *not* a variant here
/// since it is reported and the run exits cleanly rather than failing.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("expected a 2-D read matrix, got {ndim} dimensions")]
    ShapeError { ndim: usize },

    #[error(
        "{positions_file} ({n_positions} positions) and {matrix_file} ({n_columns} columns) \
         have different numbers of SNVs"
    )]
    ShapeMismatch {
        positions_file: String,
        matrix_file: String,
        n_positions: usize,
        n_columns: usize,
    },

    #[error("truncated SVD of rank {rank} failed to converge on a {rows}x{cols} matrix")]
    SvdFailure {
        rank: usize,
        rows: usize,
        cols: usize,
    },

    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: malformed integer table: {reason}")]
    Parse { path: String, reason: String },
}

pub type CoreResult<T> = Result<T, CoreError>;
