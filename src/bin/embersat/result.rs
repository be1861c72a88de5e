use thiserror::Error;

pub type EmbersatResult<T> = Result<T, EmbersatError>;

#[derive(Error, Debug)]
pub enum EmbersatError {
    #[error("IO error, more details: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Failed to read file {1}, more details: {0}")]
    FileReadingError(std::io::Error, String),
    #[error("The supplied file is not supported, expected a '*.cnf' DIMACS file")]
    InvalidInstanceFile,
    #[error("Unknown branching strategy '{0}', expected 'vsids', 'maple', or 'rand'")]
    InvalidBranchStrategy(String),
}
