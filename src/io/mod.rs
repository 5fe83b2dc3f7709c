//! Batch source and result sink around the pipeline
//!
//! [`read_batches`] feeds the pipeline input channel from any buffered
//! reader; [`write_results`] drains the output channel into any writer.

mod batch;
mod sink;

pub use batch::read_batches;
pub use sink::{write_results, SinkSummary};

use std::path::{Path, PathBuf};

/// Where the name-strings of a run come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// A single name-string given on the command line
    Name(String),
    /// A file with one name-string per line
    File(PathBuf),
    /// Standard input, one name-string per line
    Stdin,
}

impl Input {
    /// Classify a command-line argument: an existing file is read line by
    /// line, anything else is a name-string. No argument means stdin.
    pub fn detect(arg: Option<&str>) -> Self {
        match arg.map(str::trim) {
            None => Self::Stdin,
            Some("-") => Self::Stdin,
            Some(arg) if Path::new(arg).is_file() => Self::File(PathBuf::from(arg)),
            Some(arg) => Self::Name(arg.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_input() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap();

        assert_eq!(Input::detect(None), Input::Stdin);
        assert_eq!(Input::detect(Some("-")), Input::Stdin);
        assert_eq!(
            Input::detect(Some(path)),
            Input::File(PathBuf::from(path))
        );
        assert_eq!(
            Input::detect(Some("Bubo bubo")),
            Input::Name("Bubo bubo".to_string())
        );
    }
}
