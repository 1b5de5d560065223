//! Error types for the IaC bug study core.

use std::io;

use thiserror::Error;

/// Error type for core operations.
#[derive(Debug, Error)]
pub enum IacBugsError {
    /// An underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    /// A CSV file could not be read or written.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    /// The ecosystem tag is not one of Ansible, Puppet or Chef.
    #[error("unsupported ecosystem: {0}")]
    UnsupportedEcosystem(String),
    /// The component label is not a known bug component.
    #[error("unknown component: {0}")]
    UnknownComponent(String),
    /// A cumulative distribution was requested against an empty population.
    #[error("division by zero: population total must be positive")]
    DivisionByZero,
    /// A catch-all error with a message.
    #[error("{0}")]
    Other(String),
}

/// Convenience result type for core operations.
pub type Result<T> = std::result::Result<T, IacBugsError>;

#[cfg(test)]
mod tests {
    use super::IacBugsError;
    use std::io;

    #[test]
    fn io_error_formats_message() {
        let error = IacBugsError::Io(io::Error::new(io::ErrorKind::Other, "boom"));
        assert_eq!(format!("{error}"), "io error: boom");
    }

    #[test]
    fn unsupported_ecosystem_names_the_tag() {
        let error = IacBugsError::UnsupportedEcosystem("Salt".to_string());
        assert_eq!(format!("{error}"), "unsupported ecosystem: Salt");
    }

    #[test]
    fn other_error_formats_message() {
        let error = IacBugsError::Other("collector failed".to_string());
        assert_eq!(format!("{error}"), "collector failed");
    }

    #[test]
    fn from_io_error_maps_variant() {
        let error: IacBugsError = io::Error::new(io::ErrorKind::NotFound, "missing").into();
        match error {
            IacBugsError::Io(inner) => {
                assert_eq!(inner.kind(), io::ErrorKind::NotFound);
            }
            other => panic!("expected Io variant, got {other:?}"),
        }
    }
}
