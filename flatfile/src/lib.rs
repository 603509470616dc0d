//! Flat file and dictionary readers, and the source loading shared by the flattener and maker.

pub mod dictionary;
pub mod error;
pub mod flat_file;
pub mod source;

pub use dictionary::Dictionary;
pub use error::{FlatFileError, SourceError};
pub use flat_file::{parse_field_path, FlatFile};
