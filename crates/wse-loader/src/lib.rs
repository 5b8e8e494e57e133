pub mod detect;
pub mod errors;
pub mod formats;
pub mod model;
mod registry;

pub use detect::{detect_columns, find_column};
pub use errors::LoaderError;
pub use model::{DetectedColumns, ParsedDataset};
pub use registry::{load_dataset, load_with_formats, DatasetFormat};
