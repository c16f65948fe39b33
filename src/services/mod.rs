//! Service layer separating I/O and encoding from the pixel transform

pub mod fetch;
pub mod format;
pub mod io;

pub use fetch::{HttpImageFetcher, ImageSource, DEFAULT_FETCH_TIMEOUT};
pub use format::OutputFormatHandler;
pub use io::ImageIOService;
