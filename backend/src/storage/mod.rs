pub mod temp_upload;

pub use temp_upload::{TempUpload, TempUploadStore, UploadError};
