pub mod order_upload;

pub use order_upload::{OrderUploadParser, Parser};
