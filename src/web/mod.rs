pub mod responses;
pub mod streaming;
