pub mod request;
pub mod upload;
