pub mod request_ext;
pub(crate) mod response_ext;
