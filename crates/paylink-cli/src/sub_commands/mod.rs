pub mod create_request;
pub mod decode_request;
pub mod pay;
pub mod preview;
pub mod split;
