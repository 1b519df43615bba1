pub mod fetch;
pub mod inference;
pub mod scratch;
pub mod storage;
