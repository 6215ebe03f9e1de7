pub mod bench;
pub mod fold;
pub mod serve;
pub mod status;
