pub mod analysis;
pub mod extractor;
pub mod verification;
