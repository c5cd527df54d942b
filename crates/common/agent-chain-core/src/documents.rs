mod base;

pub use base::Document;
