//! Application services: content reads, page composition and revalidation.

pub mod content;
pub mod error;
pub mod pages;
pub mod revalidation;
