// Resume and job description uploads: validation, text extraction, catalog, originals.

pub mod extract;
pub mod handlers;
pub mod store;
