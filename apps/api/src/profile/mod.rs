// Profile editor and résumé upload.

pub mod form;
pub mod handlers;
pub mod resume;
