// Automated applications: the tracker list and job URL submission, plus the
// dashboard metrics and history export computed from the same rows.

pub mod dashboard;
pub mod export;
pub mod handlers;
pub mod tracker;
