// Settings panel: automation switch, job-type preferences and the minimum
// match threshold.

pub mod handlers;
pub mod preferences;
