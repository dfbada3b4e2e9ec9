pub mod background_tasks;
pub mod logging;
