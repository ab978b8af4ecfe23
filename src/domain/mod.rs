pub mod planner;
pub mod scheduler;
pub mod topology;
pub mod utils;
