pub mod budget;
pub mod config;
pub mod cube;
pub mod cube_builder;
pub mod cube_optimizer;
pub mod efficiency_table;
pub mod flow_state;
pub mod ligne;
pub mod ligne_finder;
pub mod observer;
pub mod scoring;
pub mod slice;
pub mod slice_planner;
