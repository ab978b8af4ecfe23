pub mod capacity;
pub mod coord;
pub mod flow;
pub mod network;
pub mod node;
