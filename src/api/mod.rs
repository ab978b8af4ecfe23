pub mod network_dto;
pub mod schedule_dto;
