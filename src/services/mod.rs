pub mod candidate_service;
pub mod derived_records;
pub mod skill_set;
pub mod status_resolver;
