pub mod candidate;
pub mod derived_record;
pub mod patch;
pub mod skill;
