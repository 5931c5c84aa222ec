pub mod devices;
pub mod siql;
