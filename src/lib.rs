pub mod commands;
pub mod device;
pub mod entity;
pub mod output;
pub mod raw_value;
