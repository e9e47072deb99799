//! Core data types for FlightSurety

pub mod account_id;
pub mod airline;
pub mod flight;
pub mod policy;
