pub mod actor;
pub mod business;
pub mod courier;
pub mod order;
