pub mod error;
pub mod file_store;
pub mod property_filter;
pub mod reference;
pub mod seed;
pub mod slug;
