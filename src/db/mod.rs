pub mod addb;
pub mod agentdb;
pub mod db;
pub mod locationdb;
pub mod mediadb;
pub mod paymentdb;
pub mod propertydb;
pub mod tariffdb;
pub mod userdb;

#[cfg(test)]
pub mod fixtures;
