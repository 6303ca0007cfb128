pub mod admodel;
pub mod agentmodel;
pub mod locationmodel;
pub mod mediamodel;
pub mod paymentmodel;
pub mod propertymodel;
pub mod tariffmodel;
pub mod usermodel;
