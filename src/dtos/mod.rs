pub mod addtos;
pub mod agentdtos;
pub mod locationdtos;
pub mod mediadtos;
pub mod paymentdtos;
pub mod propertydtos;
pub mod tariffdtos;
pub mod userdtos;
