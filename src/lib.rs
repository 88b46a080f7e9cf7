pub mod config;
pub mod email;
pub mod mappings;
pub mod nlp;
pub mod notifications;
pub mod routing;
pub mod shared;
pub mod tickets;
