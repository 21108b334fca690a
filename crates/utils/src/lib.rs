pub mod assets;
pub mod ephemeral;
pub mod external_services;
