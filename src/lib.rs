pub mod configuration;
pub mod mailchimp;
pub mod routes;
pub mod startup;
pub mod telemetry;
