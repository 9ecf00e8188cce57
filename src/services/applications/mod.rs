//! Applications: registrations, their certificates and passwords.

mod application_data_source;
mod application_resource;
mod certificate;
mod client;
mod credentials;
mod password;

pub use application_data_source::ApplicationDataSource;
pub use application_resource::{APPLICATION_RESOURCE_NAME, ApplicationResource};
pub use certificate::{APPLICATION_CERTIFICATE_RESOURCE_NAME, ApplicationCertificateResource};
pub use client::ApplicationsClient;
pub use password::{APPLICATION_PASSWORD_RESOURCE_NAME, ApplicationPasswordResource};
