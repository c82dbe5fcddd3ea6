use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Contact;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateContactRequest {
    pub city: String,
    pub street: String,
    #[serde(default)]
    pub house: String,
    #[serde(default)]
    pub apartment: String,
    pub phone: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateContactRequest {
    pub city: Option<String>,
    pub street: Option<String>,
    pub house: Option<String>,
    pub apartment: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ContactList {
    pub items: Vec<Contact>,
}
