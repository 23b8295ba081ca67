pub mod health;
pub mod medications;
pub mod patients;
pub mod reconciliations;
pub mod upload;

use serde::{Deserialize, Serialize};

use crate::db::repository::Page;

/// `?skip=&limit=` shared by list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub skip: Option<u32>,
    pub limit: Option<u32>,
}

impl PageQuery {
    pub fn page(&self) -> Page {
        Page::new(self.skip, self.limit)
    }
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}
