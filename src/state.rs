use std::sync::Arc;

use crate::{admission::AdmissionController, config::Config};

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub admission: Arc<AdmissionController>,
}
