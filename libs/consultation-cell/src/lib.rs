pub mod models;
pub mod error;
pub mod services;
pub mod state;
pub mod handlers;
pub mod router;

pub use models::*;
pub use error::*;
pub use services::*;
pub use state::{ConsultationCellState, ConsultationServices};
pub use router::consultation_routes;
