pub mod directory;
pub mod filter;
pub mod debounce;

pub use directory::{DoctorDirectory, StaticDoctorDirectory, SupabaseDoctorDirectory};
pub use filter::DoctorFilterEngine;
pub use debounce::DebouncedDoctorSearch;
