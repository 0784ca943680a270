mod profile_repository;
mod progress_repository;
mod proof_repository;
mod week_repository;

pub use profile_repository::ProfileRepository;
pub use progress_repository::ProgressRepository;
pub use proof_repository::ProofRepository;
pub use week_repository::WeekRepository;
