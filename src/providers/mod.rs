pub mod identity;
pub mod mailer;
pub mod storage;

pub use identity::{HttpIdentity, IdentityError, IdentityProvider, Principal};
pub use mailer::{Email, MailError, Mailer, ResendMailer};
pub use storage::{HttpObjectStorage, ObjectStorage, StorageError};
