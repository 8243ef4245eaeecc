mod crypto;
mod db;
mod extractor;

pub use crypto::{hash_password, hash_token, verify_password};
pub use db::{create_session_with_token, delete_session, DEV_TEST_TOKEN};
pub use extractor::{AuthUser, MaybeUser};
