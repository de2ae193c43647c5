pub mod authenticator;

pub use authenticator::{Identity, SessionAuthenticator};
