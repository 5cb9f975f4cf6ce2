//! Drive accounts and access token caching.

mod account;
mod store;
mod token_cache;

pub use account::PanAccount;
pub use store::{AccountStore, PostgresAccountStore};
pub use token_cache::{AccessTokenCache, FreshToken, TokenRefresher};
