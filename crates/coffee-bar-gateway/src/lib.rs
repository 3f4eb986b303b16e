mod cache;
mod client;
mod graphql;
mod identity;
mod operations;
mod session;

pub use cache::{CacheKey, QueryCache};
pub use client::CoffeeGateway;
pub use graphql::{GraphqlRequest, GraphqlTransport, ReqwestGraphqlTransport};
pub use identity::{
    access_request_mailto, classify_identity_error, parse_callback, Auth0Config,
    Auth0IdentityProvider, IdentityProvider, TokenGrant,
};
pub use session::{
    AccessToken, AccessTokenCell, FileTokenStorage, MemoryTokenStorage, Session, StoredToken,
    TokenStorage, TOKEN_STORAGE_KEY,
};
