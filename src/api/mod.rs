//! HTTP API.
//!
//! - `GET /` and `GET /hello` - fixed messages
//! - `POST /chat` - fixed reply
//! - `POST /search_reddit` - plan and run a subreddit digest

mod reddit;
mod routes;
pub mod types;

pub use reddit::{search, SearchError};
pub use routes::{router, serve, AppState};
