//! Emote pool: the catalog partitioned into free and active emotes.
//!
//! An id moves through the pool as:
//! - `free` → `reserved` on `allocate`, then `active` once the registry accepts
//!   (or back to `free` if it refuses)
//! - `active` → `releasing` on `release`/expiry, then `free` once the remote
//!   removal returns, whatever its outcome

mod active;
#[allow(clippy::module_inception)]
mod pool;
mod state;

pub use active::ActiveEmote;
pub use pool::{DEFAULT_CALL_TIMEOUT, EmotePool, PoolError};
pub use state::PoolSnapshot;
