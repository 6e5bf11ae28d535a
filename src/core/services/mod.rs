//! Shared collaborators used by tool handlers.
//!
//! - `http` - outbound HTTP with upstream error mapping
//! - `process` - local command execution (real or dry-run)
//! - `poller` - bounded fixed-interval polling
//! - `scheduler` - delayed and repeating tasks with cancellable ids
//! - `signer` - HMAC-SHA256 request signing and MD5 helpers
//! - `token_cache` - on-disk OAuth token cache

pub mod http;
pub mod poller;
pub mod process;
pub mod scheduler;
pub mod signer;
pub mod token_cache;

pub use http::{HttpClient, UpstreamResponse};
pub use poller::{PollPolicy, PollStatus, poll_until};
pub use process::{
    CommandOutput, CommandRunner, CommandSpec, DryRunRunner, Platform, SystemCommandRunner,
};
pub use scheduler::{MAX_DELAY, Schedule, TaskAction, TaskInfo, TaskScheduler};
pub use signer::{RequestSigner, SignedHeaders, md5_hex};
pub use token_cache::{StoredToken, TokenCache};
