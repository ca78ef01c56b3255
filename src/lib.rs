// Palisade - Content-Security-Policy construction for server-rendered responses
//
// This library builds a policy from a static directive catalog, layers per-request
// nonces and hashes onto it without weakening older engines, and serializes it
// into a minimal header value.

// Re-export core functionality
pub use palisade_csp::*;

// Re-export member crates
pub use palisade_csp;
pub use palisade_log;

// Prelude for common imports
pub mod prelude {
    pub use palisade_csp::prelude::*;
    pub use palisade_log::{debug, error, info, trace, warn};
}
