//! End-to-end tests through the public API: snapshot parsing, the full
//! evaluation pipeline, and the HTTP layer.

mod api;
mod builders;
mod mock_source;
mod properties;
mod scenarios;
