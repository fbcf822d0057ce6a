// Export boundary: per-client rate limiting and the download handlers that turn a
// view model into an attachment response.

pub mod handlers;
pub mod rate_limit;
