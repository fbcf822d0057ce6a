use std::sync::Arc;

use crate::content::profession::ProfessionDirectory;
use crate::export::rate_limit::RateLimiter;
use crate::render::avatar::AvatarProcessor;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Per-client export budget. Backed by Redis or process memory.
    pub rate_limiter: Arc<RateLimiter>,
    pub professions: Arc<dyn ProfessionDirectory>,
    /// EXIF orientation fix applied to PDF avatars before rendering.
    pub avatar_processor: Arc<dyn AvatarProcessor>,
}
