pub mod booking_repo;
pub mod places_repo;
pub mod reviews_cache;
pub mod turnstile_repo;
