pub mod booking;
pub mod place;
pub mod turnstile;
