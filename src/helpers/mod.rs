pub mod errors;
pub mod fallbacks;
pub mod iframe_reply;
