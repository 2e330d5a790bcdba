//! Text processing applied to topics before they are stored.

mod excerpt;
mod sanitize;
mod slug;

pub use excerpt::*;
pub use sanitize::*;
pub use slug::*;
