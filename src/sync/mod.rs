//! Client-side state for the shopping-list screen.

mod notice;
mod view;

pub use notice::{Notice, NoticeKind};
pub use view::{LoadState, ShoppingListView};
