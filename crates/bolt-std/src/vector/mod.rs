mod base;
mod element;
mod iter;
mod mapped;

pub use base::*;
pub use element::*;
pub use iter::*;
pub use mapped::*;
