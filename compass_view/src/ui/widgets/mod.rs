pub(crate) mod compass_button;
pub(crate) mod section;

pub use compass_button::compass_button;
pub use section::section;
