pub mod page_range;

pub use page_range::parse_page_selection;
