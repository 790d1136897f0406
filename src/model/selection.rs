use std::collections::BTreeSet;

/// Pages to keep in the output
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PageSelection {
    #[default]
    All,
    /// 1-based page ordinals
    Only(BTreeSet<u32>),
}

impl PageSelection {
    pub fn contains(&self, ordinal: u32) -> bool {
        match self {
            PageSelection::All => true,
            PageSelection::Only(pages) => pages.contains(&ordinal),
        }
    }

    /// Selected ordinals beyond `page_count`
    pub fn out_of_range(&self, page_count: u32) -> Vec<u32> {
        match self {
            PageSelection::All => Vec::new(),
            PageSelection::Only(pages) => pages
                .iter()
                .copied()
                .filter(|&p| p > page_count)
                .collect(),
        }
    }
}
