use lopdf::ObjectId;

/// One raster image as seen from one page.
///
/// The same `id` may show up on several pages. Substitutions are applied to
/// the page's own resource entry (`page_id` + `forms` + `name`), never to the
/// shared object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    /// 1-based page ordinal in the input document
    pub page: u32,
    pub page_id: ObjectId,
    /// Form XObject names leading from the page resources to the ones holding
    /// the image; empty for images drawn by the page itself
    pub forms: Vec<Vec<u8>>,
    /// Resource name, e.g. `Im0`
    pub name: Vec<u8>,
    pub id: ObjectId,
    pub width: u32,
    pub height: u32,
    pub color_space: Option<String>,
    pub bits_per_component: Option<u8>,
    /// Filter chain in decoding order
    pub filters: Vec<String>,
    /// Encoded bytes of the image stream plus its soft mask, if any
    pub encoded_len: u64,
}

impl ImageRef {
    /// 0-based page index, as used by the fallback renderer
    pub fn page_index(&self) -> usize {
        self.page.saturating_sub(1) as usize
    }

    /// Resource path such as `Im0` or `Fm0/Im3`
    pub fn name_str(&self) -> String {
        self.forms
            .iter()
            .chain(std::iter::once(&self.name))
            .map(|part| String::from_utf8_lossy(part))
            .collect::<Vec<_>>()
            .join("/")
    }
}
