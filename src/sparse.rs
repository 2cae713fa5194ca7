//! Sparsely backed int32 array.
//!
//! Script-visible arrays can be declared with sizes far beyond what a map
//! will ever touch, so the backing storage is a three-level tree (region ->
//! page table -> page of slots) where each subtree is allocated on first
//! write. Reads of never-written indices return 0 without allocating.

const PAGE_BITS: u32 = 10;
const PAGES_BITS: u32 = 10;

const PAGE_SLOTS: usize = 1 << PAGE_BITS; // i32 slots per page
const PAGES_PER_REGION: usize = 1 << PAGES_BITS;
const REGION_COUNT: usize = 1 << (32 - PAGE_BITS - PAGES_BITS);

type Page = Box<[i32; PAGE_SLOTS]>;

struct Region {
    pages: Vec<Option<Page>>,
}

impl Region {
    fn new() -> Self {
        let mut pages = Vec::new();
        pages.resize_with(PAGES_PER_REGION, || None);
        Region { pages }
    }
}

#[derive(Default)]
pub struct SparseArray {
    regions: Vec<Option<Box<Region>>>,
}

impl SparseArray {
    pub fn new() -> Self {
        SparseArray {
            regions: Vec::new(),
        }
    }

    #[inline]
    fn split(index: u32) -> (usize, usize, usize) {
        let slot = (index & (PAGE_SLOTS as u32 - 1)) as usize;
        let page = ((index >> PAGE_BITS) & (PAGES_PER_REGION as u32 - 1)) as usize;
        let region = (index >> (PAGE_BITS + PAGES_BITS)) as usize;
        (region, page, slot)
    }

    pub fn get(&self, index: u32) -> i32 {
        let (r, p, s) = Self::split(index);
        match self.regions.get(r) {
            Some(Some(region)) => match &region.pages[p] {
                Some(page) => page[s],
                None => 0,
            },
            _ => 0,
        }
    }

    pub fn set(&mut self, index: u32, value: i32) {
        let (r, p, s) = Self::split(index);
        if self.regions.is_empty() {
            self.regions.resize_with(REGION_COUNT, || None);
        }
        let region = self.regions[r].get_or_insert_with(|| Box::new(Region::new()));
        let page = region.pages[p].get_or_insert_with(|| Box::new([0; PAGE_SLOTS]));
        page[s] = value;
    }

    /// Reset every index to 0 and release all backing storage. This is the
    /// only way the array's memory footprint shrinks.
    pub fn clear(&mut self) {
        self.regions = Vec::new();
    }
}
