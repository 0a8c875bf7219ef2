//! Supplemental page table (§4.4): the per-process map from virtual page
//! number to its `Page` descriptor. Lookups on the fault path go through
//! `find`/`find_mut`; `spt_insert`/`spt_remove` are the only mutators, so
//! the set of pages a process can ever fault on is exactly what this map
//! holds.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;

use super::page::{Page, VirtAddr};

pub struct Spt {
    table: BTreeMap<VirtAddr, Box<Page>>,
}

impl Spt {
    pub fn new() -> Self {
        Self {
            table: BTreeMap::new(),
        }
    }

    /// Look up the page covering `va`, rounded down to its containing page.
    pub fn find(&self, va: VirtAddr) -> Option<&Page> {
        self.table.get(&page_floor(va)).map(|b| b.as_ref())
    }

    pub fn find_mut(&mut self, va: VirtAddr) -> Option<&mut Page> {
        self.table.get_mut(&page_floor(va)).map(|b| b.as_mut())
    }

    /// Insert a freshly constructed page. Fails if a page already occupies
    /// that virtual address (§7: duplicate insert is a caller bug, not a
    /// recoverable condition elsewhere, but `mmap` needs to check for
    /// overlap up front so this returns `Err` rather than panicking).
    pub fn insert(&mut self, page: Page) -> Result<(), &'static str> {
        let key = page_floor(page.va);
        if self.table.contains_key(&key) {
            return Err("address already mapped");
        }
        self.table.insert(key, Box::new(page));
        Ok(())
    }

    /// Remove and return the page at `va`, if any. Does not tear down its
    /// backing resources — callers that want that call `page::destroy`
    /// first or use `remove_and_destroy`.
    pub fn remove(&mut self, va: VirtAddr) -> Option<Box<Page>> {
        self.table.remove(&page_floor(va))
    }

    pub fn remove_and_destroy(&mut self, va: VirtAddr) -> bool {
        match self.remove(va) {
            Some(mut page) => {
                super::page::destroy(&mut page);
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&VirtAddr, &Box<Page>)> {
        self.table.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&VirtAddr, &mut Box<Page>)> {
        self.table.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Tear down every page in this table (§4.13, process exit). Order
    /// matters: this must run before the owning `AddressSpace` is dropped,
    /// since `Page::destroy` for FILE pages writes back through a frame
    /// whose mapping the address space teardown would otherwise have
    /// already invalidated.
    pub fn kill(&mut self) {
        for (_, page) in self.table.iter_mut() {
            super::page::destroy(page);
        }
        self.table.clear();
    }
}

impl Default for Spt {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Spt {
    fn drop(&mut self) {
        if !self.table.is_empty() {
            crate::log_warn!(
                "[SPT] dropped with {} live pages; caller should have called kill()",
                self.table.len()
            );
            self.kill();
        }
    }
}

const PAGE_SIZE: u64 = 4096;

fn page_floor(va: VirtAddr) -> VirtAddr {
    va & !(PAGE_SIZE - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::page::{LazyAux, PageTypeTag};

    fn uninit_page(va: u64) -> Page {
        Page::new_uninit(va, true, PageTypeTag::Anon, LazyAux::None)
    }

    #[test]
    fn insert_then_find_rounds_down_to_page() {
        let mut spt = Spt::new();
        spt.insert(uninit_page(0x4000)).unwrap();
        assert!(spt.find(0x4000).is_some());
        assert!(spt.find(0x4abc).is_some());
        assert!(spt.find(0x5000).is_none());
    }

    #[test]
    fn duplicate_insert_rejected() {
        let mut spt = Spt::new();
        spt.insert(uninit_page(0x1000)).unwrap();
        assert!(spt.insert(uninit_page(0x1000)).is_err());
    }

    #[test]
    fn remove_drops_the_page() {
        let mut spt = Spt::new();
        spt.insert(uninit_page(0x2000)).unwrap();
        assert!(spt.remove(0x2000).is_some());
        assert!(spt.find(0x2000).is_none());
    }
}
