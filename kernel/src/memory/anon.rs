//! Anonymous (zero-fill / swap-backed) page handler (§4.5).

use super::page::{AnonData, Page, PageKind, PageOps};
use super::swap;

const PAGE_SIZE: usize = 4096;

pub struct AnonPageOps;

impl PageOps for AnonPageOps {
    /// Bring an ANON page's data into `kva`. If it was never swapped out
    /// (`slot_no` is `None`, e.g. a freshly materialized stack page) the
    /// frame is already zeroed by `frame_alloc` and there is nothing to do.
    fn swap_in(page: &mut Page, kva: u64) -> bool {
        let data = match &mut page.kind {
            PageKind::Anon(d) => d,
            _ => return false,
        };
        let Some(slot) = data.slot_no.take() else {
            return true;
        };
        let buf = unsafe { core::slice::from_raw_parts_mut(kva as *mut u8, PAGE_SIZE) };
        swap::slot_read(slot, buf);
        swap::slot_free(slot);
        true
    }

    /// Evict this page: copy its frame to a fresh swap slot, then release
    /// the frame. §7: no free slot is a PANIC at the call site (ANON has no
    /// other backing store to fall back to).
    fn swap_out(page: &mut Page) -> bool {
        let Some(frame) = page.frame.take() else {
            return false;
        };
        let slot = match swap::slot_alloc() {
            Some(s) => s,
            None => {
                // Put the frame back; caller decides how to handle OOM-swap.
                page.frame = Some(frame);
                return false;
            }
        };
        let buf = unsafe { core::slice::from_raw_parts(frame.kva as *const u8, PAGE_SIZE) };
        swap::slot_write(slot, buf);

        match &mut page.kind {
            PageKind::Anon(d) => d.slot_no = Some(slot),
            _ => unreachable!("AnonPageOps::swap_out called on non-Anon page"),
        }

        super::frame::frame_free(page.owner_pid, page.va, *frame);
        true
    }

    /// Free the swap slot if this page was swapped out. Any resident frame
    /// is left for `page::destroy`'s generic step, which reclaims it the
    /// same way for every variant.
    fn destroy(page: &mut Page) {
        if let PageKind::Anon(AnonData { slot_no }) = &mut page.kind {
            if let Some(slot) = slot_no.take() {
                swap::slot_free(slot);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::page::PageTypeTag;

    fn anon_page(va: u64) -> Page {
        Page {
            va,
            writable: true,
            kind: PageKind::Anon(AnonData::default()),
            frame: None,
            owner_pid: 0,
            stack: false,
        }
    }

    #[test]
    fn swap_in_with_no_slot_is_a_noop_success() {
        let mut page = anon_page(0x1000);
        assert!(AnonPageOps::swap_in(&mut page, 0));
        assert_eq!(page.tag(), PageTypeTag::Anon);
    }

    #[test]
    fn swap_out_without_frame_fails() {
        let mut page = anon_page(0x1000);
        assert!(!AnonPageOps::swap_out(&mut page));
    }
}
