//! Supplemental-page-table fork (§4.12).
//!
//! Builds a child `AddressSpace` and `Spt` from a parent's, one page at a
//! time. There is no copy-on-write here: ANON pages get a real byte copy,
//! UNINIT pages are re-registered so the child re-runs its own lazy load,
//! and FILE pages are re-registered non-resident so the child re-faults
//! them in from the file rather than sharing a frame. Frame sharing across
//! address spaces would need refcounted frames, which the frame table's
//! single-owner `(Pid, VirtAddr)` model (`memory::frame`) doesn't support —
//! COW-style sharing is an explicitly excluded optimization, so re-fault is
//! the simpler and still-correct choice.

use alloc::boxed::Box;
use spin::Mutex;

use super::page::{AnonData, FileData, LazyAux, Page, PageKind, PageTypeTag, UninitData};
use super::paging::AddressSpace;
use super::spt::Spt;
use super::swap;

const PAGE_SIZE: u64 = 4096;

/// Clone `parent_as`/`parent_spt` into a fresh address space and SPT for a
/// child process. Returns `None` only if the child's address space itself
/// could not be allocated; a failure to copy an individual page is logged
/// and that page is simply dropped from the child (matches §7: fork does
/// not roll back pages already copied).
pub fn fork_address_space(
    parent_spt: &Mutex<Spt>,
    parent_as: &Mutex<AddressSpace>,
    child_pid: crate::process::Pid,
) -> Option<(Spt, AddressSpace)> {
    let mut child_as = AddressSpace::new_with_kernel()?;
    let mut child_spt = Spt::new();

    let parent_spt = parent_spt.lock();
    let parent_as = parent_as.lock();

    for (&va, page) in parent_spt.iter() {
        if page.stack && matches!(page.kind, PageKind::Anon(_)) && !is_copyable_stack(page) {
            continue;
        }
        match copy_page(page, &parent_as, &mut child_as, child_pid) {
            Some(child_page) => {
                if child_spt.insert(child_page).is_err() {
                    crate::log_warn!("[FORK] duplicate va {:#x} while copying SPT", va);
                }
            }
            None => {
                crate::log_warn!("[FORK] failed to copy page {:#x}, child will fault on access", va);
            }
        }
    }

    Some((child_spt, child_as))
}

/// Stack pages copy like any ANON page; this hook exists so a future
/// policy change (skip copying guard/unmapped stack slack) has one place
/// to land without touching the main loop.
fn is_copyable_stack(_page: &Page) -> bool {
    true
}

fn copy_page(
    page: &Page,
    parent_as: &AddressSpace,
    child_as: &mut AddressSpace,
    child_pid: crate::process::Pid,
) -> Option<Page> {
    match &page.kind {
        PageKind::Uninit(u) => Some(Page {
            va: page.va,
            writable: page.writable,
            kind: PageKind::Uninit(UninitData {
                aux: u.aux.clone(),
                planned_kind: u.planned_kind,
            }),
            frame: None,
            owner_pid: child_pid,
            stack: page.stack,
        }),
        PageKind::Anon(a) => copy_anon(page, a, parent_as, child_as, child_pid),
        PageKind::File(f) => Some(Page {
            va: page.va,
            writable: page.writable,
            kind: PageKind::File(FileData {
                file: f.file.clone(),
                file_offset: f.file_offset,
                read_bytes: f.read_bytes,
                zero_bytes: f.zero_bytes,
                mapped_page_count: f.mapped_page_count,
            }),
            frame: None,
            owner_pid: child_pid,
            stack: false,
        }),
    }
}

fn copy_anon(
    page: &Page,
    data: &AnonData,
    parent_as: &AddressSpace,
    child_as: &mut AddressSpace,
    child_pid: crate::process::Pid,
) -> Option<Page> {
    let mut new_data = AnonData::default();

    if let Some(frame) = &page.frame {
        // Resident: copy the live bytes into a fresh frame for the child.
        // No self-eviction context: the child pid isn't registered in the
        // process table yet, so a contended victim here can only belong to
        // some other process and `frame_alloc`'s cross-process `try_lock`
        // path handles that.
        let child_frame = super::frame::frame_alloc(child_pid, page.va, None)?;
        unsafe {
            core::ptr::copy_nonoverlapping(
                frame.kva as *const u8,
                child_frame.kva as *mut u8,
                PAGE_SIZE as usize,
            );
        }
        let flags = super::paging::PageFlags::user(page.writable);
        if child_as.map_page(page.va, child_frame.phys, flags).is_none() {
            super::frame::frame_free(child_pid, page.va, child_frame);
            return None;
        }
        let frame = Box::new(child_frame);
        return Some(Page {
            va: page.va,
            writable: page.writable,
            kind: PageKind::Anon(new_data),
            frame: Some(frame),
            owner_pid: child_pid,
            stack: page.stack,
        });
    }

    if let Some(slot) = data.slot_no {
        // Swapped out: duplicate the slot's contents rather than share it,
        // since `slot_free` assumes single ownership.
        let mut buf = alloc::vec![0u8; PAGE_SIZE as usize];
        swap::slot_read(slot, &mut buf);
        let new_slot = swap::slot_alloc()?;
        swap::slot_write(new_slot, &buf);
        new_data.slot_no = Some(new_slot);
    }

    let _ = parent_as; // reserved for future permission-bit inheritance

    Some(Page {
        va: page.va,
        writable: page.writable,
        kind: PageKind::Anon(new_data),
        frame: None,
        owner_pid: child_pid,
        stack: page.stack,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_uninit_page_preserves_planned_kind() {
        let page = Page::new_uninit(0x4000, true, PageTypeTag::File, LazyAux::None);
        match &page.kind {
            PageKind::Uninit(u) => assert_eq!(u.planned_kind, PageTypeTag::File),
            _ => unreachable!(),
        }
    }
}
