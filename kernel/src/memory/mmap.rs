//! `mmap`/`munmap` (§4.10): map a file's contents into a process's address
//! space as a run of lazily-loaded FILE pages, one per page of the
//! mapping. The mapping is entirely a SPT construct until each page is
//! first touched — `mmap` itself never reads the file or allocates a
//! frame.

use alloc::sync::Arc;
use core::sync::atomic::{AtomicU64, Ordering};

use crate::vfs::FileOps;

use super::page::{LazyAux, PageTypeTag, VirtAddr};
use super::paging::AddressSpace;
use super::spt::Spt;

const PAGE_SIZE: u64 = 4096;

/// Bump allocator for addresses the kernel chooses on the caller's behalf
/// (`addr == 0`), grounded in the same "next free mmap address" idea the
/// syscall layer's `sys_mmap` already uses.
static NEXT_MMAP_ADDR: AtomicU64 = AtomicU64::new(0x0000_5000_0000_0000);

/// Map `length` bytes into the address space at `addr` (or a kernel-chosen
/// address if `addr` is 0). `backing = Some((file, offset))` makes this a
/// file-backed mapping, read lazily page by page; `None` is an anonymous,
/// zero-filled mapping. Returns the address the mapping landed at. Fails if
/// any page in the target range is already occupied in the SPT (no
/// overlapping mappings).
pub fn mmap(
    spt: &mut Spt,
    addr: u64,
    length: u64,
    writable: bool,
    backing: Option<(Arc<dyn FileOps>, u64)>,
) -> Result<VirtAddr, &'static str> {
    if length == 0 {
        return Err("zero-length mapping");
    }

    let page_count = ((length + PAGE_SIZE - 1) / PAGE_SIZE) as usize;
    let base = if addr != 0 {
        addr & !(PAGE_SIZE - 1)
    } else {
        NEXT_MMAP_ADDR.fetch_add(page_count as u64 * PAGE_SIZE, Ordering::SeqCst)
    };

    for i in 0..page_count {
        if spt.find(base + (i as u64) * PAGE_SIZE).is_some() {
            return Err("address range already mapped");
        }
    }

    match backing {
        Some((file, file_offset)) => {
            let mut remaining = length;
            for i in 0..page_count {
                let va = base + (i as u64) * PAGE_SIZE;
                let read_bytes = remaining.min(PAGE_SIZE) as u32;
                let zero_bytes = (PAGE_SIZE as u32) - read_bytes;
                remaining -= read_bytes as u64;

                super::uninit::alloc_file_backed(
                    spt,
                    va,
                    writable,
                    file.clone(),
                    file_offset + (i as u64) * PAGE_SIZE,
                    read_bytes,
                    zero_bytes,
                )?;
            }
        }
        None => {
            for i in 0..page_count {
                let va = base + (i as u64) * PAGE_SIZE;
                super::uninit::alloc_page_with_initializer(
                    spt,
                    va,
                    writable,
                    PageTypeTag::Anon,
                    LazyAux::None,
                )?;
            }
        }
    }

    Ok(base)
}

/// Unmap the region starting at `addr` that a prior `mmap` returned.
/// Writes back dirty pages, tears down each page's resources, and removes
/// the hardware mapping. Rejects stack-marked pages outright: those are
/// never installed by `mmap` and unmapping one here would indicate a
/// caller bug, not a legitimate munmap target
/// (`original_source/userprog/process.c`).
pub fn munmap(
    spt: &mut Spt,
    address_space: &mut AddressSpace,
    addr: u64,
    page_count: usize,
) -> Result<(), &'static str> {
    let base = addr & !(PAGE_SIZE - 1);

    for i in 0..page_count {
        let va = base + (i as u64) * PAGE_SIZE;
        let Some(page) = spt.find_mut(va) else {
            continue;
        };
        if page.stack {
            return Err("refusing to munmap a stack page");
        }
        if page.is_resident() {
            super::page::swap_out(page);
            address_space.unmap_page(va);
        }
        spt.remove_and_destroy(va);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::{Stat, VfsResult};

    struct EmptyFile;
    impl FileOps for EmptyFile {
        fn read(&self, _offset: u64, _buf: &mut [u8]) -> VfsResult<usize> {
            Ok(0)
        }
        fn write(&self, _offset: u64, buf: &[u8]) -> VfsResult<usize> {
            Ok(buf.len())
        }
        fn stat(&self) -> VfsResult<Stat> {
            Err(crate::vfs::VfsError::NotSupported)
        }
    }

    #[test]
    fn mmap_rejects_zero_length() {
        let mut spt = Spt::new();
        let file: Arc<dyn FileOps> = Arc::new(EmptyFile);
        assert!(mmap(&mut spt, 0x4000_0000, 0, true, Some((file, 0))).is_err());
    }

    #[test]
    fn mmap_installs_one_uninit_page_per_mapped_page() {
        let mut spt = Spt::new();
        let file: Arc<dyn FileOps> = Arc::new(EmptyFile);
        let base = mmap(&mut spt, 0x4000_0000, PAGE_SIZE * 3 - 10, true, Some((file, 0))).unwrap();
        assert_eq!(spt.len(), 3);
        assert!(spt.find(base).is_some());
        assert!(spt.find(base + 2 * PAGE_SIZE).is_some());
    }

    #[test]
    fn mmap_rejects_overlapping_range() {
        let mut spt = Spt::new();
        let file: Arc<dyn FileOps> = Arc::new(EmptyFile);
        let base = mmap(&mut spt, 0x4000_0000, PAGE_SIZE, true, Some((file.clone(), 0))).unwrap();
        assert!(mmap(&mut spt, base, PAGE_SIZE, true, Some((file, 0))).is_err());
    }

    #[test]
    fn mmap_anonymous_installs_pages_with_no_file() {
        let mut spt = Spt::new();
        let base = mmap(&mut spt, 0x5000_0000, PAGE_SIZE, true, None).unwrap();
        let page = spt.find(base).unwrap();
        assert_eq!(page.tag(), PageTypeTag::Uninit);
    }
}
