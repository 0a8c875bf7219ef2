//! File-backed page handler (§4.6): pages whose contents live in a regular
//! file, used both for executable loading and `mmap`. Unlike ANON, the
//! backing store here is the file itself — swap slots are never used.
//! `destroy` only handles write-back; the resident frame, if any, is
//! reclaimed by `page::destroy`'s generic step after this call returns.

use super::page::{FileData, Page, PageKind, PageOps};

const PAGE_SIZE: u64 = 4096;

pub struct FilePageOps;

impl PageOps for FilePageOps {
    /// Read this page's slice of the file into `kva`, zero-filling the
    /// remainder. Used both for the first fault-in and for re-faulting a
    /// page this process previously evicted.
    fn swap_in(page: &mut Page, kva: u64) -> bool {
        let data = match &page.kind {
            PageKind::File(d) => d,
            _ => return false,
        };
        read_into(data, kva)
    }

    /// Write the page back to the file if it was modified since the last
    /// load, then drop the in-core copy. The frame itself is freed by the
    /// caller (§4.3): FILE pages never own their frame's lifetime the way
    /// ANON does, since the same file offset may still be mapped elsewhere.
    fn swap_out(page: &mut Page) -> bool {
        let Some(frame) = &page.frame else {
            return false;
        };
        let dirty = is_dirty_without_relocking(page);

        if dirty {
            if !write_back(page, frame.kva) {
                return false;
            }
        }

        let frame = page.frame.take().unwrap();
        super::frame::frame_free(page.owner_pid, page.va, *frame);
        true
    }

    /// Write back if dirty. The shared file handle itself is never closed
    /// here — it is an `Arc`, dropped only when the last page (and any
    /// syscall-level open fd) referencing it goes away. Frame release is
    /// left to `page::destroy`'s generic step, same as ANON.
    fn destroy(page: &mut Page) {
        if page.frame.is_some() && is_dirty_without_relocking(page) {
            if let Some(frame) = &page.frame {
                write_back(page, frame.kva);
            }
        }
    }
}

/// Read the hardware dirty bit for `page`'s mapping without assuming the
/// caller doesn't already hold `page.owner_pid`'s `AddressSpace` lock.
/// `frame::evict_one` and `mmap::munmap` both call into `swap_out`/`destroy`
/// while already holding that lock for the page's own process (eviction of
/// one of a process's own pages, or unmapping one) — `lock()` there would
/// deadlock against itself. A contended lock means some caller up the stack
/// already has the definitive answer and is about to act on it anyway, so
/// treat the page as dirty and write back rather than risk silently
/// dropping real writes.
fn is_dirty_without_relocking(page: &Page) -> bool {
    match crate::process::address_space_of(page.owner_pid) {
        Some(space) => match space.try_lock() {
            Some(guard) => guard.is_dirty(page.va),
            None => true,
        },
        None => false,
    }
}

fn read_into(data: &FileData, kva: u64) -> bool {
    let buf = unsafe { core::slice::from_raw_parts_mut(kva as *mut u8, PAGE_SIZE as usize) };
    if data.read_bytes > 0 {
        let read_len = data.read_bytes as usize;
        match data.file.read(data.file_offset, &mut buf[..read_len]) {
            Ok(n) if n == read_len => {}
            _ => return false,
        }
    }
    if data.zero_bytes > 0 {
        let start = data.read_bytes as usize;
        buf[start..start + data.zero_bytes as usize].fill(0);
    }
    true
}

fn write_back(page: &Page, kva: u64) -> bool {
    let data = match &page.kind {
        PageKind::File(d) => d,
        _ => return false,
    };
    if data.read_bytes == 0 {
        return true;
    }
    let buf = unsafe { core::slice::from_raw_parts(kva as *const u8, data.read_bytes as usize) };
    data.file.write(data.file_offset, buf).map(|_| ()).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::page::PageTypeTag;
    use crate::vfs::{FileOps, Stat, VfsResult};
    use alloc::sync::Arc;
    use spin::Mutex;

    struct MemFile(Mutex<alloc::vec::Vec<u8>>);

    impl FileOps for MemFile {
        fn read(&self, offset: u64, buf: &mut [u8]) -> VfsResult<usize> {
            let data = self.0.lock();
            let off = offset as usize;
            if off >= data.len() {
                return Ok(0);
            }
            let n = buf.len().min(data.len() - off);
            buf[..n].copy_from_slice(&data[off..off + n]);
            Ok(n)
        }
        fn write(&self, offset: u64, buf: &[u8]) -> VfsResult<usize> {
            let mut data = self.0.lock();
            let off = offset as usize;
            if data.len() < off + buf.len() {
                data.resize(off + buf.len(), 0);
            }
            data[off..off + buf.len()].copy_from_slice(buf);
            Ok(buf.len())
        }
        fn stat(&self) -> VfsResult<Stat> {
            Err(crate::vfs::VfsError::NotSupported)
        }
    }

    fn file_page(read_bytes: u32, zero_bytes: u32, file: Arc<dyn FileOps>) -> Page {
        Page {
            va: 0x2000,
            writable: true,
            kind: PageKind::File(FileData {
                file,
                file_offset: 0,
                read_bytes,
                zero_bytes,
                mapped_page_count: 1,
            }),
            frame: None,
            owner_pid: 0,
            stack: false,
        }
    }

    #[test]
    fn read_into_zero_fills_past_read_bytes() {
        let file: Arc<dyn FileOps> = Arc::new(MemFile(Mutex::new(alloc::vec![0xAAu8; 4096])));
        let page = file_page(10, 4086, file);
        let data = match &page.kind {
            PageKind::File(d) => d,
            _ => unreachable!(),
        };
        let mut buf = alloc::vec![0xFFu8; 4096];
        assert!(read_into(data, buf.as_mut_ptr() as u64));
        assert_eq!(&buf[..10], &[0xAAu8; 10]);
        assert_eq!(&buf[10..], &[0u8; 4086]);
    }

    #[test]
    fn tag_is_file() {
        let file: Arc<dyn FileOps> = Arc::new(MemFile(Mutex::new(alloc::vec![0u8; 4096])));
        let page = file_page(4096, 0, file);
        assert_eq!(page.tag(), PageTypeTag::File);
    }
}
