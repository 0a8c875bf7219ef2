//! Lazy loader (§4.7): the `UNINIT` page handler. An `UNINIT` page carries
//! enough information to become an `ANON` or `FILE` page on first fault,
//! without doing any of that work at `mmap`/exec-load time.

use alloc::sync::Arc;

use crate::vfs::FileOps;

use super::page::{AnonData, FileAux, FileData, LazyAux, Page, PageKind, PageTypeTag};
use super::spt::Spt;

/// Register a page that will be materialized on first access. Used both
/// for demand-paged executable segments (`planned_kind = File`) and lazily
/// allocated anonymous memory, e.g. stack growth (`planned_kind = Anon`).
pub fn alloc_page_with_initializer(
    spt: &mut Spt,
    va: u64,
    writable: bool,
    planned_kind: PageTypeTag,
    aux: LazyAux,
) -> Result<(), &'static str> {
    let page = Page::new_uninit(va, writable, planned_kind, aux);
    spt.insert(page)
}

/// Convenience constructor used by the ELF loader and `mmap` (§4.10): an
/// UNINIT page planned to become FILE, carrying the file slice it will
/// read on first fault.
pub fn alloc_file_backed(
    spt: &mut Spt,
    va: u64,
    writable: bool,
    file: Arc<dyn FileOps>,
    offset: u64,
    read_bytes: u32,
    zero_bytes: u32,
) -> Result<(), &'static str> {
    let aux = LazyAux::File(FileAux {
        file,
        offset,
        read_bytes,
        zero_bytes,
    });
    alloc_page_with_initializer(spt, va, writable, PageTypeTag::File, aux)
}

/// Turn `page` from `Uninit` into its planned concrete kind, without
/// loading any contents yet. Called once a frame has been installed at
/// `page.va` (§4.11 `claim`), right before `load_contents`.
pub fn materialize(page: &mut Page) -> bool {
    let (planned_kind, aux) = match &mut page.kind {
        PageKind::Uninit(u) => (u.planned_kind, core::mem::replace(&mut u.aux, LazyAux::None)),
        _ => return false,
    };

    page.kind = match (planned_kind, aux) {
        (PageTypeTag::Anon, _) => PageKind::Anon(AnonData::default()),
        (PageTypeTag::File, LazyAux::File(f)) => PageKind::File(FileData {
            file: f.file,
            file_offset: f.offset,
            read_bytes: f.read_bytes,
            zero_bytes: f.zero_bytes,
            mapped_page_count: 0,
        }),
        (PageTypeTag::File, LazyAux::None) => return false,
        (PageTypeTag::Uninit, _) => return false,
    };
    true
}

/// Load a freshly materialized page's initial contents into its resident
/// frame. For ANON this is a no-op (the frame is already zeroed by
/// `frame_alloc`); for FILE this reads the backing file slice. This reuses
/// the same `swap_in` entry points the eviction path uses to re-fault a
/// page — a first load and a re-fault read their contents identically.
pub fn load_contents(page: &mut Page) -> bool {
    let Some(frame) = &page.frame else {
        return false;
    };
    let kva = frame.kva;
    if matches!(page.kind, PageKind::Uninit(_)) {
        return false;
    }
    super::page::swap_in(page, kva)
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
    fn materialize_anon_drops_aux_and_sets_kind() {
        let mut page = Page::new_uninit(0x1000, true, PageTypeTag::Anon, LazyAux::None);
        assert!(materialize(&mut page));
        assert_eq!(page.tag(), PageTypeTag::Anon);
    }

    #[test]
    fn materialize_file_without_aux_fails() {
        let mut page = Page::new_uninit(0x1000, true, PageTypeTag::File, LazyAux::None);
        assert!(!materialize(&mut page));
    }

    #[test]
    fn materialize_file_with_aux_sets_file_data() {
        let aux = LazyAux::File(FileAux {
            file: Arc::new(EmptyFile),
            offset: 0,
            read_bytes: 0,
            zero_bytes: 4096,
        });
        let mut page = Page::new_uninit(0x1000, true, PageTypeTag::File, aux);
        assert!(materialize(&mut page));
        assert_eq!(page.tag(), PageTypeTag::File);
    }
}
