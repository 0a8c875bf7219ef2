//! Supplemental-page-table page object.
//!
//! A `Page` is the per-process, per-virtual-page description of how a page's
//! contents are backed: not yet materialized (`Uninit`), anonymous/swap-backed
//! (`Anon`), or file-backed (`File`). The variant is rewritten in place on
//! first fault; `va` and `writable` never change after insertion.

use alloc::boxed::Box;
use alloc::sync::Arc;

use crate::process::Pid;
use crate::vfs::FileOps;

use super::frame::Frame;

pub type VirtAddr = u64;

/// Payload carried by an `Uninit` page until the first fault materializes
/// it, owned exclusively by the `Uninit` variant until that fault consumes
/// (or frees) it.
#[derive(Clone)]
pub enum LazyAux {
    None,
    File(FileAux),
}

#[derive(Clone)]
pub struct FileAux {
    pub file: Arc<dyn FileOps>,
    pub offset: u64,
    pub read_bytes: u32,
    pub zero_bytes: u32,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PageTypeTag {
    Uninit,
    Anon,
    File,
}

pub struct UninitData {
    pub aux: LazyAux,
    pub planned_kind: PageTypeTag,
}

#[derive(Default)]
pub struct AnonData {
    pub slot_no: Option<u32>,
}

pub struct FileData {
    pub file: Arc<dyn FileOps>,
    pub file_offset: u64,
    pub read_bytes: u32,
    pub zero_bytes: u32,
    /// Page count of the mmap region this page belongs to, for
    /// diagnostics; `munmap` takes its extent explicitly from the caller
    /// rather than trusting this field.
    pub mapped_page_count: usize,
}

pub enum PageKind {
    Uninit(UninitData),
    Anon(AnonData),
    File(FileData),
}

impl PageKind {
    pub fn tag(&self) -> PageTypeTag {
        match self {
            PageKind::Uninit(_) => PageTypeTag::Uninit,
            PageKind::Anon(_) => PageTypeTag::Anon,
            PageKind::File(_) => PageTypeTag::File,
        }
    }
}

/// One virtual page owned by a process's supplemental page table.
pub struct Page {
    pub va: VirtAddr,
    pub writable: bool,
    pub kind: PageKind,
    pub frame: Option<Box<Frame>>,
    /// Owning process. The frame table keys on `(owner_pid, va)` rather
    /// than a thread id, since an address space (and its SPT) is shared by
    /// every thread of a process, not owned by one.
    pub owner_pid: Pid,
    /// Marks an ANON page installed by stack growth (§4.9). Only ANON pages
    /// may carry this marker; enforced at construction sites.
    pub stack: bool,
}

impl Page {
    pub fn new_uninit(va: VirtAddr, writable: bool, planned_kind: PageTypeTag, aux: LazyAux) -> Self {
        Self {
            va,
            writable,
            kind: PageKind::Uninit(UninitData { aux, planned_kind }),
            frame: None,
            owner_pid: crate::process::current_pid(),
            stack: false,
        }
    }

    pub fn is_resident(&self) -> bool {
        self.frame.is_some()
    }

    pub fn tag(&self) -> PageTypeTag {
        self.kind.tag()
    }
}

/// Dispatch table shape every variant must honor (§4.3). We use match
/// dispatch rather than a trait object: there are exactly three variants,
/// and avoiding `dyn` keeps this allocation-free on the hot fault path.
pub trait PageOps {
    /// Bring `page` into `kva`. Returns false on I/O failure.
    fn swap_in(page: &mut Page, kva: u64) -> bool;
    /// Evict `page`'s resident frame back to its backing store. Returns
    /// false on failure (disk full, I/O error); caller PANICs for ANON,
    /// propagates to process termination for FILE.
    fn swap_out(page: &mut Page) -> bool;
    /// Release backing-store resources. Leaves `page` itself intact.
    fn destroy(page: &mut Page);
}

/// Swap a non-resident page back into `kva` via its variant's handler.
pub fn swap_in(page: &mut Page, kva: u64) -> bool {
    match page.kind {
        PageKind::Anon(_) => super::anon::AnonPageOps::swap_in(page, kva),
        PageKind::File(_) => super::file_page::FilePageOps::swap_in(page, kva),
        PageKind::Uninit(_) => false,
    }
}

/// Evict a resident page via its variant's handler.
pub fn swap_out(page: &mut Page) -> bool {
    match page.kind {
        PageKind::Anon(_) => super::anon::AnonPageOps::swap_out(page),
        PageKind::File(_) => super::file_page::FilePageOps::swap_out(page),
        PageKind::Uninit(_) => false,
    }
}

/// Free the backing-store resources of `page` (§4.3: frees neither the page
/// object itself nor, for FILE, the shared file handle). Each variant's
/// `destroy` handles its own swap slot / write-back; whatever frame is left
/// resident afterward is freed here uniformly.
pub fn destroy(page: &mut Page) {
    match page.kind {
        PageKind::Anon(_) => super::anon::AnonPageOps::destroy(page),
        PageKind::File(_) => super::file_page::FilePageOps::destroy(page),
        PageKind::Uninit(ref mut u) => {
            // Dropping the aux here frees any file Arc it held.
            u.aux = LazyAux::None;
        }
    }
    if let Some(frame) = page.frame.take() {
        super::frame::frame_free(page.owner_pid, page.va, *frame);
    }
}
