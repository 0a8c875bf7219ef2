//! Physical Frame Allocator (Bitmap)
//!
//! Tracks all usable physical pages (4 KB frames) via a bitmap.
//! Each bit represents one physical frame: 0 = free, 1 = allocated.
//! Initialized from the Limine memory map after the heap is ready.

use core::sync::atomic::{AtomicU64, Ordering};
use spin::Mutex;
use alloc::vec;
use alloc::vec::Vec;
use alloc::collections::VecDeque;

use crate::process::Pid;
use super::page::VirtAddr;
use super::paging::AddressSpace;
use super::spt::Spt;

/// Page / frame size (4 KB)
const FRAME_SIZE: u64 = 4096;

/// Global frame allocator (initialized in main.rs after heap is ready)
static FRAME_ALLOC: Mutex<Option<FrameAllocator>> = Mutex::new(None);

/// Statistics: total frames managed
static TOTAL_FRAMES: AtomicU64 = AtomicU64::new(0);
/// Statistics: allocated frames
static USED_FRAMES: AtomicU64 = AtomicU64::new(0);

/// Physical frame allocator using a bitmap
struct FrameAllocator {
    /// Bitmap: each bit = one 4 KB frame. bit set = allocated.
    bitmap: Vec<u64>,
    /// Base physical address (lowest tracked frame)
    base_phys: u64,
    /// Total number of frames tracked
    total_frames: usize,
    /// Hint: index of last allocation (speeds up linear scan)
    next_hint: usize,
}

impl FrameAllocator {
    /// Allocate one physical frame. Returns its physical address.
    fn alloc(&mut self) -> Option<u64> {
        let words = self.bitmap.len();
        
        // Start scanning from hint
        for offset in 0..words {
            let idx = (self.next_hint + offset) % words;
            let word = self.bitmap[idx];
            
            if word == u64::MAX {
                continue; // all 64 frames in this word are taken
            }
            
            // Find first zero bit
            let bit = (!word).trailing_zeros() as usize;
            let frame_index = idx * 64 + bit;
            
            if frame_index >= self.total_frames {
                continue;
            }
            
            // Mark as allocated
            self.bitmap[idx] |= 1u64 << bit;
            self.next_hint = idx;
            
            USED_FRAMES.fetch_add(1, Ordering::Relaxed);
            
            return Some(self.base_phys + frame_index as u64 * FRAME_SIZE);
        }
        
        None // Out of memory
    }
    
    /// Free a previously allocated frame
    fn free(&mut self, phys: u64) {
        if phys < self.base_phys {
            return;
        }
        let frame_index = ((phys - self.base_phys) / FRAME_SIZE) as usize;
        if frame_index >= self.total_frames {
            return;
        }
        let word_idx = frame_index / 64;
        let bit_idx = frame_index % 64;
        
        if self.bitmap[word_idx] & (1u64 << bit_idx) != 0 {
            self.bitmap[word_idx] &= !(1u64 << bit_idx);
            USED_FRAMES.fetch_sub(1, Ordering::Relaxed);
        }
    }
}

/// Region descriptor passed from main.rs memory-map scan
pub struct PhysRegion {
    pub base: u64,
    pub length: u64,
}

/// Initialize the frame allocator.
///
/// `usable_regions` — list of USABLE physical memory regions from the Limine memory map.  
/// `heap_phys` / `heap_size` — the region already consumed by the kernel heap (must be marked used).
pub fn init(usable_regions: &[PhysRegion], heap_phys: u64, heap_size: u64) {
    if usable_regions.is_empty() {
        crate::serial_println!("[FRAME] No usable regions — frame allocator disabled");
        return;
    }
    
    // Determine the physical address range to track
    let min_phys = usable_regions.iter().map(|r| r.base).min().unwrap();
    let max_phys = usable_regions.iter().map(|r| r.base + r.length).max().unwrap();
    
    // Align min down and max up to FRAME_SIZE
    let base_phys = min_phys & !(FRAME_SIZE - 1);
    let top_phys = (max_phys + FRAME_SIZE - 1) & !(FRAME_SIZE - 1);
    let total_frames = ((top_phys - base_phys) / FRAME_SIZE) as usize;
    
    // Allocate bitmap (all bits set = all allocated by default)
    let bitmap_words = (total_frames + 63) / 64;
    let mut bitmap = vec![u64::MAX; bitmap_words];
    
    // Mark usable regions as FREE (clear bits)
    for region in usable_regions {
        let region_start = (region.base.max(base_phys) - base_phys) / FRAME_SIZE;
        let region_end = ((region.base + region.length).min(top_phys) - base_phys) / FRAME_SIZE;
        
        for frame in region_start..region_end {
            let word = frame as usize / 64;
            let bit = frame as usize % 64;
            bitmap[word] &= !(1u64 << bit);
        }
    }
    
    // Mark heap region as USED (set bits)
    let heap_end = heap_phys + heap_size;
    if heap_phys >= base_phys && heap_phys < top_phys {
        let start_frame = ((heap_phys - base_phys) / FRAME_SIZE) as usize;
        let end_frame = (((heap_end.min(top_phys)) - base_phys) / FRAME_SIZE) as usize;
        for frame in start_frame..end_frame {
            let word = frame / 64;
            let bit = frame % 64;
            bitmap[word] |= 1u64 << bit;
        }
    }
    
    // Also mark the first 1 MB as used (legacy BIOS area, etc.)
    let low_end = (0x10_0000u64.min(top_phys) - base_phys) / FRAME_SIZE;
    for frame in 0..low_end as usize {
        let word = frame / 64;
        let bit = frame % 64;
        bitmap[word] |= 1u64 << bit;
    }
    
    // Count free frames
    let mut free_count: u64 = 0;
    for i in 0..total_frames {
        let word = i / 64;
        let bit = i % 64;
        if bitmap[word] & (1u64 << bit) == 0 {
            free_count += 1;
        }
    }
    let used_count = total_frames as u64 - free_count;
    
    TOTAL_FRAMES.store(total_frames as u64, Ordering::SeqCst);
    USED_FRAMES.store(used_count, Ordering::SeqCst);
    
    crate::serial_println!("[FRAME] Allocator ready: {} total frames, {} free ({} MB), {} used",
        total_frames, free_count, free_count * 4 / 1024, used_count);
    
    *FRAME_ALLOC.lock() = Some(FrameAllocator {
        bitmap,
        base_phys,
        total_frames,
        next_hint: 0,
    });
}

/// Allocate a single physical 4 KB frame.
/// Returns the page-aligned physical address, or `None` if OOM.
pub fn alloc_frame() -> Option<u64> {
    FRAME_ALLOC.lock().as_mut()?.alloc()
}

/// Free a physical frame previously returned by `alloc_frame`.
pub fn free_frame(phys: u64) {
    if let Some(alloc) = FRAME_ALLOC.lock().as_mut() {
        alloc.free(phys);
    }
}

/// Allocate a zeroed physical frame (convenience wrapper).
pub fn alloc_frame_zeroed() -> Option<u64> {
    let phys = alloc_frame()?;
    let hhdm = crate::memory::hhdm_offset();
    let virt = phys + hhdm;
    crate::serial_println!("[FRAME] alloc_zeroed: phys={:#x} hhdm={:#x} virt={:#x}", phys, hhdm, virt);
    core::sync::atomic::fence(core::sync::atomic::Ordering::SeqCst);
    unsafe {
        core::ptr::write_bytes(virt as *mut u8, 0, FRAME_SIZE as usize);
    }
    Some(phys)
}

/// Return (total, used) frame counts.
pub fn stats() -> (u64, u64) {
    (TOTAL_FRAMES.load(Ordering::Relaxed), USED_FRAMES.load(Ordering::Relaxed))
}

/// Run self-tests on the frame allocator. Returns (passed, failed).
pub fn self_test() -> (usize, usize) {
    let mut passed = 0usize;
    let mut failed = 0usize;

    // Test 1: Basic allocation returns page-aligned address
    match alloc_frame() {
        Some(phys) => {
            if phys & 0xFFF == 0 {
                crate::serial_println!("[FRAME-TEST] alloc page-aligned: PASS");
                passed += 1;
            } else {
                crate::serial_println!("[FRAME-TEST] alloc NOT page-aligned ({:#x}): FAIL", phys);
                failed += 1;
            }
            free_frame(phys);
        }
        None => {
            crate::serial_println!("[FRAME-TEST] alloc returned None: FAIL");
            failed += 1;
        }
    }

    // Test 2: Zeroed allocation
    match alloc_frame_zeroed() {
        Some(phys) => {
            let hhdm = crate::memory::hhdm_offset();
            let page = unsafe { core::slice::from_raw_parts((phys + hhdm) as *const u8, 4096) };
            if page.iter().all(|&b| b == 0) {
                crate::serial_println!("[FRAME-TEST] alloc_zeroed all zeros: PASS");
                passed += 1;
            } else {
                crate::serial_println!("[FRAME-TEST] alloc_zeroed NOT zeroed: FAIL");
                failed += 1;
            }
            free_frame(phys);
        }
        None => {
            crate::serial_println!("[FRAME-TEST] alloc_zeroed returned None: FAIL");
            failed += 1;
        }
    }

    // Test 3: Free then re-alloc succeeds
    if let Some(frame1) = alloc_frame() {
        free_frame(frame1);
        if alloc_frame().is_some() {
            crate::serial_println!("[FRAME-TEST] free + realloc: PASS");
            passed += 1;
            // Note: we leak frame2 intentionally — test only
        } else {
            crate::serial_println!("[FRAME-TEST] realloc after free: FAIL");
            failed += 1;
        }
    }

    // Test 4: 16 consecutive allocs produce unique, non-overlapping frames
    let mut frames = alloc::vec::Vec::new();
    let mut test4_ok = true;
    for _ in 0..16 {
        match alloc_frame() {
            Some(f) => {
                if frames.contains(&f) {
                    crate::serial_println!("[FRAME-TEST] duplicate frame {:#x}: FAIL", f);
                    test4_ok = false;
                    break;
                }
                frames.push(f);
            }
            None => {
                crate::serial_println!("[FRAME-TEST] OOM during multi-alloc: FAIL");
                test4_ok = false;
                break;
            }
        }
    }
    for f in &frames {
        free_frame(*f);
    }
    if test4_ok {
        crate::serial_println!("[FRAME-TEST] 16 unique frames: PASS");
        passed += 1;
    } else {
        failed += 1;
    }

    // Test 5: Stats tracking is consistent
    let (_, used_before) = stats();
    if let Some(f) = alloc_frame() {
        let (_, used_after) = stats();
        if used_after == used_before + 1 {
            crate::serial_println!("[FRAME-TEST] stats consistent: PASS");
            passed += 1;
        } else {
            crate::serial_println!("[FRAME-TEST] stats before={} after={}: FAIL", used_before, used_after);
            failed += 1;
        }
        free_frame(f);
    } else {
        crate::serial_println!("[FRAME-TEST] stats test alloc failed: FAIL");
        failed += 1;
    }

    (passed, failed)
}

// ============================================================================
// C1 — frame table and claim-time allocation (§4.1, §4.11)
//
// `alloc_frame`/`free_frame` above are the raw physical-page pool
// (palloc_get_page's Rust shape). `Frame` and `FRAME_TABLE` sit on top of it:
// every frame handed to a resident page is recorded here, in insertion
// order, so the evictor can walk it clock-style when the pool is exhausted.
// ============================================================================

/// A physical frame backing one resident virtual page.
pub struct Frame {
    pub kva: u64,
    pub phys: u64,
}

/// Non-owning identity of a resident frame: which process and which page.
/// The frame table stores these rather than raw pointers into the page
/// object, so a victim is always relocated through the owning SPT — never
/// through a pointer that could outlive the page it named.
#[derive(Clone, Copy, PartialEq, Eq)]
struct FrameKey {
    owner_pid: Pid,
    va: VirtAddr,
}

static FRAME_TABLE: Mutex<VecDeque<FrameKey>> = Mutex::new(VecDeque::new());

/// Locks on one process's `Spt`/`AddressSpace` the caller already holds,
/// passed down so eviction can use them directly rather than re-locking
/// through `vm_handles_of` when the victim it pops happens to belong to
/// that same process (self-eviction — the common case of a single process
/// exhausting the frame pool with its own pages, §8 scenario 4/P3).
/// `spin::Mutex`/`RwLock` aren't reentrant, so without this, evicting one
/// of the caller's own pages would try to re-lock a mutex it's already
/// holding and deadlock (or, with a `try_lock`-and-skip fallback, simply
/// never succeed, since every candidate belongs to the same contended
/// process).
pub struct EvictionCtx<'a> {
    pub pid: Pid,
    pub spt: &'a mut Spt,
    pub address_space: &'a mut AddressSpace,
}

/// Allocate a frame for `va` in `owner_pid`'s address space, evicting a
/// resident page if the physical pool is exhausted. Returns `None` only if
/// eviction itself could not free a frame (caller treats this as the fatal
/// `OutOfMemory` case from §7).
///
/// `self_ctx`, if given, is the calling process's own already-locked
/// `Spt`/`AddressSpace` (see `EvictionCtx`); pass it whenever the caller is
/// already holding those locks (the fault handler, fork's parent-copy loop)
/// so self-eviction can proceed instead of spinning forever on a contended
/// lock.
pub fn frame_alloc(owner_pid: Pid, va: VirtAddr, self_ctx: Option<&mut EvictionCtx>) -> Option<Frame> {
    let phys = match alloc_frame_zeroed() {
        Some(p) => p,
        None => {
            if !evict_one(self_ctx) {
                return None;
            }
            alloc_frame_zeroed()?
        }
    };
    FRAME_TABLE.lock().push_back(FrameKey { owner_pid, va });
    let kva = crate::memory::phys_to_virt(phys);
    Some(Frame { kva, phys })
}

/// Release a frame previously returned by `frame_alloc`. Must be called
/// with the hardware mapping already cleared.
pub fn frame_free(owner_pid: Pid, va: VirtAddr, frame: Frame) {
    let key = FrameKey { owner_pid, va };
    let mut table = FRAME_TABLE.lock();
    if let Some(idx) = table.iter().position(|k| *k == key) {
        table.remove(idx);
    }
    drop(table);
    free_frame(frame.phys);
}

/// Outcome of one eviction attempt against a single candidate frame.
enum EvictStep {
    /// Evicted; the physical frame is free and the hardware mapping is gone.
    Evicted,
    /// Accessed bit was set; it was cleared and the candidate should be
    /// requeued for another pass.
    SecondChance,
    /// Not resident-clean (e.g. disk full on FILE write-back); drop it
    /// rather than requeue, same as before.
    Failed,
}

/// Shared decision logic for one candidate, given direct access to its
/// owning process's `AddressSpace`/`Spt` — used both by the self-eviction
/// fast path (guards the caller already holds) and the cross-process path
/// (guards freshly locked here).
fn try_evict(address_space: &mut AddressSpace, spt: &mut Spt, va: VirtAddr) -> EvictStep {
    if address_space.is_accessed(va) {
        address_space.clear_accessed(va);
        return EvictStep::SecondChance;
    }

    let evicted = match spt.find_mut(va) {
        Some(page) => super::page::swap_out(page),
        None => false,
    };

    if evicted {
        // swap_out already freed the physical frame; the hardware mapping
        // must go with it or a stale PTE would still point at whatever
        // frame gets allocated next.
        address_space.unmap_page(va);
        EvictStep::Evicted
    } else {
        EvictStep::Failed
    }
}

/// Clock/second-chance eviction (§4.11): walk the frame table in insertion
/// order; a frame whose hardware accessed bit is set gets a second chance
/// (bit cleared, frame moved to the back); the first frame found with the
/// bit already clear is evicted via its page's `swap_out`.
///
/// When a popped candidate belongs to `self_ctx`'s process, its already-held
/// `Spt`/`AddressSpace` guards are used directly (self-eviction: a process
/// exhausting the pool with its own pages, the common case). Other
/// processes' candidates are relocked here via `try_lock`; a contended one
/// is requeued rather than awaited, since some other thread holding it is
/// presumably about to finish and release it.
fn evict_one(mut self_ctx: Option<&mut EvictionCtx>) -> bool {
    let table_len = FRAME_TABLE.lock().len();
    if table_len == 0 {
        return false;
    }

    for _ in 0..(2 * table_len + 1) {
        let key = match FRAME_TABLE.lock().pop_front() {
            Some(k) => k,
            None => return false,
        };

        if let Some(ctx) = self_ctx.as_deref_mut() {
            if ctx.pid == key.owner_pid {
                match try_evict(ctx.address_space, ctx.spt, key.va) {
                    EvictStep::Evicted => return true,
                    EvictStep::SecondChance => {
                        FRAME_TABLE.lock().push_back(key);
                        continue;
                    }
                    EvictStep::Failed => continue,
                }
            }
        }

        let (spt, address_space) = match crate::process::vm_handles_of(key.owner_pid) {
            Some(h) => h,
            None => continue, // owning process is gone; drop this stale entry
        };

        let Some(mut as_guard) = address_space.try_lock() else {
            FRAME_TABLE.lock().push_back(key);
            continue;
        };

        let Some(mut spt_guard) = spt.try_lock() else {
            drop(as_guard);
            FRAME_TABLE.lock().push_back(key);
            continue;
        };

        let step = try_evict(&mut as_guard, &mut spt_guard, key.va);
        drop(spt_guard);
        drop(as_guard);

        match step {
            EvictStep::Evicted => return true,
            EvictStep::SecondChance => FRAME_TABLE.lock().push_back(key),
            EvictStep::Failed => {}
        }
    }
    false
}
