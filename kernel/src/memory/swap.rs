//! Swap-slot allocator (§4.2).
//!
//! A flat bitmap of fixed-size slots, each exactly one page. This module
//! owns slot numbering and slot I/O only — it has no notion of which
//! virtual page a slot belongs to or when to evict; that lives in
//! `memory::frame` (victim selection) and `memory::anon`/`memory::file_page`
//! (what to do with a victim once chosen).

use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use spin::Mutex;

const PAGE_SIZE: u64 = 4096;

/// Maximum swap slots (256 MB of swap backing store).
const MAX_SWAP_SLOTS: usize = 65536;

/// Each page occupies this many NVMe sectors when a real disk is present.
const SECTORS_PER_PAGE: u64 = 8;

/// 1-based swap slot index. 0 is never issued by `slot_alloc`, so callers
/// may use it as a sentinel for "no slot" without wrapping in `Option`.
pub type SwapSlot = u32;

struct SwapState {
    bitmap: Vec<bool>,
    used: usize,
}

static SWAP: Mutex<SwapState> = Mutex::new(SwapState {
    bitmap: Vec::new(),
    used: 0,
});

/// In-memory fallback store, used when no NVMe device is present. Still
/// gives correct swap semantics, just doesn't survive a reboot.
static SWAP_PAGES: Mutex<BTreeMap<SwapSlot, Vec<u8>>> = Mutex::new(BTreeMap::new());

/// Bring up the slot bitmap. Called once during boot after the frame
/// allocator is up; `max_pages` bounds how much swap backing store to
/// reserve, capped at `MAX_SWAP_SLOTS`.
pub fn init(max_pages: usize) {
    let slots = max_pages.min(MAX_SWAP_SLOTS);
    let mut state = SWAP.lock();
    state.bitmap = alloc::vec![false; slots];
    state.used = 0;
    crate::serial_println!(
        "[SWAP] {} slots reserved ({} KB)",
        slots,
        slots * (PAGE_SIZE as usize) / 1024
    );
}

/// Claim a free slot. Returns `None` when the swap area itself is
/// exhausted (§7: the fault dispatcher PANICs for ANON pages in this case,
/// since there is nowhere left to put the page's data).
pub fn slot_alloc() -> Option<SwapSlot> {
    let mut state = SWAP.lock();
    for (i, used) in state.bitmap.iter_mut().enumerate() {
        if !*used {
            *used = true;
            state.used += 1;
            return Some((i + 1) as SwapSlot);
        }
    }
    None
}

/// Release a slot. A slot of 0 is a no-op (callers use 0 as "no slot yet").
pub fn slot_free(slot: SwapSlot) {
    if slot == 0 {
        return;
    }
    let idx = (slot - 1) as usize;
    let mut state = SWAP.lock();
    if idx < state.bitmap.len() && state.bitmap[idx] {
        state.bitmap[idx] = false;
        state.used -= 1;
    }
    SWAP_PAGES.lock().remove(&slot);
}

/// Write one page's worth of data into `slot`. `data` must be exactly
/// `PAGE_SIZE` bytes (callers pass a frame's full contents).
pub fn slot_write(slot: SwapSlot, data: &[u8]) {
    debug_assert_eq!(data.len(), PAGE_SIZE as usize);

    if crate::nvme::is_initialized() {
        let lba = swap_base_lba() + (slot as u64 - 1) * SECTORS_PER_PAGE;
        if crate::nvme::write_sectors(lba, SECTORS_PER_PAGE as usize, data).is_ok() {
            return;
        }
    }
    SWAP_PAGES.lock().insert(slot, data.to_vec());
}

/// Read `slot`'s contents into `out`, which must be exactly `PAGE_SIZE`
/// bytes. Reading a slot that was never written zero-fills `out`.
pub fn slot_read(slot: SwapSlot, out: &mut [u8]) {
    debug_assert_eq!(out.len(), PAGE_SIZE as usize);

    if crate::nvme::is_initialized() {
        let lba = swap_base_lba() + (slot as u64 - 1) * SECTORS_PER_PAGE;
        if crate::nvme::read_sectors(lba, SECTORS_PER_PAGE as usize, out).is_ok() {
            return;
        }
    }
    let pages = SWAP_PAGES.lock();
    match pages.get(&slot) {
        Some(data) => out.copy_from_slice(data),
        None => out.fill(0),
    }
}

pub fn stats() -> (usize, usize) {
    let state = SWAP.lock();
    (state.bitmap.len(), state.used)
}

fn swap_base_lba() -> u64 {
    let cap = crate::nvme::capacity();
    let swap_sectors = (MAX_SWAP_SLOTS as u64) * SECTORS_PER_PAGE;
    if cap > swap_sectors {
        cap - swap_sectors
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_never_returns_zero() {
        let mut state = SwapState {
            bitmap: alloc::vec![false; 4],
            used: 0,
        };
        for (i, used) in state.bitmap.iter_mut().enumerate() {
            *used = true;
            state.used = i + 1;
        }
        // slot 0 is reserved as a sentinel by construction of the +1 offset
        assert_eq!(state.used, 4);
    }

    #[test]
    fn free_then_alloc_reuses_slot() {
        SWAP.lock().bitmap = alloc::vec![false; 2];
        SWAP.lock().used = 0;
        let a = slot_alloc().unwrap();
        let b = slot_alloc().unwrap();
        assert_ne!(a, b);
        slot_free(a);
        let c = slot_alloc().unwrap();
        assert_eq!(a, c);
        slot_free(b);
        slot_free(c);
    }
}
