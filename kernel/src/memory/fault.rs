//! Page fault dispatcher (§4.8), stack growth policy (§4.9), and `claim`
//! (§4.11): the glue between a hardware `#PF` and the SPT. This is the
//! only module that ever installs a hardware mapping for a page the SPT
//! already knows about (every other module hands back a filled `Frame`
//! and lets this one call `map_page`).

use super::page::{Page, PageKind};
use super::paging::{AddressSpace, PageFlags, UserMemoryRegion};
use super::spt::Spt;

const PAGE_SIZE: u64 = 4096;

fn page_floor(va: u64) -> u64 {
    va & !(PAGE_SIZE - 1)
}

/// Outcome of dispatching one page fault, used by the interrupt handler to
/// decide whether to resume the faulting instruction or terminate the
/// process.
#[derive(Debug, PartialEq, Eq)]
pub enum FaultOutcome {
    Resolved,
    Unhandled,
}

/// Handle a user-mode page fault. `present` mirrors the hardware error
/// code's `PROTECTION_VIOLATION` bit (true: page was mapped but the access
/// violated its permissions; false: page was not present at all).
pub fn try_handle_fault(
    spt: &mut Spt,
    address_space: &mut AddressSpace,
    fault_addr: u64,
    write: bool,
    user_rsp: u64,
) -> FaultOutcome {
    let va = page_floor(fault_addr);

    if spt.find(va).is_none() {
        if should_grow_stack(fault_addr, user_rsp, spt) {
            if grow_stack(spt, address_space, va) {
                return FaultOutcome::Resolved;
            }
        }
        return FaultOutcome::Unhandled;
    }

    if claim(spt, address_space, va, write) {
        FaultOutcome::Resolved
    } else {
        FaultOutcome::Unhandled
    }
}

/// §4.9: grow the stack one page at a time. Growth is permitted only for
/// exactly the two accesses a PUSH-style or direct stack access can make:
/// one slot below `rsp` (a `push`), or at/above `rsp`, and only within the
/// 1 MiB region below `USER_STACK`. Anything else (e.g. `rsp - 9`) is out
/// of bounds and left unresolved.
fn should_grow_stack(fault_addr: u64, user_rsp: u64, spt: &Spt) -> bool {
    let _ = spt;
    if fault_addr > UserMemoryRegion::USER_STACK {
        return false;
    }

    let push_style = user_rsp
        .checked_sub(8)
        .is_some_and(|below_rsp| fault_addr == below_rsp && below_rsp >= UserMemoryRegion::STACK_LIMIT);

    let at_or_above_rsp = fault_addr >= user_rsp && user_rsp >= UserMemoryRegion::STACK_LIMIT;

    push_style || at_or_above_rsp
}

fn grow_stack(spt: &mut Spt, address_space: &mut AddressSpace, va: u64) -> bool {
    use super::page::AnonData;

    let page = Page {
        va,
        writable: true,
        kind: PageKind::Anon(AnonData::default()),
        frame: None,
        owner_pid: crate::process::current_pid(),
        stack: true,
    };

    if spt.insert(page).is_err() {
        return false;
    }
    claim(spt, address_space, va, true)
}

/// §4.11: bring the page at `va` into residency and install its hardware
/// mapping. Assumes `spt.find(va)` already returned `Some`.
pub fn claim(spt: &mut Spt, address_space: &mut AddressSpace, va: u64, write: bool) -> bool {
    let owner_pid = {
        let Some(page) = spt.find_mut(va) else {
            return false;
        };

        if write && !page.writable {
            return false;
        }
        if page.is_resident() {
            // Already mapped; a second fault here means a stale TLB entry or
            // a race with another CPU. Nothing to claim.
            return true;
        }
        page.owner_pid
    };
    let was_uninit = matches!(spt.find(va).unwrap().kind, PageKind::Uninit(_));

    // `spt`/`address_space` are already locked by our caller (the fault
    // handler) for this page's own process, so hand them to `frame_alloc`
    // as an eviction context: if the pool is exhausted and the victim
    // clock-walks back to one of this same process's pages, eviction must
    // use these guards directly rather than trying to re-lock them.
    let mut self_ctx = super::frame::EvictionCtx {
        pid: owner_pid,
        spt: &mut *spt,
        address_space: &mut *address_space,
    };
    let frame = match super::frame::frame_alloc(owner_pid, va, Some(&mut self_ctx)) {
        Some(f) => f,
        None => panic!("out of memory: frame allocation failed after eviction attempt"),
    };

    let Some(page) = spt.find_mut(va) else {
        super::frame::frame_free(owner_pid, va, frame);
        return false;
    };
    page.frame = Some(alloc::boxed::Box::new(frame));

    let loaded = if was_uninit {
        super::uninit::materialize(page) && super::uninit::load_contents(page)
    } else {
        let kva = page.frame.as_ref().unwrap().kva;
        super::page::swap_in(page, kva)
    };

    if !loaded {
        crate::log_error!("[FAULT] failed to load page at {:#x}", va);
        let frame = *page.frame.take().unwrap();
        super::frame::frame_free(page.owner_pid, va, frame);
        return false;
    }

    let phys = page.frame.as_ref().unwrap().phys;
    let flags = PageFlags::user(page.writable);
    if address_space.map_page(va, phys, flags).is_none() {
        let frame = *page.frame.take().unwrap();
        super::frame::frame_free(page.owner_pid, va, frame);
        return false;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stack_growth_accepted_exactly_at_rsp_minus_8() {
        let spt = Spt::new();
        let rsp = UserMemoryRegion::USER_STACK;
        assert!(should_grow_stack(rsp - 8, rsp, &spt));
    }

    #[test]
    fn stack_growth_rejected_at_rsp_minus_9() {
        let spt = Spt::new();
        let rsp = UserMemoryRegion::USER_STACK;
        assert!(!should_grow_stack(rsp - 9, rsp, &spt));
    }

    #[test]
    fn stack_growth_accepted_at_or_above_rsp() {
        let spt = Spt::new();
        let rsp = UserMemoryRegion::USER_STACK - PAGE_SIZE * 4;
        assert!(should_grow_stack(rsp, rsp, &spt));
        assert!(should_grow_stack(rsp + 8, rsp, &spt));
    }

    #[test]
    fn stack_growth_rejected_past_user_stack_top() {
        let spt = Spt::new();
        assert!(!should_grow_stack(
            UserMemoryRegion::USER_STACK + 1,
            UserMemoryRegion::USER_STACK,
            &spt
        ));
    }

    #[test]
    fn stack_growth_accepted_exactly_at_stack_limit() {
        let spt = Spt::new();
        let rsp = UserMemoryRegion::STACK_LIMIT;
        assert!(should_grow_stack(rsp, rsp, &spt));
    }

    #[test]
    fn stack_growth_rejected_one_byte_below_stack_limit() {
        let spt = Spt::new();
        let rsp = UserMemoryRegion::STACK_LIMIT - 1;
        assert!(!should_grow_stack(rsp, rsp, &spt));
    }

    #[test]
    fn scenario_lazy_anon_stack_fault_at_rsp_minus_8() {
        let spt = Spt::new();
        let rsp = 0x4748_0000;
        let fault_addr = rsp - 8;
        assert_eq!(fault_addr, 0x4747_9FF8);
        assert!(should_grow_stack(fault_addr, rsp, &spt));
        assert_eq!(page_floor(fault_addr), 0x4747_9000);
    }
}
