//! Timing Side-Channel Analysis
//!
//! This module measures memory access latencies to detect:
//!   - TrustZone-induced timing differences (Secure World cache effects)
//!   - Hidden memory regions (different access speeds reveal cache/SRAM)
//!   - Speculative execution artifacts
//!   - Cache-based covert channels
//!
//! The principle: accessing Secure World memory from Normal World
//! takes longer (fault + restore) even if the fault is hidden.
//! By measuring nanosecond-level timing, we can infer the security
//! configuration without needing privilege.

use alloc::string::String;
use alloc::format;
use alloc::vec::Vec;

/// Read the cycle counter (architecture-specific)
fn read_cycle_counter() -> u64 {
    #[cfg(target_arch = "aarch64")]
    {
        let cnt: u64;
        unsafe {
            core::arch::asm!(
                "mrs {}, cntvct_el0",
                out(reg) cnt,
                options(nomem, nostack)
            );
        }
        cnt
    }
    
    #[cfg(target_arch = "x86_64")]
    {
        let lo: u32;
        let hi: u32;
        unsafe {
            core::arch::asm!(
                "rdtsc",
                out("eax") lo,
                out("edx") hi,
                options(nomem, nostack)
            );
        }
        ((hi as u64) << 32) | (lo as u64)
    }
    
    #[cfg(target_arch = "riscv64")]
    {
        let cnt: u64;
        unsafe {
            core::arch::asm!(
                "rdcycle {}",
                out(reg) cnt,
                options(nomem, nostack)
            );
        }
        cnt
    }
}

/// Get timer frequency for converting cycles to nanoseconds
fn get_timer_freq() -> u64 {
    #[cfg(target_arch = "aarch64")]
    {
        let freq: u64;
        unsafe {
            core::arch::asm!(
                "mrs {}, cntfrq_el0",
                out(reg) freq,
                options(nomem, nostack)
            );
        }
        freq
    }
    
    #[cfg(target_arch = "x86_64")]
    {
        // Assume ~2GHz if we can't detect
        2_000_000_000
    }
    
    #[cfg(target_arch = "riscv64")]
    {
        // Typical RISC-V timer frequency
        10_000_000
    }
}

/// Measure access time to a single address (in cycles)
fn measure_access_time(addr: u64, iterations: usize) -> (u64, u64, u64) {
    let mut min_cycles = u64::MAX;
    let mut max_cycles = 0u64;
    let mut total_cycles = 0u64;
    
    for _ in 0..iterations {
        // Flush caches (architecture-specific)
        #[cfg(target_arch = "aarch64")]
        unsafe {
            core::arch::asm!("dsb sy", "isb", options(nomem, nostack));
        }
        #[cfg(target_arch = "x86_64")]
        unsafe {
            core::arch::asm!("mfence", options(nomem, nostack));
        }
        #[cfg(target_arch = "riscv64")]
        unsafe {
            core::arch::asm!("fence", options(nomem, nostack));
        }
        
        let start = read_cycle_counter();
        
        // Attempt volatile read
        unsafe {
            let ptr = addr as *const u32;
            let _ = core::ptr::read_volatile(ptr);
        }
        
        // Barrier after read
        #[cfg(target_arch = "aarch64")]
        unsafe {
            core::arch::asm!("dsb sy", options(nomem, nostack));
        }
        #[cfg(target_arch = "x86_64")]
        unsafe {
            core::arch::asm!("mfence", options(nomem, nostack));
        }
        #[cfg(target_arch = "riscv64")]
        unsafe {
            core::arch::asm!("fence", options(nomem, nostack));
        }
        
        let end = read_cycle_counter();
        let elapsed = end.wrapping_sub(start);
        
        if elapsed < min_cycles { min_cycles = elapsed; }
        if elapsed > max_cycles { max_cycles = elapsed; }
        total_cycles += elapsed;
    }
    
    let avg = total_cycles / iterations as u64;
    (min_cycles, avg, max_cycles)
}

/// Classify access time anomalies
fn classify_timing(avg_cycles: u64, baseline_cycles: u64) -> (&'static str, &'static str) {
    let ratio = if baseline_cycles > 0 {
        (avg_cycles * 100) / baseline_cycles
    } else {
        100
    };
    
    match ratio {
        0..=80 => ("FAST", "\x01G"),    // Faster than baseline = SRAM/cache?
        81..=120 => ("NORMAL", "\x01W"), // Within 20% = normal DRAM
        121..=300 => ("SLOW", "\x01Y"),  // 1.2-3x = possible MMIO or faulted
        301..=1000 => ("VERY SLOW", "\x01R"), // 3-10x = definite fault/MMIO
        _ => ("ANOMALOUS", "\x01R"),     // 10x+ = exception occurred
    }
}

/// Main timing analysis
pub fn run_timing_analysis(args: &str) -> String {
    let mut output = String::new();
    
    output.push_str("\x01C== TrustProbe: Timing Side-Channel Analyzer ==\x01W\n\n");
    
    let freq = get_timer_freq();
    output.push_str(&format!("Timer frequency: {} Hz ({} MHz)\n", freq, freq / 1_000_000));
    
    let iterations = 10;
    
    // Step 1: Establish baseline with known-good memory
    output.push_str("\n\x01Y--- Baseline Measurement ---\x01W\n");
    
    // Use our own stack/code pages as baseline
    let baseline_addr = &output as *const String as u64;
    let baseline_page = baseline_addr & !0xFFF;
    let (bl_min, bl_avg, bl_max) = measure_access_time(baseline_page, iterations);
    
    output.push_str(&format!("Baseline (kernel memory): min={} avg={} max={} cycles\n",
        bl_min, bl_avg, bl_max));
    
    let ns_per_cycle = if freq > 0 { 1_000_000_000 / freq } else { 1 };
    output.push_str(&format!("  ~{} ns per access (avg)\n", bl_avg * ns_per_cycle));
    
    // Step 2: Probe target regions
    output.push_str("\n\x01Y--- Region Timing Comparison ---\x01W\n");
    output.push_str(&format!("{:<16} {:<10} {:<10} {:<10} {:<10} {}\n",
        "ADDRESS", "MIN", "AVG", "MAX", "RATIO", "CLASS"));
    output.push_str(&format!("{}\n", "-".repeat(70)));
    
    // Define regions to probe
    #[cfg(target_arch = "aarch64")]
    let probe_regions: Vec<(u64, &str)> = alloc::vec![
        (0x0800_0000, "GIC"),
        (0x0900_0000, "UART"),
        (0x0A00_0000, "VirtIO"),
        (0x0E00_0000, "Secure SRAM"),
        (0x4000_0000, "RAM (low)"),
        (0x8000_0000, "RAM (high)"),
    ];
    
    #[cfg(target_arch = "x86_64")]
    let probe_regions: Vec<(u64, &str)> = alloc::vec![
        (0x000A_0000, "VGA/SMRAM"),
        (0x000F_0000, "BIOS area"),
        (0xFEC0_0000, "I/O APIC"),
        (0xFEE0_0000, "Local APIC"),
        (0xFED0_0000, "HPET"),
    ];
    
    #[cfg(target_arch = "riscv64")]
    let probe_regions: Vec<(u64, &str)> = alloc::vec![
        (0x0200_0000, "CLINT"),
        (0x0C00_0000, "PLIC"),
        (0x1000_0000, "UART"),
        (0x8000_0000, "RAM"),
    ];
    
    let mut anomalies = Vec::new();
    
    for (addr, name) in &probe_regions {
        let (p_min, p_avg, p_max) = measure_access_time(*addr, iterations);
        let ratio = if bl_avg > 0 { (p_avg * 100) / bl_avg } else { 0 };
        let (class, color) = classify_timing(p_avg, bl_avg);
        
        output.push_str(&format!("0x{:010X}   {:<10} {:<10} {:<10} {:<10} {}{}\x01W ({})\n",
            addr, p_min, p_avg, p_max,
            format!("{}%", ratio), color, class, name));
        
        if ratio > 200 || ratio < 50 {
            anomalies.push((*addr, *name, ratio, class));
        }
    }
    
    // Step 3: Fine-grained scan around anomalies
    if !anomalies.is_empty() {
        output.push_str(&format!("\n\x01Y--- Anomaly Details ---\x01W\n"));
        output.push_str(&format!("Found {} timing anomalies:\n\n", anomalies.len()));
        
        for (addr, name, ratio, class) in &anomalies {
            output.push_str(&format!("\x01R[{}]\x01W {} @ 0x{:010X} ({}% of baseline)\n",
                class, name, addr, ratio));
            
            if *ratio > 300 {
                output.push_str("    Interpretation: This region likely triggers a fault/exception.\n");
                output.push_str("    This could indicate secure memory, MMIO, or unmapped region.\n");
            } else if *ratio < 50 {
                output.push_str("    Interpretation: Faster than DRAM — could be SRAM or cached.\n");
                output.push_str("    This might be a tightly-coupled memory or L1 cache hit.\n");
            }
        }
    }
    
    // Summary
    output.push_str(&format!("\n\x01C== Timing Analysis Summary ==\x01W\n"));
    output.push_str(&format!("  Regions tested: {}\n", probe_regions.len()));
    output.push_str(&format!("  Anomalies: {}\n", anomalies.len()));
    output.push_str(&format!("  Baseline: {} cycles ({} ns)\n", bl_avg, bl_avg * ns_per_cycle));
    
    if anomalies.iter().any(|(_, _, r, _)| *r > 500) {
        output.push_str("\n\x01R[!] High-latency regions detected — possible secure boundaries\x01W\n");
        output.push_str("    Run 'hwscan trustzone' for detailed boundary mapping\n");
    }
    
    output
}
