//! Shader cores and compute dispatch.
//!
//! Execution here is an accounting model, not an ISA: instructions are
//! four-word groups whose opcodes update a small register file and charge
//! cycle costs. Unknown opcodes are silently ignored.

use crate::monitor::PerformanceMonitor;

/// Registers per shader core.
const REGISTER_COUNT: usize = 32;

/// Cycle penalty charged for a simulated memory load.
const LOAD_PENALTY: u64 = 10;

/// Cycle penalty charged for a simulated memory store.
const STORE_PENALTY: u64 = 5;

/// A single shader core with its register file and execution counters.
pub struct ShaderCore {
    core_id: u32,
    busy: bool,
    instruction_count: u64,
    cycle_count: u64,
    registers: Vec<f32>,
}

impl ShaderCore {
    /// Creates an idle core with zeroed registers.
    pub fn new(core_id: u32) -> Self {
        Self {
            core_id,
            busy: false,
            instruction_count: 0,
            cycle_count: 0,
            registers: vec![0.0; REGISTER_COUNT],
        }
    }

    /// Core identifier.
    pub fn core_id(&self) -> u32 {
        self.core_id
    }

    /// Returns `true` while the core is mid-instruction.
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Instructions executed so far.
    pub fn instruction_count(&self) -> u64 {
        self.instruction_count
    }

    /// Cycles consumed so far.
    pub fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    /// Value of register `index`, or 0.0 out of range.
    pub fn register(&self, index: usize) -> f32 {
        self.registers.get(index).copied().unwrap_or(0.0)
    }

    /// Executes one instruction group.
    ///
    /// Layout is `[opcode, dst, src1, src2]`; shorter groups are allowed and
    /// simply lack operands. Opcodes: `0x01` ADD, `0x02` MUL, `0x03` LOAD
    /// (charges the load penalty), `0x04` STORE (charges the store penalty).
    /// Unknown opcodes and out-of-range register operands are no-ops.
    pub fn execute_instruction(&mut self, instruction: &[u32]) {
        let Some(&opcode) = instruction.first() else {
            return;
        };

        self.busy = true;

        match opcode {
            0x01 | 0x02 => {
                if let [_, dst, src1, src2, ..] = *instruction {
                    let (dst, src1, src2) = (dst as usize, src1 as usize, src2 as usize);
                    if dst < REGISTER_COUNT && src1 < REGISTER_COUNT && src2 < REGISTER_COUNT {
                        self.registers[dst] = if opcode == 0x01 {
                            self.registers[src1] + self.registers[src2]
                        } else {
                            self.registers[src1] * self.registers[src2]
                        };
                    }
                }
            }
            0x03 => self.cycle_count += LOAD_PENALTY,
            0x04 => self.cycle_count += STORE_PENALTY,
            _ => {}
        }

        self.instruction_count += 1;
        self.cycle_count += 1;
        self.busy = false;
    }
}

/// Shader core array with synchronous compute dispatch.
pub struct GpuCore {
    cores: Vec<ShaderCore>,
}

impl GpuCore {
    /// Creates `num_cores` idle shader cores.
    pub fn new(num_cores: u32) -> Self {
        Self {
            cores: (0..num_cores).map(ShaderCore::new).collect(),
        }
    }

    /// The shader cores, for inspection.
    pub fn shader_cores(&self) -> &[ShaderCore] {
        &self.cores
    }

    /// Distributes `num_threads` over the cores and runs `program` on each.
    ///
    /// Threads are split into contiguous per-core ranges; each thread executes
    /// the whole program as four-word instruction groups. Execution is
    /// synchronous and completes before returning. The dispatch is timed and
    /// the thread count recorded on the monitor.
    pub fn dispatch_compute(
        &mut self,
        mon: &mut PerformanceMonitor,
        program: &[u32],
        num_threads: u32,
    ) {
        if self.cores.is_empty() {
            return;
        }

        mon.start_timer("compute_dispatch");
        mon.increment_counter("dispatched_threads", num_threads as u64);

        let num_cores = self.cores.len() as u32;
        let threads_per_core = num_threads.div_ceil(num_cores);

        for (core_idx, core) in self.cores.iter_mut().enumerate() {
            let start_thread = core_idx as u32 * threads_per_core;
            let end_thread = (start_thread + threads_per_core).min(num_threads);
            if start_thread >= num_threads {
                break;
            }

            for _thread in start_thread..end_thread {
                for group in program.chunks(4) {
                    core.execute_instruction(group);
                }
            }
        }

        mon.end_timer("compute_dispatch");
    }

    /// Returns `true` when no core is mid-instruction.
    pub fn is_idle(&self) -> bool {
        self.cores.iter().all(|core| !core.is_busy())
    }

    /// Number of cores currently mid-instruction.
    pub fn active_cores(&self) -> u32 {
        self.cores.iter().filter(|core| core.is_busy()).count() as u32
    }
}
